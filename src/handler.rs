use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use paperchat_core::{DocumentScope, LlmModel, PromptStyle};

use crate::app::{
    copy_to_clipboard, App, ConfirmAction, InputMode, PathAction, Popup, Screen, QUICK_ACTIONS,
};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Task(result) => app.apply_task(*result),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if !matches!(app.popup, Popup::None) {
        handle_popup(app, key);
        return;
    }

    if app.screen == Screen::Auth {
        handle_auth(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('1') => return app.switch_screen(Screen::Chat),
        KeyCode::Char('2') => return app.switch_screen(Screen::Documents),
        KeyCode::Char('3') => return app.switch_screen(Screen::Dashboard),
        KeyCode::Char('4') => return app.switch_screen(Screen::Profile),
        KeyCode::Char('L') => return app.logout(),
        _ => {}
    }

    match app.screen {
        Screen::Chat => handle_chat_normal(app, key),
        Screen::Documents => handle_documents_normal(app, key),
        Screen::Dashboard => {
            if key.code == KeyCode::Char('R') {
                app.refresh_dashboard();
            }
        }
        Screen::Profile => handle_profile_normal(app, key),
        Screen::Auth => {}
    }
}

// ----------------------------------------------------------------------
// Auth
// ----------------------------------------------------------------------

fn handle_auth(app: &mut App, key: KeyEvent) {
    if app.auth_busy {
        return;
    }
    let count = app.auth_fields.len();
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::Down => app.auth_focus = (app.auth_focus + 1) % count,
        KeyCode::BackTab | KeyCode::Up => app.auth_focus = (app.auth_focus + count - 1) % count,
        KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.toggle_auth_mode()
        }
        KeyCode::Enter => {
            if app.auth_focus + 1 < count {
                app.auth_focus += 1;
            } else {
                app.submit_auth();
            }
        }
        _ => {
            let focus = app.auth_focus;
            if app.auth_fields[focus].handle_key(key) {
                app.auth_error = None;
            }
        }
    }
}

// ----------------------------------------------------------------------
// Chat
// ----------------------------------------------------------------------

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Char('/') => {
            if !app.capture.is_transcribing() {
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Enter => app.submit_question(),
        KeyCode::Char('j') | KeyCode::Down => app.chat_scroll = app.chat_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => app.chat_scroll = app.chat_scroll.saturating_sub(1),
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        KeyCode::Char('m') => {
            let current = LlmModel::all().iter().position(|m| *m == app.model).unwrap_or(0);
            app.picker_state.select(Some(current));
            app.popup = Popup::ModelPicker;
        }
        KeyCode::Char('p') => {
            let current = PromptStyle::all().iter().position(|s| *s == app.style).unwrap_or(0);
            app.picker_state.select(Some(current));
            app.popup = Popup::StylePicker;
        }
        KeyCode::Char('s') => {
            let current = app
                .scope_options()
                .iter()
                .position(|(scope, _)| *scope == app.scope)
                .unwrap_or(0);
            app.picker_state.select(Some(current));
            app.popup = Popup::ScopePicker;
        }
        KeyCode::Char('a') => {
            app.picker_state.select(Some(0));
            app.popup = Popup::QuickActions;
        }
        KeyCode::Char('r') => app.toggle_recording(),
        KeyCode::Char('y') => {
            if let Some(answer) = app.last_answer().map(str::to_string) {
                copy_to_clipboard(&answer);
                app.notify(paperchat_core::Notice::info("Copied last answer"));
            }
        }
        KeyCode::Char('C') => app.request_clear_history(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Chat => handle_chat_editing(app, key),
        Screen::Profile => handle_profile_editing(app, key),
        _ => app.input_mode = InputMode::Normal,
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_question(),
        _ => {
            // Input is locked while a transcription may overwrite it
            if !app.capture.is_transcribing() {
                app.input.handle_key(key);
            }
        }
    }
}

// ----------------------------------------------------------------------
// Documents
// ----------------------------------------------------------------------

fn handle_documents_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.documents_next(),
        KeyCode::Char('k') | KeyCode::Up => app.documents_prev(),
        KeyCode::Enter => app.use_selected_as_scope(),
        KeyCode::Char('s') => app.open_summary(),
        KeyCode::Char('g') => app.open_graph(),
        KeyCode::Char('u') => open_path_input(app, PathAction::UploadPdf),
        KeyCode::Char('U') => open_path_input(app, PathAction::UploadImage),
        KeyCode::Char('d') => app.download_selected(),
        KeyCode::Char('x') => app.request_delete_selected(),
        KeyCode::Char('R') => app.refresh_documents(),
        _ => {}
    }
}

fn open_path_input(app: &mut App, action: PathAction) {
    app.path_input.clear();
    app.popup = Popup::PathInput(action);
}

// ----------------------------------------------------------------------
// Profile
// ----------------------------------------------------------------------

fn handle_profile_normal(app: &mut App, key: KeyEvent) {
    let count = app.profile_fields.len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
            app.profile_focus = (app.profile_focus + 1) % count
        }
        KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
            app.profile_focus = (app.profile_focus + count - 1) % count
        }
        KeyCode::Char('i') | KeyCode::Char('e') => app.input_mode = InputMode::Editing,
        KeyCode::Char('S') => app.save_profile(),
        KeyCode::Char('D') => {
            app.popup = Popup::Confirm(ConfirmAction::DeleteAccount);
        }
        _ => {}
    }
}

fn handle_profile_editing(app: &mut App, key: KeyEvent) {
    let count = app.profile_fields.len();
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Tab | KeyCode::Down => app.profile_focus = (app.profile_focus + 1) % count,
        KeyCode::BackTab | KeyCode::Up => app.profile_focus = (app.profile_focus + count - 1) % count,
        KeyCode::Enter => app.save_profile(),
        _ => {
            let focus = app.profile_focus;
            app.profile_fields[focus].handle_key(key);
        }
    }
}

// ----------------------------------------------------------------------
// Popups
// ----------------------------------------------------------------------

fn picker_nav(app: &mut App, len: usize, down: bool) {
    if len == 0 {
        return;
    }
    let i = app.picker_state.selected().unwrap_or(0);
    let next = if down { (i + 1).min(len - 1) } else { i.saturating_sub(1) };
    app.picker_state.select(Some(next));
}

fn handle_popup(app: &mut App, key: KeyEvent) {
    let len = match &app.popup {
        Popup::ModelPicker => LlmModel::all().len(),
        Popup::StylePicker => PromptStyle::all().len(),
        Popup::ScopePicker => app.scope_options().len(),
        Popup::QuickActions => QUICK_ACTIONS.len(),
        Popup::PathInput(action) => {
            let action = *action;
            return handle_path_input(app, key, action);
        }
        Popup::Confirm(_) => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm(),
                KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => app.popup = Popup::None,
                _ => {}
            }
            return;
        }
        Popup::Summary(_) => {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => app.popup = Popup::None,
                KeyCode::Char('r') => app.regenerate_summary(),
                KeyCode::Char('S') => app.share_summary(),
                KeyCode::Char('e') => app.export_summary(),
                _ => {}
            }
            return;
        }
        Popup::Graph(_) => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                app.popup = Popup::None;
            }
            return;
        }
        Popup::None => return,
    };

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.popup = Popup::None,
        KeyCode::Char('j') | KeyCode::Down => picker_nav(app, len, true),
        KeyCode::Char('k') | KeyCode::Up => picker_nav(app, len, false),
        KeyCode::Enter => {
            let Some(i) = app.picker_state.selected() else { return };
            let popup = std::mem::replace(&mut app.popup, Popup::None);
            match popup {
                Popup::ModelPicker => {
                    if let Some(model) = LlmModel::all().into_iter().nth(i) {
                        app.set_model(model);
                    }
                }
                Popup::StylePicker => {
                    if let Some(style) = PromptStyle::all().into_iter().nth(i) {
                        app.set_style(style);
                    }
                }
                Popup::ScopePicker => {
                    app.scope = app
                        .scope_options()
                        .into_iter()
                        .nth(i)
                        .map(|(scope, _)| scope)
                        .unwrap_or(DocumentScope::All);
                }
                Popup::QuickActions => app.apply_quick_action(i),
                _ => {}
            }
        }
        _ => {}
    }
}

fn handle_path_input(app: &mut App, key: KeyEvent, action: PathAction) {
    match key.code {
        KeyCode::Esc => app.popup = Popup::None,
        KeyCode::Enter => app.upload(action),
        _ => {
            app.path_input.handle_key(key);
        }
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match (app.screen, mouse.kind) {
        (Screen::Chat, MouseEventKind::ScrollDown) => {
            app.chat_scroll = app.chat_scroll.saturating_add(3);
        }
        (Screen::Chat, MouseEventKind::ScrollUp) => {
            app.chat_scroll = app.chat_scroll.saturating_sub(3);
        }
        (Screen::Documents, MouseEventKind::ScrollDown) => app.documents_next(),
        (Screen::Documents, MouseEventKind::ScrollUp) => app.documents_prev(),
        _ => {}
    }
}
