use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Clear, List, ListItem, Paragraph, Row, Table,
        Wrap,
    },
    Frame,
};

use paperchat_core::{format_model_name, ChatRole, LlmModel, NoticeLevel, PanelBody, PromptStyle};

use crate::app::{
    App, AuthMode, InputMode, PathAction, Popup, Screen, PROFILE_LABELS, QUICK_ACTIONS,
};
use crate::input::TextInput;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Centered popup area clamped to the frame.
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn key_style() -> Style {
    // Dark background with bright text for visibility on both light/dark terminals
    Style::default().bg(Color::DarkGray).fg(Color::White)
}

fn label_style() -> Style {
    Style::default().bg(Color::Black).fg(Color::White)
}

fn hint_spans(pairs: &[(&str, &str)]) -> Vec<Span<'static>> {
    pairs
        .iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(format!(" {} ", key), key_style()),
                Span::styled(format!(" {} ", label), label_style()),
            ]
        })
        .collect()
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Auth => render_auth_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Documents => render_documents_screen(app, frame, body_area),
        Screen::Dashboard => render_dashboard_screen(app, frame, body_area),
        Screen::Profile => render_profile_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
    render_popup(app, frame, area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(" PaperChat ", Style::default().fg(Color::Cyan).bold())];

    if app.screen != Screen::Auth {
        let tabs = [
            ("1", "Chat", Screen::Chat),
            ("2", "Documents", Screen::Documents),
            ("3", "Dashboard", Screen::Dashboard),
            ("4", "Profile", Screen::Profile),
        ];
        for (key, label, screen) in tabs {
            let style = if app.screen == screen {
                Style::default().fg(Color::White).bold()
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(format!(" {}:{} ", key, label), style));
        }
    }

    if let Some(user) = app.user_label() {
        spans.push(Span::styled(format!(" {} ", user), Style::default().fg(Color::Green)));
    }
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::Gray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Auth => " AUTH ",
        Screen::Chat => " CHAT ",
        Screen::Documents => " DOCS ",
        Screen::Dashboard => " STATS ",
        Screen::Profile => " PROFILE ",
    };

    let mut spans = vec![Span::styled(mode_text, mode_style)];

    // A live notice takes the place of the key hints
    if let Some(notice) = app.current_notice() {
        let color = match notice.level {
            NoticeLevel::Info => Color::Cyan,
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        spans.push(Span::styled(format!(" {} ", notice.text), Style::default().fg(color)));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
        return;
    }

    let hints: &[(&str, &str)] = match (&app.popup, app.screen, app.input_mode) {
        (Popup::Summary(_), _, _) => &[("r", "regenerate"), ("S", "share"), ("e", "export"), ("Esc", "close")],
        (Popup::Graph(_), _, _) => &[("Esc", "close")],
        (Popup::Confirm(_), _, _) => &[("y", "confirm"), ("n", "cancel")],
        (Popup::PathInput(_), _, _) => &[("Enter", "upload"), ("Esc", "cancel")],
        (Popup::None, Screen::Auth, _) => &[
            ("Tab", "next field"),
            ("Enter", "submit"),
            ("^T", "login/register"),
            ("Esc", "quit"),
        ],
        (Popup::None, Screen::Chat, InputMode::Editing) => &[("Enter", "send"), ("Esc", "done")],
        (Popup::None, Screen::Chat, InputMode::Normal) => &[
            ("i", "type"),
            ("r", "record"),
            ("s", "scope"),
            ("m", "model"),
            ("p", "style"),
            ("a", "quick"),
            ("y", "copy"),
            ("C", "clear"),
            ("q", "quit"),
        ],
        (Popup::None, Screen::Documents, _) => &[
            ("Enter", "chat"),
            ("s", "summary"),
            ("g", "graph"),
            ("u/U", "upload pdf/image"),
            ("d", "download"),
            ("x", "delete"),
            ("R", "refresh"),
        ],
        (Popup::None, Screen::Dashboard, _) => &[("R", "refresh"), ("1-4", "screens"), ("q", "quit")],
        (Popup::None, Screen::Profile, InputMode::Editing) => &[("Tab", "next"), ("Enter", "save"), ("Esc", "done")],
        (Popup::None, Screen::Profile, InputMode::Normal) => &[
            ("i", "edit"),
            ("S", "save"),
            ("D", "delete account"),
            ("L", "logout"),
        ],
        _ => &[("Enter", "select"), ("Esc", "cancel")],
    };
    spans.extend(hint_spans(hints));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ----------------------------------------------------------------------
// Auth
// ----------------------------------------------------------------------

fn render_field(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    input: &TextInput,
    focused: bool,
    editing: bool,
) {
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", label));

    // Keep the cursor visible with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && input.cursor >= inner_width {
        input.cursor - inner_width + 1
    } else {
        0
    };
    let visible: String = input.display().chars().skip(scroll_offset).take(inner_width).collect();

    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)).block(block),
        area,
    );

    if focused && editing {
        let cursor_x = (input.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_auth_screen(app: &App, frame: &mut Frame, area: Rect) {
    let labels = app.auth_labels();
    let height = labels.len() as u16 * 3 + 5;
    let form_area = popup_rect(area, 54, height);

    let title = match app.auth_mode {
        AuthMode::Login => " Log in ",
        AuthMode::Register => " Create account ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let mut constraints: Vec<Constraint> = labels.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Length(1));
    constraints.push(Constraint::Min(0));
    let rows = Layout::vertical(constraints).split(inner);

    for (i, (label, input)) in labels.iter().zip(&app.auth_fields).enumerate() {
        render_field(frame, rows[i], label, input, app.auth_focus == i, !app.auth_busy);
    }

    let status = if app.auth_busy {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        Line::from(Span::styled(format!("Please wait{}", dots), Style::default().fg(Color::DarkGray)))
    } else if let Some(error) = &app.auth_error {
        Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red)))
    } else {
        let other = match app.auth_mode {
            AuthMode::Login => "No account? Ctrl+T to register",
            AuthMode::Register => "Have an account? Ctrl+T to log in",
        };
        Line::from(Span::styled(other, Style::default().fg(Color::DarkGray)))
    };
    frame.render_widget(Paragraph::new(status), rows[labels.len()]);
}

// ----------------------------------------------------------------------
// Chat
// ----------------------------------------------------------------------

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_column, sidebar_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(30)]).areas(area);
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(chat_column);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.scope_label()));

    let chat_text = if app.chat.messages().is_empty() && !app.chat.is_pending() {
        Text::from(Span::styled(
            "Pick a document with s, then ask a question about it...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.chat.messages() {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(msg.content.lines().map(|l| Line::from(l.to_string())));
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(msg.content.lines().map(parse_markdown_line));
                }
            }

            let mut meta = Vec::new();
            if let Some(model) = &msg.model_id {
                meta.push(format_model_name(model));
            }
            if let Some(sources) = msg.sources.as_ref().filter(|s| !s.is_empty()) {
                meta.push(format!("Sources: {}", sources.join(", ")));
            }
            if !meta.is_empty() {
                lines.push(Line::from(Span::styled(
                    meta.join(" · "),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
            lines.push(Line::default());
        }

        if app.chat.is_pending() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    render_chat_input(app, frame, input_area);
    render_chat_sidebar(app, frame, sidebar_area);
}

fn render_chat_input(app: &App, frame: &mut Frame, area: Rect) {
    let (title, border_color) = if app.capture.is_recording() {
        (format!(" ● REC {}s (r to stop) ", app.capture.elapsed_secs()), Color::Red)
    } else if app.capture.is_transcribing() {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        (format!(" Transcribing{} ", dots), Color::Magenta)
    } else if app.input_mode == InputMode::Editing {
        (" Ask (Enter to send) ".to_string(), Color::Yellow)
    } else {
        (" Ask (i to type, r to speak) ".to_string(), Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input.cursor;
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };
    let visible_text: String = app.input.text.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if app.input_mode == InputMode::Editing && matches!(app.popup, Popup::None) {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_chat_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Settings ");

    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White).bold();
    let lines = vec![
        Line::from(Span::styled("Model", label)),
        Line::from(Span::styled(app.model.display_name(), value)),
        Line::default(),
        Line::from(Span::styled("Style", label)),
        Line::from(Span::styled(app.style.display_name(), value)),
        Line::default(),
        Line::from(Span::styled("Document", label)),
        Line::from(Span::styled(app.scope_label(), value)),
        Line::default(),
        Line::from(Span::styled("Questions", label)),
        Line::from(Span::styled(app.chat.question_count().to_string(), value)),
    ];

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

// ----------------------------------------------------------------------
// Documents
// ----------------------------------------------------------------------

fn uploaded_label(doc: &paperchat_core::Document) -> String {
    doc.uploaded()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn render_documents_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = if app.documents_loading {
        " Documents (loading...) ".to_string()
    } else {
        format!(" Documents ({}) ", app.documents.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    if app.documents.is_empty() && !app.documents_loading {
        let empty = Paragraph::new("No documents yet. Press u to upload a PDF.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["File", "Uploaded", "Size"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = app
        .documents
        .iter()
        .map(|doc| Row::new(vec![doc.title().to_string(), uploaded_label(doc), doc.size_label()]))
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Min(20), Constraint::Length(18), Constraint::Length(10)],
    )
    .header(header)
    .block(block)
    .highlight_style(
        Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut app.documents_state);
}

// ----------------------------------------------------------------------
// Dashboard
// ----------------------------------------------------------------------

fn stat_box(frame: &mut Frame, area: Rect, title: &str, value: String) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", title));
    frame.render_widget(
        Paragraph::new(Span::styled(value, Style::default().fg(Color::Cyan).bold())).block(block),
        area,
    );
}

fn render_dashboard_screen(app: &App, frame: &mut Frame, area: Rect) {
    let [stats_area, bottom_area] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);
    let [docs_box, questions_box, models_box] = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .areas(stats_area);

    stat_box(frame, docs_box, "Documents", app.documents.len().to_string());
    stat_box(frame, questions_box, "Questions", app.chat.question_count().to_string());
    stat_box(frame, models_box, "Models used", app.model_stats.len().to_string());

    let [chart_area, recent_area] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(bottom_area);

    let chart_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Model usage ");
    if app.model_stats.is_empty() {
        frame.render_widget(
            Paragraph::new("No questions asked yet.")
                .style(Style::default().fg(Color::DarkGray))
                .block(chart_block),
            chart_area,
        );
    } else {
        let bars: Vec<Bar> = app
            .model_stats
            .iter()
            .map(|usage| {
                Bar::default()
                    .label(Line::from(format_model_name(&usage.name)))
                    .value(usage.count)
            })
            .collect();
        let chart = BarChart::default()
            .block(chart_block)
            .data(BarGroup::default().bars(&bars))
            .bar_width(9)
            .bar_gap(2)
            .bar_style(Style::default().fg(Color::Cyan))
            .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
        frame.render_widget(chart, chart_area);
    }

    let recent_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Recent documents ");
    let items: Vec<ListItem> = app
        .recent_documents()
        .iter()
        .map(|doc| {
            ListItem::new(Line::from(vec![
                Span::raw(format!(" {} ", doc.title())),
                Span::styled(uploaded_label(doc), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items).block(recent_block), recent_area);
}

// ----------------------------------------------------------------------
// Profile
// ----------------------------------------------------------------------

fn render_profile_screen(app: &App, frame: &mut Frame, area: Rect) {
    let form_area = popup_rect(area, 60, PROFILE_LABELS.len() as u16 * 3 + 3);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Profile ");
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let mut constraints: Vec<Constraint> = PROFILE_LABELS.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Min(0));
    let rows = Layout::vertical(constraints).split(inner);

    let editing = app.input_mode == InputMode::Editing;
    for (i, (label, input)) in PROFILE_LABELS.iter().zip(&app.profile_fields).enumerate() {
        render_field(frame, rows[i], label, input, app.profile_focus == i, editing);
    }
}

// ----------------------------------------------------------------------
// Popups
// ----------------------------------------------------------------------

fn render_popup(app: &mut App, frame: &mut Frame, area: Rect) {
    let picker: Option<(&str, Vec<(String, bool)>)> = match &app.popup {
        Popup::ModelPicker => Some((
            " Select Model ",
            LlmModel::all()
                .into_iter()
                .map(|m| (m.display_name(), m == app.model))
                .collect(),
        )),
        Popup::StylePicker => Some((
            " Answer Style ",
            PromptStyle::all()
                .into_iter()
                .map(|s| (s.display_name().to_string(), s == app.style))
                .collect(),
        )),
        Popup::ScopePicker => Some((
            " Chat With ",
            app.scope_options()
                .into_iter()
                .map(|(scope, label)| (label, scope == app.scope))
                .collect(),
        )),
        Popup::QuickActions => Some((
            " Quick Actions ",
            QUICK_ACTIONS.iter().map(|a| (a.to_string(), false)).collect(),
        )),
        _ => None,
    };
    if let Some((title, items)) = picker {
        render_picker(app, frame, area, title, items);
        return;
    }

    match &app.popup {
        Popup::None
        | Popup::ModelPicker
        | Popup::StylePicker
        | Popup::ScopePicker
        | Popup::QuickActions => {}
        Popup::Summary(panel) => {
            let mut lines: Vec<Line> = match &panel.body {
                PanelBody::Loading(text) => vec![Line::from(Span::styled(
                    *text,
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                ))],
                PanelBody::Failed(text) => {
                    vec![Line::from(Span::styled(*text, Style::default().fg(Color::Red)))]
                }
                PanelBody::Ready(text) => text.lines().map(parse_markdown_line).collect(),
            };
            if let Some(url) = &panel.share_url {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    format!("Shared: {}", url),
                    Style::default().fg(Color::Green),
                )));
            }
            let title = format!(" Summary: {} ", panel.document.title());
            render_text_popup(frame, area, &title, Text::from(lines));
        }
        Popup::Graph(panel) => {
            let lines: Vec<Line> = panel.lines().into_iter().map(Line::from).collect();
            let title = format!(" Knowledge Graph: {} ", panel.document.title());
            render_text_popup(frame, area, &title, Text::from(lines));
        }
        Popup::Confirm(action) => {
            let popup_area = popup_rect(area, 50, 5);
            frame.render_widget(Clear, popup_area);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Confirm ");
            let text = Text::from(vec![
                Line::from(action.prompt()),
                Line::default(),
                Line::from(hint_spans(&[("y", "yes"), ("n", "no")])),
            ]);
            frame.render_widget(
                Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
                popup_area,
            );
        }
        Popup::PathInput(action) => {
            let title = match action {
                PathAction::UploadPdf => "PDF to upload",
                PathAction::UploadImage => "Image to upload",
            };
            let popup_area = popup_rect(area, 60, 3);
            frame.render_widget(Clear, popup_area);
            render_field(frame, popup_area, title, &app.path_input, true, true);
        }
    }
}

fn render_picker(
    app: &mut App,
    frame: &mut Frame,
    area: Rect,
    title: &str,
    items: Vec<(String, bool)>,
) {
    let popup_area = popup_rect(area, 44, items.len() as u16 + 2);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title.to_string());

    let items: Vec<ListItem> = items
        .into_iter()
        .map(|(label, current)| {
            let style = if current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", label)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.picker_state);
}

fn render_text_popup(frame: &mut Frame, area: Rect, title: &str, text: Text) {
    let popup_area = popup_rect(area, area.width * 3 / 4, area.height * 3 / 4);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title.to_string());
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        popup_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("a **bold** claim");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "bold");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_unclosed() {
        let line = parse_markdown_line("**open");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "**open");
    }

    #[test]
    fn test_popup_rect_is_centered_and_clamped() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(popup_rect(area, 40, 10), Rect::new(30, 15, 40, 10));
        let small = popup_rect(Rect::new(0, 0, 20, 8), 60, 30);
        assert_eq!((small.width, small.height), (16, 4));
    }
}
