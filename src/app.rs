use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::widgets::{ListState, TableState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use paperchat_core::api::cancellable;
use paperchat_core::audio::ActiveRecording;
use paperchat_core::models::{recent_documents, UploadResponse};
use paperchat_core::{
    ApiClient, ApiError, ApiResult, AudioCapture, AuthManager, ChatSynchronizer, CommandMicrophone, Config,
    Document, DocumentScope, ExchangeOutcome, GraphPanel, KnowledgeGraph, LlmModel, ModelUsage, Notice,
    ProfileUpdate, PromptStyle, Registration, Session, SessionHandle, Submission, SummaryPanel,
};

use crate::input::TextInput;
use crate::tui::AppEvent;

const NOTICE_TTL: Duration = Duration::from_secs(4);

pub const QUICK_ACTIONS: [&str; 4] = [
    "Summarize the main findings",
    "What are the key contributions?",
    "What methodology was used?",
    "Compare the results across papers",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Chat,
    Documents,
    Dashboard,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone)]
pub enum ConfirmAction {
    DeleteDocument(Document),
    ClearHistory,
    DeleteAccount,
}

impl ConfirmAction {
    pub fn prompt(&self) -> String {
        match self {
            ConfirmAction::DeleteDocument(doc) => format!("Delete \"{}\"?", doc.filename),
            ConfirmAction::ClearHistory => "Clear the whole chat history?".to_string(),
            ConfirmAction::DeleteAccount => {
                "Delete your account? This cannot be undone.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathAction {
    UploadPdf,
    UploadImage,
}

pub enum Popup {
    None,
    ModelPicker,
    StylePicker,
    ScopePicker,
    QuickActions,
    Summary(SummaryPanel),
    Graph(GraphPanel),
    Confirm(ConfirmAction),
    PathInput(PathAction),
}

/// Results of background requests, delivered back through the event loop.
#[derive(Debug)]
pub enum TaskResult {
    SessionRestored(Session),
    SignedIn(ApiResult<Session>),
    Registered(ApiResult<String>),
    History(ApiResult<Vec<paperchat_core::ChatMessage>>),
    Documents(ApiResult<Vec<Document>>),
    ModelStats(ApiResult<Vec<ModelUsage>>),
    Answer(ExchangeOutcome),
    RecordingDrained(Vec<Vec<u8>>),
    Transcription(ApiResult<String>),
    Summary {
        document_id: String,
        regenerated: bool,
        result: ApiResult<String>,
    },
    SummaryShared(ApiResult<String>),
    Graph {
        document_id: String,
        result: ApiResult<KnowledgeGraph>,
    },
    Uploaded(ApiResult<UploadResponse>),
    Downloaded(ApiResult<PathBuf>),
    Deleted(ApiResult<String>),
    HistoryCleared(ApiResult<()>),
    ProfileUpdated(ApiResult<String>),
    AccountDeleted(ApiResult<()>),
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub popup: Popup,
    pub picker_state: ListState,

    // Backend
    pub config: Config,
    pub api: ApiClient,
    pub auth: Arc<AuthManager>,
    pub session: SessionHandle,
    events: mpsc::UnboundedSender<AppEvent>,
    view_cancel: CancellationToken,

    // Auth screen
    pub auth_mode: AuthMode,
    pub auth_fields: Vec<TextInput>,
    pub auth_focus: usize,
    pub auth_busy: bool,
    pub auth_error: Option<String>,

    // Chat screen
    pub chat: ChatSynchronizer,
    pub input: TextInput,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub model: LlmModel,
    pub style: PromptStyle,
    pub scope: DocumentScope,
    pub capture: AudioCapture,
    pub microphone: CommandMicrophone,
    recording: Option<ActiveRecording>,

    // Documents & dashboard
    pub documents: Vec<Document>,
    pub documents_state: TableState,
    pub documents_loading: bool,
    pub model_stats: Vec<ModelUsage>,
    pub path_input: TextInput,

    // Profile screen
    pub profile_fields: Vec<TextInput>,
    pub profile_focus: usize,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    notices: Vec<(Notice, Instant)>,
}

pub const LOGIN_LABELS: [&str; 2] = ["Email", "Password"];
pub const REGISTER_LABELS: [&str; 6] = [
    "Username",
    "First name",
    "Last name",
    "Email",
    "Password",
    "Confirm password",
];
pub const PROFILE_LABELS: [&str; 6] = [
    "Username",
    "Email",
    "First name",
    "Last name",
    "Current password",
    "New password",
];

fn login_fields() -> Vec<TextInput> {
    vec![TextInput::new(), TextInput::masked()]
}

fn register_fields() -> Vec<TextInput> {
    vec![
        TextInput::new(),
        TextInput::new(),
        TextInput::new(),
        TextInput::new(),
        TextInput::masked(),
        TextInput::masked(),
    ]
}

fn profile_fields() -> Vec<TextInput> {
    vec![
        TextInput::new(),
        TextInput::new(),
        TextInput::new(),
        TextInput::new(),
        TextInput::masked(),
        TextInput::masked(),
    ]
}

fn non_empty(input: &TextInput) -> Option<String> {
    let text = input.text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl App {
    /// Must be called inside the tokio runtime.
    pub fn new(
        config: Config,
        api: ApiClient,
        auth: Arc<AuthManager>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let model = config
            .default_model
            .as_deref()
            .map(LlmModel::from_id)
            .unwrap_or_default();
        let style = config
            .prompt_style
            .as_deref()
            .and_then(PromptStyle::from_str)
            .unwrap_or_default();
        let microphone = config
            .recorder_command
            .as_deref()
            .map(CommandMicrophone::new)
            .unwrap_or_default();

        let session = auth.handle();
        let logged_in = session.get_session().is_authenticated();

        let mut app = Self {
            should_quit: false,
            screen: if logged_in { Screen::Chat } else { Screen::Auth },
            input_mode: InputMode::Normal,
            popup: Popup::None,
            picker_state: ListState::default(),
            chat: ChatSynchronizer::new(api.chat()),
            config,
            api,
            auth,
            session,
            events,
            view_cancel: CancellationToken::new(),
            auth_mode: AuthMode::Login,
            auth_fields: login_fields(),
            auth_focus: 0,
            auth_busy: false,
            auth_error: None,
            input: TextInput::new(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            model,
            style,
            scope: DocumentScope::All,
            capture: AudioCapture::new(),
            microphone,
            recording: None,
            documents: Vec::new(),
            documents_state: TableState::default(),
            documents_loading: false,
            model_stats: Vec::new(),
            path_input: TextInput::new(),
            profile_fields: profile_fields(),
            profile_focus: 0,
            animation_frame: 0,
            notices: Vec::new(),
        };

        if logged_in {
            let auth = app.auth.clone();
            app.spawn(async move { TaskResult::SessionRestored(auth.restore().await) });
            app.load_session_data();
        }
        app
    }

    // ------------------------------------------------------------------
    // Background tasks
    // ------------------------------------------------------------------

    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = fut.await;
            let _ = tx.send(AppEvent::Task(Box::new(result)));
        });
    }

    /// Token for requests owned by the current screen.
    fn view_token(&self) -> CancellationToken {
        self.view_cancel.clone()
    }

    fn leave_view(&mut self) {
        self.view_cancel.cancel();
        self.view_cancel = CancellationToken::new();
        if self.screen == Screen::Chat {
            self.chat.cancel_pending();
            if self.capture.is_recording() || self.capture.is_transcribing() {
                self.recording = None;
                self.capture.abort();
            }
        }
        self.popup = Popup::None;
        self.input_mode = InputMode::Normal;
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        if self.screen == screen || !self.is_logged_in() {
            return;
        }
        self.leave_view();
        self.screen = screen;
        match screen {
            Screen::Documents => self.refresh_documents(),
            Screen::Dashboard => self.refresh_dashboard(),
            Screen::Profile => self.load_profile_fields(),
            // An earlier fetch may have been cancelled by leaving the view
            Screen::Chat if !self.chat.is_hydrated() => self.load_history(),
            Screen::Chat | Screen::Auth => {}
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.get_session().is_authenticated()
    }

    pub fn user_label(&self) -> Option<String> {
        self.session.get_session().user.map(|u| u.display_name())
    }

    // ------------------------------------------------------------------
    // Notices
    // ------------------------------------------------------------------

    pub fn notify(&mut self, notice: Notice) {
        tracing::debug!("Notice: {:?}", notice);
        self.notices.push((notice, Instant::now()));
    }

    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.last().map(|(notice, _)| notice)
    }

    pub fn tick(&mut self) {
        if self.chat.is_pending() || self.capture.is_transcribing() || self.auth_busy {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.notices.retain(|(_, at)| at.elapsed() < NOTICE_TTL);

        if let Some(recording) = self.recording.as_mut() {
            while let Some(chunk) = recording.try_next_chunk() {
                self.capture.push_chunk(chunk);
            }
        }
    }

    fn notify_error(&mut self, err: &ApiError) {
        if !err.is_cancelled() {
            self.notify(Notice::error(err.to_string()));
        }
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    pub fn toggle_auth_mode(&mut self) {
        self.auth_mode = match self.auth_mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.auth_fields = match self.auth_mode {
            AuthMode::Login => login_fields(),
            AuthMode::Register => register_fields(),
        };
        self.auth_focus = 0;
        self.auth_error = None;
    }

    pub fn auth_labels(&self) -> &'static [&'static str] {
        match self.auth_mode {
            AuthMode::Login => &LOGIN_LABELS,
            AuthMode::Register => &REGISTER_LABELS,
        }
    }

    pub fn submit_auth(&mut self) {
        if self.auth_busy {
            return;
        }
        self.auth_error = None;
        let auth = self.auth.clone();
        match self.auth_mode {
            AuthMode::Login => {
                let email = self.auth_fields[0].text.clone();
                let password = self.auth_fields[1].text.clone();
                self.auth_busy = true;
                self.spawn(async move {
                    TaskResult::SignedIn(auth.sign_in(&email, &password).await)
                });
            }
            AuthMode::Register => {
                let fields: Vec<String> = self.auth_fields.iter().map(|f| f.text.clone()).collect();
                let form = Registration {
                    username: fields[0].trim().to_string(),
                    first_name: fields[1].trim().to_string(),
                    last_name: fields[2].trim().to_string(),
                    email: fields[3].trim().to_string(),
                    password: fields[4].clone(),
                    confirm_password: fields[5].clone(),
                };
                self.auth_busy = true;
                self.spawn(async move { TaskResult::Registered(auth.register(&form).await) });
            }
        }
    }

    /// Entry point after any successful login.
    fn load_session_data(&mut self) {
        self.load_history();
        self.refresh_documents();
    }

    /// History fetch owned by the chat view. The log is not saved until it
    /// has been merged in.
    fn load_history(&mut self) {
        let client = self.chat.client();
        let token = self.chat.cancel_token();
        self.spawn(async move { TaskResult::History(cancellable(&token, client.history()).await) });
    }

    pub fn logout(&mut self) {
        self.leave_view();
        self.chat.reset();
        self.auth.logout();
        self.documents.clear();
        self.documents_state.select(None);
        self.model_stats.clear();
        self.scope = DocumentScope::All;
        self.input.clear();
        self.auth_mode = AuthMode::Login;
        self.auth_fields = login_fields();
        self.auth_focus = 0;
        self.screen = Screen::Auth;
        self.notify(Notice::info("Logged out"));
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    pub fn can_submit(&self) -> bool {
        !self.input.is_blank() && !self.chat.is_pending() && !self.capture.is_transcribing()
    }

    pub fn submit_question(&mut self) {
        if !self.can_submit() {
            return;
        }
        let question = self.input.text.clone();
        let submission = self.chat.begin_submit(
            &question,
            &self.scope,
            self.model.as_str(),
            self.style.as_str(),
        );
        match submission {
            Submission::Ignored => return,
            Submission::Rejected => {}
            Submission::Pending(exchange) => {
                self.spawn(async move { TaskResult::Answer(exchange.send().await) });
            }
        }
        self.input.clear();
        self.input_mode = InputMode::Normal;
        self.scroll_chat_to_bottom();
    }

    pub fn toggle_recording(&mut self) {
        if self.capture.is_recording() {
            self.stop_recording();
            return;
        }
        match self.capture.start(&self.microphone) {
            Ok(recording) => {
                self.recording = Some(recording);
                self.notify(Notice::info("Recording... press r again to stop."));
            }
            Err(e) => self.notify(e.to_notice()),
        }
    }

    fn stop_recording(&mut self) {
        // None while an earlier stop is still draining
        if let Some(recording) = self.recording.take() {
            self.spawn(async move { TaskResult::RecordingDrained(recording.finish().await) });
        }
    }

    fn transcribe_recording(&mut self, rest: Vec<Vec<u8>>) {
        // Aborted while the recorder was draining
        if !self.capture.is_recording() {
            return;
        }
        for chunk in rest {
            self.capture.push_chunk(chunk);
        }
        match self.capture.stop() {
            Ok(payload) => {
                self.notify(Notice::info("Transcribing audio..."));
                let voice = self.api.voice();
                let token = self.view_token();
                self.spawn(async move {
                    TaskResult::Transcription(cancellable(&token, voice.transcribe(&payload)).await)
                });
            }
            Err(e) => self.notify(e.to_notice()),
        }
    }

    pub fn apply_quick_action(&mut self, index: usize) {
        if let Some(action) = QUICK_ACTIONS.get(index) {
            self.input.set(*action);
            self.input_mode = InputMode::Editing;
        }
    }

    /// Scope picker entries: "All documents" followed by each document.
    pub fn scope_options(&self) -> Vec<(DocumentScope, String)> {
        let mut options = vec![(DocumentScope::All, "All documents".to_string())];
        options.extend(
            self.documents
                .iter()
                .map(|d| (DocumentScope::Document(d.id.clone()), d.title().to_string())),
        );
        options
    }

    pub fn scope_label(&self) -> String {
        match &self.scope {
            DocumentScope::All => "All documents".to_string(),
            DocumentScope::Document(id) => self
                .documents
                .iter()
                .find(|d| &d.id == id)
                .map(|d| d.title().to_string())
                .unwrap_or_else(|| format!("Document {}", id)),
        }
    }

    pub fn set_model(&mut self, model: LlmModel) {
        if let Err(e) = Config::save_default_model(model.as_str()) {
            tracing::warn!("Failed to save default model: {}", e);
        }
        self.model = model;
    }

    pub fn set_style(&mut self, style: PromptStyle) {
        if let Err(e) = Config::save_prompt_style(style.as_str()) {
            tracing::warn!("Failed to save prompt style: {}", e);
        }
        self.style = style;
    }

    pub fn request_clear_history(&mut self) {
        self.popup = Popup::Confirm(ConfirmAction::ClearHistory);
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };

        // History is unbounded; count in usize and clamp to the widget's u16
        let mut total_lines: usize = 0;
        for msg in self.chat.messages() {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                total_lines += (char_count / wrap_width) + 1;
            }
            if msg.model_id.is_some() || msg.sources.is_some() {
                total_lines += 1;
            }
            total_lines += 1; // Blank line after message
        }
        if self.chat.is_pending() {
            total_lines += 2;
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn last_answer(&self) -> Option<&str> {
        self.chat
            .messages()
            .iter()
            .rev()
            .find(|m| !m.is_user())
            .map(|m| m.content.as_str())
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    pub fn refresh_documents(&mut self) {
        self.documents_loading = true;
        let docs = self.api.documents();
        let token = self.view_token();
        self.spawn(async move { TaskResult::Documents(cancellable(&token, docs.list()).await) });
    }

    pub fn refresh_dashboard(&mut self) {
        self.refresh_documents();
        self.refresh_model_stats();
    }

    fn refresh_model_stats(&mut self) {
        let chat = self.api.chat();
        let token = self.view_token();
        self.spawn(async move { TaskResult::ModelStats(cancellable(&token, chat.model_stats()).await) });
    }

    pub fn selected_document(&self) -> Option<&Document> {
        self.documents_state
            .selected()
            .and_then(|i| self.documents.get(i))
    }

    pub fn documents_next(&mut self) {
        if self.documents.is_empty() {
            return;
        }
        let i = self
            .documents_state
            .selected()
            .map(|i| (i + 1).min(self.documents.len() - 1))
            .unwrap_or(0);
        self.documents_state.select(Some(i));
    }

    pub fn documents_prev(&mut self) {
        if self.documents.is_empty() {
            return;
        }
        let i = self.documents_state.selected().map(|i| i.saturating_sub(1)).unwrap_or(0);
        self.documents_state.select(Some(i));
    }

    pub fn recent_documents(&self) -> Vec<Document> {
        recent_documents(&self.documents, 5)
    }

    pub fn use_selected_as_scope(&mut self) {
        if let Some(doc) = self.selected_document().cloned() {
            self.scope = DocumentScope::Document(doc.id);
            self.notify(Notice::success(format!("Chatting with {}", doc.filename)));
            self.switch_screen(Screen::Chat);
        }
    }

    pub fn open_summary(&mut self) {
        let Some(doc) = self.selected_document().cloned() else { return };
        let document_id = doc.id.clone();
        self.popup = Popup::Summary(SummaryPanel::open(doc));
        self.request_summary(document_id, false);
    }

    pub fn regenerate_summary(&mut self) {
        let document_id = match &mut self.popup {
            Popup::Summary(panel) if !panel.body.is_loading() => {
                panel.begin_regenerate();
                panel.document.id.clone()
            }
            _ => return,
        };
        self.request_summary(document_id, true);
    }

    fn request_summary(&mut self, document_id: String, regenerated: bool) {
        let insights = self.api.insights();
        let token = self.view_token();
        self.spawn(async move {
            let result = cancellable(&token, insights.summarize(&document_id, regenerated)).await;
            TaskResult::Summary { document_id, regenerated, result }
        });
    }

    pub fn share_summary(&mut self) {
        let Popup::Summary(panel) = &self.popup else { return };
        let Some(summary) = panel.summary().map(str::to_string) else { return };
        let chat = self.api.chat();
        let token = self.view_token();
        self.spawn(async move {
            TaskResult::SummaryShared(cancellable(&token, chat.share_answer(&summary)).await)
        });
    }

    pub fn export_summary(&mut self) {
        let Popup::Summary(panel) = &self.popup else { return };
        let notice = match panel.export(&self.config.download_dir()) {
            Ok(path) => Notice::success(format!("Saved {}", path.display())),
            Err(e) => Notice::error(format!("Export failed: {}", e)),
        };
        self.notify(notice);
    }

    pub fn open_graph(&mut self) {
        let Some(doc) = self.selected_document().cloned() else { return };
        let document_id = doc.id.clone();
        self.popup = Popup::Graph(GraphPanel::open(doc));
        let insights = self.api.insights();
        let token = self.view_token();
        self.spawn(async move {
            let result = cancellable(&token, insights.entities(&document_id)).await;
            TaskResult::Graph { document_id, result }
        });
    }

    pub fn upload(&mut self, action: PathAction) {
        let raw = self.path_input.take();
        let path = expand_home(raw.trim());
        self.popup = Popup::None;
        self.input_mode = InputMode::Normal;
        if raw.trim().is_empty() {
            return;
        }
        self.notify(Notice::info(format!("Uploading {}...", path.display())));
        let docs = self.api.documents();
        let token = self.view_token();
        self.spawn(async move {
            let upload = async {
                match action {
                    PathAction::UploadPdf => docs.upload_pdf(&path).await,
                    PathAction::UploadImage => docs.upload_image(&path).await,
                }
            };
            TaskResult::Uploaded(cancellable(&token, upload).await)
        });
    }

    pub fn download_selected(&mut self) {
        let Some(doc) = self.selected_document().cloned() else { return };
        let docs = self.api.documents();
        let dir = self.config.download_dir();
        let token = self.view_token();
        self.spawn(async move {
            TaskResult::Downloaded(cancellable(&token, docs.download_to(&doc, &dir)).await)
        });
    }

    pub fn request_delete_selected(&mut self) {
        if let Some(doc) = self.selected_document().cloned() {
            self.popup = Popup::Confirm(ConfirmAction::DeleteDocument(doc));
        }
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    fn load_profile_fields(&mut self) {
        self.profile_fields = profile_fields();
        self.profile_focus = 0;
        if let Some(user) = self.session.get_session().user {
            self.profile_fields[0].set(user.username);
            self.profile_fields[1].set(user.email);
            self.profile_fields[2].set(user.first_name.unwrap_or_default());
            self.profile_fields[3].set(user.last_name.unwrap_or_default());
        }
    }

    pub fn save_profile(&mut self) {
        let f = &self.profile_fields;
        let update = ProfileUpdate {
            username: non_empty(&f[0]),
            email: non_empty(&f[1]),
            first_name: non_empty(&f[2]),
            last_name: non_empty(&f[3]),
            current_password: non_empty(&f[4]),
            new_password: non_empty(&f[5]),
        };
        if update.new_password.is_some() && update.current_password.is_none() {
            self.notify(Notice::warning("Enter your current password to change it"));
            return;
        }
        self.input_mode = InputMode::Normal;
        let auth = self.auth.clone();
        let token = self.view_token();
        self.spawn(async move {
            TaskResult::ProfileUpdated(cancellable(&token, auth.update_profile(&update)).await)
        });
    }

    // ------------------------------------------------------------------
    // Confirmations
    // ------------------------------------------------------------------

    pub fn confirm(&mut self) {
        if !matches!(self.popup, Popup::Confirm(_)) {
            return;
        }
        let Popup::Confirm(action) = std::mem::replace(&mut self.popup, Popup::None) else {
            return;
        };
        match action {
            ConfirmAction::DeleteDocument(doc) => {
                let docs = self.api.documents();
                let token = self.view_token();
                self.spawn(async move { TaskResult::Deleted(cancellable(&token, docs.delete(&doc.id)).await) });
            }
            ConfirmAction::ClearHistory => {
                self.chat.cancel_pending();
                let flushed = self.chat.flush();
                let chat = self.api.chat();
                self.spawn(async move {
                    // A save landing after the delete would bring the history back
                    flushed.await;
                    TaskResult::HistoryCleared(chat.delete_history().await)
                });
            }
            ConfirmAction::DeleteAccount => {
                let auth = self.auth.clone();
                self.spawn(async move { TaskResult::AccountDeleted(auth.delete_account().await) });
            }
        }
    }

    // ------------------------------------------------------------------
    // Task results
    // ------------------------------------------------------------------

    pub fn apply_task(&mut self, result: TaskResult) {
        match result {
            TaskResult::SessionRestored(session) => {
                if !session.is_authenticated() && self.screen != Screen::Auth {
                    self.logout();
                    self.notify(Notice::warning("Session expired. Please log in again."));
                } else if let Some(user) = session.user {
                    tracing::info!("Restored session for {}", user.username);
                }
            }
            TaskResult::SignedIn(result) => {
                self.auth_busy = false;
                match result {
                    Ok(session) => {
                        let name = session
                            .user
                            .map(|u| u.display_name())
                            .unwrap_or_else(|| "back".to_string());
                        self.auth_fields = login_fields();
                        self.auth_focus = 0;
                        self.screen = Screen::Chat;
                        self.notify(Notice::success(format!("Welcome, {}", name)));
                        self.load_session_data();
                    }
                    Err(e) => self.auth_error = Some(e.to_string()),
                }
            }
            TaskResult::Registered(result) => {
                self.auth_busy = false;
                match result {
                    Ok(message) => {
                        let email = self.auth_fields.get(3).map(|f| f.text.clone()).unwrap_or_default();
                        self.toggle_auth_mode();
                        self.auth_fields[0].set(email);
                        self.auth_focus = 1;
                        self.notify(Notice::success(format!("{}. Please log in.", message)));
                    }
                    Err(e) => self.auth_error = Some(e.to_string()),
                }
            }
            TaskResult::History(result) => match result {
                Ok(history) => {
                    self.chat.apply_history(history);
                    self.scroll_chat_to_bottom();
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    tracing::warn!("Could not load chat history: {}", e);
                    self.notify(Notice::warning("Could not load chat history; new messages are not saved yet"));
                }
            },
            TaskResult::Documents(result) => {
                self.documents_loading = false;
                match result {
                    Ok(documents) => {
                        self.documents = documents;
                        let selected = self
                            .documents_state
                            .selected()
                            .filter(|i| *i < self.documents.len())
                            .or(if self.documents.is_empty() { None } else { Some(0) });
                        self.documents_state.select(selected);
                        if let DocumentScope::Document(id) = &self.scope {
                            if !self.documents.iter().any(|d| &d.id == id) {
                                self.scope = DocumentScope::All;
                            }
                        }
                    }
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => {
                        tracing::warn!("Failed to load documents: {}", e);
                        self.notify(Notice::error("Failed to load documents"));
                    }
                }
            }
            TaskResult::ModelStats(result) => match result {
                Ok(stats) => self.model_stats = stats,
                Err(e) => self.notify_error(&e),
            },
            TaskResult::Answer(outcome) => {
                if self.chat.complete(outcome) {
                    self.scroll_chat_to_bottom();
                }
            }
            TaskResult::RecordingDrained(rest) => self.transcribe_recording(rest),
            TaskResult::Transcription(result) => {
                if let Some(notice) = self.capture.finish_transcription(result, &mut self.input.text) {
                    self.input.sync_cursor();
                    self.notify(notice);
                }
            }
            TaskResult::Summary { document_id, regenerated, result } => {
                if result.as_ref().is_err_and(|e| e.is_cancelled()) {
                    return;
                }
                if let Popup::Summary(panel) = &mut self.popup {
                    if panel.document.id == document_id {
                        panel.apply(result, regenerated);
                    }
                }
            }
            TaskResult::SummaryShared(result) => match result {
                Ok(url) => {
                    copy_to_clipboard(&url);
                    if let Popup::Summary(panel) = &mut self.popup {
                        panel.share_url = Some(url.clone());
                    }
                    self.notify(Notice::success(format!("Link copied: {}", url)));
                }
                Err(e) if e.is_cancelled() => {}
                Err(_) => self.notify(Notice::error(paperchat_core::panels::SHARE_FAILED)),
            },
            TaskResult::Graph { document_id, result } => {
                if result.as_ref().is_err_and(|e| e.is_cancelled()) {
                    return;
                }
                if let Popup::Graph(panel) = &mut self.popup {
                    if panel.document.id == document_id {
                        panel.apply(result);
                    }
                }
            }
            TaskResult::Uploaded(result) => match result {
                Ok(response) => {
                    let text = response.msg.unwrap_or_else(|| "Upload complete".to_string());
                    self.notify(Notice::success(text));
                    self.refresh_documents();
                }
                Err(e) => self.notify_error(&e),
            },
            TaskResult::Downloaded(result) => match result {
                Ok(path) => self.notify(Notice::success(format!("Saved {}", path.display()))),
                Err(e) => self.notify_error(&e),
            },
            TaskResult::Deleted(result) => match result {
                Ok(message) => {
                    self.notify(Notice::success(message));
                    self.refresh_documents();
                }
                Err(e) => self.notify_error(&e),
            },
            TaskResult::HistoryCleared(result) => match result {
                Ok(()) => {
                    self.chat.history_deleted();
                    self.chat_scroll = 0;
                    self.notify(Notice::success("Chat history cleared"));
                }
                Err(e) => self.notify_error(&e),
            },
            TaskResult::ProfileUpdated(result) => match result {
                Ok(message) => {
                    self.load_profile_fields();
                    self.notify(Notice::success(message));
                }
                Err(e) => self.notify_error(&e),
            },
            TaskResult::AccountDeleted(result) => match result {
                Ok(()) => {
                    self.logout();
                    self.notify(Notice::info("Account deleted"));
                }
                Err(e) => self.notify_error(&e),
            },
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

pub fn copy_to_clipboard(text: &str) {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let candidates: [(&str, &[&str]); 3] = [
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];
    for (program, args) in candidates {
        if let Ok(mut child) = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(text.as_bytes());
            }
            return;
        }
    }
    tracing::debug!("No clipboard program found");
}
