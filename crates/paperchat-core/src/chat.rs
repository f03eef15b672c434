//! Client-side chat log kept in step with the backend history.

use std::future::Future;

use chrono::SecondsFormat;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::api::{cancellable, ChatClient};
use crate::error::{ApiError, ApiResult};
use crate::models::parse_timestamp;
use crate::state::{now_timestamp, ChatMessage, DocumentScope};

pub const NO_DOCUMENT_SELECTED: &str = "No document selected or not logged in";
pub const ANSWER_FAILED: &str = "Failed to get answer";

enum PersistCmd {
    Save(Vec<ChatMessage>),
    Flush(oneshot::Sender<()>),
}

/// Result of [`ChatSynchronizer::begin_submit`].
pub enum Submission {
    /// Blank question, or a reply is still pending.
    Ignored,
    /// Rejected locally; the error placeholder is already in the log.
    Rejected,
    /// The question is in the log and the request is ready to send.
    Pending(PendingExchange),
}

/// A question waiting to be sent. Runs without access to the log so it can
/// be moved onto a task.
pub struct PendingExchange {
    client: ChatClient,
    epoch: u64,
    question: String,
    document_id: String,
    model: String,
    prompt_style: String,
    cancel: CancellationToken,
}

impl PendingExchange {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub async fn send(self) -> ExchangeOutcome {
        let result = cancellable(
            &self.cancel,
            self.client
                .ask(&self.question, &self.document_id, &self.model, &self.prompt_style),
        )
        .await;
        ExchangeOutcome {
            epoch: self.epoch,
            model: self.model,
            result,
        }
    }
}

#[derive(Debug)]
pub struct ExchangeOutcome {
    pub epoch: u64,
    pub model: String,
    pub result: ApiResult<String>,
}

/// Ordered message log with optimistic appends.
///
/// Every change queues the full log for `POST /qa/history`; saves run one at
/// a time in submission order, so the last change wins. Nothing is saved
/// until the backend history has been merged in (or hydration was skipped),
/// since a full-list save would otherwise replace it. Must be created inside
/// a tokio runtime.
pub struct ChatSynchronizer {
    client: ChatClient,
    messages: Vec<ChatMessage>,
    hydrated: bool,
    epoch: u64,
    pending: Option<u64>,
    cancel: CancellationToken,
    persist_tx: mpsc::UnboundedSender<PersistCmd>,
}

impl ChatSynchronizer {
    pub fn new(client: ChatClient) -> Self {
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_persister(client.clone(), persist_rx));
        Self {
            client,
            messages: Vec::new(),
            hydrated: false,
            epoch: 0,
            pending: None,
            cancel: CancellationToken::new(),
            persist_tx,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn client(&self) -> ChatClient {
        self.client.clone()
    }

    /// Token for requests owned by the chat view.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn question_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_user()).count()
    }

    /// Whether the backend history has been merged into the log.
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Treats the backend history as empty and enables saving. Local changes
    /// made so far are saved right away.
    pub fn skip_hydration(&mut self) {
        self.hydrated = true;
        if !self.messages.is_empty() {
            self.persist();
        }
    }

    pub async fn hydrate(&mut self) -> ApiResult<usize> {
        let history = cancellable(&self.cancel, self.client.history()).await?;
        self.apply_history(history);
        Ok(self.messages.len())
    }

    /// Installs fetched history. Messages appended locally while the fetch
    /// was in flight are kept after it.
    pub fn apply_history(&mut self, history: Vec<ChatMessage>) {
        let local = std::mem::take(&mut self.messages);
        self.messages = history
            .into_iter()
            .map(|mut m| {
                m.timestamp = normalize_timestamp(&m.timestamp);
                m
            })
            .collect();

        let had_local = !local.is_empty();
        for message in local {
            if !self.messages.iter().any(|m| m.id == message.id) {
                self.messages.push(message);
            }
        }
        self.hydrated = true;
        tracing::debug!("Chat hydrated with {} messages", self.messages.len());
        if had_local {
            self.persist();
        }
    }

    /// Appends the question and prepares the request for it.
    pub fn begin_submit(
        &mut self,
        question: &str,
        scope: &DocumentScope,
        model: &str,
        prompt_style: &str,
    ) -> Submission {
        if question.trim().is_empty() || self.pending.is_some() {
            return Submission::Ignored;
        }

        self.epoch += 1;
        let mut message = ChatMessage::user(question, scope.document_id().map(str::to_string));
        message.model_id = Some(model.to_string());
        self.messages.push(message);
        self.persist();

        let Some(document_id) = scope.document_id() else {
            self.messages.push(ChatMessage::assistant(NO_DOCUMENT_SELECTED, None));
            self.persist();
            return Submission::Rejected;
        };

        self.pending = Some(self.epoch);
        Submission::Pending(PendingExchange {
            client: self.client.clone(),
            epoch: self.epoch,
            question: question.to_string(),
            document_id: document_id.to_string(),
            model: model.to_string(),
            prompt_style: prompt_style.to_string(),
            cancel: self.cancel.clone(),
        })
    }

    /// Appends the reply for `outcome`. Returns false when the reply was
    /// superseded or cancelled and has been dropped.
    pub fn complete(&mut self, outcome: ExchangeOutcome) -> bool {
        if self.pending != Some(outcome.epoch) {
            tracing::debug!("Discarding stale reply for epoch {}", outcome.epoch);
            return false;
        }
        self.pending = None;

        let reply = match outcome.result {
            Ok(answer) => ChatMessage::assistant(answer, Some(outcome.model)),
            Err(ApiError::Cancelled) => return false,
            Err(e) => {
                tracing::warn!("Question failed: {}", e);
                ChatMessage::assistant(failure_text(&e), None)
            }
        };
        self.messages.push(reply);
        self.persist();
        true
    }

    /// Submits and waits for the reply in one step.
    pub async fn submit(
        &mut self,
        question: &str,
        scope: &DocumentScope,
        model: &str,
        prompt_style: &str,
    ) {
        if let Submission::Pending(exchange) = self.begin_submit(question, scope, model, prompt_style) {
            let outcome = exchange.send().await;
            self.complete(outcome);
        }
    }

    /// Drops any pending reply and aborts requests owned by the chat view.
    pub fn cancel_pending(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
        self.pending = None;
    }

    /// Deletes the backend history. Queued saves are drained first so none of
    /// them lands after the delete.
    pub async fn clear(&mut self) -> ApiResult<()> {
        self.cancel_pending();
        self.flush().await;
        self.client.delete_history().await?;
        self.history_deleted();
        tracing::info!("Chat history cleared");
        Ok(())
    }

    /// Empties the local log after the backend history was deleted. The
    /// (now empty) backend state counts as hydrated.
    pub fn history_deleted(&mut self) {
        self.cancel_pending();
        self.messages.clear();
        self.hydrated = true;
    }

    /// Empties the local log without touching the backend (logout). The next
    /// session has to hydrate again before anything is saved.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.messages.clear();
        self.hydrated = false;
    }

    /// Resolves once every save queued so far has been attempted. The
    /// returned future does not borrow the synchronizer, so it can be moved
    /// onto a task.
    pub fn flush(&self) -> impl Future<Output = ()> + Send + 'static {
        let persist_tx = self.persist_tx.clone();
        async move {
            let (tx, rx) = oneshot::channel();
            if persist_tx.send(PersistCmd::Flush(tx)).is_ok() {
                let _ = rx.await;
            }
        }
    }

    fn persist(&self) {
        if !self.hydrated {
            tracing::debug!("History not loaded yet; holding change locally");
            return;
        }
        if self
            .persist_tx
            .send(PersistCmd::Save(self.messages.clone()))
            .is_err()
        {
            tracing::warn!("History persister is gone; change not saved");
        }
    }
}

async fn run_persister(client: ChatClient, mut rx: mpsc::UnboundedReceiver<PersistCmd>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            PersistCmd::Save(messages) => {
                if messages.is_empty() {
                    continue;
                }
                if let Err(e) = client.save_history(&messages).await {
                    tracing::warn!("Failed to save chat history: {}", e);
                }
            }
            PersistCmd::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

fn failure_text(err: &ApiError) -> String {
    match err {
        ApiError::NotAuthenticated => NO_DOCUMENT_SELECTED.to_string(),
        other => {
            let text = other.to_string();
            if text.trim().is_empty() {
                ANSWER_FAILED.to_string()
            } else {
                text
            }
        }
    }
}

/// Canonical `YYYY-MM-DDTHH:MM:SS.mmmZ`; anything unparseable becomes now.
pub fn normalize_timestamp(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(now_timestamp)
}
