use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};

use paperchat_core::audio::{AudioPayload, CaptureError};
use paperchat_core::models::recent_documents;
use paperchat_core::{
    format_model_name, ApiClient, AudioCapture, AuthManager, ChatRole, CommandMicrophone, Config,
    GraphPanel, LlmModel, PromptStyle, Registration, SummaryPanel,
};

/// Everything a command needs: config, the shared client and the session.
pub struct Context {
    pub config: Config,
    pub api: ApiClient,
    pub auth: Arc<AuthManager>,
}

impl Context {
    pub fn new(config: Config, api: ApiClient) -> Self {
        let auth = Arc::new(AuthManager::new(&api));
        Self { config, api, auth }
    }

    fn require_login(&self) -> Result<()> {
        if !self.auth.is_authenticated() {
            bail!("Not logged in. Run {} first.", "paperchat login".bold());
        }
        Ok(())
    }
}

pub async fn login(ctx: &Context, email: Option<String>) -> Result<()> {
    let theme = ColorfulTheme::default();
    let email = match email {
        Some(email) => email,
        None => Input::with_theme(&theme).with_prompt("Email").interact_text()?,
    };
    let password = Password::with_theme(&theme).with_prompt("Password").interact()?;

    let session = ctx.auth.sign_in(&email, &password).await?;
    let name = session
        .user
        .map(|u| u.display_name())
        .unwrap_or_else(|| email.clone());
    println!("{} Logged in as {}", "✓".green(), name.bold());
    Ok(())
}

pub async fn register(ctx: &Context) -> Result<()> {
    let theme = ColorfulTheme::default();
    let form = Registration {
        username: Input::with_theme(&theme).with_prompt("Username").interact_text()?,
        first_name: Input::with_theme(&theme).with_prompt("First name").interact_text()?,
        last_name: Input::with_theme(&theme).with_prompt("Last name").interact_text()?,
        email: Input::with_theme(&theme).with_prompt("Email").interact_text()?,
        password: Password::with_theme(&theme).with_prompt("Password").interact()?,
        confirm_password: Password::with_theme(&theme)
            .with_prompt("Confirm password")
            .interact()?,
    };

    let message = ctx.auth.register(&form).await?;
    println!("{} {}", "✓".green(), message);
    println!("Log in with: {}", format!("paperchat login --email {}", form.email).bold());
    Ok(())
}

pub fn logout(ctx: &Context) {
    ctx.auth.logout();
    println!("{}", "Logged out".yellow());
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    let session = ctx.auth.restore().await;
    match session.user {
        Some(user) => {
            println!("{} {}", user.display_name().bold(), format!("<{}>", user.email).dimmed());
            println!("  username: {}", user.username);
        }
        None if session.is_authenticated() => {
            println!("{}", "Logged in, but the profile could not be loaded".yellow());
        }
        None => println!("{}", "Session expired. Please log in again.".red()),
    }
    Ok(())
}

pub async fn documents(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    let docs = ctx.api.documents().list().await?;

    if docs.is_empty() {
        println!("{}", "No documents uploaded yet".yellow());
        return Ok(());
    }

    println!("\n{}", "📄 Documents".bold().blue());
    println!("{}", "=".repeat(40).dimmed());
    for doc in recent_documents(&docs, docs.len()) {
        let uploaded = doc
            .uploaded()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {}  {}",
            format!("{:>4}", doc.id).bold().yellow(),
            doc.title(),
            uploaded.dimmed(),
            doc.size_label().dimmed()
        );
    }
    Ok(())
}

pub async fn upload(ctx: &Context, path: &Path, image: bool) -> Result<()> {
    ctx.require_login()?;
    let docs = ctx.api.documents();
    let response = if image {
        docs.upload_image(path).await?
    } else {
        docs.upload_pdf(path).await?
    };
    let message = response.msg.unwrap_or_else(|| "Upload complete".to_string());
    println!("{} {}", "✓".green(), message);
    if let Some(id) = response.pdf_id {
        println!("  id: {}", id.bold());
    }
    Ok(())
}

pub async fn download(ctx: &Context, id: &str, out: Option<PathBuf>) -> Result<()> {
    ctx.require_login()?;
    let docs = ctx.api.documents();
    let document = docs
        .list()
        .await?
        .into_iter()
        .find(|d| d.id == id)
        .with_context(|| format!("No document with id {}", id))?;
    let dir = out.unwrap_or_else(|| ctx.config.download_dir());
    let path = docs.download_to(&document, &dir).await?;
    println!("{} Saved {}", "✓".green(), path.display().to_string().bold());
    Ok(())
}

pub async fn delete(ctx: &Context, id: &str, yes: bool) -> Result<()> {
    ctx.require_login()?;
    if !yes
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete document {}?", id))
            .default(false)
            .interact()?
    {
        return Ok(());
    }
    let message = ctx.api.documents().delete(id).await?;
    println!("{} {}", "✓".green(), message);
    Ok(())
}

pub async fn ask(
    ctx: &Context,
    question: &str,
    document: &str,
    model: Option<String>,
    style: Option<String>,
) -> Result<()> {
    ctx.require_login()?;
    let model = model
        .or_else(|| ctx.config.default_model.clone())
        .map(|m| LlmModel::from_id(&m))
        .unwrap_or_default();
    let style = match style.or_else(|| ctx.config.prompt_style.clone()) {
        Some(s) => PromptStyle::from_str(&s)
            .with_context(|| format!("Unknown prompt style '{}' (concise, technical, casual)", s))?,
        None => PromptStyle::default(),
    };

    println!("🤖 Asking {} ({})...\n", model.display_name().bold().magenta(), style.display_name());
    let answer = ctx
        .api
        .chat()
        .ask(question, document, model.as_str(), style.as_str())
        .await?;
    println!("{}", "Answer:".bold().green());
    println!("{}", answer);
    Ok(())
}

pub async fn history(ctx: &Context, limit: usize) -> Result<()> {
    ctx.require_login()?;
    let messages = ctx.api.chat().history().await?;
    if messages.is_empty() {
        println!("{}", "No chat history".yellow());
        return Ok(());
    }

    let skip = messages.len().saturating_sub(limit);
    for msg in &messages[skip..] {
        let label = match msg.role {
            ChatRole::User => "You:".bold().cyan(),
            ChatRole::Assistant => "AI:".bold().yellow(),
        };
        let model = msg
            .model_id
            .as_deref()
            .map(|m| format!(" [{}]", format_model_name(m)))
            .unwrap_or_default();
        println!("{} {}{}", label, msg.timestamp.dimmed(), model.dimmed());
        println!("{}\n", msg.content);
    }
    Ok(())
}

pub async fn clear_history(ctx: &Context, yes: bool) -> Result<()> {
    ctx.require_login()?;
    if !yes
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Clear the whole chat history?")
            .default(false)
            .interact()?
    {
        return Ok(());
    }
    ctx.api.chat().delete_history().await?;
    println!("{} Chat history cleared", "✓".green());
    Ok(())
}

pub async fn summary(ctx: &Context, id: &str, regenerate: bool, export: bool) -> Result<()> {
    ctx.require_login()?;
    let document = ctx
        .api
        .documents()
        .list()
        .await?
        .into_iter()
        .find(|d| d.id == id)
        .with_context(|| format!("No document with id {}", id))?;

    let insights = ctx.api.insights();
    let mut panel = SummaryPanel::open(document);
    if regenerate {
        panel.regenerate(&insights).await;
    } else {
        panel.load(&insights).await;
    }

    println!("\n{}", format!("📝 {}", panel.document.title()).bold().green());
    println!("{}", "=".repeat(50).dimmed());
    match panel.summary() {
        Some(text) => println!("{}", text),
        None => bail!("{}", panel.text()),
    }

    if export {
        let path = panel.export(&ctx.config.download_dir())?;
        println!("\n{} Saved {}", "✓".green(), path.display().to_string().bold());
    }
    Ok(())
}

pub async fn graph(ctx: &Context, id: &str) -> Result<()> {
    ctx.require_login()?;
    let document = ctx
        .api
        .documents()
        .list()
        .await?
        .into_iter()
        .find(|d| d.id == id)
        .with_context(|| format!("No document with id {}", id))?;

    let mut panel = GraphPanel::open(document);
    panel.load(&ctx.api.insights()).await;

    println!("\n{}", format!("🕸  {}", panel.document.title()).bold().blue());
    for line in panel.lines() {
        println!("{}", line);
    }
    Ok(())
}

pub async fn stats(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    let stats = ctx.api.chat().model_stats().await?;
    if stats.is_empty() {
        println!("{}", "No questions asked yet".yellow());
        return Ok(());
    }

    let max = stats.iter().map(|s| s.count).max().unwrap_or(1).max(1);
    println!("\n{}", "📊 Questions per model".bold().blue());
    for usage in stats {
        let width = (usage.count * 30 / max) as usize;
        println!(
            "{:<22} {} {}",
            format_model_name(&usage.name),
            "█".repeat(width).cyan(),
            usage.count.to_string().bold()
        );
    }
    Ok(())
}

pub async fn share(ctx: &Context, text: &str) -> Result<()> {
    ctx.require_login()?;
    let url = ctx.api.chat().share_answer(text).await?;
    println!("{} {}", "🔗".green(), url.bold());
    Ok(())
}

pub async fn shared(ctx: &Context, token: &str) -> Result<()> {
    let shared = ctx.api.chat().shared_answer(token).await?;
    if let Some(created) = shared.created_at {
        println!("{}", format!("Shared {}", created).dimmed());
    }
    println!("{}", shared.answer.unwrap_or_default());
    Ok(())
}

fn audio_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("webm") => "audio/webm",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        _ => "audio/wav",
    }
}

pub async fn transcribe(ctx: &Context, file: Option<PathBuf>, seconds: u64) -> Result<()> {
    ctx.require_login()?;
    let voice = ctx.api.voice();

    let payload = match file {
        Some(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Could not read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "voice.wav".to_string());
            AudioPayload::new(bytes, audio_mime(&path), filename)
        }
        None => record(ctx, seconds).await?,
    };

    println!("{}", "Transcribing...".dimmed());
    let text = voice.transcribe(&payload).await?;
    println!("{}", text);
    Ok(())
}

async fn record(ctx: &Context, seconds: u64) -> Result<AudioPayload> {
    let microphone = ctx
        .config
        .recorder_command
        .as_deref()
        .map(CommandMicrophone::new)
        .unwrap_or_default();

    let mut capture = AudioCapture::new();
    let mut recording = capture.start(&microphone)?;
    println!("{} Recording for {}s...", "●".red(), seconds);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
    while let Ok(Some(chunk)) = tokio::time::timeout_at(deadline, recording.next_chunk()).await {
        capture.push_chunk(chunk);
    }
    for chunk in recording.finish().await {
        capture.push_chunk(chunk);
    }

    capture.stop().map_err(|e| match e {
        CaptureError::NoAudio => anyhow::anyhow!("No audio recorded. Check the recorder ({}).", microphone.program()),
        other => other.into(),
    })
}
