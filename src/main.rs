use anyhow::{Context, Result, bail};
use case_assistant::config::{HistoryBackend, Settings};
use case_assistant::services::{ChatHistoryStore, HttpGateway, MemoryHistoryStore};
use case_assistant::{CaseSession, ChatMessage, MessageType, ViewEvent};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Bundled defaults, used when no .env file is present
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    load_bundled_config();
}

fn load_bundled_config() {
    for line in BUNDLED_CONFIG.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            // Only set if not already set (allow env override)
            if std::env::var(key).is_err() {
                // SAFETY: runs from the synchronous `main` before the tokio runtime
                // is built, so no other thread exists yet
                unsafe {
                    std::env::set_var(key, value);
                }
            }
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("case_assistant=info,warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_message(msg: &ChatMessage) {
    let who = match msg.kind {
        MessageType::User => "you",
        MessageType::Assistant => "assistant",
        MessageType::System => "system",
        MessageType::Error => "error",
    };
    println!("[{}] {}: {}", msg.timestamp, who, msg.text);
}

fn print_results(session: &CaseSession) {
    if session.has_similar_cases() {
        println!("Similar cases:");
        for case in session.similar_cases() {
            println!("  {:>3}%  {}", case.similarity, case.url);
        }
    }
    if session.has_external_info() {
        println!("External references:");
        for info in session.external_info() {
            println!("  {:>3}%  {} <{}>", info.similarity, info.title, info.url);
        }
    }
    if session.has_external_images() {
        println!("Images:");
        for image in session.external_images() {
            let src = image.src.as_deref().unwrap_or("-");
            println!("  {}: {} ({})", image.header, image.description, src);
        }
    }
    if session.has_recommendations() {
        println!("Recommendations:");
        for rec in session.recommendations() {
            println!("  [{}] {}", rec.kind, rec.message);
        }
    }
    if let Some(err) = session.error() {
        println!("! {err}");
    }
}

fn main() -> Result<()> {
    load_dotenv();
    init_logging();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?
        .block_on(run())
}

async fn run() -> Result<()> {
    let Some(case_id) = std::env::args().nth(1) else {
        bail!("usage: case-assistant <case-id>");
    };

    let settings = Settings::from_env()?;
    let gateway = Arc::new(HttpGateway::new(&settings).context("failed to build HTTP client")?);
    let history: Arc<dyn ChatHistoryStore> = match settings.history {
        HistoryBackend::Remote => gateway.clone(),
        HistoryBackend::Memory => Arc::new(MemoryHistoryStore::new()),
    };

    let mut session = CaseSession::new(case_id, gateway, history)
        .with_locale(settings.locale)
        .with_record_url(settings.record_url.clone());
    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Some(ViewEvent::ScrollToBottom) = events.recv().await {
            debug!("transcript updated");
        }
    });

    session.activate().await;
    print_results(&session);
    session.transcript().iter().for_each(print_message);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let seen = session.transcript().len();
        session.set_current_message(line);
        if session.is_send_disabled() {
            continue;
        }
        session.submit().await;
        session.transcript()[seen..].iter().for_each(print_message);
        print_results(&session);
    }

    session.flush().await;
    Ok(())
}
