//! Parley application binary - composition root.
//!
//! 1. Load configuration from TOML, apply CLI overrides
//! 2. Seed the in-memory gateway from a JSON fixture
//! 3. Build the chat controller and reconcile the merged view
//! 4. Optionally open a conversation, mark it read, send a message, change
//!    its status

mod cli;

use std::sync::Arc;

use clap::Parser;

use parley_chat::{ChatController, ConversationEntry, Fixture, InMemoryGateway, SessionSnapshot};
use parley_core::ParleyConfig;

use cli::CliArgs;

/// Bundled demo data used when no fixture is given.
const DEMO_FIXTURE: &str = include_str!("../fixtures/demo.json");

fn print_view(view: &[ConversationEntry], total_unread: u32) {
    println!("Conversations ({} unread)", total_unread);
    for entry in view {
        let key = entry
            .key()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        let who = entry.tenant_name().unwrap_or_else(|| "Unknown".to_string());
        let unit = entry
            .unit_label()
            .map(|u| format!(" [{}]", u))
            .unwrap_or_default();
        let unread = match entry.unread_count {
            Some(n) if n > 0 => format!(" ({} unread)", n),
            _ => String::new(),
        };
        println!("  {:<16} {}{} - {}{}", key, who, unit, entry.subject, unread);
    }
}

fn print_session(snapshot: &SessionSnapshot) {
    let active = snapshot
        .active
        .map(|k| k.to_string())
        .unwrap_or_else(|| "none".to_string());
    println!("Session {} [{}] on {}", snapshot.session_id, snapshot.state, active);
    for message in &snapshot.messages {
        println!(
            "  {} {:>16}: {}",
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.sender_type.to_string(),
            message.content
        );
    }
    if let Some(ref err) = snapshot.error {
        println!("  error: {}", err);
    }
    if !snapshot.draft.is_empty() {
        println!("  draft: {}", snapshot.draft);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ParleyConfig::load_or_default(&config_file);
    config.gateway.property_id = args.resolve_property(config.gateway.property_id);
    let log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_file.display(),
        property_id = config.gateway.property_id,
        "Configuration resolved"
    );

    // Gateway.
    let property = config.gateway.property();
    let gateway = match args.fixture {
        Some(ref path) => InMemoryGateway::from_fixture(property, path)?,
        None => {
            let fixture: Fixture = serde_json::from_str(DEMO_FIXTURE)?;
            InMemoryGateway::with_fixture(property, fixture)
        }
    }
    .with_sender_type(config.chat.sender_type);

    // Controller, cancelled on Ctrl-C.
    let controller = ChatController::new(Arc::new(gateway), &config);
    let token = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, abandoning pending requests");
            token.cancel();
        }
    });

    controller.initialize().await?;
    tracing::info!(mode = ?controller.view_mode(), "Merged view ready");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&controller.merged_view())?);
    } else {
        print_view(&controller.merged_view(), controller.total_unread());
    }

    if let Some(ref key) = args.select {
        controller.select(key).await?;
        if args.mark_read {
            controller.mark_active_read().await?;
        }
        if let Some(ref text) = args.send {
            if let Err(e) = controller.send(text).await {
                tracing::error!(error = %e, "Send failed");
            }
        }
        if let Some(status) = args.status {
            if let Err(e) = controller.update_active_thread(Some(status), None).await {
                tracing::error!(error = %e, "Status change failed");
            }
        }
        print_session(&controller.snapshot());
        if (args.send.is_some() || args.status.is_some()) && !args.json {
            print_view(&controller.merged_view(), controller.total_unread());
        }
    }

    controller.close();
    Ok(())
}
