use std::sync::Arc;

use slack_approvals::approval::{ApprovalWorkflow, DecisionGuard};
use slack_approvals::config::{BotConfig, ConnectionMode};
use slack_approvals::server::slack_routes;
use slack_approvals::slack::{SlackApi, SlackClient};
use slack_approvals::socket;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export SLACK_BOT_TOKEN=xoxb-... SLACK_SIGNING_SECRET=...");
        std::process::exit(1);
    });

    eprintln!("⚡️ Slack approvals v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Command: {}", config.command);

    let client = Arc::new(SlackClient::new(config.bot_token.clone()));
    let slack: Arc<dyn SlackApi> = client.clone();

    let mut workflow = ApprovalWorkflow::new(slack, config.command.clone());
    match config.decision_guard_ttl {
        Some(ttl) => {
            eprintln!("   Decision guard: {}s", ttl.as_secs());
            workflow = workflow.with_decision_guard(DecisionGuard::new(ttl));
        }
        None => eprintln!("   Decision guard: off"),
    }
    let workflow = Arc::new(workflow);

    match config.mode {
        ConnectionMode::Socket => {
            let app_token = config
                .app_token
                .clone()
                .ok_or_else(|| anyhow::anyhow!("SLACK_APP_TOKEN is required in socket mode"))?;
            eprintln!("   Mode: socket\n");
            tracing::info!(command = %config.command, "Approval bot running in socket mode");
            socket::run(client, app_token, workflow).await;
        }
        ConnectionMode::Http => {
            let signing_secret = config
                .signing_secret
                .clone()
                .ok_or_else(|| anyhow::anyhow!("SLACK_SIGNING_SECRET is required in HTTP mode"))?;
            eprintln!("   Mode: http (0.0.0.0:{})", config.port);
            eprintln!("   Commands URL: /slack/commands");
            eprintln!("   Interactivity URL: /slack/interactions\n");

            let app = slack_routes(workflow, signing_secret);
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
            tracing::info!(port = config.port, command = %config.command, "Approval bot listening");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
