use std::sync::Arc;

use anyhow::Context;

use lead_wizard::config::WizardConfig;
use lead_wizard::wizard::{
    HttpRelay, RelaySink, WizardRouteState, spawn_expiry_task, wizard_routes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WizardConfig::from_env().context("loading wizard configuration")?;

    let port: u16 = std::env::var("WIZARD_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    eprintln!("Lead Wizard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Relay: {}", config.relay_url);
    eprintln!("   Submit timeout: {:?}", config.submit_timeout);
    eprintln!("   Offer deadline: {}", config.deadline);
    eprintln!("   Idle wizards expire after: {:?}", config.session_idle_ttl);
    eprintln!("   API: http://0.0.0.0:{}/api/wizard\n", port);

    let sink: Arc<dyn RelaySink> = Arc::new(HttpRelay::new(config.relay_url.clone()));
    let idle_ttl = config.session_idle_ttl;
    let state = WizardRouteState::new(config, sink);
    let _expiry = spawn_expiry_task(state.clone(), idle_ttl);
    let app = wizard_routes(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("binding port {port}"))?;
    tracing::info!(port, "Wizard API server started");
    axum::serve(listener, app).await?;

    Ok(())
}
