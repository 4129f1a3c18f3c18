use anyhow::Result;
use tracing::info;

use contractdesk_form_service::config::Config;
use contractdesk_form_service::{
    build_router_with_state, build_state, init_tracing, run_dropdown_population,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.log_filter);

    info!(
        addr = %config.bind_addr,
        datastore_configured = config.datastore_url.is_some(),
        webhook_url = %config.webhook_url,
        "starting contract form service"
    );

    let bind_addr = config.bind_addr;
    let state = build_state(config);
    tokio::spawn(run_dropdown_population(state.clone()));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, build_router_with_state(state).into_make_service()).await?;

    Ok(())
}
