mod bindings;

use agentui_runtime::{HostConfig, HostError};
use std::process;
use tracing_subscriber::EnvFilter;

slint::include_modules!();

fn main() {
    init_tracing();

    let result = HostConfig::from_env()
        .map_err(HostError::from)
        .and_then(agentui_runtime::run::<bindings::AppBindings>);

    if let Err(err) = result {
        tracing::error!(error = %err, "ui host fatal error");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
