#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("avatar_dat=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    avatar_dat::gui::run().map_err(|e| anyhow::anyhow!("editor window failed: {}", e))
}
