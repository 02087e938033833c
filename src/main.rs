mod charts;
mod client;
mod config;
mod dashboard;
mod export;
mod html;
mod models;
mod session;
mod view;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;

use crate::{
    client::BackendClient,
    config::{BackendMode, Settings},
};

#[derive(Debug, Parser)]
#[command(name = "chainfly-dashboard", version)]
struct Cli {
    /// Override BACKEND_MODE (local|remote)
    #[arg(long)]
    backend: Option<BackendMode>,

    /// Override DASHBOARD_HOST
    #[arg(long)]
    host: Option<String>,

    /// Override DASHBOARD_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Open the dashboard in a browser once it is listening
    #[arg(long)]
    open: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(mode) = cli.backend {
        settings.backend_mode = mode;
    }
    if let Some(host) = cli.host {
        settings.dashboard_host = host;
    }
    if let Some(port) = cli.port {
        settings.dashboard_port = port;
    }
    settings.dashboard_open_browser |= cli.open;
    settings.validate()?;

    let client = BackendClient::from_settings(&settings)?;

    log::info!(
        "app.start backend_mode={} backend_url={}",
        settings.backend_mode,
        client.base_url()
    );

    if settings.dashboard_open_browser {
        let url = format!("http://{}:{}/", settings.dashboard_host, settings.dashboard_port);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(650)).await;
            let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        });
    }

    dashboard::serve_dashboard(settings, client).await
}
