use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wif_cli::{Cli, LogFormat, Settings, commands};

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let settings = Settings::from(&cli.global);
    init_tracing(settings.log_format);

    tracing::debug!(command = ?cli.command, "starting");
    let ok = commands::run(&cli.command, &settings).await?;
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
