mod cli;
mod commands;
mod config;

use clap::Parser;

use crate::cli::Commands;
use crate::commands::{
    ExportRequest, handle_config_command, handle_export_command, handle_formats_command,
};
use crate::config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(Config::get_config_path);

    match cli.command {
        Commands::Export {
            format,
            input,
            output,
            out_dir,
            base_url,
            dry_run,
        } => {
            let config = Config::load(&config_path).await?;
            let request = ExportRequest {
                format: format.into(),
                input,
                output,
                out_dir,
                base_url,
                dry_run,
            };
            handle_export_command(request, &config).await?;
        }
        Commands::Formats => handle_formats_command().await?,
        Commands::Config { command } => handle_config_command(command, &config_path).await?,
    }

    Ok(())
}
