use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use affiliate_engine::cli::{Cli, Commands};
use affiliate_engine::config::StaticConfig;
use affiliate_engine::runtime::lifetime::prepare_app_state;
use affiliate_engine::runtime::modes::{run_payouts_once, run_performance_once, run_server};
use affiliate_engine::system::init_logging;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve);

    if let Commands::GenerateConfig { output } = &command {
        let sample = StaticConfig::generate_sample_config();
        match output {
            Some(path) => {
                std::fs::write(path, sample)
                    .with_context(|| format!("Failed to write {}", path))?;
                eprintln!("[INFO] Sample configuration written to {}", path);
            }
            None => print!("{}", sample),
        }
        return Ok(());
    }

    let config = StaticConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    let _log_guard = init_logging(&config.logging)?;

    let state = match prepare_app_state(Arc::new(config)).await {
        Ok(state) => state,
        Err(e) => {
            if let Some(err) = e.downcast_ref::<affiliate_engine::errors::AffiliateError>() {
                eprintln!("{}", err.format_colored());
            }
            return Err(e);
        }
    };

    match command {
        Commands::RunPayouts => run_payouts_once(&state).await,
        Commands::RefreshPerformance => run_performance_once(&state).await,
        Commands::Serve | Commands::GenerateConfig { .. } => run_server(state).await,
    }
}
