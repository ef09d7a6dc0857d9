use anyhow::Result;
use brandbook_app::Tether;
use brandbook_app::cli::{self, Cli};
use brandbook_common::observability::{LogConfig, LogFormat, init_logging};
use brandbook_config::{BrandbookConfig, BrandbookConfigLoader, CONFIG_FILE_NAME, user_config_path};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LogConfig {
        emit_stderr: cli.verbose,
        format: LogFormat::from_env_value(std::env::var("BRANDBOOK_LOG_FORMAT").ok().as_deref()),
        ..LogConfig::default()
    })?;

    // Explicit file, else the user and working-directory files (env wins).
    let mut loader = BrandbookConfigLoader::new();
    match &cli.config {
        Some(path) => loader = loader.with_file(path),
        None => {
            if let Some(path) = user_config_path() {
                loader = loader.with_optional_file(path);
            }
            loader = loader.with_optional_file(CONFIG_FILE_NAME);
        }
    }
    let cfg: BrandbookConfig = loader.load()?;

    let tether = Tether::from_config(cfg)?;
    cli::run(cli, tether).await
}
