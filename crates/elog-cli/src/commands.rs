use super::args::{Cli, Commands};
use super::handlers;
use anyhow::Result;
use elog_runtime::{CancelToken, Config, Runtime, logging, resolve_config_dir};
use tracing::debug;

pub fn run(cli: Cli) -> Result<()> {
    logging::init(&cli.log_level, cli.log_file.as_deref())?;

    let config_path = resolve_config_dir(cli.config_dir.as_deref())?.join("config.toml");
    debug!(config = %config_path.display(), "Resolved configuration file");

    match cli.command {
        Commands::Config { command } => handlers::config(command, &config_path, cli.json),
        command => {
            let config = Config::load_from(&config_path)?;
            let profile = config.profile(cli.profile.as_deref())?.clone();

            let cancel = CancelToken::new();
            let on_interrupt = cancel.clone();
            ctrlc::set_handler(move || on_interrupt.cancel())?;
            let runtime = Runtime::new(profile).with_cancel_token(cancel);

            let executor = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            executor.block_on(handlers::query(&runtime, command, cli.json))
        }
    }
}
