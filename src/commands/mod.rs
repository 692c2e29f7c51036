//! Entry points for each CLI subcommand.

pub mod health;
pub mod screen;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.relay.bind_addr = bind;
            }
            config.validate()?;
            crate::relay::serve(config.relay).await
        }
        Command::Health { api_url } => {
            if let Some(url) = api_url {
                config.client.api_base_url = url;
            }
            health::run_health_check(&config).await
        }
        Command::Screen(args) => {
            if let Some(ref url) = args.api_url {
                config.client.api_base_url = url.clone();
            }
            screen::run_screening(&config, &args).await
        }
    }
}
