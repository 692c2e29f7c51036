use anyhow::bail;
use tracing::info;

use crate::config::AppConfig;
use crate::detection::DetectionClient;

pub async fn run_health_check(config: &AppConfig) -> anyhow::Result<()> {
    let client = DetectionClient::new(&config.client)?;
    info!("Running health check against {}", client.api_base());

    if client.health_check().await {
        println!("Relay at {} is healthy", client.api_base());
        Ok(())
    } else {
        bail!("Relay at {} is not responding", client.api_base())
    }
}
