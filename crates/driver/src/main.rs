use anyhow::Context;

use keyqueue_driver::DriverConfig;
use keyqueue_observability::LogConfig;

fn main() -> anyhow::Result<()> {
    let logging = LogConfig::from_env();
    keyqueue_observability::logging::init_with(&logging);
    tracing::debug!(filter = %logging.filter, format = %logging.format, "logging initialized");

    let config = DriverConfig::from_env().context("loading driver configuration")?;
    tracing::info!(?config, "starting keyqueue driver");

    let report = keyqueue_driver::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_complete() {
        tracing::warn!("some consumers received fewer messages than expected");
    }
    Ok(())
}
