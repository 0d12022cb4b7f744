//! # Host Simulator
//!
//! Runs the scripted parent/child exchange against a simulated host and logs
//! what each frame observed.
//!
//! ## Configuration
//!
//! - `FRAME_RPC_CONFIG`: path to a JSON session configuration (optional)
//! - `FRAME_RPC_LOG_LEVEL`, `FRAME_RPC_JSON_LOGS`: see `frame-telemetry`

use anyhow::{Context, Result};
use frame_rpc::BridgeConfig;
use frame_telemetry::{init_telemetry, TelemetryConfig};
use host_simulator::{run_scenario, ScenarioSettings};
use tracing::info;

fn load_config() -> Result<BridgeConfig> {
    match std::env::var("FRAME_RPC_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {path}"))?;
            Ok(BridgeConfig::from_json(&raw)?)
        }
        Err(_) => Ok(BridgeConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_component("simulator"))?;

    let settings = ScenarioSettings {
        bridge: load_config()?,
        ..ScenarioSettings::default()
    };

    let report = run_scenario(settings).await?;
    info!(
        parent_sent = report.parent_stats.messages_sent,
        parent_dropped = report.parent_stats.total_dropped(),
        child_sent = report.child_stats.messages_sent,
        child_dropped = report.child_stats.total_dropped(),
        "Scenario complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
