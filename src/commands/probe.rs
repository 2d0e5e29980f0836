//! Probe command - checks a running service's health endpoint.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::health::{self, HealthCheck, ProbeStatus};

/// Execute the probe command.
///
/// Single-shot by default; `--wait` applies the full orchestrator
/// semantics (grace period, interval, consecutive-failure counting).
pub fn cmd_probe(config: &Config, host: &str, wait: bool) -> Result<()> {
    let check = HealthCheck::from_config(config);

    if wait {
        return health::watch(&check, host);
    }

    match health::probe_once(&check, host)? {
        ProbeStatus::Healthy => {
            println!("healthy: GET {} returned 200", check.url(host));
            Ok(())
        }
        ProbeStatus::Unhealthy(reason) => {
            bail!("unhealthy: GET {} - {}", check.url(host), reason)
        }
    }
}
