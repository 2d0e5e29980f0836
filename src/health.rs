//! Liveness probe contract and prober.
//!
//! The runtime image has no shell, so health checking is an exec-form
//! command baked into the image config plus an external prober: an HTTP
//! GET against a fixed unauthenticated status endpoint. HTTP 200 is
//! healthy; any other status or a connection error is not.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

/// Health check parameters, serialized into the image config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Status endpoint path. Idempotent, side-effect-free, unauthenticated.
    pub endpoint: String,
    pub port: u16,
    /// Seconds between probes.
    pub interval_secs: u64,
    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,
    /// Grace period before the first probe counts.
    pub start_period_secs: u64,
    /// Consecutive failures before the container is marked unhealthy.
    pub retries: u32,
}

impl HealthCheck {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.health_endpoint.clone(),
            port: config.port,
            interval_secs: 30,
            timeout_secs: 5,
            start_period_secs: 60,
            retries: 3,
        }
    }

    pub fn url(&self, host: &str) -> String {
        format!("http://{}:{}{}", host, self.port, self.endpoint)
    }

    /// Exec-form probe command for the image config. No shell is present
    /// in the runtime image, so the command invokes the language runtime
    /// directly.
    pub fn probe_command(&self, runtime_binary: &str) -> Vec<String> {
        vec![
            "CMD".to_string(),
            runtime_binary.to_string(),
            "-e".to_string(),
            format!(
                "require('http').get({{port:{},path:'{}',timeout:{}}},\
                 r=>process.exit(r.statusCode===200?0:1)).on('error',()=>process.exit(1))",
                self.port,
                self.endpoint,
                self.timeout_secs * 1000
            ),
        ]
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Healthy,
    Unhealthy(String),
}

impl ProbeStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeStatus::Healthy)
    }
}

/// Issue one probe against a running service.
///
/// Ok(Unhealthy) covers HTTP failures and connection errors; Err is
/// reserved for prober-side problems (runtime construction).
pub fn probe_once(check: &HealthCheck, host: &str) -> Result<ProbeStatus> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build probe runtime")?;

    let url = check.url(host);
    let timeout = Duration::from_secs(check.timeout_secs);

    runtime.block_on(async move {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let status = match client.get(&url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                ProbeStatus::Healthy
            }
            Ok(response) => {
                ProbeStatus::Unhealthy(format!("HTTP {}", response.status().as_u16()))
            }
            Err(e) if e.is_timeout() => ProbeStatus::Unhealthy("timed out".to_string()),
            Err(e) => ProbeStatus::Unhealthy(format!("connection error: {}", e)),
        };
        Ok(status)
    })
}

/// Apply the orchestrator semantics against a running service: wait out
/// the grace period, probe every interval, and bail once the configured
/// number of consecutive probes has failed.
///
/// Runs until the service is marked unhealthy; interrupt to stop a
/// healthy watch.
pub fn watch(check: &HealthCheck, host: &str) -> Result<()> {
    println!(
        "Waiting {}s grace period before first probe...",
        check.start_period_secs
    );
    std::thread::sleep(Duration::from_secs(check.start_period_secs));

    let mut consecutive_failures = 0u32;
    loop {
        match probe_once(check, host)? {
            ProbeStatus::Healthy => {
                consecutive_failures = 0;
                println!("  [PROBE] healthy");
            }
            ProbeStatus::Unhealthy(reason) => {
                consecutive_failures += 1;
                println!(
                    "  [PROBE] unhealthy ({}) - {}/{} consecutive failures",
                    reason, consecutive_failures, check.retries
                );
                if consecutive_failures >= check.retries {
                    bail!(
                        "Service marked unhealthy after {} consecutive failed probes",
                        consecutive_failures
                    );
                }
            }
        }
        std::thread::sleep(Duration::from_secs(check.interval_secs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn test_check(port: u16) -> HealthCheck {
        HealthCheck {
            endpoint: "/rest/admin/application-version".to_string(),
            port,
            interval_secs: 30,
            timeout_secs: 5,
            start_period_secs: 60,
            retries: 3,
        }
    }

    /// Serve exactly one HTTP response on an ephemeral port.
    fn one_shot_server(status_line: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = write!(
                    stream,
                    "{}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                    status_line
                );
            }
        });
        port
    }

    #[test]
    fn probe_reports_healthy_on_200() {
        let port = one_shot_server("HTTP/1.1 200 OK");
        let status = probe_once(&test_check(port), "127.0.0.1").unwrap();
        assert!(status.is_healthy());
    }

    #[test]
    fn probe_reports_unhealthy_on_500() {
        let port = one_shot_server("HTTP/1.1 500 Internal Server Error");
        let status = probe_once(&test_check(port), "127.0.0.1").unwrap();
        assert_eq!(status, ProbeStatus::Unhealthy("HTTP 500".to_string()));
    }

    #[test]
    fn probe_reports_unhealthy_on_connection_error() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let status = probe_once(&test_check(port), "127.0.0.1").unwrap();
        assert!(!status.is_healthy());
    }

    #[test]
    fn orchestrator_parameters_are_fixed() {
        let config = Config::load(std::path::Path::new("/nonexistent"));
        let check = HealthCheck::from_config(&config);
        assert_eq!(check.interval_secs, 30);
        assert_eq!(check.timeout_secs, 5);
        assert_eq!(check.start_period_secs, 60);
        assert_eq!(check.retries, 3);
    }

    #[test]
    fn probe_command_is_exec_form() {
        let check = test_check(3000);
        let command = check.probe_command("/nodejs/bin/node");
        assert_eq!(command[0], "CMD");
        assert_eq!(command[1], "/nodejs/bin/node");
        // No shell indirection anywhere in the command.
        assert!(command.iter().all(|part| !part.contains("sh -c")));
    }
}
