//! Health check for a running testx server
//!
//! Exposed over HTTP so that harnesses and container orchestrators can wait for the server to
//! come up, and notice when it is on its way down.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use axum::http::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Health status enumeration
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Health response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: HealthStatus,
}

/// Configuration options for the health check component.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Set to false to disable the health check
    pub enabled: bool,

    /// Optionally set a custom healthcheck path
    /// Defaults to /health
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    config: HealthCheckConfig,
    live: Arc<AtomicBool>,
}

impl HealthCheck {
    pub fn new(config: HealthCheckConfig) -> Self {
        Self {
            config,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// Report down from now on, while in-flight requests drain
    pub fn mark_down(&self) {
        debug!("Health check marked down");
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn get_health_state(&self) -> (Health, StatusCode) {
        if self.live.load(Ordering::SeqCst) {
            (
                Health {
                    status: HealthStatus::Up,
                },
                StatusCode::OK,
            )
        } else {
            (
                Health {
                    status: HealthStatus::Down,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_default_config() {
        let config = HealthCheckConfig::default();
        assert!(config.enabled);
        assert_eq!(config.path, "/health");
    }

    #[test]
    fn test_health_check_goes_down() {
        let health_check = HealthCheck::new(HealthCheckConfig::default());
        let observer = health_check.clone();

        let (health, status_code) = observer.get_health_state();
        assert_eq!(health.status, HealthStatus::Up);
        assert_eq!(status_code, StatusCode::OK);

        health_check.mark_down();

        let (health, status_code) = observer.get_health_state();
        assert_eq!(health.status, HealthStatus::Down);
        assert_eq!(status_code, StatusCode::SERVICE_UNAVAILABLE);
    }
}
