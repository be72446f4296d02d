//! Health checks for the running relay.

use crate::relay::StatsSnapshot;
use crate::VoxelServer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use sysinfo::{Pid, System};
use tokio::sync::RwLock;

/// Fraction of `max_connections` above which the relay reports degraded.
const CAPACITY_WARNING_RATIO: f64 = 0.9;

/// Health check manager for monitoring server status
#[derive(Debug)]
pub struct HealthManager {
    server_start_time: Instant,
    last_health_check: Arc<RwLock<Option<HealthCheckResult>>>,
}

/// Health check result containing system status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub timestamp: u64,
    pub uptime_seconds: u64,
    pub memory_usage_mb: u64,
    pub live_sessions: usize,
    pub max_connections: usize,
    pub filled_voxels: usize,
    pub relay: StatsSnapshot,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Overall health status of the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthManager {
    /// Creates a new health manager
    pub fn new() -> Self {
        Self {
            server_start_time: Instant::now(),
            last_health_check: Arc::new(RwLock::new(None)),
        }
    }

    /// Performs a health check of the relay and the process
    pub async fn perform_health_check(&self, server: &VoxelServer) -> HealthCheckResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let uptime_seconds = self.server_start_time.elapsed().as_secs();
        let memory_usage_mb = memory_usage_mb();

        let (live_sessions, max_connections, filled_voxels) = {
            let relay = server.relay();
            let relay = relay.lock().await;
            (
                relay.registry().len(),
                relay.max_connections(),
                relay.world().count_filled(),
            )
        };
        let relay = server.stats().snapshot();

        if live_sessions >= max_connections {
            warnings.push(format!("At capacity: {}/{} sessions", live_sessions, max_connections));
        } else if live_sessions as f64 >= max_connections as f64 * CAPACITY_WARNING_RATIO {
            warnings.push(format!("Near capacity: {}/{} sessions", live_sessions, max_connections));
        }

        if memory_usage_mb > 1024 {
            warnings.push(format!("High memory usage: {}MB", memory_usage_mb));
        }

        if memory_usage_mb > 2048 {
            errors.push(format!("Critical memory usage: {}MB", memory_usage_mb));
        }

        let status = if !errors.is_empty() {
            HealthStatus::Unhealthy
        } else if !warnings.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let result = HealthCheckResult {
            status,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            uptime_seconds,
            memory_usage_mb,
            live_sessions,
            max_connections,
            filled_voxels,
            relay,
            errors,
            warnings,
        };

        // Cache the result
        *self.last_health_check.write().await = Some(result.clone());

        result
    }

    /// Gets the last cached health check result
    pub async fn get_last_health_check(&self) -> Option<HealthCheckResult> {
        self.last_health_check.read().await.clone()
    }

    /// Performs a quick liveness check (minimal overhead)
    pub async fn liveness_check(&self) -> bool {
        true
    }

    /// True while the relay can take another session.
    pub async fn readiness_check(&self, server: &VoxelServer) -> bool {
        let relay = server.relay();
        let relay = relay.lock().await;
        relay.registry().len() < relay.max_connections()
    }

    /// Gets health metrics in Prometheus format
    pub async fn get_prometheus_metrics(&self, server: &VoxelServer) -> String {
        let health_check = self.perform_health_check(server).await;

        let status_value = match health_check.status {
            HealthStatus::Healthy => 1.0,
            HealthStatus::Degraded => 0.5,
            HealthStatus::Unhealthy => 0.0,
        };

        let stats = &health_check.relay;
        format!(
            "# HELP voxel_relay_health Overall relay health status\n\
             # TYPE voxel_relay_health gauge\n\
             voxel_relay_health {}\n\
             # HELP voxel_relay_uptime_seconds Relay uptime in seconds\n\
             # TYPE voxel_relay_uptime_seconds counter\n\
             voxel_relay_uptime_seconds {}\n\
             # HELP voxel_relay_memory_usage_mb Memory usage in megabytes\n\
             # TYPE voxel_relay_memory_usage_mb gauge\n\
             voxel_relay_memory_usage_mb {}\n\
             # HELP voxel_relay_live_sessions Connected sessions\n\
             # TYPE voxel_relay_live_sessions gauge\n\
             voxel_relay_live_sessions {}\n\
             # HELP voxel_relay_filled_voxels Non-empty voxels in the world\n\
             # TYPE voxel_relay_filled_voxels gauge\n\
             voxel_relay_filled_voxels {}\n\
             # HELP voxel_relay_messages_applied_total Client messages that changed state\n\
             # TYPE voxel_relay_messages_applied_total counter\n\
             voxel_relay_messages_applied_total {}\n\
             # HELP voxel_relay_messages_ignored_total Well-formed client messages with no effect\n\
             # TYPE voxel_relay_messages_ignored_total counter\n\
             voxel_relay_messages_ignored_total {}\n\
             # HELP voxel_relay_messages_rejected_total Malformed or oversized client frames\n\
             # TYPE voxel_relay_messages_rejected_total counter\n\
             voxel_relay_messages_rejected_total {}\n\
             # HELP voxel_relay_events_broadcast_total Events handed to session queues\n\
             # TYPE voxel_relay_events_broadcast_total counter\n\
             voxel_relay_events_broadcast_total {}\n",
            status_value,
            health_check.uptime_seconds,
            health_check.memory_usage_mb,
            health_check.live_sessions,
            health_check.filled_voxels,
            stats.messages_applied,
            stats.messages_ignored,
            stats.messages_rejected,
            stats.events_broadcast,
        )
    }
}

impl Default for HealthManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Resident memory of this process in MB.
fn memory_usage_mb() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Some(mb) = linux_memory_usage_mb() {
            return mb;
        }
    }

    let mut sys = System::new_all();
    sys.refresh_all();
    match sys.process(Pid::from(std::process::id() as usize)) {
        Some(process) => process.memory() / 1024 / 1024,
        None => 0,
    }
}

#[cfg(target_os = "linux")]
fn linux_memory_usage_mb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_server_with_config, ServerConfig};

    #[tokio::test]
    async fn test_health_check_idle_relay() {
        let health_manager = HealthManager::new();
        let server = create_server_with_config(ServerConfig::default());

        let result = health_manager.perform_health_check(&server).await;

        assert!(result.uptime_seconds < 60);
        assert_eq!(result.live_sessions, 0);
        assert_eq!(result.max_connections, 256);
        assert_eq!(result.filled_voxels, 20 * 20 * 5);
        assert!(result.warnings.iter().all(|w| !w.contains("capacity")));
        assert!(health_manager.get_last_health_check().await.is_some());
    }

    #[tokio::test]
    async fn test_health_check_at_capacity() {
        let health_manager = HealthManager::new();
        let server = create_server_with_config(ServerConfig {
            max_connections: 1,
            ..ServerConfig::default()
        });

        let (tx, _rx) = crate::connection::outbound_channel();
        server.relay().lock().await.connect(tx).unwrap();

        let result = health_manager.perform_health_check(&server).await;
        assert_ne!(result.status, HealthStatus::Healthy);
        assert!(result.warnings.iter().any(|w| w.starts_with("At capacity")));
        assert!(!health_manager.readiness_check(&server).await);
    }

    #[tokio::test]
    async fn test_liveness_and_readiness() {
        let health_manager = HealthManager::new();
        let server = create_server_with_config(ServerConfig::default());
        assert!(health_manager.liveness_check().await);
        assert!(health_manager.readiness_check(&server).await);
    }

    #[tokio::test]
    async fn test_prometheus_metrics() {
        let health_manager = HealthManager::new();
        let server = create_server_with_config(ServerConfig::default());
        let metrics = health_manager.get_prometheus_metrics(&server).await;

        assert!(metrics.contains("# TYPE voxel_relay_live_sessions gauge"));
        assert!(metrics.contains("voxel_relay_live_sessions 0\n"));
        assert!(metrics.contains("voxel_relay_filled_voxels 2000\n"));
    }
}
