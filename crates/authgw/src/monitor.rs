//! Health monitoring engine
//!
//! Every interval the monitor probes all configured servers concurrently with
//! the monitoring account and publishes the sorted result as a new snapshot.
//! A probe that errors or is denied marks its server unavailable for the
//! cycle. The loop runs until its cancellation token fires; cancelling drops
//! the in-flight cycle and aborts its probes.

use crate::config::{AuthCheckConfig, ServerList};
use crate::provider::AuthProvider;
use crate::registry::{AvailabilityRegistry, AvailabilitySnapshot, ServiceStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Time a probe may run past its server's response timeout before it is abandoned
pub const PROBE_GRACE: Duration = Duration::from_secs(1);

pub struct HealthMonitor {
    provider: Arc<dyn AuthProvider>,
    registry: Arc<AvailabilityRegistry>,
    servers: ServerList,
    user: String,
    pass: String,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        registry: Arc<AvailabilityRegistry>,
        servers: ServerList,
        check: &AuthCheckConfig,
    ) -> Self {
        HealthMonitor {
            provider,
            registry,
            servers,
            user: check.user.clone(),
            pass: check.pass.clone(),
            interval: check.interval(),
        }
    }

    /// Probe every server once and publish the result
    pub async fn run_cycle(&self) -> Arc<AvailabilitySnapshot> {
        debug!(servers = self.servers.len(), "Start monitoring authentication check");

        let mut probes = JoinSet::new();
        for server in self.servers.iter() {
            let provider = Arc::clone(&self.provider);
            let user = self.user.clone();
            let pass = self.pass.clone();
            let ordinal = server.ordinal;
            let name = server.name.clone();
            let deadline = server.response_timeout.saturating_add(PROBE_GRACE);

            probes.spawn(async move {
                let result = timeout(
                    deadline,
                    provider.authenticate_for_healthcheck(&user, &pass, ordinal),
                )
                .await;

                let up = match result {
                    Ok(Ok(true)) => true,
                    Ok(Ok(false)) => {
                        warn!(
                            server = %name,
                            ordinal,
                            "Unable to authenticate monitoring user, server is unavailable"
                        );
                        false
                    }
                    Ok(Err(e)) => {
                        warn!(server = %name, ordinal, error = %e, "Server is unavailable");
                        false
                    }
                    Err(_) => {
                        warn!(server = %name, ordinal, "Health check probe timed out");
                        false
                    }
                };
                debug!(server = %name, ordinal, up, "Probe finished");
                (ordinal, up)
            });
        }

        let mut available = Vec::with_capacity(self.servers.len());
        let mut unavailable = Vec::new();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((ordinal, true)) => available.push(ordinal),
                Ok((ordinal, false)) => unavailable.push(ordinal),
                Err(e) => error!(error = %e, "Health check probe task failed"),
            }
        }

        let previous = self
            .registry
            .publish(AvailabilitySnapshot::new(available, unavailable));
        let current = self.registry.snapshot();

        debug!(
            generation = current.generation(),
            available = ?current.available(),
            unavailable = ?current.unavailable(),
            "Published availability snapshot"
        );
        log_transition(&previous, &current, self.registry.total());

        current
    }

    /// Run cycles separated by the configured interval until `token` is cancelled
    pub async fn run(&self, token: CancellationToken) {
        info!(
            servers = self.servers.len(),
            interval_secs = self.interval.as_secs(),
            "Health monitor started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.run_cycle() => {}
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        info!("Health monitor stopped");
    }

    /// Run the monitor as a background task
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }
}

/// Mark every configured server available, for deployments without health checks
pub fn seed_all_available(registry: &AvailabilityRegistry) {
    registry.publish(AvailabilitySnapshot::all_available(registry.total()));
    info!(
        servers = registry.total(),
        "Health checks disabled, all servers marked available"
    );
}

fn log_transition(previous: &AvailabilitySnapshot, current: &AvailabilitySnapshot, total: usize) {
    let before = previous.status(total);
    let after = current.status(total);
    if previous.generation() > 0 && before.status_id == after.status_id {
        return;
    }

    match after.status_id {
        ServiceStatus::Ok => {
            info!(status = %after.status_id, "All authentication servers available")
        }
        _ => warn!(status = %after.status_id, "{}", after.msg),
    }
}
