//! Health verification: bounded container polling plus a single application
//! probe.
//!
//! The poll is a three-state machine: `Pending` transitions to `Healthy` on
//! a clean "healthy" answer, to `TimedOut` at the retry ceiling, and stays
//! `Pending` on a transient miss. Constant interval, no jitter. Sleep and
//! remote calls are injectable so tests run without real delay or a host.

use std::time::Duration;

use anyhow::Result;

use crate::output::{OutputContext, progress};
use crate::ssh::Ssh;

/// Maximum container-health poll attempts.
pub const MAX_RETRIES: u32 = 10;

/// Pause between poll attempts.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Container health polling states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Pending,
    Healthy,
    TimedOut,
}

/// Poll bookkeeping. Terminal states are `Healthy` and `TimedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckState {
    pub retries: u32,
    pub status: HealthStatus,
}

/// Injectable pause between poll attempts.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded constant-interval health verification.
pub struct HealthVerifier {
    max_retries: u32,
    interval: Duration,
}

impl Default for HealthVerifier {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            interval: RETRY_INTERVAL,
        }
    }
}

impl HealthVerifier {
    #[must_use]
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// Locate a running container built from `image`.
    ///
    /// Any failure to look one up (docker error, transport error, empty
    /// listing) reads as "none found" — the caller downgrades that to a
    /// warning, because an image without a HEALTHCHECK directive is
    /// indistinguishable from a broken one at this layer.
    pub async fn find_container(&self, ssh: &impl Ssh, image: &str) -> Option<String> {
        let output = ssh
            .exec(&format!("docker ps -q --filter ancestor={image}"))
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
    }

    /// One inspect call. Anything but a clean "healthy" answer is a
    /// transient miss.
    async fn inspect_healthy(&self, ssh: &impl Ssh, container: &str) -> bool {
        let Ok(output) = ssh
            .exec(&format!(
                "docker inspect --format '{{{{.State.Health.Status}}}}' {container}"
            ))
            .await
        else {
            return false;
        };
        if !output.status.success() {
            return false;
        }
        String::from_utf8_lossy(&output.stdout).trim() == "healthy"
    }

    /// Drive the polling state machine to a terminal state.
    ///
    /// Performs exactly `min(attempts_to_healthy, max_retries)` inspect
    /// calls, sleeping the configured interval between attempts.
    pub async fn poll_container(
        &self,
        ssh: &impl Ssh,
        sleeper: &impl Sleeper,
        container: &str,
    ) -> HealthCheckState {
        let mut state = HealthCheckState {
            retries: 0,
            status: HealthStatus::Pending,
        };
        while state.status == HealthStatus::Pending {
            state.retries += 1;
            if self.inspect_healthy(ssh, container).await {
                state.status = HealthStatus::Healthy;
            } else if state.retries >= self.max_retries {
                state.status = HealthStatus::TimedOut;
            } else {
                sleeper.sleep(self.interval).await;
            }
        }
        state
    }

    /// Single-shot reachability probe issued on the host itself.
    ///
    /// # Errors
    ///
    /// Fatal on any non-2xx answer or connection failure; there is no retry.
    pub async fn probe_application(&self, ssh: &impl Ssh, port: u32) -> Result<()> {
        let output = ssh.exec(&format!("curl -sf http://localhost:{port}")).await?;
        if !output.status.success() {
            anyhow::bail!(
                "application on port {port} is not answering (curl exit {})",
                output.status.code().unwrap_or(-1)
            );
        }
        Ok(())
    }

    /// Run both checks: container polling, then the application probe.
    ///
    /// # Errors
    ///
    /// Returns an error when polling times out or the probe fails. A missing
    /// container downgrades polling to a warning and the run continues.
    pub async fn verify(
        &self,
        ssh: &impl Ssh,
        sleeper: &impl Sleeper,
        image: &str,
        port: u32,
        out: &OutputContext,
    ) -> Result<()> {
        match self.find_container(ssh, image).await {
            None => {
                out.warn(&format!(
                    "no running container matches image '{image}'; skipping container health check"
                ));
            }
            Some(container) => {
                let pb = out
                    .show_progress()
                    .then(|| progress::spinner("waiting for container health..."));
                let state = self.poll_container(ssh, sleeper, &container).await;
                match state.status {
                    HealthStatus::Healthy => {
                        if let Some(pb) = pb {
                            progress::finish_ok(&pb, "container reports healthy");
                        } else {
                            out.success("container reports healthy");
                        }
                    }
                    HealthStatus::TimedOut | HealthStatus::Pending => {
                        if let Some(pb) = &pb {
                            pb.finish_and_clear();
                        }
                        anyhow::bail!(
                            "container {container} did not report healthy after {} checks ({}s)",
                            state.retries,
                            u64::from(state.retries) * self.interval.as_secs()
                        );
                    }
                }
            }
        }

        self.probe_application(ssh, port).await
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
