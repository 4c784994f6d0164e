// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local sliding-window admission guard.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use luc_config::model::GuardConfig;
use luc_core::{AdapterType, AdmissionGuard, CallerId, HealthStatus, LucError, PluginAdapter};
use tracing::warn;

/// Per-caller log of request instants within the trailing window.
///
/// Limits are per process: two instances each admit `max_requests`.
pub struct SlidingWindowGuard {
    max_requests: u32,
    window: Duration,
    callers: DashMap<CallerId, VecDeque<Instant>>,
}

impl SlidingWindowGuard {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            callers: DashMap::new(),
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Count a request at `now`. Rejected requests are not logged.
    pub fn allow_at(&self, caller: &CallerId, now: Instant) -> bool {
        let mut log = self.callers.entry(caller.clone()).or_default();
        while let Some(oldest) = log.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }
        if log.len() < self.max_requests as usize {
            log.push_back(now);
            true
        } else {
            false
        }
    }

    /// Requests currently counted against `caller`.
    pub fn in_window(&self, caller: &CallerId) -> usize {
        self.callers.get(caller).map_or(0, |log| log.len())
    }
}

#[async_trait]
impl PluginAdapter for SlidingWindowGuard {
    fn name(&self) -> &str {
        "memory-window"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::AdmissionGuard
    }

    async fn health_check(&self) -> Result<HealthStatus, LucError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LucError> {
        self.callers.clear();
        Ok(())
    }
}

#[async_trait]
impl AdmissionGuard for SlidingWindowGuard {
    async fn allow(&self, caller: &CallerId) -> Result<bool, LucError> {
        let allowed = self.allow_at(caller, Instant::now());
        if !allowed {
            warn!(caller_id = %caller, max_requests = self.max_requests, "admission denied");
        }
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: &str) -> CallerId {
        CallerId::parse(id).unwrap()
    }

    #[test]
    fn rejects_past_limit_and_recovers_after_window() {
        let guard = SlidingWindowGuard::new(2, Duration::from_secs(60));
        let a = caller("a");
        let t0 = Instant::now();
        assert!(guard.allow_at(&a, t0));
        assert!(guard.allow_at(&a, t0 + Duration::from_secs(1)));
        assert!(!guard.allow_at(&a, t0 + Duration::from_secs(2)));
        assert_eq!(guard.in_window(&a), 2);

        // First request leaves the window; one slot frees up.
        assert!(guard.allow_at(&a, t0 + Duration::from_secs(60)));
        assert!(!guard.allow_at(&a, t0 + Duration::from_secs(60)));
    }

    #[test]
    fn callers_are_independent() {
        let guard = SlidingWindowGuard::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(guard.allow_at(&caller("a"), now));
        assert!(!guard.allow_at(&caller("a"), now));
        assert!(guard.allow_at(&caller("b"), now));
    }

    #[tokio::test]
    async fn trait_object_denies_after_limit() {
        let guard: Box<dyn AdmissionGuard> =
            Box::new(SlidingWindowGuard::from_config(&GuardConfig {
                max_requests: 1,
                ..GuardConfig::default()
            }));
        let c = caller("svc");
        assert!(guard.allow(&c).await.unwrap());
        assert!(!guard.allow(&c).await.unwrap());
        assert_eq!(guard.adapter_type(), AdapterType::AdmissionGuard);
    }
}
