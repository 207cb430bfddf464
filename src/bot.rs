//! Shared bot state and its lifecycle.

use crate::{
    command::Command,
    config::Config,
    event::{EventBus, Listener},
    log_internal,
    permission::PermissionGate,
    rate_limit::RateLimiter,
    registry::{LoadReport, Registry},
    stats::Stats,
};
use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::Notify;

pub struct BotCore {
    pub cfg: Config,
    pub registry: Registry,
    pub load_report: LoadReport,
    pub limiter: RateLimiter,
    pub gate: PermissionGate,
    pub stats: Stats,
    pub events: EventBus,
    maintenance: AtomicBool,
    accepting: AtomicBool,
    in_flight: AtomicUsize,
    drained: Notify,
}

/// Marks one dispatch as in flight until dropped.
pub struct InFlight<'a> {
    core: &'a BotCore,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.core.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.core.drained.notify_waiters();
        }
    }
}

impl BotCore {
    pub fn new(
        cfg: Config,
        manifest: Vec<(&'static str, Box<dyn Command>)>,
        listeners: Vec<Box<dyn Listener>>,
    ) -> Self {
        let mut registry = Registry::new();
        let load_report = registry.load(manifest, &cfg.commands);
        log_internal!(
            "Loaded {} commands in {} categories",
            load_report.loaded,
            registry.categories().len()
        );

        let events = EventBus::new(listeners);
        if events.is_empty() {
            log::debug!("No event listeners loaded");
        }

        Self {
            registry,
            load_report,
            limiter: RateLimiter::new((&cfg.rate_limit).into()),
            gate: PermissionGate::new(&cfg),
            stats: Stats::new(),
            events,
            maintenance: AtomicBool::new(cfg.general.maintenance),
            accepting: AtomicBool::new(true),
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
            cfg,
        }
    }

    pub fn maintenance(&self) -> bool {
        self.maintenance.load(Ordering::Acquire)
    }

    pub fn set_maintenance(&self, enabled: bool) {
        self.maintenance.store(enabled, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Register a new dispatch, unless shutdown has begun.
    pub fn enter(&self) -> Option<InFlight<'_>> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight { core: self };
        // Checked after counting, so `drain` either sees this dispatch or it sees the flag.
        match self.is_accepting() {
            true => Some(guard),
            false => None,
        }
    }

    /// Stop accepting new dispatches. In-flight ones keep running.
    pub fn begin_shutdown(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    /// Wait up to `grace` for in-flight dispatches to finish. Returns whether all did.
    pub async fn drain(&self, grace: Duration) -> bool {
        let wait = async {
            loop {
                let drained = self.drained.notified();
                tokio::pin!(drained);
                drained.as_mut().enable();
                if self.in_flight() == 0 {
                    return;
                }
                drained.await;
            }
        };
        tokio::time::timeout(grace, wait).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn core() -> Arc<BotCore> {
        Arc::new(BotCore::new(Config::default(), Vec::new(), Vec::new()))
    }

    #[test]
    fn maintenance_starts_from_configuration() {
        let mut cfg = Config::default();
        cfg.general.maintenance = true;
        let core = BotCore::new(cfg, Vec::new(), Vec::new());
        assert!(core.maintenance());
        core.set_maintenance(false);
        assert!(!core.maintenance());
    }

    #[test]
    fn guards_track_in_flight_dispatches() {
        let core = core();
        let first = core.enter().unwrap();
        let second = core.enter().unwrap();
        assert_eq!(core.in_flight(), 2);
        drop(first);
        drop(second);
        assert_eq!(core.in_flight(), 0);

        core.begin_shutdown();
        assert!(core.enter().is_none());
        assert_eq!(core.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_returns_immediately_when_idle() {
        let core = core();
        core.begin_shutdown();
        assert!(core.drain(Duration::from_millis(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_in_flight_work() {
        let core = core();
        let worker = {
            let core = core.clone();
            let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();
            let handle = tokio::spawn(async move {
                let _guard = core.enter().unwrap();
                entered_tx.send(()).unwrap();
                tokio::time::sleep(Duration::from_secs(2)).await;
            });
            entered_rx.await.unwrap();
            handle
        };

        core.begin_shutdown();
        assert!(core.drain(Duration::from_secs(5)).await);
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn drain_gives_up_after_grace() {
        let core = core();
        let _stuck = core.enter().unwrap();
        core.begin_shutdown();
        assert!(!core.drain(Duration::from_secs(1)).await);
        assert_eq!(core.in_flight(), 1);
    }
}
