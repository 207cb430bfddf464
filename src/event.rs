//! Serenity hands us events through callbacks. The handler translates the ones we care about into
//! a distinct Event enum so listeners can subscribe to them by kind.

use crate::{context::EventContext, dispatch::Inbound, log_internal};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};

/// Connection details reported when a shard becomes ready.
#[derive(Clone, Debug)]
pub struct ReadyInfo {
    pub user: String,
    pub guilds: usize,
    /// `(id, total)` when sharded.
    pub shard: Option<(u32, u32)>,
}

/// A gateway event
pub enum Event<'a> {
    Ready(&'a ReadyInfo),
    Message(&'a Inbound),
    Interaction(&'a Inbound),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Ready,
    Message,
    Interaction,
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ready(_) => EventKind::Ready,
            Event::Message(_) => EventKind::Message,
            Event::Interaction(_) => EventKind::Interaction,
        }
    }
}

#[serenity::async_trait]
pub trait Listener: Sync + Send {
    /// Listener name.  Used for logs
    fn name(&self) -> &'static str;
    fn trigger(&self) -> EventKind;
    /// Run on the first matching event only.
    fn once(&self) -> bool {
        false
    }
    async fn execute(&self, ctx: &EventContext<'_>, event: &Event<'_>) -> Result<()>;
}

struct Subscription {
    listener: Box<dyn Listener>,
    fired: AtomicBool,
}

pub struct EventBus {
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    pub fn new(listeners: Vec<Box<dyn Listener>>) -> Self {
        let subscriptions = listeners
            .into_iter()
            .filter(|listener| {
                let valid = !listener.name().trim().is_empty();
                if !valid {
                    log::warn!("Skipping unnamed {:?} listener", listener.trigger());
                }
                valid
            })
            .map(|listener| Subscription {
                listener,
                fired: AtomicBool::new(false),
            })
            .collect::<Vec<_>>();
        log_internal!("Loaded {} event listeners", subscriptions.len());
        Self { subscriptions }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Run every listener subscribed to this kind of event, in registration order.
    ///
    /// Listener errors are logged and do not stop the remaining listeners. Returns how many
    /// listeners ran.
    pub async fn emit(&self, ctx: &EventContext<'_>, event: &Event<'_>) -> usize {
        let mut ran = 0;
        for subscription in &self.subscriptions {
            let listener = &subscription.listener;
            if listener.trigger() != event.kind() {
                continue;
            }
            // Claimed before running, so concurrent shards cannot both fire it.
            if listener.once() && subscription.fired.swap(true, Ordering::AcqRel) {
                continue;
            }

            ran += 1;
            if let Err(e) = listener.execute(ctx, event).await {
                log::error!("Error in listener {}: {:#}", listener.name(), e);
            }
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bot::BotCore, config::Config};
    use anyhow::bail;
    use std::sync::{atomic::AtomicUsize, Arc};

    struct Counting {
        name: &'static str,
        trigger: EventKind,
        once: bool,
        fail: bool,
        runs: Arc<AtomicUsize>,
    }

    #[serenity::async_trait]
    impl Listener for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn trigger(&self) -> EventKind {
            self.trigger
        }

        fn once(&self) -> bool {
            self.once
        }

        async fn execute(&self, _ctx: &EventContext<'_>, _event: &Event<'_>) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("listener broke");
            }
            Ok(())
        }
    }

    fn counting(
        name: &'static str,
        trigger: EventKind,
        once: bool,
        fail: bool,
    ) -> (Box<dyn Listener>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let listener: Box<dyn Listener> = Box::new(Counting {
            name,
            trigger,
            once,
            fail,
            runs: runs.clone(),
        });
        (listener, runs)
    }

    fn ready() -> ReadyInfo {
        ReadyInfo {
            user: "mayonk".to_owned(),
            guilds: 3,
            shard: None,
        }
    }

    #[tokio::test]
    async fn once_listeners_fire_a_single_time() {
        let (once, once_runs) = counting("once", EventKind::Ready, true, false);
        let (every, every_runs) = counting("every", EventKind::Ready, false, false);
        let core = BotCore::new(Config::default(), Vec::new(), Vec::new());
        let bus = EventBus::new(vec![once, every]);
        let ctx = EventContext {
            core: &core,
            discord: None,
        };

        let info = ready();
        assert_eq!(bus.emit(&ctx, &Event::Ready(&info)).await, 2);
        assert_eq!(bus.emit(&ctx, &Event::Ready(&info)).await, 1);
        assert_eq!(once_runs.load(Ordering::SeqCst), 1);
        assert_eq!(every_runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_do_not_stop_other_listeners() {
        let (broken, broken_runs) = counting("broken", EventKind::Ready, false, true);
        let (fine, fine_runs) = counting("fine", EventKind::Ready, false, false);
        let (other, other_runs) = counting("other", EventKind::Message, false, false);
        let core = BotCore::new(Config::default(), Vec::new(), Vec::new());
        let bus = EventBus::new(vec![broken, fine, other]);
        let ctx = EventContext {
            core: &core,
            discord: None,
        };

        let info = ready();
        assert_eq!(bus.emit(&ctx, &Event::Ready(&info)).await, 2);
        assert_eq!(broken_runs.load(Ordering::SeqCst), 1);
        assert_eq!(fine_runs.load(Ordering::SeqCst), 1);
        assert_eq!(other_runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unnamed_listeners_are_skipped() {
        let (unnamed, _) = counting(" ", EventKind::Message, false, false);
        let (named, _) = counting("trace", EventKind::Message, false, false);
        assert_eq!(EventBus::new(vec![unnamed, named]).len(), 1);
    }
}
