use crate::{
    context::EventContext,
    event::{Event, EventKind, Listener},
    logging::PrintColor,
};
use anyhow::Result;

/// Logs every message at debug level.
pub struct Trace;

#[serenity::async_trait]
impl Listener for Trace {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn trigger(&self) -> EventKind {
        EventKind::Message
    }

    async fn execute(&self, _ctx: &EventContext<'_>, event: &Event<'_>) -> Result<()> {
        if let Event::Message(inbound) = event {
            log::debug!("{} {:?}", inbound.color(), inbound.payload);
        }
        Ok(())
    }
}
