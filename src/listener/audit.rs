use crate::{
    context::EventContext,
    dispatch::{Inbound, Payload},
    event::{Event, EventKind, Listener},
    log_event,
    logging::PrintColor,
};
use anyhow::Result;

/// Logs every slash command invocation with its arguments.
pub struct Audit;

#[serenity::async_trait]
impl Listener for Audit {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn trigger(&self) -> EventKind {
        EventKind::Interaction
    }

    async fn execute(&self, _ctx: &EventContext<'_>, event: &Event<'_>) -> Result<()> {
        if let Event::Interaction(inbound) = event {
            if let Some(invocation) = invocation(inbound) {
                log_event!("{} used {}", inbound.color(), invocation);
            }
        }
        Ok(())
    }
}

fn invocation(inbound: &Inbound) -> Option<String> {
    let Payload::Interaction { name, args } = &inbound.payload else {
        return None;
    };
    Some(match args.is_empty() {
        true => format!("/{}", name),
        false => format!("/{} {}", name, args.join(" ")),
    })
}
