use crate::{
    bot::BotCore, config::Config, dispatch::Inbound, registry::Descriptor, reply::Responder,
};
use anyhow::Result;

/// Everything a command can see while it runs.
pub struct CommandContext<'a> {
    pub core: &'a BotCore,
    pub cfg: &'a Config,
    pub inbound: &'a Inbound,
    /// The resolved command, not the alias the user typed.
    pub command: &'a Descriptor,
    pub args: &'a [String],
    pub responder: &'a dyn Responder,
    /// Gateway context. `None` when running outside a live connection, e.g. in tests.
    pub discord: Option<&'a serenity::all::Context>,
}

impl CommandContext<'_> {
    pub async fn reply(&self, text: &str) -> Result<()> {
        self.responder.send(text).await
    }
}

/// Collection of data that is shared with event listeners
pub struct EventContext<'a> {
    pub core: &'a BotCore,
    pub discord: Option<&'a serenity::all::Context>,
}
