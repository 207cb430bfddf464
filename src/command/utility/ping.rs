use crate::{command::Command, context::CommandContext, registry::Meta};
use anyhow::Result;

pub struct Ping;

#[serenity::async_trait]
impl Command for Ping {
    fn meta(&self) -> Meta {
        Meta::new("ping")
            .aliases(&["p", "test"])
            .describe("Check that the bot is responsive")
            .slash()
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<()> {
        let elapsed = ctx.inbound.received.elapsed();
        ctx.reply(&format!("🏓 Pong! Handled in {} ms.", elapsed.as_millis()))
            .await
    }
}
