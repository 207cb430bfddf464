use crate::{
    context::EventContext,
    event::{Event, EventKind, Listener},
    log_event, reply,
};
use anyhow::Result;
use serenity::all::ActivityData;

/// Logs the connection and sets the presence, once per shard.
pub struct Ready;

#[serenity::async_trait]
impl Listener for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    fn trigger(&self) -> EventKind {
        EventKind::Ready
    }

    async fn execute(&self, ctx: &EventContext<'_>, event: &Event<'_>) -> Result<()> {
        let Event::Ready(info) = event else {
            return Ok(());
        };

        match info.shard {
            Some((id, total)) => log_event!(
                "Connected as {} on shard {}/{} ({} guilds)",
                info.user,
                id + 1,
                total,
                info.guilds
            ),
            None => log_event!("Connected as {} ({} guilds)", info.user, info.guilds),
        }

        if let Some(discord) = ctx.discord {
            discord.set_activity(Some(ActivityData::playing(activity(ctx))));
        }
        Ok(())
    }
}

fn activity(ctx: &EventContext<'_>) -> String {
    let cfg = &ctx.core.cfg;
    let vars = [
        ("prefix", cfg.general.command_prefix.clone()),
        ("version", env!("CARGO_PKG_VERSION").to_owned()),
    ];
    reply::render(&cfg.status.activity, &vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bot::BotCore, config::Config};

    #[test]
    fn activity_fills_prefix_and_version() {
        let core = BotCore::new(Config::default(), Vec::new(), Vec::new());
        let ctx = EventContext {
            core: &core,
            discord: None,
        };
        assert_eq!(
            activity(&ctx),
            format!(".help | v{}", env!("CARGO_PKG_VERSION"))
        );
    }
}
