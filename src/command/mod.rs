use crate::{context::CommandContext, registry::Meta};
use anyhow::Result;

mod owner;
mod utility;

#[serenity::async_trait]
pub trait Command: Sync + Send {
    /// Name, aliases, requirement and the rest of the command's contract.
    fn meta(&self) -> Meta;
    /// Run the command. An `Err` is reported to the invoking user.
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<()>;
}

/// Every built-in command with its category, in registration order.
///
/// Earlier entries win alias collisions.
pub fn manifest() -> Vec<(&'static str, Box<dyn Command>)> {
    vec![
        entry("utility", utility::help::Help),
        entry("utility", utility::ping::Ping),
        entry("utility", utility::stats::Stats),
        entry("owner", owner::maintenance::Maintenance),
    ]
}

fn entry(
    category: &'static str,
    command: impl Command + 'static,
) -> (&'static str, Box<dyn Command>) {
    (category, Box::new(command))
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        bot::BotCore,
        config::Config,
        dispatch::{Author, Inbound, Io, Payload},
        permission::tests::Members,
        reply::tests::Recorder,
    };
    use serenity::all::{ChannelId, GuildId, UserId};
    use tokio::time::Instant;

    /// Core with the built-in manifest and user 1 as owner.
    pub(crate) fn core() -> BotCore {
        let mut cfg = Config::default();
        cfg.general.owners = vec![UserId::new(1)];
        BotCore::new(cfg, super::manifest(), Vec::new())
    }

    pub(crate) fn io<'a>(responder: &'a Recorder, members: &'a Members) -> Io<'a> {
        Io {
            responder,
            members,
            discord: None,
        }
    }

    pub(crate) fn text(user: u64, content: &str) -> Inbound {
        Inbound {
            author: Author {
                id: UserId::new(user),
                name: format!("user{user}"),
                bot: false,
            },
            guild_id: Some(GuildId::new(10)),
            channel_id: ChannelId::new(20),
            received: Instant::now(),
            payload: Payload::Text(content.to_owned()),
        }
    }

    /// Dispatch `inbound` against a fresh core and return what was sent back.
    pub(crate) async fn run(inbound: &Inbound) -> Vec<String> {
        let core = core();
        let members = Members::default();
        let responder = Recorder::default();
        core.dispatch(inbound, &io(&responder, &members)).await;
        responder.sent()
    }

    #[test]
    fn manifest_loads_cleanly() {
        let core = core();
        assert_eq!(core.registry.len(), super::manifest().len());
        assert!(core.load_report.rejected.is_empty());
        assert!(core.load_report.dropped_aliases.is_empty());
    }
}
