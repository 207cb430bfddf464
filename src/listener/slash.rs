use crate::{
    context::EventContext,
    event::{Event, EventKind, Listener},
    log_internal,
    registry::Descriptor,
};
use anyhow::Result;
use serenity::all::{CommandOptionType, CreateCommand, CreateCommandOption};

/// Discord rejects slash command descriptions outside 1..=100 characters.
const DESCRIPTION_LIMIT: usize = 100;

/// Publishes every slash-enabled command when the first shard is ready.
pub struct RegisterSlash;

#[serenity::async_trait]
impl Listener for RegisterSlash {
    fn name(&self) -> &'static str {
        "register_slash"
    }

    fn trigger(&self) -> EventKind {
        EventKind::Ready
    }

    fn once(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &EventContext<'_>, _event: &Event<'_>) -> Result<()> {
        let Some(discord) = ctx.discord else {
            return Ok(());
        };

        let commands = ctx
            .core
            .registry
            .iter()
            .filter(|d| d.slash)
            .map(create)
            .collect::<Vec<_>>();
        let count = commands.len();
        serenity::all::Command::set_global_commands(discord, commands).await?;
        log_internal!("Registered {} slash commands", count);
        Ok(())
    }
}

fn description(descriptor: &Descriptor) -> String {
    match descriptor.description.trim() {
        "" => descriptor.name.clone(),
        text => text.chars().take(DESCRIPTION_LIMIT).collect(),
    }
}

fn create(descriptor: &Descriptor) -> CreateCommand {
    let mut command = CreateCommand::new(&descriptor.name).description(description(descriptor));
    if let Some(usage) = &descriptor.usage {
        let usage: String = usage.chars().take(DESCRIPTION_LIMIT).collect();
        command = command.add_option(
            CreateCommandOption::new(CommandOptionType::String, "args", usage).required(false),
        );
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bot::BotCore, config::Config};

    #[test]
    fn descriptions_are_bounded_and_never_empty() {
        let core = BotCore::new(Config::default(), crate::command::manifest(), Vec::new());

        let help = core.registry.get("help").unwrap();
        assert_eq!(
            description(help),
            "List commands, or show details for one"
        );
        for descriptor in core.registry.iter() {
            let text = description(descriptor);
            assert!(!text.is_empty());
            assert!(text.chars().count() <= DESCRIPTION_LIMIT);
        }
    }
}
