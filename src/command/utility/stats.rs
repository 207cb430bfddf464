use crate::{command::Command, context::CommandContext, registry::Meta};
use anyhow::Result;

pub struct Stats;

#[serenity::async_trait]
impl Command for Stats {
    fn meta(&self) -> Meta {
        Meta::new("stats")
            .describe("Show bot and personal activity")
            .slash()
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<()> {
        let process = ctx.core.stats.snapshot();
        let mut reply = format!(
            "**Bot**\nUptime: {}\nMessages seen: {}\nCommands run: {}\nActive users: {}\nCommands loaded: {}\n",
            uptime(process.uptime_secs),
            process.messages,
            process.commands,
            process.users,
            ctx.core.registry.len(),
        );

        if let Some(discord) = ctx.discord {
            reply.push_str(&format!("Guilds: {}\n", discord.cache.guild_count()));
        }

        if let Some(user) = ctx.core.stats.user(ctx.inbound.author.id) {
            reply.push_str(&format!(
                "\n**You**\nMessages: {}\nCommands: {}\nLast active: {}\n",
                user.messages,
                user.commands,
                user.last_active.format("%Y-%m-%d %H:%M UTC"),
            ));
        }

        ctx.reply(&reply).await
    }
}

fn uptime(secs: u64) -> String {
    let (days, hours, minutes) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60);
    match (days, hours) {
        (0, 0) => format!("{}m {}s", minutes, secs % 60),
        (0, _) => format!("{}h {}m", hours, minutes),
        _ => format!("{}d {}h {}m", days, hours, minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::{run, text};

    #[test]
    fn uptime_is_human_readable() {
        assert_eq!(uptime(59), "0m 59s");
        assert_eq!(uptime(3 * 3600 + 120), "3h 2m");
        assert_eq!(uptime(2 * 86_400 + 3600 + 60), "2d 1h 1m");
    }

    #[tokio::test]
    async fn reports_process_and_caller() {
        let sent = run(&text(2, ".stats")).await;
        assert!(sent[0].contains("Commands run: 1"));
        assert!(sent[0].contains("**You**\nMessages: 1\nCommands: 1"));
    }
}
