use crate::{
    command::Command,
    context::CommandContext,
    permission::{Level, Requirement},
    registry::{Descriptor, Meta},
    reply::MESSAGE_LIMIT,
};
use anyhow::Result;

pub struct Help;

#[serenity::async_trait]
impl Command for Help {
    fn meta(&self) -> Meta {
        Meta::new("help")
            .aliases(&["h", "commands"])
            .describe("List commands, or show details for one")
            .usage("[command]")
            .slash()
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<()> {
        let prefix = &ctx.cfg.general.command_prefix;

        if let Some(token) = ctx.args.first() {
            let reply = match ctx.core.registry.resolve(token) {
                Some(descriptor) => details(prefix, descriptor),
                None => format!("No command named `{}`.", token),
            };
            return ctx.reply(&reply).await;
        }

        let is_owner = ctx.core.gate.is_owner(ctx.inbound.author.id);
        let mut lines = Vec::new();
        for category in ctx.core.registry.categories() {
            let entries = ctx
                .core
                .registry
                .iter()
                .filter(|d| d.category == category && d.enabled)
                .filter(|d| is_owner || d.requirement != Requirement::Level(Level::Owner))
                .map(|d| format!("{}{} - {}", prefix, d.synopsis(), d.description))
                .collect::<Vec<_>>();
            if entries.is_empty() {
                continue;
            }
            lines.push(format!("[{}]", category));
            lines.extend(entries);
        }
        lines.push(String::new());
        lines.push(format!("{}{} <command> for details", prefix, ctx.command.name));

        for page in pages(&lines) {
            ctx.reply(&page).await?;
        }
        Ok(())
    }
}

const FENCE_OPEN: &str = "```\n";
const FENCE_CLOSE: &str = "```";

/// Pack lines into code blocks that each fit in one message. Lines too long for a block on their
/// own are cut.
fn pages(lines: &[String]) -> Vec<String> {
    let budget = MESSAGE_LIMIT - FENCE_OPEN.len() - FENCE_CLOSE.len();
    let mut pages = Vec::new();
    let mut page = String::new();
    let mut used = 0;
    for line in lines {
        let line = line.chars().take(budget - 1).collect::<String>();
        let width = line.chars().count() + 1;
        if used + width > budget && used > 0 {
            pages.push(format!("{}{}{}", FENCE_OPEN, page, FENCE_CLOSE));
            page.clear();
            used = 0;
        }
        page.push_str(&line);
        page.push('\n');
        used += width;
    }
    if used > 0 {
        pages.push(format!("{}{}{}", FENCE_OPEN, page, FENCE_CLOSE));
    }
    pages
}

fn details(prefix: &str, descriptor: &Descriptor) -> String {
    let mut text = format!("**{}{}**\n", prefix, descriptor.synopsis());
    if !descriptor.description.is_empty() {
        text.push_str(&format!("{}\n", descriptor.description));
    }
    if !descriptor.aliases.is_empty() {
        text.push_str(&format!("Aliases: {}\n", descriptor.aliases.join(", ")));
    }
    text.push_str(&format!("Category: {}\n", descriptor.category));
    if let Some(cooldown) = descriptor.cooldown {
        text.push_str(&format!("Cooldown: {}s\n", cooldown.as_secs()));
    }
    if !descriptor.enabled {
        text.push_str("Currently disabled\n");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::{run, text};

    #[tokio::test]
    async fn lists_commands_by_category() {
        let sent = run(&text(2, ".help")).await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("[utility]"));
        assert!(sent[0].contains(".ping - "));
        // Owner-only commands are hidden from everybody else.
        assert!(!sent[0].contains("maintenance"));

        let sent = run(&text(1, ".h")).await;
        assert!(sent[0].contains("[owner]"));
        assert!(sent[0].contains(".maintenance"));
        assert!(sent[0].ends_with(".help <command> for details\n```"));
    }

    #[test]
    fn long_listings_split_into_fenced_pages() {
        let mut lines = (0..120)
            .map(|i| format!(".command{} - {}", i, "x".repeat(40)))
            .collect::<Vec<_>>();
        lines.push("é".repeat(MESSAGE_LIMIT * 2));
        lines.push(".help <command> for details".to_owned());

        let pages = pages(&lines);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.chars().count() <= MESSAGE_LIMIT, "{}", page.chars().count());
            assert!(page.starts_with("```\n"));
            assert!(page.ends_with("\n```"));
        }
        assert!(pages[0].contains(".command0 - "));
        assert!(pages.last().unwrap().contains(".help <command> for details"));
        let listed = pages.iter().map(|p| p.matches(".command").count()).sum::<usize>();
        assert_eq!(listed, 120);
    }

    #[test]
    fn short_listings_fit_one_page() {
        let lines = vec!["[utility]".to_owned(), ".ping - Pong".to_owned()];
        assert_eq!(pages(&lines), vec!["```\n[utility]\n.ping - Pong\n```".to_owned()]);
    }

    #[tokio::test]
    async fn shows_details_by_alias() {
        let sent = run(&text(2, ".help p")).await;
        assert!(sent[0].starts_with("**.ping**"));
        assert!(sent[0].contains("Aliases: p, test"));

        let sent = run(&text(2, ".help nope")).await;
        assert_eq!(sent, vec!["No command named `nope`.".to_owned()]);
    }
}
