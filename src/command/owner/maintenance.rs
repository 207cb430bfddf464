use crate::{
    command::Command,
    context::CommandContext,
    log_internal,
    logging::PrintColor,
    permission::{Level, Requirement},
    registry::Meta,
};
use anyhow::{bail, Result};

/// Toggles maintenance mode, during which only owners can run commands.
pub struct Maintenance;

#[serenity::async_trait]
impl Command for Maintenance {
    fn meta(&self) -> Meta {
        Meta::new("maintenance")
            .aliases(&["maint"])
            .describe("Turn maintenance mode on or off")
            .usage("[on|off]")
            .require(Requirement::Level(Level::Owner))
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<()> {
        let enabled = match ctx.args.first().map(|a| a.to_lowercase()).as_deref() {
            None => !ctx.core.maintenance(),
            Some("on") | Some("true") => true,
            Some("off") | Some("false") => false,
            Some(other) => bail!("expected `on` or `off`, got `{}`", other),
        };

        ctx.core.set_maintenance(enabled);
        log_internal!(
            "{} turned maintenance {}",
            ctx.inbound.author.color(),
            if enabled { "on" } else { "off" }
        );
        ctx.reply(match enabled {
            true => "🔧 Maintenance mode is now on.",
            false => "✅ Maintenance mode is now off.",
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::command::tests::{core, io, text};
    use crate::dispatch::{Denial, Outcome};
    use crate::permission::tests::Members;
    use crate::reply::tests::Recorder;

    #[tokio::test]
    async fn toggles_and_blocks_other_users() {
        let core = core();
        let members = Members::default();
        let responder = Recorder::default();

        let outcome = core.dispatch(&text(1, ".maintenance on"), &io(&responder, &members)).await;
        assert_eq!(outcome, Outcome::Completed);
        assert!(core.maintenance());

        let outcome = core.dispatch(&text(2, ".ping"), &io(&responder, &members)).await;
        assert_eq!(outcome, Outcome::Denied(Denial::Maintenance));

        let outcome = core.dispatch(&text(1, ".maint"), &io(&responder, &members)).await;
        assert_eq!(outcome, Outcome::Completed);
        assert!(!core.maintenance());
    }

    #[tokio::test]
    async fn rejects_unknown_arguments() {
        let core = core();
        let members = Members::default();
        let responder = Recorder::default();

        let outcome = core.dispatch(&text(1, ".maintenance maybe"), &io(&responder, &members)).await;
        assert_eq!(outcome, Outcome::Failed);
        assert!(!core.maintenance());
    }

    #[tokio::test]
    async fn requires_an_owner() {
        let core = core();
        let members = Members::default();
        let responder = Recorder::default();

        let outcome = core.dispatch(&text(2, ".maintenance on"), &io(&responder, &members)).await;
        assert_eq!(outcome, Outcome::Denied(Denial::NoPermission));
        assert!(!core.maintenance());
    }
}
