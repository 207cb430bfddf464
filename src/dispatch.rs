//! From an inbound message or interaction to a command invocation.
//!
//! `received -> parsed -> resolved -> authorized -> throttled-check -> executing`, ending in
//! [`Outcome::Completed`] or a contained failure. Unknown commands end silently; denials are
//! reported to the user; handler faults are logged and reported but never escape.

use crate::{
    bot::BotCore,
    context::CommandContext,
    log_internal,
    logging::PrintColor,
    permission::MemberLookup,
    rate_limit::Throttle,
    registry::Descriptor,
    reply::{self, Responder},
};
use anyhow::anyhow;
use serenity::{
    all::{ChannelId, GuildId, UserId},
    futures::FutureExt,
};
use std::{any::Any, panic::AssertUnwindSafe, time::Duration};
use tokio::time::Instant;

/// Longest handler error text echoed back to the user.
const ERROR_DETAIL_LIMIT: usize = 500;

#[derive(Clone, Debug)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub bot: bool,
}

#[derive(Clone, Debug)]
pub enum Payload {
    /// Raw message content, prefix included.
    Text(String),
    /// A slash command invocation.
    Interaction { name: String, args: Vec<String> },
}

/// One message or interaction, stripped of everything dispatch does not need.
#[derive(Clone, Debug)]
pub struct Inbound {
    pub author: Author,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub received: Instant,
    pub payload: Payload,
}

/// The world a dispatch talks to.
pub struct Io<'a> {
    pub responder: &'a dyn Responder,
    pub members: &'a dyn MemberLookup,
    pub discord: Option<&'a serenity::all::Context>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parsed {
    pub name: String,
    pub args: Vec<String>,
}

/// Split `content` into a case-folded command name and its arguments.
///
/// `None` unless `content` starts with `prefix` and names something.
pub fn parse(content: &str, prefix: &str) -> Option<Parsed> {
    let rest = content.strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?.to_lowercase();
    Some(Parsed {
        name,
        args: words.map(str::to_owned).collect(),
    })
}

/// Why an inbound value was dropped without a reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ignored {
    ShuttingDown,
    Bot,
    Blacklisted,
    DirectMessage,
    NotACommand,
    Unknown,
}

/// Why a resolved command was refused. Each one is reported to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    Maintenance,
    NoPermission,
    Disabled,
    RateLimited { retry_after: Duration },
    Cooldown { remaining: Duration },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ignored(Ignored),
    Denied(Denial),
    Completed,
    Failed,
    TimedOut,
}

impl BotCore {
    pub async fn dispatch(&self, inbound: &Inbound, io: &Io<'_>) -> Outcome {
        let Some(_in_flight) = self.enter() else {
            return self.ignore(inbound, Ignored::ShuttingDown, io).await;
        };

        if let Some(reason) = self.prefilter(inbound) {
            return self.ignore(inbound, reason, io).await;
        }

        if let Payload::Text(_) = inbound.payload {
            self.stats.record_message(inbound.author.id);
        }

        // received -> parsed -> resolved
        let (command, args) = match &inbound.payload {
            Payload::Text(content) => {
                let Some(parsed) = parse(content, &self.cfg.general.command_prefix) else {
                    return Outcome::Ignored(Ignored::NotACommand);
                };
                let Some(command) = self.registry.resolve(&parsed.name) else {
                    log::debug!("{} unknown command `{}`", inbound.color(), parsed.name);
                    return Outcome::Ignored(Ignored::Unknown);
                };
                (command, parsed.args)
            }
            Payload::Interaction { name, args } => {
                let Some(command) = self.registry.get(name).filter(|c| c.slash) else {
                    log::debug!("{} unknown slash command `{}`", inbound.color(), name);
                    return self.ignore(inbound, Ignored::Unknown, io).await;
                };
                (command, args.clone())
            }
        };

        // resolved -> authorized
        let author = inbound.author.id;
        if self.maintenance() && !self.gate.is_owner(author) {
            return self.deny(inbound, command, Denial::Maintenance, io).await;
        }
        if !self
            .gate
            .allows(author, inbound.guild_id, &command.requirement, io.members)
        {
            return self.deny(inbound, command, Denial::NoPermission, io).await;
        }

        // authorized -> throttled-check
        if !command.enabled {
            return self.deny(inbound, command, Denial::Disabled, io).await;
        }
        let cooldown = command
            .cooldown
            .or_else(|| self.cfg.cooldowns.default_cooldown());
        match self.limiter.check(author, &command.name, cooldown) {
            Throttle::Allowed => {}
            Throttle::Limited { retry_after } => {
                let denial = Denial::RateLimited { retry_after };
                return self.deny(inbound, command, denial, io).await;
            }
            Throttle::Cooling { remaining } => {
                let denial = Denial::Cooldown { remaining };
                return self.deny(inbound, command, denial, io).await;
            }
        }

        // throttled-check -> executing
        self.execute(inbound, command, &args, io).await
    }

    fn prefilter(&self, inbound: &Inbound) -> Option<Ignored> {
        let blacklist = &self.cfg.blacklist;
        if inbound.author.bot {
            Some(Ignored::Bot)
        } else if blacklist.users.contains(&inbound.author.id)
            || inbound
                .guild_id
                .is_some_and(|guild_id| blacklist.guilds.contains(&guild_id))
        {
            Some(Ignored::Blacklisted)
        } else if inbound.guild_id.is_none() && !self.cfg.general.allow_dm {
            Some(Ignored::DirectMessage)
        } else {
            None
        }
    }

    /// Text is dropped silently. Discord shows an interaction that gets no answer as failed, so
    /// those are answered unless they came from a bot.
    async fn ignore(&self, inbound: &Inbound, reason: Ignored, io: &Io<'_>) -> Outcome {
        if let Payload::Interaction { .. } = inbound.payload {
            let messages = &self.cfg.messages;
            let template = match reason {
                Ignored::ShuttingDown => Some(&messages.shutting_down),
                Ignored::Blacklisted => Some(&messages.no_permission),
                Ignored::DirectMessage => Some(&messages.direct_messages),
                Ignored::Unknown => Some(&messages.unknown_command),
                Ignored::Bot | Ignored::NotACommand => None,
            };
            if let Some(template) = template {
                notify(io, &reply::render(template, &[])).await;
            }
        }
        Outcome::Ignored(reason)
    }

    async fn deny(
        &self,
        inbound: &Inbound,
        command: &Descriptor,
        denial: Denial,
        io: &Io<'_>,
    ) -> Outcome {
        log::debug!("{} `{}` refused: {:?}", inbound.color(), command.name, denial);

        let messages = &self.cfg.messages;
        let (template, time) = match denial {
            Denial::Maintenance => (&messages.maintenance, None),
            Denial::NoPermission => (&messages.no_permission, None),
            Denial::Disabled => (&messages.command_disabled, None),
            Denial::RateLimited { retry_after } => (&messages.rate_limited, Some(retry_after)),
            Denial::Cooldown { remaining } => (&messages.cooldown, Some(remaining)),
        };
        let mut vars = vec![("command", command.name.clone())];
        if let Some(time) = time {
            vars.push(("time", reply::seconds(time)));
        }

        notify(io, &reply::render(template, &vars)).await;
        Outcome::Denied(denial)
    }

    async fn execute(
        &self,
        inbound: &Inbound,
        command: &Descriptor,
        args: &[String],
        io: &Io<'_>,
    ) -> Outcome {
        self.stats.record_command(inbound.author.id);
        log_internal!("{} ran `{}` {:?}", inbound.color(), command.name, args);

        let ctx = CommandContext {
            core: self,
            cfg: &self.cfg,
            inbound,
            command,
            args,
            responder: io.responder,
            discord: io.discord,
        };

        let run = AssertUnwindSafe(command.handler().execute(&ctx)).catch_unwind();
        let limit = self.cfg.timeouts.command();
        let finished = match limit.is_zero() {
            true => Some(run.await),
            false => tokio::time::timeout(limit, run).await.ok(),
        };

        let error = match finished {
            Some(Ok(Ok(()))) => return Outcome::Completed,
            Some(Ok(Err(error))) => error,
            Some(Err(panic)) => anyhow!("handler panicked: {}", panic_message(panic.as_ref())),
            None => {
                log::warn!(
                    "{} `{}` timed out after {:?}",
                    inbound.color(),
                    command.name,
                    limit
                );
                let vars = [("command", command.name.clone())];
                notify(io, &reply::render(&self.cfg.messages.timeout, &vars)).await;
                return Outcome::TimedOut;
            }
        };

        log::error!(
            "{} `{}` failed: {:#}",
            inbound.color(),
            command.name,
            error
        );
        let detail: String = error.to_string().chars().take(ERROR_DETAIL_LIMIT).collect();
        let vars = [("command", command.name.clone()), ("error", detail)];
        notify(io, &reply::render(&self.cfg.messages.error, &vars)).await;
        Outcome::Failed
    }
}

/// Send a notice, swallowing delivery failures so they cannot cascade.
async fn notify(io: &Io<'_>, text: &str) {
    if let Err(e) = io.responder.send(text).await {
        log::warn!("Could not deliver notice: {:#}", e);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic>"
    }
}
