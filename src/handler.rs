use crate::{
    bot::BotCore,
    context::EventContext,
    dispatch::Io,
    event::{Event, ReadyInfo},
    helper::{InteractionHelper, MessageHelper},
    reply::{InteractionResponder, MessageResponder},
};
use serenity::all::{Interaction, Message, Ready};
use std::sync::Arc;

/// Discord event handler
pub struct Handler {
    core: Arc<BotCore>,
}

impl<'a> Handler {
    pub fn new(core: Arc<BotCore>) -> Self {
        Self { core }
    }

    fn ctx(&'a self, discord_ctx: &'a serenity::all::Context) -> EventContext<'a> {
        EventContext {
            core: &self.core,
            discord: Some(discord_ctx),
        }
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: serenity::all::Context, ready: Ready) {
        let info = ReadyInfo {
            user: ready.user.name.clone(),
            guilds: ready.guilds.len(),
            shard: ready.shard.map(|shard| (shard.id.0, shard.total)),
        };
        self.core
            .events
            .emit(&self.ctx(&discord_ctx), &Event::Ready(&info))
            .await;
    }

    async fn message(&self, discord_ctx: serenity::all::Context, msg: Message) {
        let inbound = msg.to_inbound();
        self.core
            .events
            .emit(&self.ctx(&discord_ctx), &Event::Message(&inbound))
            .await;

        let responder = MessageResponder {
            http: &discord_ctx.http,
            msg: &msg,
        };
        let io = Io {
            responder: &responder,
            members: &*discord_ctx.cache,
            discord: Some(&discord_ctx),
        };
        self.core.dispatch(&inbound, &io).await;
    }

    async fn interaction_create(&self, discord_ctx: serenity::all::Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let inbound = command.to_inbound();
        self.core
            .events
            .emit(&self.ctx(&discord_ctx), &Event::Interaction(&inbound))
            .await;

        let responder = InteractionResponder::new(&discord_ctx.http, &command);
        let io = Io {
            responder: &responder,
            members: &*discord_ctx.cache,
            discord: Some(&discord_ctx),
        };
        self.core.dispatch(&inbound, &io).await;
    }
}
