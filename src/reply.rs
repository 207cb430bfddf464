//! Outbound replies: where they go and what they say.

use anyhow::Result;
use serenity::all::{
    CommandInteraction, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, Http, Message,
};
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

/// Discord refuses messages longer than this.
pub const MESSAGE_LIMIT: usize = 2000;

/// Somewhere a reply to the current invocation can be sent.
#[serenity::async_trait]
pub trait Responder: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Replies to a text message.
pub struct MessageResponder<'a> {
    pub http: &'a Http,
    pub msg: &'a Message,
}

#[serenity::async_trait]
impl Responder for MessageResponder<'_> {
    async fn send(&self, text: &str) -> Result<()> {
        self.msg.reply(self.http, clamp(text)).await?;
        Ok(())
    }
}

/// Replies to a slash command. The first reply answers the interaction, later ones are
/// follow-ups.
pub struct InteractionResponder<'a> {
    pub http: &'a Http,
    pub interaction: &'a CommandInteraction,
    responded: AtomicBool,
}

impl<'a> InteractionResponder<'a> {
    pub fn new(http: &'a Http, interaction: &'a CommandInteraction) -> Self {
        Self {
            http,
            interaction,
            responded: AtomicBool::new(false),
        }
    }
}

#[serenity::async_trait]
impl Responder for InteractionResponder<'_> {
    async fn send(&self, text: &str) -> Result<()> {
        let text = clamp(text);
        if self.responded.swap(true, Ordering::AcqRel) {
            let followup = CreateInteractionResponseFollowup::new()
                .content(text)
                .ephemeral(true);
            self.interaction.create_followup(self.http, followup).await?;
        } else {
            let message = CreateInteractionResponseMessage::new()
                .content(text)
                .ephemeral(true);
            self.interaction
                .create_response(self.http, CreateInteractionResponse::Message(message))
                .await?;
        }
        Ok(())
    }
}

/// Fill `{placeholders}` in a configured template.
///
/// Templates that reference unknown placeholders or are malformed are sent as written rather
/// than dropped.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| ((*key).to_owned(), value.clone()))
        .collect();
    strfmt::strfmt(template, &vars).unwrap_or_else(|_| template.to_owned())
}

/// Cut `text` to fit in a single Discord message, on a char boundary.
pub fn clamp(text: &str) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text.to_owned();
    }
    let mut clamped: String = text.chars().take(MESSAGE_LIMIT - 1).collect();
    clamped.push('…');
    clamped
}

/// Whole seconds, rounded up so "0 seconds" is never shown while still denied.
pub fn seconds(duration: std::time::Duration) -> String {
    let secs = duration.as_millis().div_ceil(1000).max(1);
    secs.to_string()
}
