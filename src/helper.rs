//! Conversions from Serenity's gateway types into the dispatcher's input

use crate::dispatch::{Author, Inbound, Payload};
use serenity::all::{CommandDataOption, CommandDataOptionValue, CommandInteraction, Message, User};
use tokio::time::Instant;

pub trait UserHelper {
    fn to_author(&self) -> Author;
}

impl UserHelper for User {
    fn to_author(&self) -> Author {
        Author {
            id: self.id,
            name: self.name.clone(),
            bot: self.bot,
        }
    }
}

pub trait MessageHelper {
    fn to_inbound(&self) -> Inbound;
}

impl MessageHelper for Message {
    fn to_inbound(&self) -> Inbound {
        Inbound {
            author: self.author.to_author(),
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            received: Instant::now(),
            payload: Payload::Text(self.content.clone()),
        }
    }
}

pub trait InteractionHelper {
    fn to_inbound(&self) -> Inbound;
}

impl InteractionHelper for CommandInteraction {
    fn to_inbound(&self) -> Inbound {
        let mut args = Vec::new();
        push_options(&mut args, &self.data.options);
        Inbound {
            author: self.user.to_author(),
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            received: Instant::now(),
            payload: Payload::Interaction {
                name: self.data.name.clone(),
                args,
            },
        }
    }
}

fn push_options(args: &mut Vec<String>, options: &[CommandDataOption]) {
    for option in options {
        if let CommandDataOptionValue::SubCommand(nested)
        | CommandDataOptionValue::SubCommandGroup(nested) = &option.value
        {
            args.push(option.name.clone());
            push_options(args, nested);
        } else {
            push_value(args, &option.value);
        }
    }
}

/// Render one option value as text-command arguments.
///
/// Free text is split on whitespace, so `/help args:ping` and `.help ping` agree.
fn push_value(args: &mut Vec<String>, value: &CommandDataOptionValue) {
    match value {
        CommandDataOptionValue::String(text) => {
            args.extend(text.split_whitespace().map(str::to_owned))
        }
        CommandDataOptionValue::Integer(n) => args.push(n.to_string()),
        CommandDataOptionValue::Number(n) => args.push(n.to_string()),
        CommandDataOptionValue::Boolean(b) => args.push(b.to_string()),
        CommandDataOptionValue::User(id) => args.push(format!("<@{}>", id)),
        CommandDataOptionValue::Role(id) => args.push(format!("<@&{}>", id)),
        CommandDataOptionValue::Channel(id) => args.push(format!("<#{}>", id)),
        CommandDataOptionValue::Mentionable(id) => args.push(id.to_string()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_text_is_split_like_a_message() {
        let mut args = Vec::new();
        push_value(
            &mut args,
            &CommandDataOptionValue::String("  ping   now ".to_owned()),
        );
        push_value(&mut args, &CommandDataOptionValue::Integer(42));
        push_value(&mut args, &CommandDataOptionValue::Boolean(true));
        assert_eq!(args, vec!["ping", "now", "42", "true"]);
    }
}
