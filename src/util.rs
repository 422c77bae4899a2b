use serde_json::{Map, Value, json};
use serenity::{all::*, async_trait};

use crate::trigger::{Reply, Trigger};

#[async_trait]
pub trait RespondableInteraction: Send + Sync {
    async fn reply(&self, http: &Http, reply: &Reply) -> anyhow::Result<()>;
    /// Answers an interaction whose handler produced no reply.
    async fn acknowledge(&self, http: &Http) -> anyhow::Result<()>;

    fn trigger(&self) -> Trigger;
}
macro_rules! implement_respondable_interaction {
    ($name:ident, $kind:expr) => {
        #[async_trait]
        impl RespondableInteraction for $name {
            async fn reply(&self, http: &Http, reply: &Reply) -> anyhow::Result<()> {
                Ok(self
                    .create_response(
                        http,
                        CreateInteractionResponse::Message(
                            CreateInteractionResponseMessage::new()
                                .content(&reply.content)
                                .ephemeral(reply.ephemeral),
                        ),
                    )
                    .await?)
            }

            async fn acknowledge(&self, http: &Http) -> anyhow::Result<()> {
                Ok(self.create_response(http, acknowledgement($kind)).await?)
            }

            fn trigger(&self) -> Trigger {
                interaction_trigger!($name, self)
                    .by(
                        self.user.id,
                        self.member.as_ref().and_then(|m| m.permissions),
                    )
                    .in_guild(self.guild_id)
                    .in_channel(self.channel_id)
                    .with_client_permissions(self.app_permissions)
            }
        }
    };
}
macro_rules! interaction_trigger {
    (CommandInteraction, $self:ident) => {
        Trigger::command(&$self.data.name).with_payload(json!({
            "options": options_to_json(&$self.data.options),
            "target_id": $self.data.target_id.map(|id| id.get().to_string()),
        }))
    };
    (ComponentInteraction, $self:ident) => {
        component_trigger(&$self.data.custom_id, &$self.data.kind)
            .with_payload(json!({ "message_id": $self.message.id.get().to_string() }))
    };
}
implement_respondable_interaction!(CommandInteraction, InteractionType::Command);
implement_respondable_interaction!(ComponentInteraction, InteractionType::Component);

pub fn interaction_to_respondable_interaction(
    interaction: &Interaction,
) -> Option<&dyn RespondableInteraction> {
    match interaction {
        Interaction::Command(cmd) => Some(cmd),
        Interaction::Component(cmp) => Some(cmp),
        _ => None,
    }
}

/// Select menus of every kind route by custom id, with the picked ids as strings.
pub fn component_trigger(custom_id: &str, kind: &ComponentInteractionDataKind) -> Trigger {
    fn ids<T: Copy + Into<u64>>(values: &[T]) -> Vec<String> {
        values.iter().map(|&id| id.into().to_string()).collect()
    }

    match kind {
        ComponentInteractionDataKind::StringSelect { values } => {
            Trigger::select_menu(custom_id, values.clone())
        }
        ComponentInteractionDataKind::UserSelect { values } => {
            Trigger::select_menu(custom_id, ids(values))
        }
        ComponentInteractionDataKind::RoleSelect { values } => {
            Trigger::select_menu(custom_id, ids(values))
        }
        ComponentInteractionDataKind::MentionableSelect { values } => {
            Trigger::select_menu(custom_id, ids(values))
        }
        ComponentInteractionDataKind::ChannelSelect { values } => {
            Trigger::select_menu(custom_id, ids(values))
        }
        ComponentInteractionDataKind::Button | ComponentInteractionDataKind::Unknown(_) => {
            Trigger::button(custom_id)
        }
    }
}

/// The response sent when a handler completes without a reply.
pub fn acknowledgement(kind: InteractionType) -> CreateInteractionResponse {
    match kind {
        InteractionType::Component => CreateInteractionResponse::Acknowledge,
        // Commands must answer with a message or Discord reports a timeout
        _ => CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content("Done.")
                .ephemeral(true),
        ),
    }
}

/// Flattens slash command options into a JSON object; ids become strings.
pub fn options_to_json(options: &[CommandDataOption]) -> Value {
    let mut map = Map::new();
    for option in options {
        let value = match &option.value {
            CommandDataOptionValue::String(s) => json!(s),
            CommandDataOptionValue::Integer(i) => json!(i),
            CommandDataOptionValue::Number(n) => json!(n),
            CommandDataOptionValue::Boolean(b) => json!(b),
            CommandDataOptionValue::User(id) => json!(id.get().to_string()),
            CommandDataOptionValue::Channel(id) => json!(id.get().to_string()),
            CommandDataOptionValue::Role(id) => json!(id.get().to_string()),
            CommandDataOptionValue::Mentionable(id) => json!(id.get().to_string()),
            CommandDataOptionValue::Attachment(id) => json!(id.get().to_string()),
            CommandDataOptionValue::SubCommand(nested)
            | CommandDataOptionValue::SubCommandGroup(nested) => options_to_json(nested),
            _ => Value::Null,
        };
        map.insert(option.name.clone(), value);
    }
    Value::Object(map)
}

/// Splits a prefixed message into its command token and arguments.
pub fn parse_prefixed<'a>(content: &'a str, prefix: &str) -> Option<(&'a str, Vec<String>)> {
    if prefix.is_empty() {
        return None;
    }
    let mut tokens = content.strip_prefix(prefix)?.split_whitespace();
    let name = tokens.next()?;
    Some((name, tokens.map(str::to_string).collect()))
}
