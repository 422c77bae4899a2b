//! Inbound triggers, as seen by the router and by handler modules.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serenity::all::{ChannelId, GuildId, Permissions, UserId};

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerKind {
    /// Slash command or context-menu invocation
    Command { name: String },
    /// Prefixed text message; `name` is the token after the prefix
    Message { name: String, args: Vec<String> },
    Button { custom_id: String },
    SelectMenu { custom_id: String, values: Vec<String> },
    Event { name: String },
}

impl TriggerKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Message { .. } => "message",
            Self::Button { .. } => "button",
            Self::SelectMenu { .. } => "select_menu",
            Self::Event { .. } => "event",
        }
    }

    /// The lookup key: a name for commands and events, a custom id for components.
    pub fn key(&self) -> &str {
        match self {
            Self::Command { name } | Self::Message { name, .. } | Self::Event { name } => name,
            Self::Button { custom_id } | Self::SelectMenu { custom_id, .. } => custom_id,
        }
    }
}

/// The user behind a trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Invoker {
    pub user_id: UserId,
    /// Resolved guild permissions; `None` when the platform did not supply them
    pub permissions: Option<Permissions>,
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub invoker: Option<Invoker>,
    pub guild_id: Option<GuildId>,
    pub channel_id: Option<ChannelId>,
    /// The client's own permissions in the trigger's channel, when known
    pub client_permissions: Option<Permissions>,
    /// Family-specific data handed to the handler (options, event model, ...)
    pub payload: Value,
}

impl Trigger {
    pub fn new(kind: TriggerKind) -> Self {
        Self {
            kind,
            invoker: None,
            guild_id: None,
            channel_id: None,
            client_permissions: None,
            payload: Value::Null,
        }
    }

    pub fn command(name: impl Into<String>) -> Self {
        Self::new(TriggerKind::Command { name: name.into() })
    }

    pub fn message(name: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(TriggerKind::Message {
            name: name.into(),
            args,
        })
    }

    pub fn button(custom_id: impl Into<String>) -> Self {
        Self::new(TriggerKind::Button {
            custom_id: custom_id.into(),
        })
    }

    pub fn select_menu(custom_id: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(TriggerKind::SelectMenu {
            custom_id: custom_id.into(),
            values,
        })
    }

    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        Self {
            payload,
            ..Self::new(TriggerKind::Event { name: name.into() })
        }
    }

    pub fn by(mut self, user_id: UserId, permissions: Option<Permissions>) -> Self {
        self.invoker = Some(Invoker {
            user_id,
            permissions,
        });
        self
    }

    pub fn in_guild(mut self, guild_id: Option<GuildId>) -> Self {
        self.guild_id = guild_id;
        self
    }

    pub fn in_channel(mut self, channel_id: ChannelId) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    pub fn with_client_permissions(mut self, permissions: Option<Permissions>) -> Self {
        self.client_permissions = permissions;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// The table handed to Lua handlers. Ids are strings, as Lua numbers
    /// cannot hold a snowflake exactly.
    pub fn view(&self) -> Value {
        let mut view = json!({
            "kind": self.kind.label(),
            "key": self.kind.key(),
            "payload": self.payload,
        });
        match &self.kind {
            TriggerKind::Message { args, .. } => view["args"] = json!(args),
            TriggerKind::SelectMenu { values, .. } => view["values"] = json!(values),
            _ => {}
        }
        if let Some(invoker) = &self.invoker {
            view["user_id"] = json!(invoker.user_id.get().to_string());
        }
        if let Some(guild_id) = self.guild_id {
            view["guild_id"] = json!(guild_id.get().to_string());
        }
        if let Some(channel_id) = self.channel_id {
            view["channel_id"] = json!(channel_id.get().to_string());
        }
        view
    }
}

/// What a handler body asks to be sent back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    /// Only visible to the invoker, where the platform supports it
    #[serde(default)]
    pub ephemeral: bool,
}

impl Reply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_carries_ids_as_strings() {
        let trigger = Trigger::select_menu("colour", vec!["red".into()])
            .by(UserId::new(9_007_199_254_740_993), None)
            .in_guild(Some(GuildId::new(5)))
            .in_channel(ChannelId::new(6));

        let view = trigger.view();
        assert_eq!(view["kind"], "select_menu");
        assert_eq!(view["key"], "colour");
        assert_eq!(view["values"], json!(["red"]));
        assert_eq!(view["user_id"], "9007199254740993");
        assert_eq!(view["guild_id"], "5");
        assert_eq!(view["channel_id"], "6");
    }

    #[test]
    fn event_view_has_no_invoker() {
        let view = Trigger::event("ready", json!({"shard": 0})).view();
        assert_eq!(view["kind"], "event");
        assert_eq!(view["payload"]["shard"], 0);
        assert!(view.get("user_id").is_none());
    }
}
