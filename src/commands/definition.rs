use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use mlua::{LuaSerdeExt as _, prelude::*};
use serde::Deserialize;
use serenity::all::{CommandOptionType, CommandType, Permissions};

use crate::{
    constant::{MAX_CHOICES, family, field},
    error::Result,
    handler::{ChannelScope, Executable, Gating, Keyed, WithCooldown, WithPermissions},
    loader::HandlerFamily,
    lua::{Fields, LoadedModule, LuaEntry},
    trigger::{Reply, Trigger},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Slash,
    ContextMenuUser,
    ContextMenuMessage,
    /// Prefixed text command; never registered remotely
    Message,
}

impl CommandKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "slash" | "chat_input" => Some(Self::Slash),
            "user" | "context_user" => Some(Self::ContextMenuUser),
            "context_message" => Some(Self::ContextMenuMessage),
            "message" | "text" => Some(Self::Message),
            _ => None,
        }
    }

    /// The remote platform's type code, if this kind is registered remotely.
    pub fn remote_type(self) -> Option<CommandType> {
        match self {
            Self::Slash => Some(CommandType::ChatInput),
            Self::ContextMenuUser => Some(CommandType::User),
            Self::ContextMenuMessage => Some(CommandType::Message),
            Self::Message => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    pub option_type: CommandOptionType,
    pub required: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
    pub autocomplete: bool,
    pub choices: Vec<(String, String)>, // (name, value) for string choices
}

/// A choice entry with name and value
#[derive(Deserialize)]
struct Choice {
    name: String,
    value: String,
}

/// A command loaded from a module.
pub struct CommandDefinition {
    pub name: String,
    pub kind: CommandKind,
    pub description: String,
    pub options: Vec<CommandOption>,
    pub default_permission: bool,
    pub gating: Gating,
    pub category: String,
    /// Alternative invocation names (message commands only)
    pub aliases: Vec<String>,
    /// Usage hint; when set, invoking without arguments is rejected (message commands only)
    pub args: Option<String>,
    pub module_path: Option<PathBuf>,
    pub generation: u64,
    entry: LuaEntry,
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("module_path", &self.module_path)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl CommandDefinition {
    /// Whether `token` names this message command, by name or alias.
    pub fn answers_to(&self, token: &str) -> bool {
        self.kind == CommandKind::Message
            && (self.name.eq_ignore_ascii_case(token)
                || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(token)))
    }
}

impl HandlerFamily for CommandDefinition {
    const FAMILY: &'static str = family::COMMAND;

    fn construct(module: LoadedModule) -> Result<Self> {
        let fields = module.fields();
        let name = fields.required_string(field::NAME)?;

        let kind_name = fields.string_or("type", "slash")?;
        let kind = CommandKind::parse(&kind_name)
            .ok_or_else(|| fields.invalid(format!("unknown command type `{kind_name}`")))?;

        let description = fields.string_or("description", "")?;
        if kind == CommandKind::Slash && description.is_empty() {
            return Err(fields.invalid("slash commands need a non-empty `description`"));
        }

        let options = match fields.optional::<LuaTable>("options")? {
            Some(table) => parse_options(&module.lua, &fields, table)?,
            None => vec![],
        };

        let args = match fields.optional::<LuaValue>("args")? {
            None | Some(LuaValue::Boolean(false)) => None,
            Some(LuaValue::Boolean(true)) => Some(String::new()),
            Some(LuaValue::String(usage)) => Some(
                usage
                    .to_str()
                    .map_err(|e| fields.invalid(format!("field `args`: {e}")))?
                    .to_string(),
            ),
            Some(other) => {
                return Err(fields.invalid(format!(
                    "field `args` must be a boolean or a usage string, got {}",
                    other.type_name()
                )));
            }
        };

        if kind == CommandKind::Slash
            && let Some(option) = options.iter().find(|o| o.description.is_empty())
        {
            return Err(fields.invalid(format!(
                "option `{}` needs a non-empty `description`",
                option.name
            )));
        }

        Ok(Self {
            kind,
            description,
            options,
            default_permission: fields.bool_or("default_permission", true)?,
            gating: fields.gating()?,
            category: fields.string_or("category", &module.meta.category)?,
            aliases: fields.string_list("aliases")?,
            args,
            module_path: Some(module.path.clone()),
            generation: module.generation,
            entry: LuaEntry::from_module(&module)?,
            name,
        })
    }
}

fn parse_options(lua: &Lua, fields: &Fields<'_>, opts: LuaTable) -> Result<Vec<CommandOption>> {
    let mut options = vec![];
    for opt in opts.sequence_values::<LuaTable>() {
        let opt = opt.map_err(|e| fields.invalid(format!("field `options`: {e}")))?;
        let opt_fields = Fields::new(&opt, fields.path());

        let name = opt_fields.required_string("name")?;
        let description = opt_fields.string_or("description", "")?;
        let type_ = opt_fields.string_or("type", "string")?;

        let option_type = match type_.as_str() {
            "string" => CommandOptionType::String,
            "integer" => CommandOptionType::Integer,
            "number" => CommandOptionType::Number,
            "boolean" => CommandOptionType::Boolean,
            "user" => CommandOptionType::User,
            "channel" => CommandOptionType::Channel,
            "role" => CommandOptionType::Role,
            "mentionable" => CommandOptionType::Mentionable,
            "attachment" => CommandOptionType::Attachment,
            _ => {
                return Err(fields.invalid(format!(
                    "option `{name}` has unknown type `{type_}`"
                )));
            }
        };

        let choices: Vec<(String, String)> = opt_fields
            .optional::<LuaValue>("choices")?
            .map(|v| lua.from_value::<Vec<Choice>>(v))
            .transpose()
            .map_err(|e| fields.invalid(format!("option `{name}` choices: {e}")))?
            .unwrap_or_default()
            .into_iter()
            .map(|c| (c.name, c.value))
            .collect();

        if choices.len() > MAX_CHOICES {
            return Err(fields.invalid(format!(
                "option `{}` has {} choices, but Discord allows a maximum of {}",
                name,
                choices.len(),
                MAX_CHOICES
            )));
        }

        options.push(CommandOption {
            description,
            option_type,
            required: opt_fields.bool_or("required", false)?,
            min_value: opt_fields.optional("min_value")?,
            max_value: opt_fields.optional("max_value")?,
            min_length: opt_fields.optional("min_length")?,
            max_length: opt_fields.optional("max_length")?,
            autocomplete: opt_fields.bool_or("autocomplete", false)?,
            choices,
            name,
        });
    }
    Ok(options)
}

impl Keyed for CommandDefinition {
    fn keys(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn module_path(&self) -> Option<&Path> {
        self.module_path.as_deref()
    }
}

#[serenity::async_trait]
impl Executable for CommandDefinition {
    async fn before(&self, trigger: &Trigger) -> anyhow::Result<()> {
        self.entry.before(trigger).await
    }

    async fn execute(&self, trigger: &Trigger) -> anyhow::Result<Option<Reply>> {
        self.entry.execute(trigger).await
    }
}

impl WithPermissions for CommandDefinition {
    fn admin_only(&self) -> bool {
        self.gating.admin_only
    }

    fn channel_scope(&self) -> ChannelScope {
        self.gating.channel_scope
    }

    fn required_user_permissions(&self) -> Permissions {
        self.gating.user_permissions
    }

    fn required_client_permissions(&self) -> Permissions {
        self.gating.client_permissions
    }
}

impl WithCooldown for CommandDefinition {
    fn cooldown_key(&self) -> &str {
        &self.name
    }

    fn cooldown(&self) -> Duration {
        self.gating.cooldown
    }
}
