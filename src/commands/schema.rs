use serenity::all::{CommandType, CreateCommand, CreateCommandOption, Permissions};

use super::definition::{CommandDefinition, CommandOption};

/// A command definition as the remote platform sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSchema {
    pub name: String,
    pub kind: CommandType,
    pub description: String,
    pub options: Vec<CommandOption>,
    pub default_permission: bool,
}

impl CommandSchema {
    /// Projects `def`, or `None` if it has no remote representation.
    pub fn project(def: &CommandDefinition, default_permission: bool) -> Option<Self> {
        let kind = def.kind.remote_type()?;
        Some(Self {
            name: def.name.clone(),
            kind,
            description: def.description.clone(),
            options: def.options.clone(),
            default_permission,
        })
    }

    pub fn to_discord_command(&self) -> CreateCommand {
        let mut cmd = CreateCommand::new(&self.name).kind(self.kind);

        // Context menu entries carry neither a description nor options
        if self.kind == CommandType::ChatInput {
            cmd = cmd.description(&self.description);
            for opt in &self.options {
                cmd = cmd.add_option(option_to_discord(opt));
            }
        }

        // Nobody but administrators until overrides are pushed
        if !self.default_permission {
            cmd = cmd.default_member_permissions(Permissions::empty());
        }

        cmd
    }
}

fn option_to_discord(opt: &CommandOption) -> CreateCommandOption {
    let mut option = CreateCommandOption::new(opt.option_type, &opt.name, &opt.description)
        .required(opt.required);

    if let Some(min_value) = opt.min_value {
        option = option.min_number_value(min_value);
    }
    if let Some(max_value) = opt.max_value {
        option = option.max_number_value(max_value);
    }
    if let Some(min_length) = opt.min_length {
        option = option.min_length(min_length);
    }
    if let Some(max_length) = opt.max_length {
        option = option.max_length(max_length);
    }
    if opt.autocomplete {
        option = option.set_autocomplete(true);
    }

    for (choice_name, choice_value) in &opt.choices {
        option = option.add_string_choice(choice_name, choice_value);
    }

    option
}
