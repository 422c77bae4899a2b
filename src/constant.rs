/// names of fields read from handler modules
pub mod field {
    pub const NAME: &str = "name";
    pub const CUSTOM_ID: &str = "custom_id";
    pub const EXECUTE: &str = "execute";
    pub const BEFORE: &str = "before";
}

/// handler families, as reported to modules in `meta.family`
pub mod family {
    pub const COMMAND: &str = "command";
    pub const EVENT: &str = "event";
    pub const BUTTON: &str = "button";
    pub const SELECT_MENU: &str = "select_menu";
}

/// names of gateway events forwarded to event listeners
pub mod event {
    pub const READY: &str = "ready";
    pub const MESSAGE_CREATE: &str = "message_create";
    pub const GUILD_MEMBER_ADD: &str = "guild_member_add";
    pub const GUILD_MEMBER_REMOVE: &str = "guild_member_remove";
    pub const REACTION_ADD: &str = "reaction_add";
    pub const REACTION_REMOVE: &str = "reaction_remove";
}

/// names of non-user-configurable commands
pub mod commands {
    pub const RELOAD: &str = "reload";
}

/// Maximum number of choices allowed per option (Discord limit)
pub const MAX_CHOICES: usize = 25;
