//! Single entry point from inbound triggers to handler invocation.
//!
//! Per trigger: resolve the key, run the `before` hook, apply the gating
//! checks in a fixed order, then invoke the handler body. Handler failures
//! never propagate to the caller; they go out on the failure channel.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use parking_lot::{Mutex, RwLock};
use serenity::all::{Permissions, UserId};
use tracing::{debug, info};

use crate::{
    commands::{CommandDefinition, CommandKind, CommandRegistry},
    components::{ButtonHandler, SelectMenuHandler},
    config,
    cooldown::{CooldownCheck, CooldownTracker},
    error::Result,
    events::EventListener,
    handler::{ChannelScope, Executable, GatedHandler},
    loader::{Collection, HandlerFamily, Loader},
    lua::LuaHost,
    permissions::permission_names,
    trigger::{Invoker, Reply, Trigger, TriggerKind},
};

/// A handler body or `before` hook that failed.
#[derive(Debug)]
pub struct HandlerFailure {
    pub family: &'static str,
    pub key: String,
    pub error: anyhow::Error,
}

/// Why a matched handler was not invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    MissingArguments { usage: String },
    AdminOnly,
    ChannelScope { required: ChannelScope },
    MissingUserPermissions(Permissions),
    MissingClientPermissions(Permissions),
    Cooldown { remaining: Duration },
}

impl Rejection {
    /// Text shown to the invoker.
    pub fn render(&self, prefix: &str, command: &str) -> String {
        match self {
            Self::MissingArguments { usage } if usage.is_empty() => {
                "This command needs arguments.".to_string()
            }
            Self::MissingArguments { usage } => {
                format!("This command needs arguments. Usage: `{prefix}{command} {usage}`")
            }
            Self::AdminOnly => "This is restricted to the bot's administrators.".to_string(),
            Self::ChannelScope {
                required: ChannelScope::DirectMessage,
            } => "This can only be used in direct messages.".to_string(),
            Self::ChannelScope { .. } => "This can only be used in a server.".to_string(),
            Self::MissingUserPermissions(missing) => format!(
                "You are missing permissions: {}",
                permission_names(*missing).join(", ")
            ),
            Self::MissingClientPermissions(missing) => format!(
                "I am missing permissions: {}",
                permission_names(*missing).join(", ")
            ),
            Self::Cooldown { remaining } => format!(
                "Please wait {} more second(s) before using this again.",
                remaining.as_secs_f64().ceil() as u64
            ),
        }
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// Nothing answers this key
    Unmatched,
    Rejected(Rejection),
    Completed(Option<Reply>),
    /// Reported on the failure channel
    Failed,
}

struct Loaders {
    buttons: Loader<ButtonHandler>,
    select_menus: Loader<SelectMenuHandler>,
    events: Loader<EventListener>,
}

pub struct Router {
    commands: Arc<RwLock<CommandRegistry>>,
    buttons: RwLock<Collection<ButtonHandler>>,
    select_menus: RwLock<Collection<SelectMenuHandler>>,
    events: RwLock<Collection<EventListener>>,
    loaders: Mutex<Loaders>,
    cooldowns: CooldownTracker,
    admins: Vec<UserId>,
    failures: flume::Sender<HandlerFailure>,
}

impl Router {
    pub fn new(
        host: LuaHost,
        commands: Arc<RwLock<CommandRegistry>>,
        admins: Vec<UserId>,
        failures: flume::Sender<HandlerFailure>,
    ) -> Self {
        Self {
            commands,
            buttons: RwLock::default(),
            select_menus: RwLock::default(),
            events: RwLock::default(),
            loaders: Mutex::new(Loaders {
                buttons: Loader::new(host.clone()),
                select_menus: Loader::new(host.clone()),
                events: Loader::new(host),
            }),
            cooldowns: CooldownTracker::new(),
            admins,
            failures,
        }
    }

    pub fn commands(&self) -> &Arc<RwLock<CommandRegistry>> {
        &self.commands
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    /// Rescans every handler directory, replacing all four tables.
    pub fn load_all(&self, dirs: &config::Handlers) -> Result<()> {
        self.commands.write().load_all(&dirs.commands_dir)?;

        let mut loaders = self.loaders.lock();
        let buttons = loaders.buttons.load_all(&dirs.buttons_dir)?;
        let select_menus = loaders.select_menus.load_all(&dirs.select_menus_dir)?;
        let events = loaders.events.load_all(&dirs.events_dir)?;
        *self.buttons.write() = buttons;
        *self.select_menus.write() = select_menus;
        *self.events.write() = events;
        Ok(())
    }

    /// Reloads one command from its module; `false` if no such command is loaded.
    pub fn reload_command(&self, name: &str) -> Result<bool> {
        let mut commands = self.commands.write();
        let Some(def) = commands.get(name) else {
            return Ok(false);
        };
        Ok(commands.reload(&def)?.is_some())
    }

    pub async fn dispatch(&self, trigger: &Trigger) -> DispatchOutcome {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.dispatch_at(trigger, now).await
    }

    /// Dispatches `trigger` as if it arrived at `now` (time since the Unix epoch).
    pub async fn dispatch_at(&self, trigger: &Trigger, now: Duration) -> DispatchOutcome {
        match &trigger.kind {
            TriggerKind::Command { name } => {
                let def = self.commands.read().get(name);
                match def.filter(|def| def.kind != CommandKind::Message) {
                    Some(def) => self.run_gated(CommandDefinition::FAMILY, def, trigger, now).await,
                    None => DispatchOutcome::Unmatched,
                }
            }
            TriggerKind::Message { name, args } => {
                let def = self.commands.read().find_message_command(name);
                let Some(def) = def else {
                    return DispatchOutcome::Unmatched;
                };
                if let Some(usage) = &def.args
                    && args.is_empty()
                {
                    return DispatchOutcome::Rejected(Rejection::MissingArguments {
                        usage: usage.clone(),
                    });
                }
                self.run_gated(CommandDefinition::FAMILY, def, trigger, now).await
            }
            TriggerKind::Button { custom_id } => {
                let handler = self.buttons.read().get(custom_id).cloned();
                match handler {
                    Some(handler) => self.run_gated(ButtonHandler::FAMILY, handler, trigger, now).await,
                    None => DispatchOutcome::Unmatched,
                }
            }
            TriggerKind::SelectMenu { custom_id, .. } => {
                let handler = self.select_menus.read().get(custom_id).cloned();
                match handler {
                    Some(handler) => {
                        self.run_gated(SelectMenuHandler::FAMILY, handler, trigger, now)
                            .await
                    }
                    None => DispatchOutcome::Unmatched,
                }
            }
            TriggerKind::Event { name } => {
                let listener = self.take_listener(name);
                match listener {
                    Some(listener) => self.run(EventListener::FAMILY, &*listener, trigger).await,
                    None => DispatchOutcome::Unmatched,
                }
            }
        }
    }

    fn take_listener(&self, name: &str) -> Option<Arc<EventListener>> {
        let mut events = self.events.write();
        let listener = events.get(name).cloned()?;
        if listener.once {
            events.remove(name);
            debug!(event = name, "removed one-shot listener");
        }
        Some(listener)
    }

    async fn run_gated<H: GatedHandler>(
        &self,
        family: &'static str,
        handler: Arc<H>,
        trigger: &Trigger,
        now: Duration,
    ) -> DispatchOutcome {
        if let Err(error) = handler.before(trigger).await {
            self.report(family, trigger, error);
            return DispatchOutcome::Failed;
        }

        if let Some(invoker) = &trigger.invoker
            && let Err(rejection) = self.gate(&*handler, trigger, invoker, now)
        {
            debug!(
                family,
                key = trigger.kind.key(),
                user = %invoker.user_id,
                ?rejection,
                "rejected trigger"
            );
            return DispatchOutcome::Rejected(rejection);
        }

        match handler.execute(trigger).await {
            Ok(reply) => DispatchOutcome::Completed(reply),
            Err(error) => {
                self.report(family, trigger, error);
                DispatchOutcome::Failed
            }
        }
    }

    async fn run<H: Executable + ?Sized>(
        &self,
        family: &'static str,
        handler: &H,
        trigger: &Trigger,
    ) -> DispatchOutcome {
        let result = match handler.before(trigger).await {
            Ok(()) => handler.execute(trigger).await,
            Err(error) => Err(error),
        };
        match result {
            Ok(reply) => DispatchOutcome::Completed(reply),
            Err(error) => {
                self.report(family, trigger, error);
                DispatchOutcome::Failed
            }
        }
    }

    /// admin-only, channel scope, user permissions, client permissions, cooldown
    fn gate<H: GatedHandler>(
        &self,
        handler: &H,
        trigger: &Trigger,
        invoker: &Invoker,
        now: Duration,
    ) -> std::result::Result<(), Rejection> {
        if handler.admin_only() && !self.is_admin(invoker.user_id) {
            return Err(Rejection::AdminOnly);
        }

        let in_guild = trigger.guild_id.is_some();
        let scope = handler.channel_scope();
        if !scope.admits(in_guild) {
            return Err(Rejection::ChannelScope { required: scope });
        }

        // Direct messages carry no permission context
        if in_guild {
            let missing = handler
                .required_user_permissions()
                .difference(invoker.permissions.unwrap_or_else(Permissions::empty));
            if !missing.is_empty() {
                return Err(Rejection::MissingUserPermissions(missing));
            }

            let missing = handler
                .required_client_permissions()
                .difference(trigger.client_permissions.unwrap_or_else(Permissions::empty));
            if !missing.is_empty() {
                return Err(Rejection::MissingClientPermissions(missing));
            }
        }

        match self.cooldowns.check_and_consume(
            handler.cooldown_key(),
            invoker.user_id,
            now,
            handler.cooldown(),
        ) {
            CooldownCheck::Allowed => Ok(()),
            CooldownCheck::Rejected { remaining } => Err(Rejection::Cooldown { remaining }),
        }
    }

    fn report(&self, family: &'static str, trigger: &Trigger, error: anyhow::Error) {
        let key = trigger.kind.key().to_string();
        info!(family, key = %key, "handler failed, reporting");
        // The receiver only disappears at shutdown
        self.failures
            .send(HandlerFailure { family, key, error })
            .ok();
    }
}
