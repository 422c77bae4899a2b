//! Button and select-menu handlers, keyed by custom id.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serenity::all::Permissions;

use crate::{
    constant::{family, field},
    error::Result,
    handler::{ChannelScope, Executable, Gating, Keyed, WithCooldown, WithPermissions},
    loader::HandlerFamily,
    lua::{LoadedModule, LuaEntry},
    trigger::{Reply, Trigger},
};

pub struct ComponentHandler {
    /// Every custom id this handler answers; the first is its cooldown key
    pub custom_ids: Vec<String>,
    pub gating: Gating,
    pub module_path: PathBuf,
    pub generation: u64,
    entry: LuaEntry,
}

impl ComponentHandler {
    fn from_module(module: LoadedModule) -> Result<Self> {
        let fields = module.fields();
        let custom_ids = fields.string_list(field::CUSTOM_ID)?;
        if custom_ids.iter().all(String::is_empty) {
            return Err(fields.invalid(format!(
                "missing required field `{}`",
                field::CUSTOM_ID
            )));
        }
        Ok(Self {
            custom_ids: custom_ids.into_iter().filter(|id| !id.is_empty()).collect(),
            gating: fields.gating()?,
            module_path: module.path.clone(),
            generation: module.generation,
            entry: LuaEntry::from_module(&module)?,
        })
    }
}

/// Buttons and select menus share a shape but live in separate tables.
macro_rules! component_family {
    ($name:ident, $family:expr) => {
        pub struct $name(pub ComponentHandler);

        impl std::ops::Deref for $name {
            type Target = ComponentHandler;

            fn deref(&self) -> &ComponentHandler {
                &self.0
            }
        }

        impl HandlerFamily for $name {
            const FAMILY: &'static str = $family;

            fn construct(module: LoadedModule) -> Result<Self> {
                ComponentHandler::from_module(module).map(Self)
            }
        }

        impl Keyed for $name {
            fn keys(&self) -> Vec<String> {
                self.custom_ids.clone()
            }

            fn module_path(&self) -> Option<&Path> {
                Some(&self.module_path)
            }
        }

        #[serenity::async_trait]
        impl Executable for $name {
            async fn before(&self, trigger: &Trigger) -> anyhow::Result<()> {
                self.entry.before(trigger).await
            }

            async fn execute(&self, trigger: &Trigger) -> anyhow::Result<Option<Reply>> {
                self.entry.execute(trigger).await
            }
        }

        impl WithPermissions for $name {
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

        impl WithCooldown for $name {
            fn cooldown_key(&self) -> &str {
                &self.custom_ids[0]
            }

            fn cooldown(&self) -> Duration {
                self.gating.cooldown
            }
        }
    };
}

component_family!(ButtonHandler, family::BUTTON);
component_family!(SelectMenuHandler, family::SELECT_MENU);
