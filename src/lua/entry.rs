use mlua::{LuaSerdeExt as _, SerializeOptions, prelude::*};

use crate::{
    constant::field,
    error::Result,
    trigger::{Reply, Trigger},
};

use super::LoadedModule;

/// The callable half of a handler module: its Lua state and entry points.
pub struct LuaEntry {
    lua: Lua,
    execute: LuaFunction,
    before: Option<LuaFunction>,
}

impl LuaEntry {
    pub fn from_module(module: &LoadedModule) -> Result<Self> {
        let fields = module.fields();
        let execute = fields
            .function(field::EXECUTE)?
            .ok_or_else(|| fields.invalid(format!("missing `{}` function", field::EXECUTE)))?;
        let before = fields.function(field::BEFORE)?;
        Ok(Self {
            lua: module.lua.clone(),
            execute,
            before,
        })
    }

    pub async fn before(&self, trigger: &Trigger) -> anyhow::Result<()> {
        if let Some(before) = &self.before {
            let view = self.trigger_value(trigger)?;
            before.call_async::<()>(view).await?;
        }
        Ok(())
    }

    pub async fn execute(&self, trigger: &Trigger) -> anyhow::Result<Option<Reply>> {
        let view = self.trigger_value(trigger)?;
        let result = self.execute.call_async::<LuaValue>(view).await?;
        self.reply_from_value(result)
    }

    fn trigger_value(&self, trigger: &Trigger) -> mlua::Result<LuaValue> {
        self.lua.to_value_with(
            &trigger.view(),
            SerializeOptions::new()
                .serialize_none_to_null(false)
                .serialize_unit_to_null(false),
        )
    }

    /// Handlers may return nothing, a string, or `{ content = ..., ephemeral = ... }`.
    fn reply_from_value(&self, value: LuaValue) -> anyhow::Result<Option<Reply>> {
        match value {
            LuaValue::Nil => Ok(None),
            LuaValue::String(s) => Ok(Some(Reply::new(s.to_str()?.to_string()))),
            value @ LuaValue::Table(_) => Ok(Some(self.lua.from_value(value)?)),
            other => anyhow::bail!("handler returned unsupported {}", other.type_name()),
        }
    }
}
