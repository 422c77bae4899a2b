use std::{path::Path, time::Duration};

use mlua::prelude::*;

use crate::{
    error::{RegistryError, Result},
    handler::{ChannelScope, Gating},
    permissions,
};

/// Typed, validating access to a handler table's fields.
pub struct Fields<'a> {
    table: &'a LuaTable,
    path: &'a Path,
}

impl<'a> Fields<'a> {
    pub fn new(table: &'a LuaTable, path: &'a Path) -> Self {
        Self { table, path }
    }

    pub fn path(&self) -> &Path {
        self.path
    }

    pub fn invalid(&self, reason: impl Into<String>) -> RegistryError {
        RegistryError::validation(self.path, reason)
    }

    pub fn optional<T: FromLua>(&self, key: &str) -> Result<Option<T>> {
        self.table
            .get::<Option<T>>(key)
            .map_err(|e| self.invalid(format!("field `{key}`: {e}")))
    }

    /// A non-empty string field; its absence is the module's key being missing.
    pub fn required_string(&self, key: &str) -> Result<String> {
        match self.optional::<String>(key)? {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.invalid(format!("missing required field `{key}`"))),
        }
    }

    pub fn string_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .optional::<String>(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self.optional::<bool>(key)?.unwrap_or(default))
    }

    /// Accepts either a single string or a sequence of strings.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.optional::<LuaValue>(key)? {
            None | Some(LuaValue::Nil) => Ok(vec![]),
            Some(LuaValue::String(s)) => Ok(vec![
                s.to_str()
                    .map_err(|e| self.invalid(format!("field `{key}`: {e}")))?
                    .to_string(),
            ]),
            Some(LuaValue::Table(t)) => t
                .sequence_values::<String>()
                .collect::<LuaResult<Vec<_>>>()
                .map_err(|e| self.invalid(format!("field `{key}`: {e}"))),
            Some(other) => Err(self.invalid(format!(
                "field `{key}` must be a string or a list of strings, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn function(&self, key: &str) -> Result<Option<LuaFunction>> {
        self.optional::<LuaFunction>(key)
    }

    pub fn permissions(&self, key: &str) -> Result<serenity::all::Permissions> {
        permissions::parse_permissions(&self.string_list(key)?)
            .map_err(|e| self.invalid(format!("field `{key}`: {e}")))
    }

    /// Cooldown in (possibly fractional) seconds; must be finite and non-negative.
    pub fn cooldown(&self, key: &str) -> Result<Duration> {
        match self.optional::<f64>(key)? {
            None => Ok(Duration::ZERO),
            Some(secs) => Duration::try_from_secs_f64(secs).map_err(|_| {
                self.invalid(format!(
                    "field `{key}` must be a non-negative number of seconds, got {secs}"
                ))
            }),
        }
    }

    pub fn channel_scope(&self, key: &str) -> Result<ChannelScope> {
        match self.optional::<String>(key)? {
            None => Ok(ChannelScope::Any),
            Some(value) => ChannelScope::parse(&value)
                .ok_or_else(|| self.invalid(format!("field `{key}`: unknown channel scope `{value}`"))),
        }
    }

    /// The gating fields shared by commands and components.
    pub fn gating(&self) -> Result<Gating> {
        Ok(Gating {
            admin_only: self.bool_or("admin_only", false)?,
            channel_scope: self.channel_scope("channel")?,
            user_permissions: self.permissions("user_permissions")?,
            client_permissions: self.permissions("client_permissions")?,
            cooldown: self.cooldown("cooldown")?,
        })
    }
}
