//! Luau hosting for handler modules.
//!
//! Every module gets its own sandboxed state, so reloading one module never
//! disturbs the others. A module's chunk returns either the handler table
//! itself or a constructor `function(client, meta)` returning it.

use std::path::{Path, PathBuf};

use mlua::{LuaSerdeExt as _, prelude::*};
use serde::Serialize;

use crate::error::{RegistryError, Result};

mod entry;
mod fields;
mod globals;

pub use entry::LuaEntry;
pub use fields::Fields;

/// What modules see as their `client` construction argument.
#[derive(Serialize, Debug, Clone, Default)]
pub struct ClientInfo {
    pub name: String,
    pub prefix: String,
    pub admin_ids: Vec<String>,
}

/// Family metadata handed to constructors as `meta`.
#[derive(Serialize, Debug, Clone)]
pub struct ModuleMeta {
    pub family: &'static str,
    pub path: String,
    pub file_stem: String,
    pub category: String,
}

impl ModuleMeta {
    pub fn for_path(family: &'static str, path: &Path) -> Self {
        let file_stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let category = path
            .parent()
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            family,
            path: path.display().to_string(),
            file_stem,
            category,
        }
    }
}

/// A module after its chunk ran and its handler table was produced.
pub struct LoadedModule {
    pub lua: Lua,
    pub table: LuaTable,
    pub path: PathBuf,
    pub meta: ModuleMeta,
    pub generation: u64,
}

impl LoadedModule {
    pub fn fields(&self) -> Fields<'_> {
        Fields::new(&self.table, &self.path)
    }
}

#[derive(Clone, Default)]
pub struct LuaHost {
    client: ClientInfo,
}

impl LuaHost {
    pub fn new(client: ClientInfo) -> Self {
        Self { client }
    }

    /// Runs `source` in a fresh sandbox and applies the construction contract.
    pub fn construct(
        &self,
        family: &'static str,
        path: &Path,
        source: &str,
        generation: u64,
    ) -> Result<LoadedModule> {
        let lua_err = |source| RegistryError::Lua {
            path: path.to_path_buf(),
            source,
        };

        let lua = create_sandbox(path).map_err(lua_err)?;
        let meta = ModuleMeta::for_path(family, path);

        let value = lua
            .load(source)
            .set_name(path.display().to_string())
            .eval::<LuaValue>()
            .map_err(lua_err)?;

        let table = match value {
            LuaValue::Table(table) => table,
            LuaValue::Function(constructor) => {
                let client = lua.to_value(&self.client).map_err(lua_err)?;
                let meta = lua.to_value(&meta).map_err(lua_err)?;
                match constructor
                    .call::<LuaValue>((client, meta))
                    .map_err(lua_err)?
                {
                    LuaValue::Table(table) => table,
                    other => {
                        return Err(RegistryError::validation(
                            path,
                            format!("constructor returned {}, expected a table", other.type_name()),
                        ));
                    }
                }
            }
            other => {
                return Err(RegistryError::validation(
                    path,
                    format!(
                        "module returned {}, expected a table or a constructor function",
                        other.type_name()
                    ),
                ));
            }
        };

        Ok(LoadedModule {
            lua,
            table,
            path: path.to_path_buf(),
            meta,
            generation,
        })
    }
}

fn create_sandbox(path: &Path) -> mlua::Result<Lua> {
    let lua = Lua::new_with(
        {
            use mlua::StdLib as SL;
            SL::COROUTINE | SL::MATH | SL::STRING | SL::TABLE | SL::UTF8 | SL::VECTOR
        },
        mlua::LuaOptions::new().catch_rust_panics(true),
    )?;
    globals::register(&lua, path)?;
    Ok(lua)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> LuaHost {
        LuaHost::new(ClientInfo {
            name: "testbot".into(),
            prefix: "?".into(),
            admin_ids: vec!["1".into()],
        })
    }

    #[test]
    fn plain_table_module() {
        let module = host()
            .construct(
                "command",
                Path::new("/bot/commands/util/ping.lua"),
                r#"return { name = "ping", execute = function() end }"#,
                3,
            )
            .unwrap();
        assert_eq!(module.table.get::<String>("name").unwrap(), "ping");
        assert_eq!(module.meta.category, "util");
        assert_eq!(module.meta.file_stem, "ping");
        assert_eq!(module.generation, 3);
    }

    #[test]
    fn constructor_receives_client_and_meta() {
        let module = host()
            .construct(
                "event",
                Path::new("/bot/events/ready.lua"),
                r#"
return function(client, meta)
    return { name = client.name .. ":" .. meta.family .. ":" .. meta.file_stem, prefix = client.prefix }
end
"#,
                0,
            )
            .unwrap();
        assert_eq!(
            module.table.get::<String>("name").unwrap(),
            "testbot:event:ready"
        );
        assert_eq!(module.table.get::<String>("prefix").unwrap(), "?");
    }

    #[test]
    fn non_table_module_is_rejected() {
        let Err(err) = host().construct("command", Path::new("/x.lua"), "return 42", 0) else {
            panic!("expected a validation error");
        };
        assert!(matches!(err, RegistryError::Validation { .. }));
    }

    #[test]
    fn syntax_error_is_a_lua_error() {
        let Err(err) = host().construct("command", Path::new("/x.lua"), "return {", 0) else {
            panic!("expected a lua error");
        };
        assert!(matches!(err, RegistryError::Lua { .. }));
    }
}
