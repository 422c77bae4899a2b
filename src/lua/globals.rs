use std::path::Path;

/// Installs `sleep`, `yield`, `print` and the `log` table.
///
/// `print` and `log.*` go to `tracing`, tagged with the module's path.
pub fn register(lua: &mlua::Lua, path: &Path) -> mlua::Result<()> {
    let module = path.display().to_string();

    lua.globals().set(
        "sleep",
        lua.create_async_function(|_lua, ms: u32| async move {
            tokio::time::sleep(std::time::Duration::from_millis(ms as u64)).await;
            Ok(())
        })?,
    )?;

    lua.globals().set(
        "yield",
        lua.globals()
            .get("coroutine")
            .and_then(|c: mlua::Table| c.get::<mlua::Function>("yield"))?,
    )?;

    let print_module = module.clone();
    lua.globals().set(
        "print",
        lua.create_function(move |_lua, values: mlua::Variadic<String>| {
            let output = values.into_iter().collect::<Vec<_>>().join("\t");
            tracing::info!(module = %print_module, "{output}");
            Ok(())
        })?,
    )?;

    let log = lua.create_table()?;
    macro_rules! level {
        ($name:literal, $macro:ident) => {{
            let module = module.clone();
            log.set(
                $name,
                lua.create_function(move |_lua, message: String| {
                    tracing::$macro!(module = %module, "{message}");
                    Ok(())
                })?,
            )?;
        }};
    }
    level!("debug", debug);
    level!("info", info);
    level!("warn", warn);
    level!("error", error);
    lua.globals().set("log", log)?;

    Ok(())
}
