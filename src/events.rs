use std::path::{Path, PathBuf};

use crate::{
    constant::{family, field},
    error::Result,
    handler::{Executable, Keyed},
    loader::HandlerFamily,
    lua::{LoadedModule, LuaEntry},
    trigger::{Reply, Trigger},
};

/// A listener for one gateway event, named by `name` or its file stem.
pub struct EventListener {
    pub name: String,
    /// Fires at most once, then leaves the dispatch table
    pub once: bool,
    pub module_path: PathBuf,
    pub generation: u64,
    entry: LuaEntry,
}

impl HandlerFamily for EventListener {
    const FAMILY: &'static str = family::EVENT;

    fn construct(module: LoadedModule) -> Result<Self> {
        let fields = module.fields();
        let name = fields.string_or(field::NAME, &module.meta.file_stem)?;
        if name.is_empty() {
            return Err(fields.invalid("event listener has no name"));
        }
        Ok(Self {
            name,
            once: fields.bool_or("once", false)?,
            module_path: module.path.clone(),
            generation: module.generation,
            entry: LuaEntry::from_module(&module)?,
        })
    }
}

impl Keyed for EventListener {
    fn keys(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn module_path(&self) -> Option<&Path> {
        Some(&self.module_path)
    }
}

#[serenity::async_trait]
impl Executable for EventListener {
    async fn before(&self, trigger: &Trigger) -> anyhow::Result<()> {
        self.entry.before(trigger).await
    }

    async fn execute(&self, trigger: &Trigger) -> anyhow::Result<Option<Reply>> {
        self.entry.execute(trigger).await
    }
}
