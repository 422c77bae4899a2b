use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::error::{RegistryError, Result};

struct CachedSource {
    text: Arc<str>,
    generation: u64,
}

/// Source text of loaded modules, keyed by absolute path.
///
/// Every invalidation bumps the generation, so instances constructed from a
/// re-read source carry a newer generation than the ones they replace.
#[derive(Default)]
pub struct ModuleCache {
    entries: HashMap<PathBuf, CachedSource>,
    generation: u64,
}

impl ModuleCache {
    /// Returns the cached source for `path`, reading it on a miss.
    pub fn fetch(&mut self, path: &Path) -> Result<(Arc<str>, u64)> {
        if let Some(cached) = self.entries.get(path) {
            return Ok((cached.text.clone(), cached.generation));
        }

        let text: Arc<str> = std::fs::read_to_string(path)
            .map_err(|source| RegistryError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .into();
        self.entries.insert(
            path.to_path_buf(),
            CachedSource {
                text: text.clone(),
                generation: self.generation,
            },
        );
        Ok((text, self.generation))
    }

    /// Evicts `path`; returns whether it was cached.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.generation += 1;
        self.entries.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.entries.clear();
    }
}
