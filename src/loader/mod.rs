//! Directory-driven handler loading, shared by every handler family.

use std::{
    collections::BTreeMap,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::{
    error::{RegistryError, Result},
    handler::Keyed,
    lua::{LoadedModule, LuaHost},
};

mod cache;

pub use cache::ModuleCache;

/// File extensions recognised as handler modules.
pub const MODULE_EXTENSIONS: &[&str] = &["lua", "luau"];

/// Handlers of one family, keyed by their dispatch keys.
pub type Collection<H> = BTreeMap<String, Arc<H>>;

/// A kind of handler the loader can construct from a module.
pub trait HandlerFamily: Keyed + Send + Sync + Sized + 'static {
    /// Reported to modules as `meta.family` and used in logs.
    const FAMILY: &'static str;

    fn construct(module: LoadedModule) -> Result<Self>;
}

/// Lists every module under `dir` at any depth, in traversal order.
///
/// A missing directory has no modules.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "handler directory does not exist");
        return Ok(vec![]);
    }

    let root = glob::Pattern::escape(&dir.to_string_lossy());
    let mut paths = vec![];
    for extension in MODULE_EXTENSIONS {
        for entry in glob::glob(&format!("{root}/**/*.{extension}"))? {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "skipping unreadable path"),
            }
        }
    }
    paths.sort();
    Ok(paths)
}

pub struct Loader<H> {
    host: LuaHost,
    cache: ModuleCache,
    family: PhantomData<fn() -> H>,
}

impl<H: HandlerFamily> Loader<H> {
    pub fn new(host: LuaHost) -> Self {
        Self {
            host,
            cache: ModuleCache::default(),
            family: PhantomData,
        }
    }

    /// Loads every module under `dir` into a fresh collection.
    ///
    /// Sources are re-read from disk. Modules that fail to load are reported
    /// and skipped; on a key collision the later module in traversal order wins.
    pub fn load_all(&mut self, dir: &Path) -> Result<Collection<H>> {
        self.cache.clear();

        let mut collection = Collection::new();
        for path in discover(dir)? {
            match self.load(&path) {
                Ok(handler) => {
                    for key in handler.keys() {
                        if collection.insert(key.clone(), handler.clone()).is_some() {
                            warn!(
                                family = H::FAMILY,
                                key = %key,
                                path = %path.display(),
                                "duplicate handler key, keeping the later module"
                            );
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        family = H::FAMILY,
                        path = %path.display(),
                        kind = err.kind(),
                        error = %err,
                        "skipping handler module"
                    );
                }
            }
        }

        info!(
            family = H::FAMILY,
            dir = %dir.display(),
            count = collection.len(),
            "loaded handlers"
        );
        Ok(collection)
    }

    /// Constructs one handler from `path`, using the cached source if present.
    pub fn load(&mut self, path: &Path) -> Result<Arc<H>> {
        let path = std::path::absolute(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (source, generation) = self.cache.fetch(&path)?;
        let module = self.host.construct(H::FAMILY, &path, &source, generation)?;
        Ok(Arc::new(H::construct(module)?))
    }

    /// Forgets the cached source so the next load re-reads it.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.cache.invalidate(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lua::Fields;

    /// Minimal family: keyed by `name`, remembers where it came from.
    pub(crate) struct Named {
        pub name: String,
        pub note: Option<String>,
        pub path: PathBuf,
        pub generation: u64,
    }

    impl Keyed for Named {
        fn keys(&self) -> Vec<String> {
            vec![self.name.clone()]
        }

        fn module_path(&self) -> Option<&Path> {
            Some(&self.path)
        }
    }

    impl HandlerFamily for Named {
        const FAMILY: &'static str = "named";

        fn construct(module: LoadedModule) -> Result<Self> {
            let fields = Fields::new(&module.table, &module.path);
            Ok(Self {
                name: fields.required_string("name")?,
                note: fields.optional("note")?,
                path: module.path.clone(),
                generation: module.generation,
            })
        }
    }

    pub(crate) fn write(dir: &Path, relative: &str, source: &str) -> PathBuf {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn discovers_nested_modules_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.lua", "return {}");
        write(dir.path(), "a/deep/c.luau", "return {}");
        write(dir.path(), "a/readme.md", "not a module");

        let found: Vec<_> = discover(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            found,
            vec![PathBuf::from("a/deep/c.luau"), PathBuf::from("b.lua")]
        );
    }

    #[test]
    fn missing_directory_is_empty() {
        let mut loader = Loader::<Named>::new(LuaHost::default());
        let collection = loader.load_all(Path::new("/no/such/handlers")).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn later_module_wins_collisions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/ping.lua", r#"return { name = "ping", note = "first" }"#);
        write(dir.path(), "b/ping.lua", r#"return { name = "ping", note = "second" }"#);

        let mut loader = Loader::<Named>::new(LuaHost::default());
        let collection = loader.load_all(dir.path()).unwrap();

        assert_eq!(collection.len(), 1);
        let ping = &collection["ping"];
        assert_eq!(ping.note.as_deref(), Some("second"));
        assert!(ping.path.ends_with("b/ping.lua"));
        assert!(ping.path.is_absolute());
    }

    #[test]
    fn invalid_modules_do_not_abort_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.lua", r#"return { name = "good" }"#);
        write(dir.path(), "nameless.lua", r#"return { note = "no key" }"#);
        write(dir.path(), "broken.lua", "return {");

        let mut loader = Loader::<Named>::new(LuaHost::default());
        let collection = loader.load_all(dir.path()).unwrap();
        assert_eq!(collection.keys().collect::<Vec<_>>(), vec!["good"]);
    }

    #[test]
    fn reload_rereads_after_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "x.lua", r#"return { name = "x", note = "v1" }"#);

        let mut loader = Loader::<Named>::new(LuaHost::default());
        let first = loader.load(&path).unwrap();

        write(dir.path(), "x.lua", r#"return { name = "x", note = "v2" }"#);
        assert_eq!(loader.load(&path).unwrap().note.as_deref(), Some("v1"));

        assert!(loader.invalidate(&first.path));
        let second = loader.load(&path).unwrap();
        assert_eq!(second.note.as_deref(), Some("v2"));
        assert!(second.generation > first.generation);
    }

    #[test]
    fn load_all_is_a_full_reload() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.lua", r#"return { name = "x", note = "v1" }"#);

        let mut loader = Loader::<Named>::new(LuaHost::default());
        loader.load_all(dir.path()).unwrap();

        write(dir.path(), "x.lua", r#"return { name = "x", note = "v2" }"#);
        write(dir.path(), "y.lua", r#"return { name = "y" }"#);
        let collection = loader.load_all(dir.path()).unwrap();
        assert_eq!(collection["x"].note.as_deref(), Some("v2"));
        assert_eq!(collection.len(), 2);
    }
}
