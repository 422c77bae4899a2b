//! Error taxonomy for loading, registry and synchronization operations.
//!
//! Handler bodies and the remote API seam speak `anyhow`; everything the
//! registry itself can fail with is a [`RegistryError`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required collection, definition or command was absent.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// An argument required for permission synchronization was absent.
    #[error("missing reference: {0}")]
    MissingReference(&'static str),

    /// A module was loaded but did not satisfy its family's contract.
    #[error("invalid module {}: {reason}", path.display())]
    Validation { path: PathBuf, reason: String },

    /// Opaque failure reported by the remote platform.
    #[error("remote API call `{call}` failed: {source}")]
    Remote {
        call: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("lua error in {}: {source}", path.display())]
    Lua {
        path: PathBuf,
        #[source]
        source: mlua::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid module pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl RegistryError {
    pub fn validation(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn remote(call: &'static str, source: anyhow::Error) -> Self {
        Self::Remote { call, source }
    }

    /// Short static label, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::MissingReference(_) => "missing_reference",
            Self::Validation { .. } => "validation",
            Self::Remote { .. } => "remote",
            Self::Lua { .. } => "lua",
            Self::Io { .. } => "io",
            Self::Pattern(_) => "pattern",
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_the_module() {
        let err = RegistryError::validation("/bot/commands/ping.lua", "missing `name`");
        assert_eq!(
            err.to_string(),
            "invalid module /bot/commands/ping.lua: missing `name`"
        );
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn remote_keeps_the_source_error() {
        let err = RegistryError::remote("set_commands", anyhow::anyhow!("429 Too Many Requests"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("429 Too Many Requests"));
    }
}
