use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the engine's entry points.
///
/// Problems local to a single element (unknown type, failed widget parse,
/// name conflicts) are logged and skipped rather than reported here.
#[derive(Debug, Error)]
pub enum GuiError {
    #[error("script error: {0}")]
    Script(#[from] mlua::Error),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the scene script did not define a global `layout` table")]
    MissingLayout,

    #[error("the root element could not be parsed")]
    UnparsedRoot,

    #[error("failed to load extension library {path:?}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("extension \"{name}\" is malformed: {reason}")]
    MalformedExtension { name: String, reason: &'static str },

    #[error("an extension named \"{0}\" is already registered")]
    DuplicateExtension(String),

    #[error("no scene has been built yet")]
    NoSource,
}

pub type Result<T> = std::result::Result<T, GuiError>;
