use thiserror::Error;

use crate::state::{SourceKind, TabId};

/// Errors raised by the switcher core and its collaborators.
///
/// Only `TabManager`, `Io` and `Json` ever reach a caller; the rest are
/// logged and degrade to an empty or unchanged view.
#[derive(Debug, Error)]
pub enum SwitcherError {
    #[error("no node with id {0}")]
    NotFound(TabId),

    #[error("{source_kind:?} source failed: {message}")]
    SourceFailure {
        source_kind: SourceKind,
        message: String,
    },

    #[error("tab manager: {0}")]
    TabManager(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SwitcherError>;
