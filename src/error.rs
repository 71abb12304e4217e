//! Error types for the engine and host adapters.

use thiserror::Error;

use crate::engine::FiberId;

/// Failure reported by a host adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("unknown host node: {0}")]
    UnknownNode(String),

    #[error("cannot create a node for tag `{0}`")]
    InvalidTag(String),

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: String, child: String },

    #[error("host error: {0}")]
    Other(String),
}

/// Errors surfaced by [`Engine::work`](crate::Engine::work) and friends.
///
/// None of these are retried. A failure during the render phase discards the
/// work-in-progress tree; a failure during commit leaves the host partially
/// mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("host adapter failed: {0}")]
    Host(#[from] HostError),

    #[error("fiber {fiber:?} has no ancestor that owns a host node")]
    OrphanFiber { fiber: FiberId },

    #[error("fiber {fiber:?} is missing from the arena")]
    MissingFiber { fiber: FiberId },

    #[error("hook {index} in `{component}` changed state type between renders")]
    HookTypeMismatch {
        component: &'static str,
        index: usize,
    },

    #[error("`{component}` updated state while rendering")]
    UpdateDuringRender { component: &'static str },
}

pub type Result<T> = std::result::Result<T, EngineError>;
