use crate::host::{AssetHandle, ObjectHandle};
use crate::module::ModuleState;

/// Alias for `Result<T, EngineError>`.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by hosts, module hooks, and package clients.
///
/// None of these abort a pass: the orchestrator logs them and records them
/// in the pass report.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The host has no object with this handle.
    #[error("unknown scene object {0}")]
    UnknownObject(ObjectHandle),

    /// The host has no asset with this handle.
    #[error("unknown asset {0}")]
    UnknownAsset(AssetHandle),

    /// A hook was called in a lifecycle state that does not allow it.
    #[error("module {module} cannot run {hook} while {state}")]
    InvalidState {
        /// Module id.
        module: String,
        /// Hook that was refused.
        hook: &'static str,
        /// State the module was in.
        state: ModuleState,
    },

    /// A module controller reported a failure.
    #[error("module {module}: {message}")]
    Module {
        /// Module id.
        module: String,
        /// What went wrong.
        message: String,
    },

    /// A package request could not be issued.
    #[error("package {package}: {message}")]
    Package {
        /// Package id.
        package: String,
        /// What went wrong.
        message: String,
    },
}
