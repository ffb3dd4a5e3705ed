use df_core::GraphError;

/// Alias for `Result<T, EngineError>`.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by the dialogue engine.
///
/// None of these are fatal: after any error the engine is either idle or
/// still in the session it was in before the call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The call needs an active dialogue but the engine is idle.
    #[error("no dialogue is active")]
    NotActive,

    /// The choice index is outside the choices currently presented.
    #[error("invalid choice index {index}: {available} choice(s) available")]
    InvalidChoiceIndex {
        /// The index that was requested.
        index: usize,
        /// How many choices are currently presented.
        available: usize,
    },

    /// A node could not be loaded or failed validation.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl EngineError {
    /// Whether the error is an unknown node id.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Graph(GraphError::NotFound(_)))
    }

    /// Whether the error is a node that failed validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Graph(GraphError::Validation { .. }))
    }
}
