use thiserror::Error;

use crate::providers::errors::ProviderError;

/// Failures inside a reply. Tool failures are reported back to the model as
/// `error: <display>` results; provider failures end the turn.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("unknown tool {0}")]
    ToolNotFound(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("{0}")]
    ExecutionError(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        assert_eq!(
            format!("error: {}", AgentError::ToolNotFound("fetch".into())),
            "error: unknown tool fetch"
        );
        assert_eq!(
            AgentError::ExecutionError("old_string not found".into()).to_string(),
            "old_string not found"
        );
        let provider = AgentError::from(ProviderError::Api {
            message: "overloaded".into(),
        });
        assert_eq!(provider.to_string(), "API Error: overloaded");
    }
}
