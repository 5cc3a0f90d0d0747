//! Session error types

use thiserror::Error;

/// Errors that can occur while talking to a tool host
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to connect to tool host '{command}': {reason}")]
    Connection { command: String, reason: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Not connected to a tool host")]
    NotConnected,

    #[error("Already connected to a tool host")]
    AlreadyConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Tool '{name}' failed: {detail}")]
    ToolExecution { name: String, detail: String },
}

impl SessionError {
    /// Whether this error concerns a single tool call rather than the session
    ///
    /// Call-local errors are reported back to the model as that call's result.
    pub fn is_call_local(&self) -> bool {
        matches!(self, SessionError::ToolExecution { .. } | SessionError::Protocol(_))
    }

    /// Whether the session is unusable after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Connection { .. } | SessionError::NotConnected | SessionError::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_execution_message() {
        let err = SessionError::ToolExecution {
            name: "divide".to_string(),
            detail: "division by zero".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("divide"));
        assert!(msg.contains("division by zero"));
    }

    #[test]
    fn test_classification() {
        assert!(
            SessionError::ToolExecution {
                name: "x".to_string(),
                detail: "y".to_string()
            }
            .is_call_local()
        );
        assert!(SessionError::Protocol("bad".to_string()).is_call_local());
        assert!(!SessionError::Transport("eof".to_string()).is_call_local());

        assert!(SessionError::Transport("eof".to_string()).is_fatal());
        assert!(SessionError::NotConnected.is_fatal());
        assert!(!SessionError::Protocol("bad".to_string()).is_fatal());
    }
}
