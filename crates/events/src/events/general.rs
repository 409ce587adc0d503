use serde::{Deserialize, Serialize};

/// Operation lifecycle and warnings not tied to one domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// Recoverable problem; the operation continues
    Warning {
        message: String,
        context: Option<String>,
    },

    OperationStarted { operation: String },

    OperationCompleted { operation: String, success: bool },

    OperationFailed { operation: String, error: String },
}

impl GeneralEvent {
    pub fn warning_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: Some(context.into()),
        }
    }
}
