//! Error types for lifecycle operations.

use std::fmt;

/// Errors that can occur while reading or mutating the job tree.
#[derive(Debug, Clone)]
pub enum LifecycleError {
    /// A fan-out operation was called without a job or a server selector.
    MissingSelector,

    /// An instance id did not follow the `serverIp@-@pid` grammar.
    MalformedInstanceId(String),

    /// A sharding item node name was not a non-negative integer.
    InvalidShardingItem(String),

    /// The job config node held a document that could not be parsed.
    InvalidConfig {
        /// Job whose config is broken
        job_name: String,
        /// Parser message
        message: String,
    },

    /// The registry call itself failed.
    Registry(String),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSelector => write!(f, "At least indicate job name or server ip"),
            Self::MalformedInstanceId(id) => write!(f, "Malformed instance id: {}", id),
            Self::InvalidShardingItem(item) => write!(f, "Invalid sharding item: {}", item),
            Self::InvalidConfig { job_name, message } => {
                write!(f, "Invalid config for job {}: {}", job_name, message)
            }
            Self::Registry(msg) => write!(f, "Registry error: {}", msg),
        }
    }
}

impl std::error::Error for LifecycleError {}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

impl From<anyhow::Error> for LifecycleError {
    fn from(err: anyhow::Error) -> Self {
        Self::Registry(err.to_string())
    }
}

impl LifecycleError {
    /// Whether the caller supplied a bad request, as opposed to the
    /// registry or its contents being at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingSelector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            LifecycleError::MissingSelector.to_string(),
            "At least indicate job name or server ip"
        );
        assert_eq!(
            LifecycleError::MalformedInstanceId("10.0.0.1".to_string()).to_string(),
            "Malformed instance id: 10.0.0.1"
        );
        assert_eq!(
            LifecycleError::InvalidConfig {
                job_name: "myJob".to_string(),
                message: "missing field `cron`".to_string(),
            }
            .to_string(),
            "Invalid config for job myJob: missing field `cron`"
        );
    }

    #[test]
    fn test_from_anyhow() {
        let err: LifecycleError = anyhow::anyhow!("connection reset").into();
        assert!(matches!(err, LifecycleError::Registry(ref msg) if msg == "connection reset"));
        assert!(!err.is_client_error());
        assert!(LifecycleError::MissingSelector.is_client_error());
    }
}
