//! NewType wrappers for the identifiers that live in the job tree.
//!
//! Job names, server IPs and instance ids are all plain strings in the
//! registry; these types keep them from being mixed up in the public API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LifecycleError, LifecycleResult};

/// Separator between the server IP and the pid in an instance id.
pub const INSTANCE_DELIMITER: &str = "@-@";

/// Server node value marking the job disabled on that server. Compared
/// case-insensitively on read.
pub const DISABLED_MARKER: &str = "DISABLED";

/// Instance node value asking the process to run the job once.
pub const TRIGGER_MARKER: &str = "TRIGGER";

/// Whether a server node value carries the disabled marker.
pub fn is_disabled_marker(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case(DISABLED_MARKER))
}

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Name of a job, unique within a tenant.
    JobName
);

newtype_string!(
    /// IP address a job server registered under.
    ServerIp
);

newtype_string!(
    /// Composite id of a live job process, `serverIp@-@pid`.
    ///
    /// The id is stored verbatim; use [`InstanceId::split`] to get at the
    /// two halves, which fails for ids without a pid.
    InstanceId
);

impl InstanceId {
    /// Split into `(server_ip, pid)`.
    pub fn split(&self) -> LifecycleResult<(&str, &str)> {
        split_instance_id(&self.0)
    }

    /// The server IP half of the id.
    pub fn server_ip(&self) -> LifecycleResult<&str> {
        self.split().map(|(ip, _)| ip)
    }
}

/// Split a raw instance id into `(server_ip, pid)`.
///
/// Both halves must be non-empty.
pub fn split_instance_id(raw: &str) -> LifecycleResult<(&str, &str)> {
    match raw.split_once(INSTANCE_DELIMITER) {
        Some((ip, pid)) if !ip.is_empty() && !pid.is_empty() => Ok((ip, pid)),
        _ => Err(LifecycleError::MalformedInstanceId(raw.to_string())),
    }
}
