// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

/// Result type for worker hooks.
pub type WorkResult<T = ()> = std::result::Result<T, WorkError>;

/// How the manager reacts to a failed `work()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The worker keeps running and tries again on the next trigger.
    Transient,
    /// The worker stops after `on_shutdown()`.
    Fatal,
}

/// Error returned from [`Worker`](crate::Worker) hooks.
///
/// ```rust
/// use addrpool_common_worker::{WorkError, WorkResult};
///
/// fn checkpoint(store_ok: bool) -> WorkResult {
///     if !store_ok {
///         return Err(WorkError::transient("store busy, retry next tick"));
///     }
///     Ok(())
/// }
/// # assert!(checkpoint(false).unwrap_err().is_transient());
/// ```
#[derive(Debug)]
pub struct WorkError {
    severity: ErrorSeverity,
    message:  String,
    source:   Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl WorkError {
    pub fn transient(message: impl Into<String>) -> Self {
        WorkError {
            severity: ErrorSeverity::Transient,
            message:  message.into(),
            source:   None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        WorkError {
            severity: ErrorSeverity::Fatal,
            message:  message.into(),
            source:   None,
        }
    }

    pub fn transient_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WorkError {
            severity: ErrorSeverity::Transient,
            message:  message.into(),
            source:   Some(Box::new(source)),
        }
    }

    pub fn fatal_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WorkError {
            severity: ErrorSeverity::Fatal,
            message:  message.into(),
            source:   Some(Box::new(source)),
        }
    }

    pub const fn severity(&self) -> ErrorSeverity { self.severity }

    pub fn is_fatal(&self) -> bool { self.severity == ErrorSeverity::Fatal }

    pub fn is_transient(&self) -> bool { self.severity == ErrorSeverity::Transient }

    pub fn message(&self) -> &str { &self.message }
}

impl fmt::Display for WorkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            ErrorSeverity::Transient => "transient",
            ErrorSeverity::Fatal => "fatal",
        };
        write!(f, "[{}] {}", severity, self.message)
    }
}

impl std::error::Error for WorkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn display_includes_severity() {
        assert_eq!(WorkError::fatal("boom").to_string(), "[fatal] boom");
        assert_eq!(WorkError::transient("later").to_string(), "[transient] later");
    }

    #[test]
    fn source_is_preserved() {
        let io = std::io::Error::other("disk");
        let err = WorkError::transient_with_source("checkpoint failed", io);
        assert!(err.is_transient());
        assert_eq!(err.source().unwrap().to_string(), "disk");
    }
}
