//! Error types for tessel.
//!
//! Construction problems (degenerate grid descriptors, malformed polygon input)
//! surface as [`MeshError::InvalidTopology`]. Local edits that would break the
//! manifold surface surface as [`MeshError::InvalidOperation`]. Attribute arrays
//! that do not match their topology surface as
//! [`MeshError::PreconditionViolation`].

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while building, mutating or indexing a topology.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A topology cannot be built from the given description.
    #[error("invalid topology: {reason}")]
    InvalidTopology {
        /// Why the description was rejected.
        reason: String,
    },

    /// A mutation was requested that would break the manifold structure.
    #[error("invalid operation: {reason}")]
    InvalidOperation {
        /// Why the operation was rejected.
        reason: String,
    },

    /// An input does not match the topology it is used with.
    #[error("precondition violated: {what} has length {actual}, expected {expected}")]
    PreconditionViolation {
        /// The offending input.
        what: &'static str,
        /// The length required by the topology.
        expected: usize,
        /// The length that was supplied.
        actual: usize,
    },

    /// The topology failed a consistency check.
    #[error("mesh has non-manifold topology: {details}")]
    NonManifold {
        /// Description of the non-manifold condition.
        details: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid topology error.
    pub fn invalid_topology(reason: impl Into<String>) -> Self {
        MeshError::InvalidTopology {
            reason: reason.into(),
        }
    }

    /// Create an invalid operation error.
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        MeshError::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Create a non-manifold error.
    pub fn non_manifold(details: impl Into<String>) -> Self {
        MeshError::NonManifold {
            details: details.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Check that an attribute array has the length the topology requires.
    pub fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(MeshError::PreconditionViolation {
                what,
                expected,
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(MeshError::check_len("positions", 3, 3).is_ok());
        let err = MeshError::check_len("positions", 3, 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "precondition violated: positions has length 2, expected 3"
        );
    }

    #[test]
    fn test_display() {
        let err = MeshError::invalid_operation("vertex V(1) has only two neighbors");
        assert_eq!(
            err.to_string(),
            "invalid operation: vertex V(1) has only two neighbors"
        );
    }
}
