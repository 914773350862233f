//! Bridge error types

use crate::config::ConfigError;
use crate::loader::LoadError;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised by the bridge.
///
/// Encoding and signature errors are raised before anything crosses the
/// boundary. `UnknownReturnKind` means the boundary speaks a different
/// protocol version and must not be retried.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The process-wide bridge was used before `init`
    #[error("BridgeNotInitialized: call jbridge::init() before invoking foreign code")]
    NotInitialized,

    /// Boundary library could not be loaded or bound
    #[error("Boundary load failed: {0}")]
    Load(#[from] LoadError),

    /// Configuration could not be read or is invalid
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Argument of a kind the wire format cannot carry
    #[error("UnsupportedArgumentType: argument {position} has unsupported kind {kind}")]
    UnsupportedArgumentType {
        /// Zero-based argument position
        position: usize,
        /// Kind of the offending value
        kind: String,
    },

    /// Array whose elements do not all share the first element's kind
    #[error(
        "HeterogeneousArrayError: argument {position} element {index} is {found}, expected {expected}"
    )]
    HeterogeneousArray {
        /// Zero-based argument position
        position: usize,
        /// Index of the first mismatching element
        index: usize,
        /// Kind set by the first element
        expected: &'static str,
        /// Kind of the mismatching element
        found: &'static str,
    },

    /// The foreign runtime threw during the call
    #[error("ForeignInvocationError: {message}")]
    ForeignInvocation {
        /// Message text as reported by the foreign runtime
        message: String,
    },

    /// The boundary returned a tag outside the protocol
    #[error("UnknownReturnKind: boundary returned tag {tag}")]
    UnknownReturnKind {
        /// Raw tag value
        tag: i32,
    },

    /// A valid tag arrived where the call required a different kind
    #[error("Unexpected return kind: expected {expected}, got {found}")]
    UnexpectedReturn {
        /// Kind the call site required
        expected: &'static str,
        /// Kind that was decoded
        found: &'static str,
    },

    /// Envelope fields inconsistent with its tag
    #[error("Malformed return envelope: {0}")]
    MalformedEnvelope(String),

    /// Object handle used after it was released
    #[error("Object handle used after release")]
    HandleReleased,

    /// Proxy path could not be resolved
    #[error("Invalid proxy path: {0}")]
    InvalidPath(String),

    /// Argument count does not fit the wire's `argc`
    #[error("Too many arguments: {0}")]
    TooManyArguments(usize),
}

impl BridgeError {
    /// Whether the error came from the foreign runtime rather than the bridge
    pub fn is_foreign(&self) -> bool {
        matches!(self, BridgeError::ForeignInvocation { .. })
    }

    /// Whether the error indicates a protocol mismatch with the boundary
    pub fn is_protocol_mismatch(&self) -> bool {
        matches!(
            self,
            BridgeError::UnknownReturnKind { .. } | BridgeError::MalformedEnvelope(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_taxonomy() {
        assert!(BridgeError::NotInitialized
            .to_string()
            .starts_with("BridgeNotInitialized"));

        let err = BridgeError::ForeignInvocation {
            message: "java.lang.ArithmeticException: / by zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ForeignInvocationError: java.lang.ArithmeticException: / by zero"
        );
        assert!(err.is_foreign());

        let err = BridgeError::UnknownReturnKind { tag: 77 };
        assert!(err.to_string().contains("77"));
        assert!(err.is_protocol_mismatch());
    }
}
