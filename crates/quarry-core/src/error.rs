//! Error types for Quarry core operations.

use thiserror::Error;

/// Result type alias using [`CoreError`] as the error type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while preparing entry parameters.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A value could not be converted to the declared parameter type.
    #[error("Cannot coerce {value} to {type_name}: {message}")]
    Coercion {
        /// Declared parameter type.
        type_name: String,
        /// Offending value, rendered as JSON.
        value: String,
        /// Reason the conversion failed.
        message: String,
    },

    /// A parameter declared a type this client does not know.
    #[error("Unknown parameter type: {name}")]
    UnknownType {
        /// Type name as sent by the server.
        name: String,
    },

    /// A value falls outside the constraints of its parameter.
    #[error("Invalid value for parameter '{parameter}': {message}")]
    Constraint {
        /// Parameter name.
        parameter: String,
        /// Which constraint was violated.
        message: String,
    },
}

impl CoreError {
    pub(crate) fn coercion(
        type_name: impl Into<String>,
        value: &serde_json::Value,
        message: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            type_name: type_name.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_coercion() {
        let err = CoreError::coercion("int", &serde_json::json!("abc"), "invalid digit");
        assert_eq!(err.to_string(), "Cannot coerce \"abc\" to int: invalid digit");
    }

    #[test]
    fn test_error_display_unknown_type() {
        let err = CoreError::UnknownType {
            name: "tensor".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown parameter type: tensor");
    }
}
