use thiserror::Error;

/// Main error type for the StudyLens system
#[derive(Error, Debug)]
pub enum SlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{backend} visualisation backend is not implemented")]
    NotImplemented { backend: String },

    #[error("{object} has no attribute '{attribute}'")]
    MissingAttribute {
        object: &'static str,
        attribute: &'static str,
    },

    #[error("Tracking error: {0}")]
    Track(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for StudyLens operations
pub type SlResult<T> = Result<T, SlError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::SlError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SlError::NotImplemented {
            backend: "bokeh".to_string(),
        };
        assert!(error.to_string().contains("bokeh"));
        assert!(error.to_string().contains("not implemented"));
    }

    #[test]
    fn test_missing_attribute_display() {
        let error = SlError::MissingAttribute {
            object: "FrozenTrial",
            attribute: "value",
        };
        assert!(error.to_string().contains("FrozenTrial"));
        assert!(error.to_string().contains("value"));
    }

    #[test]
    fn test_config_macro() {
        let err = config_error!("bad frequency: {}", 0);
        match err {
            SlError::Config(msg) => assert!(msg.contains("bad frequency")),
            _ => panic!("expected Config error"),
        }
    }
}
