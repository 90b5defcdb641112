use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

/// Malformed configuration, detected before any connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown recognition option: {0}")]
    UnknownOption(String),

    #[error("invalid duration for '{field}': {value:?} (expected e.g. \"7s\" or \"0.5s\")")]
    InvalidDuration { field: String, value: String },

    #[error("invalid value for '{field}': expected {expected}")]
    InvalidValue {
        field: String,
        expected: &'static str,
    },

    #[error("unknown audio encoding: {0} (expected one of pcm, opus, mp3, flac, alaw, mulaw)")]
    UnknownEncoding(String),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("client certificate and private key must be given together")]
    IncompleteIdentity,
}

/// Every way a client invocation can fail.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("RPC error: code = {code:?}, details = {message}")]
    Transport { code: tonic::Code, message: String },

    #[error("{0}")]
    Application(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task {task_id} has failed: {message}")]
    TaskFailed { task_id: String, message: String },
}

impl ClientError {
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application(message.into())
    }
}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        Self::Transport {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_transport_error() {
        let err = ClientError::from(tonic::Status::unauthenticated("bad token"));
        match err {
            ClientError::Transport { code, message } => {
                assert_eq!(code, tonic::Code::Unauthenticated);
                assert_eq!(message, "bad token");
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn test_transport_error_display_carries_code_and_detail() {
        let err = ClientError::from(tonic::Status::unavailable("connection refused"));
        let text = err.to_string();
        assert!(text.contains("Unavailable"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_validation_error_converts() {
        let err: ClientError = ValidationError::UnknownOption("colour".to_string()).into();
        assert!(matches!(err, ClientError::Validation(ValidationError::UnknownOption(_))));
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_invalid_duration_names_field() {
        let err = ValidationError::InvalidDuration {
            field: "no_speech_timeout".to_string(),
            value: "7x".to_string(),
        };
        assert!(err.to_string().contains("no_speech_timeout"));
        assert!(err.to_string().contains("7x"));
    }
}
