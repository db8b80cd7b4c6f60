/// Result of one remote call, before any retry decision
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCallOutcome<T> {
    Success(T),
    /// Expected to succeed on a later attempt (service unavailable)
    TransientFailure { status: u16, message: String },
    /// Bad request, rejected credential, network failure
    PermanentFailure { status: Option<u16>, message: String },
    /// The response did not match the expected envelope
    MalformedResponse(String),
}

impl<T> RemoteCallOutcome<T> {
    /// Sort an HTTP error status into transient or permanent
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 503 {
            RemoteCallOutcome::TransientFailure { status, message }
        } else {
            RemoteCallOutcome::PermanentFailure {
                status: Some(status),
                message,
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteCallOutcome::TransientFailure { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteCallOutcome<U> {
        match self {
            RemoteCallOutcome::Success(v) => RemoteCallOutcome::Success(f(v)),
            RemoteCallOutcome::TransientFailure { status, message } => {
                RemoteCallOutcome::TransientFailure { status, message }
            }
            RemoteCallOutcome::PermanentFailure { status, message } => {
                RemoteCallOutcome::PermanentFailure { status, message }
            }
            RemoteCallOutcome::MalformedResponse(raw) => RemoteCallOutcome::MalformedResponse(raw),
        }
    }

    /// Collapse into a result, counting this as the only attempt
    pub fn into_result(self) -> Result<T, RemoteError> {
        match self {
            RemoteCallOutcome::Success(v) => Ok(v),
            RemoteCallOutcome::TransientFailure { status, message } => Err(RemoteError::Transient {
                status,
                message,
                attempts: 1,
            }),
            RemoteCallOutcome::PermanentFailure { status, message } => {
                Err(RemoteError::Permanent { status, message })
            }
            RemoteCallOutcome::MalformedResponse(raw) => Err(RemoteError::Malformed(raw)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("API error {status}: {message} (after {attempts} attempts)")]
    Transient {
        status: u16,
        message: String,
        attempts: u32,
    },

    #[error("{}", permanent_message(.status, .message))]
    Permanent { status: Option<u16>, message: String },

    #[error("Malformed response from API")]
    Malformed(String),
}

fn permanent_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("API error {status}: {message}"),
        None => message.to_string(),
    }
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Transient { status, .. } => Some(*status),
            RemoteError::Permanent { status, .. } => *status,
            RemoteError::Malformed(_) => None,
        }
    }

    /// 401/403 mean the stored key was rejected
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}
