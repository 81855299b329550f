use thiserror::Error;

/// Every way a clock action can end badly. `Display` is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("You entered invalid email")]
    InvalidEmail,

    #[error("Subdomain field must contain data")]
    EmptySubdomain,

    #[error("Password field must contain data")]
    EmptyPassword,

    #[error("Please check your internet connection. Turn on Wi-Fi or mobile network.")]
    Offline,

    #[error("Authorization unsuccessful. Check your credentials and internet connection please. {reason}")]
    Auth { reason: String },

    #[error("Authorization unsuccessful. Check your credentials, please.")]
    Submit { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Connectivity,
    Auth,
    Submit,
}

impl ClockError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClockError::InvalidEmail | ClockError::EmptySubdomain | ClockError::EmptyPassword => ErrorCategory::Validation,
            ClockError::Offline => ErrorCategory::Connectivity,
            ClockError::Auth { .. } => ErrorCategory::Auth,
            ClockError::Submit { .. } => ErrorCategory::Submit,
        }
    }

    /// Text for the `error` field of a step report.
    pub fn reason(&self) -> String {
        match self {
            ClockError::Auth { reason } | ClockError::Submit { reason } => reason.clone(),
            other => other.to_string(),
        }
    }

    pub fn auth(reason: impl Into<String>) -> Self {
        ClockError::Auth { reason: reason.into() }
    }

    pub fn submit(reason: impl Into<String>) -> Self {
        ClockError::Submit { reason: reason.into() }
    }
}
