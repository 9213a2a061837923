use http::Method;

pub type Result<T> = std::result::Result<T, NetError>;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown driver '{0}'")]
    UnsupportedDriver(String),

    #[error("Your system doesn't support the '{0}' driver")]
    DriverUnavailable(String),

    #[error("Unsupported HTTP method '{0}'")]
    UnsupportedMethod(Method),

    #[error("No request has been prepared")]
    NoPreparedRequest,

    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl NetError {
    /// True when the failure happened while talking to the remote end.
    pub fn is_transport(&self) -> bool {
        matches!(self, NetError::Transport(_))
    }
}

#[cfg(feature = "driver_curl")]
impl From<curl::Error> for NetError {
    fn from(e: curl::Error) -> Self {
        NetError::Transport(Box::new(e))
    }
}

#[cfg(feature = "driver_reqwest")]
impl From<reqwest::Error> for NetError {
    fn from(e: reqwest::Error) -> Self {
        NetError::Transport(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            NetError::UnsupportedDriver("socket".into()).to_string(),
            "Unknown driver 'socket'"
        );
        assert_eq!(
            NetError::UnsupportedMethod(Method::PATCH).to_string(),
            "Unsupported HTTP method 'PATCH'"
        );
    }

    #[test]
    fn only_transport_errors_report_as_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(NetError::Transport(Box::new(io)).is_transport());
        assert!(!NetError::NoPreparedRequest.is_transport());
    }
}
