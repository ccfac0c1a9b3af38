/// Failures raised by the engine's library crates: model backends, stores
/// and wiring. Turn-level outcomes live in the gateway's `TurnFailure`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failure talking to a model backend.
    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// The backend answered, but with an error or an unusable body.
    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Missing or unusable credentials for a model backend.
    #[error("auth: {0}")]
    Auth(String),

    /// No backend can serve the requested model or role.
    #[error("no model available: {0}")]
    NoModel(String),

    #[error("conversation {0} not found")]
    ConversationNotFound(String),

    /// An id that cannot be used as a storage key.
    #[error("invalid id {0:?}")]
    InvalidId(String),

    /// Persistence failed for a reason other than plain IO.
    #[error("store: {0}")]
    Store(String),

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    /// Failures worth reporting to a client as "try again later" rather
    /// than as a server bug.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout(_) | Error::Auth(_) | Error::NoModel(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_covers_backend_failures() {
        assert!(Error::NoModel("executor".into()).is_unavailable());
        assert!(Error::Timeout("60s".into()).is_unavailable());
        assert!(!Error::ConversationNotFound("c1".into()).is_unavailable());
        assert!(!Error::Store("disk".into()).is_unavailable());
    }

    #[test]
    fn messages_name_the_subject() {
        assert_eq!(Error::ConversationNotFound("c1".into()).to_string(), "conversation c1 not found");
        assert_eq!(Error::InvalidId("../x".into()).to_string(), "invalid id \"../x\"");
    }
}
