use crate::api;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] api::Error),

    #[error("Another submission is still in progress")]
    Busy,
}

impl Error {
    pub fn api(&self) -> Option<&api::Error> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Text to show to the user for this error
    ///
    /// The server's own message wins. Errors caught before sending anything
    /// describe themselves. Anything else (transport failures, unexplained
    /// statuses) gets the operation's `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Api(api::Error::Remote {
                message: Some(msg), ..
            }) => msg.clone(),
            Error::Api(e) if e.is_local() => e.to_string(),
            Error::Busy => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}
