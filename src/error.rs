pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    General(String),
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
    #[error("Expected (N, 3) array, got shape {0:?}")]
    PointShape(Vec<usize>),
    #[error("{0}")]
    Unsupported(String),
    #[error("{message}: {uri}")]
    InvalidUri { message: String, uri: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] ureq::Error),
    #[error(transparent)]
    Wrapped(Box<dyn std::error::Error>),
}

impl Error {
    pub fn general(message: impl Into<String>) -> Self {
        Self::General(message.into())
    }

    pub fn wrap(error: impl std::error::Error + 'static) -> Self {
        Self::Wrapped(Box::new(error))
    }

    pub(crate) fn invalid_uri(message: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::InvalidUri {
            message: message.into(),
            uri: uri.into(),
        }
    }
}
