use std::path::PathBuf;

use uuid::Uuid;

pub type Res<T> = Result<T, Error>;

/// Shorthand for rejecting a command with a message for the player.
pub fn err<T, S: ToString>(message: S) -> Res<T> {
    Err(Error::Validation(message.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown set: {0}")]
    UnknownSet(String),

    #[error("set {set} has no booster configurations")]
    NoBoosters { set: String },

    #[error("packs of {set} have no cards")]
    EmptyPack { set: String },

    #[error("sheet {sheet} is malformed: {message}")]
    MalformedSheet { sheet: String, message: String },

    #[error("sheet {sheet} could not be colour balanced after {attempts} attempts")]
    Unbalanceable { sheet: String, attempts: usize },

    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to download {uri}: {message}")]
    Download { uri: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A player command that can't be applied. Seat state is unchanged.
    #[error("{0}")]
    Validation(String),

    /// The pack circulation protocol was broken, e.g. a stale pack arrived.
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("seat {0} is no longer drafting")]
    SeatClosed(Uuid),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    Validation,
    Protocol,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(ConfigError::UnknownSet(_)) => ErrorKind::NotFound,
            Error::Config(_) => ErrorKind::Configuration,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Protocol(_) | Error::SeatClosed(_) => ErrorKind::Protocol,
        }
    }
}
