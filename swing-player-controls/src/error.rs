use snafu::prelude::*;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{message}"))]
    Client {
        message: String,
    },
    #[snafu(display("failed to seek"))]
    Seek,
    #[snafu(display("{message}"))]
    StreamError {
        message: String,
    },
    PoisonError,
    #[snafu(display("Unable to migrate database to latest version"))]
    DatabaseMigrationError,
    #[snafu(display("Unable to find database location"))]
    DatabaseLocationError,
    #[snafu(display("Database error: {source}"))]
    DatabaseError {
        #[snafu(source)]
        source: sqlx::Error,
    },
    #[snafu(display("Serialization error: {source}"))]
    SerializationError {
        #[snafu(source)]
        source: serde_json::Error,
    },
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(_value: sqlx::migrate::MigrateError) -> Self {
        Self::DatabaseMigrationError
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::SerializationError { source }
    }
}

impl From<sqlx::Error> for Error {
    fn from(source: sqlx::Error) -> Self {
        Self::DatabaseError { source }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::PoisonError
    }
}

impl From<rodio::source::SeekError> for Error {
    fn from(_: rodio::source::SeekError) -> Self {
        Error::Seek
    }
}

impl From<rodio::StreamError> for Error {
    fn from(value: rodio::StreamError) -> Self {
        Self::StreamError {
            message: value.to_string(),
        }
    }
}

impl From<rodio::decoder::DecoderError> for Error {
    fn from(value: rodio::decoder::DecoderError) -> Self {
        Self::StreamError {
            message: value.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::StreamError {
            message: value.to_string(),
        }
    }
}

impl From<swing_player_client::Error> for Error {
    fn from(value: swing_player_client::Error) -> Self {
        Error::Client {
            message: value.to_string(),
        }
    }
}
