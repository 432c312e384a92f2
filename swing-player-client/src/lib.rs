use snafu::prelude::*;

pub mod client;
pub mod swing_models;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("{message}"))]
    Api { message: String },
    #[snafu(display("{message}"))]
    DeserializeJSON { message: String },
    #[snafu(display("Invalid server url: {url}"))]
    InvalidUrl { url: String },
    #[snafu(display("Request failed: {message}"))]
    Request { message: String },
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Request {
            message: error.to_string(),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Error::InvalidUrl {
            url: error.to_string(),
        }
    }
}
