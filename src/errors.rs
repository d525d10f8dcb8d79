use std::fmt;

use reqwest::StatusCode;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Http(reqwest::Error),
    /// Token service answered with a non-2xx status; carries the response body.
    Transport(StatusCode, String),
    Decode(String),
    Config(String),
    NoToken,
}

impl Error {
    /// True for failures of the network exchange itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_, _) | Error::Http(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Http(err) => write!(f, "http error: {err}"),
            Error::Transport(status, body) => {
                write!(f, "token service returned {status}: {body}")
            }
            Error::Decode(msg) => write!(f, "token decode error: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::NoToken => write!(f, "no token cached"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Decode(format!("invalid JWT: {err}"))
    }
}
