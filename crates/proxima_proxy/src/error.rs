use std::io;

use proxima_http::HttpError;

/// Why a request could not be carried to the origin and back.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("cannot connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("origin I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("origin protocol violation: {0}")]
    ProtocolViolation(String),
}

impl From<HttpError> for ForwardError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Io(e) => ForwardError::Io(e),
            HttpError::Timeout => {
                ForwardError::Io(io::Error::new(io::ErrorKind::TimedOut, "origin read timed out"))
            }
            HttpError::Closed => ForwardError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "origin closed the connection mid-response",
            )),
            HttpError::Malformed(msg) => ForwardError::ProtocolViolation(msg),
            HttpError::HeadersTooLarge => {
                ForwardError::ProtocolViolation("response header block too large".into())
            }
            HttpError::BodyTooLarge => {
                ForwardError::ProtocolViolation("response body too large".into())
            }
        }
    }
}
