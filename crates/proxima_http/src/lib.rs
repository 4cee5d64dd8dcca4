pub mod headers;
pub mod message;
pub mod reader;
pub mod responses;
pub mod writer;

pub use headers::Headers;
pub use message::{Request, Response};
pub use reader::{ReadLimits, read_request, read_response};
pub use writer::{encode_request, encode_response, write_response};

/// Failures while reading or writing an HTTP/1.x message.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for peer")]
    Timeout,

    #[error("connection closed mid-message")]
    Closed,

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("header block too large")]
    HeadersTooLarge,

    #[error("body too large")]
    BodyTooLarge,
}
