use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error(transparent)]
    Decode(#[from] poker_wire::DecodeError),
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    #[error("session closed")]
    Closed,
}
