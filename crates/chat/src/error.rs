use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Channel error: {0}")]
    Channel(String),

    /// A history, conversation or read-receipt request failed.
    #[error("Request error: {0}")]
    Request(String),
}

impl ChatError {
    pub fn request<T: std::fmt::Display>(msg: T) -> Self {
        Self::Request(msg.to_string())
    }
}
