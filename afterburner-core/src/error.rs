use thiserror::Error;

/// Why a `/mahm` body could not be turned into a snapshot.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("XML syntax error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("expected root element <{expected}>, found <{found}>")]
    UnexpectedRoot { expected: &'static str, found: String },

    #[error("document has no root element")]
    EmptyDocument,

    #[error("missing element <{element}> in <{parent}>")]
    MissingElement {
        parent: &'static str,
        element: &'static str,
    },

    #[error("entry #{index} is missing <{field}>")]
    MissingField { index: usize, field: &'static str },
}

/// Failures of a single scrape. None of these outlive the request.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("get {path} failed: {detail}")]
    Transport { path: String, detail: String },

    #[error("read {path} body failed: {detail}")]
    Body { path: String, detail: String },

    #[error("unmarshal {path} body failed: {source}")]
    Decode {
        path: String,
        #[source]
        source: DecodeError,
    },

    #[error("render exposition failed: {0}")]
    Render(String),
}

impl ScrapeError {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Transport { .. } => "transport",
            ScrapeError::Body { .. } => "body",
            ScrapeError::Decode { .. } => "decode",
            ScrapeError::Render(_) => "render",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Invalid(String),
}
