use thiserror::Error;

pub type Result<T> = std::result::Result<T, FoldpaneError>;

#[derive(Error, Debug)]
pub enum FoldpaneError {
    #[error("markup error: {0}")]
    Markup(#[from] html::ParseError),

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("render context is missing a `{0}` payload")]
    MissingPayload(&'static str),

    #[error("unknown render mode `{0}`")]
    UnknownMode(String),

    #[error("no renderer registered for handler `{0}`")]
    UnknownHandler(String),

    #[error("document error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FoldpaneError {
    pub fn selector(selector: &str, reason: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}
