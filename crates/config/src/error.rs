#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
    #[error("unknown provider kind: {0}")]
    UnknownProviderKind(String),
}
