use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid tenant identifier '{0}': {1}")]
    InvalidTenant(String, String),

    #[error("Invalid product id list '{0}': expected comma-separated non-negative integers")]
    InvalidProductIds(String),

    #[error("Unknown {kind} status code '{code}'")]
    UnknownStatus { kind: &'static str, code: String },
}
