use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Observer failed for {event}: {reason}")]
    Observer { event: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
