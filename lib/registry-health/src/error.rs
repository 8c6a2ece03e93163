use thiserror::Error;

pub type Result<T> = std::result::Result<T, HealthError>;

#[derive(Error, Debug)]
pub enum HealthError {
    #[error("Cannot probe unregistered service: {0}")]
    ServiceNotFound(String),

    #[error("Cannot probe service without hosts: {0}")]
    NoHosts(String),

    #[error("Probe request failed: {0}")]
    Request(String),

    #[error("Probe returned status {0}")]
    Status(u16),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Metrics encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
