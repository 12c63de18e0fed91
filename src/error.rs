use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    ParseInvalidSelector(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport Error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("The generation service answered with status {0}.")]
    TransportStatus(reqwest::StatusCode),

    #[error("Persistence Error: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("Identifier {0:?} is not usable as a table, collection or column name.")]
    InvalidIdentifier(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
}
