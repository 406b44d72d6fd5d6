use thiserror::Error;

/// Failures surfaced by the workout store.
///
/// `InvalidDay` and `InvalidReorder` are caller precondition violations;
/// `NotFound` only arises on direct-by-id lookups (the get-or-create and
/// listing paths never fail this way); `Persistence` aborts the whole
/// logical operation, so no partial mutation survives it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("day must be between 0 and 6, got {0}")]
    InvalidDay(i64),

    #[error("new order is not a permutation of the current {0} children")]
    InvalidReorder(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("persistence failure: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
    }
}
