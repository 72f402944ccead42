use crate::ingest::error::IngestError;
use crate::transform::error::TransformError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxiDemandError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine data directory")]
    DataDirResolution(#[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
