use thiserror::Error;

/// Errors surfaced by the ingest pipeline. Everything here is a problem with
/// the uploaded file, not a server fault; the next upload can be attempted.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("required columns could not be resolved: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("malformed input: {0}")]
    Parse(String),

    #[error("no claim rows found after normalization")]
    EmptyDataset,
}
