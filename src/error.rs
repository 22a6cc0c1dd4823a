use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum AnnotatorError {
    #[error("invalid protein id: {0:?}")]
    InvalidProteinId(String),

    #[error("invalid organism taxonomy id: {0}")]
    InvalidOrganismId(String),

    #[error("invalid name mode: {0} (expected systematic|gene)")]
    InvalidNameMode(String),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    ConfigValue(String),

    #[error("Protein not found in UniProt: {0}")]
    NotFound(String),

    #[error("UniProt rate limit persisted after retries for {0}")]
    RateLimited(String),

    #[error("UniProt request timed out for {0}")]
    Timeout(String),

    #[error("uniprot request failed: {0}")]
    Transport(String),

    #[error("uniprot returned status {status}: {message}")]
    UniprotStatus { status: u16, message: String },

    #[error("malformed UniProt payload: {0}")]
    Malformed(String),

    #[error("uniprot client setup failed: {0}")]
    UniprotHttp(String),

    #[error("batch worker failed for {0}")]
    Worker(String),
}

impl AnnotatorError {
    /// Transient failures are worth retrying on the next call and are never
    /// stored in the annotation cache.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnnotatorError::RateLimited(_)
                | AnnotatorError::Timeout(_)
                | AnnotatorError::Transport(_)
                | AnnotatorError::UniprotStatus { .. }
                | AnnotatorError::Malformed(_)
                | AnnotatorError::Worker(_)
        )
    }
}
