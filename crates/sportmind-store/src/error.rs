use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid session date: {0}")]
    InvalidDate(#[from] sportmind_core::SessionDateError),

    #[error("reading {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
