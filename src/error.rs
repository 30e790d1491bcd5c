use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TIFF encoding error: {0}")]
    Tiff(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] ::config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Nothing to process: {0}")]
    EmptyResult(String),

    #[error("No input files found in {}", .0.display())]
    NoInputFiles(PathBuf),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl From<tiff::TiffError> for ProcessingError {
    fn from(e: tiff::TiffError) -> Self {
        ProcessingError::Tiff(e.to_string())
    }
}

impl ProcessingError {
    /// Errors that only affect the current file or schema guess, not the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProcessingError::Parse(_)
                | ProcessingError::EmptyResult(_)
                | ProcessingError::InvalidFormat(_)
        )
    }

    /// Failures while reading one input file: the file is reported and skipped.
    ///
    /// Only valid where nothing but input reads can fail.
    pub fn is_input_failure(&self) -> bool {
        self.is_recoverable()
            || matches!(self, ProcessingError::Io(_) | ProcessingError::Csv(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_input_failures() {
        let denied = ProcessingError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(denied.is_input_failure());
        assert!(!denied.is_recoverable());
        assert!(ProcessingError::Parse("bad".to_string()).is_input_failure());

        assert!(!ProcessingError::Tiff("encoder".to_string()).is_input_failure());
        assert!(!ProcessingError::NoInputFiles(PathBuf::from("data")).is_input_failure());
        assert!(!ProcessingError::Config("bad".to_string()).is_input_failure());
    }
}
