use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unparseable movement date: {value}")]
    Date { value: String },

    #[error("Malformed currency value in {field}: {value}")]
    Currency { field: String, value: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Chart rendering error: {0}")]
    Chart(String),

    #[error("Document rendering error: {0}")]
    Pdf(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
