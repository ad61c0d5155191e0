use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, LmfError>;

/// Enum representing all possible errors in the wordnet_lmf library.
#[derive(Error, Debug)]
pub enum LmfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Configuration(String),

    #[error("database already open")]
    AlreadyOpen,

    #[error("database still not open")]
    NotOpen,

    #[error("invalid LMF XML file \"{0}\": file not existing")]
    InputFileNotFound(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("SQL error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Internal error: {0}")]
    Internal(String), // For unexpected situations
}

