//! Error types for engine operations

use thiserror::Error;

/// Errors that can occur inside the document engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Font file could not be parsed or used
    #[error("Font error: {0}")]
    Font(String),

    /// Image file could not be read or queried
    #[error("Image error: {0}")]
    Image(String),

    /// PDF writer misuse or serialization failure
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Invalid dimension string
    #[error("Invalid unit: {0}")]
    Unit(String),

    /// Invalid colour specification
    #[error("Invalid color: {0}")]
    Color(String),

    /// Unknown language name
    #[error("Unknown language: {0}")]
    Language(String),

    /// Node list manipulation failed
    #[error("Node error: {0}")]
    Node(String),

    /// Document state does not allow the operation
    #[error("Document error: {0}")]
    Document(String),

    /// XML dump failed
    #[error("XML error: {0}")]
    Xml(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
