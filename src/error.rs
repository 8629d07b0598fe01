//! Error types for BIM ingestion.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that make a whole parse fail. No partial model is returned.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Tabular input needs a header row and at least one data row.
    #[error("tabular input needs a header and at least one row, found {lines} line(s)")]
    TooFewLines { lines: usize },

    /// The payload is not valid UTF-8 text.
    #[error("input is not valid UTF-8: {source}")]
    InvalidUtf8 {
        #[from]
        source: std::str::Utf8Error,
    },

    /// Failed to read delimited records.
    #[error("CSV read failed: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// Failed to decode a JSON document.
    #[error("JSON decode failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },

    /// The geometry engine returned a non-positive model handle.
    #[error("unable to open IFC model (engine handle {handle})")]
    ModelOpen { handle: i32 },

    /// The document decoded but its shape is not a model.
    #[error("unsupported document structure: {message}")]
    UnsupportedStructure { message: String },

    /// The geometry engine could not be initialised.
    #[error("geometry engine failed: {source}")]
    Engine {
        #[from]
        source: EngineError,
    },
}

/// Failures raised inside the geometry engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A referenced entity is not present in the model.
    #[error("entity #{id} not found")]
    MissingEntity { id: u64 },

    /// An attribute did not hold the expected kind of value.
    #[error("entity #{id} attribute {index}: expected {expected}")]
    UnexpectedAttribute {
        id: u64,
        index: usize,
        expected: &'static str,
    },

    /// The engine does not handle this construct.
    #[error("unsupported: {message}")]
    Unsupported { message: String },

    /// The model handle is not open.
    #[error("model {handle} is not open")]
    ModelNotOpen { handle: i32 },
}

/// Which part of element resolution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStage {
    Geometry,
    Properties,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry => f.write_str("geometry"),
            Self::Properties => f.write_str("properties"),
        }
    }
}

/// A single element could not be fully resolved. Never fatal to the parse.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize)]
#[error("element #{express_id} {stage} resolution failed: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ElementResolutionFailure {
    pub express_id: u64,
    pub guid: String,
    pub stage: ResolutionStage,
    pub message: String,
}

/// Errors from the persistence and object-storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No object is stored under this reference.
    #[error("object '{object_ref}' not found")]
    UnknownObject { object_ref: String },

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors that can occur while ingesting a source file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}
