use thiserror::Error;

use crate::core::types::StructureId;

#[derive(Error, Debug)]
pub enum QuarryError {
    #[error("Material has no entry in the resource table: {0}")]
    MissingEntry(String),

    #[error("Cannot remove the last entry from the resource table")]
    LastEntry,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("A composite quarry is already registered (base {0:?})")]
    QuarryAlreadyPresent(StructureId),

    #[error("Structure already registered: {0:?}")]
    DuplicateStructure(StructureId),

    #[error("Structure not registered: {0:?}")]
    UnknownStructure(StructureId),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QuarryError>;
