//! CLI error type.

use thiserror::Error;

/// Errors surfaced to the command line.
#[derive(Error, Debug)]
pub enum CliError {
    /// A model file could not be read.
    #[error("Cannot read model file: {0}")]
    Io(#[from] std::io::Error),

    /// A model file is not valid JSON or does not match the schema.
    #[error("Cannot parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The model file parsed but describes an invalid registry.
    #[error(transparent)]
    Model(#[from] dtree_core::ModelError),

    /// The registry could not be expanded into a tree.
    #[error(transparent)]
    Build(#[from] dtree_engine::BuildError),

    /// A pipeline stage was invoked out of order or out of range.
    #[error(transparent)]
    Tree(#[from] dtree_engine::TreeError),

    /// A sensitivity sweep was rejected.
    #[error(transparent)]
    Sweep(#[from] dtree_engine::SensitivityError),

    /// An argument combination the schema cannot express statically.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result alias used throughout the CLI.
pub type Result<T> = std::result::Result<T, CliError>;
