//! Error types for schema building.

use clapdoc_core::{OptionNameError, ValidationError};
use thiserror::Error;

/// Hard errors that abort a build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The requested root type is not a known record.
    #[error("could not find a record type named '{0}'")]
    RootNotFound(String),

    /// A field carries both `opt*` and `arg*` directives.
    #[error("'{type_name}.{field}' has both option and argument configuration")]
    OptionArgumentConflict { type_name: String, field: String },

    /// A bool field would become a positional argument.
    #[error("'{type_name}.{field}': arguments cannot be type bool")]
    BoolArgument { type_name: String, field: String },

    /// The `opt` directive of a field is missing or malformed.
    #[error("parsing '{type_name}.{field}' as option: {source}")]
    InvalidOption {
        type_name: String,
        field: String,
        #[source]
        source: OptionNameError,
    },

    /// A record contains itself through a chain of subcommand pointers.
    #[error("'{type_name}.{field}' makes '{target}' a subcommand of itself")]
    RecursiveCommand {
        type_name: String,
        field: String,
        target: String,
    },

    /// The finished tree failed validation.
    #[error("invalid command tree: {0}")]
    Invalid(#[from] ValidationError),
}

/// Result type for schema building.
pub type Result<T> = std::result::Result<T, SchemaError>;
