//! Core types for doc-comment driven command-line schemas.
//!
//! This crate defines the pieces shared by the schema builder and the code
//! generator:
//!
//! - [`AnnotatedText`] and [`Directive`]: documentation text split into a
//!   blurb, overview paragraphs and `clap:` directives.
//! - [`TypeKind`]: the fixed set of scalar kinds a field may have, with the
//!   value parsing contract ([`TypeKind::parse_value`]).
//! - [`Command`], [`OptionSpec`], [`Argument`]: the command tree.
//!
//! Validation ([`validate_command`]) catches structural errors such as
//! duplicate options, reserved help names and duplicate subcommands.
//!
//! # Example
//!
//! ```
//! use clapdoc_core::*;
//!
//! let doc = "Make the input uppercase.\n\nclap:opt upper";
//! let text = AnnotatedText::parse(Some(doc));
//! let names = parse_option_names(text.value_of("opt").unwrap()).unwrap();
//!
//! let mut root = Command::new("Strops", "", "strops");
//! root.options.push(
//!     OptionSpec::new("upper", names.short.as_deref(), names.long.as_deref(), TypeKind::Bool)
//!         .with_text(text),
//! );
//! root.options.push(OptionSpec::help());
//!
//! assert!(validate_command(&root).is_empty());
//! assert_eq!(root.find_option("upper").unwrap().text.blurb, "make the input uppercase");
//! ```

mod directive;
mod types;
mod validate;
mod value;

pub use directive::{AnnotatedText, DIRECTIVE_MARKER, Directive};
pub use types::*;
pub use validate::{
    OptionNameError, OptionNames, ValidationError, parse_option_names, validate_command,
};
pub use value::{TypeCategory, TypeKind, Value, ValueError};
