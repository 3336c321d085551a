//! Schema builder for doc-comment driven command-line interfaces.
//!
//! Record declarations come from a [`TypeDeclSource`]. [`SchemaBuilder`]
//! starts at a root record and produces a validated
//! [`Command`](clapdoc_core::Command) tree:
//!
//! - scalar fields with an `opt` directive become options,
//! - other scalar fields become positional arguments,
//! - pointers to other records become subcommands.
//!
//! Fields that cannot be used are skipped and reported in [`Diagnostics`].
//!
//! # Example
//!
//! ```
//! use clapdoc_builder::{Declarations, SchemaBuilder};
//!
//! let decls = Declarations::from_yaml_str(r#"
//! records:
//!   - name: Git
//!     doc: A version control tool.
//!     fields:
//!       - name: remote
//!         type: Option<Remote>
//!   - name: Remote
//!     doc: |
//!       Manage remotes.
//!
//!       clap:cmd_aliases r, rem
//! "#).unwrap();
//!
//! let built = SchemaBuilder::new(&decls).build("Git").unwrap();
//! let remote = built.root.find_subcommand("rem").unwrap();
//! assert_eq!(remote.path(), "git remote");
//! ```

mod builder;
mod diagnostics;
mod error;
mod source;

pub use builder::{Built, SchemaBuilder, build};
pub use diagnostics::{Diagnostics, Warning, WarningKind};
pub use error::{Result, SchemaError};
pub use source::{Declarations, FieldDecl, RecordDecl, SourceError, TypeDeclSource, TypeRef};
