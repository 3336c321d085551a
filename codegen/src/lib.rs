//! Usage text layout and parser generation for clapdoc command trees.
//!
//! Given a validated [`Command`](clapdoc_core::Command) tree, this crate
//!
//! - lays out help text ([`render_usage`]),
//! - generates a Rust source file with one parse function per command
//!   ([`Generator`]),
//! - simulates the generated parsers in process ([`simulate::simulate`]).
//!
//! # Example
//!
//! ```
//! use clapdoc_codegen::{GenerateConfig, LayoutConfig, render_usage, generate};
//! use clapdoc_core::{AnnotatedText, Command, OptionSpec, TypeKind};
//!
//! let mut root = Command::new("Cli", "", "cli");
//! root.text = AnnotatedText::with_blurb("do one thing well");
//! root.options.push(OptionSpec::new("quiet", Some("q"), None, TypeKind::Bool));
//! root.options.push(OptionSpec::help());
//!
//! let usage = render_usage(&root, &LayoutConfig::default());
//! assert!(usage.starts_with("cli - do one thing well\n"));
//!
//! let code = generate(&root, &GenerateConfig::default());
//! assert!(code.contains("fn clap_usage_root()"));
//! ```

mod config;
mod generate;
pub mod layout;
mod preamble;
pub mod simulate;

pub use config::{ConfigError, GenerateConfig, MIN_WIDTH};
pub use generate::{Generator, generate};
pub use layout::{DEFAULT_WIDTH, LayoutConfig, LayoutStyle, render_usage};
pub use preamble::PreambleNeeds;
pub use simulate::{EnvLookup, Outcome, ParseFailure, ParsedCommand, ProcessEnv, simulate};
