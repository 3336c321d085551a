//! Command tree validation.
//!
//! Checks the structural invariants of a built command tree: option names
//! are well formed and unique per command, the help option is present
//! exactly once and its names are not reused, subcommand names are unique
//! among siblings, and environment variable names are valid identifiers.
//!
//! The `opt` directive's name list is also parsed here, since its rules are
//! part of the same naming contract.
//!
//! # Examples
//!
//! ```
//! use clapdoc_core::*;
//!
//! let mut cmd = Command::new("Cli", "", "cli");
//! cmd.options.push(OptionSpec::new("verbose", Some("v"), Some("verbose"), TypeKind::Bool));
//! cmd.options.push(OptionSpec::help());
//! assert!(validate_command(&cmd).is_empty());
//!
//! // A second `-v` in the same command
//! cmd.options.insert(0, OptionSpec::new("version", Some("v"), None, TypeKind::Bool));
//! assert!(!validate_command(&cmd).is_empty());
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::{Argument, Command, HELP_LONG, HELP_SHORT, OptionSpec};

static OPTION_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("static regex must compile")
});

static ENV_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex must compile")
});

static FIELD_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex must compile")
});

static TYPE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("static regex must compile")
});

/// Command tree validation errors.
///
/// Every variant carries the invocation path of the offending command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Command invocation name is empty or whitespace-only.
    #[error("command name cannot be empty (in '{0}')")]
    EmptyCommandName(String),
    /// A command name or alias that cannot be typed as a single token.
    #[error("'{command}': invalid command name '{name}'")]
    InvalidCommandName { command: String, name: String },
    /// Record type name is not a Rust type path.
    #[error("'{command}': invalid type name '{name}'")]
    InvalidTypeName { command: String, name: String },
    /// Field name is not a Rust identifier.
    #[error("'{command}': invalid field name '{name}'")]
    InvalidFieldName { command: String, name: String },
    /// An argument display name contains characters other than letters,
    /// digits, `-` and `_`.
    #[error("'{command}': invalid argument name '{name}'")]
    InvalidArgumentName { command: String, name: String },
    /// An option has neither short nor long form.
    #[error("'{command}': option for field '{field}' must define a short or long name")]
    MissingOptionName { command: String, field: String },
    /// A short name is not exactly one character.
    #[error("'{command}': invalid short option name '{name}'")]
    InvalidShortOption { command: String, name: String },
    /// A name contains characters other than letters, digits, `-` and `_`.
    #[error("'{command}': invalid option name '{name}'")]
    InvalidOptionName { command: String, name: String },
    /// A field option uses `h` or `help`.
    #[error("'{command}': '{name}' is reserved for the help option")]
    ReservedOptionName { command: String, name: String },
    /// Two options in one command share a name.
    #[error("'{command}': duplicate option '{name}'")]
    DuplicateOption { command: String, name: String },
    /// The help option is missing.
    #[error("'{0}': missing help option")]
    MissingHelpOption(String),
    /// Two sibling subcommands share a name or alias.
    #[error("'{command}': duplicate subcommand '{name}'")]
    DuplicateSubcommand { command: String, name: String },
    /// Environment variable name is not a valid identifier.
    #[error("'{command}': invalid environment variable name '{name}'")]
    InvalidEnvName { command: String, name: String },
    /// A positional argument is boolean.
    #[error("'{command}': argument '{name}' cannot be type bool")]
    BoolArgument { command: String, name: String },
}

/// Problems with the value of an `opt` directive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionNameError {
    /// An option-related directive was present without an `opt` directive.
    #[error("adding option without a 'clap:opt' directive")]
    MissingOptDirective,
    /// The `opt` directive has no names.
    #[error("'clap:opt' found but no names provided")]
    NoNames,
    /// Two names were given and neither is a single character.
    #[error("two opt names found ('{0}', '{1}'), one must be the short version (only one character)")]
    TwoLongNames(String, String),
    /// Two single-character names were given.
    #[error("two opt names found ('{0}', '{1}'), one must be the long version")]
    TwoShortNames(String, String),
    /// More than two names were given.
    #[error("illegal 'clap:opt' value '{0}': too many comma separated values")]
    TooManyNames(String),
    /// `h` or `help` was requested.
    #[error("'help' and 'h' are reserved option names")]
    Reserved,
}

/// Short and long names parsed from an `opt` directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionNames {
    pub short: Option<String>,
    pub long: Option<String>,
}

/// Parses the comma-separated name list of an `opt` directive.
///
/// Empty entries are ignored. The list may hold one short (single
/// character) and one long name, in either order.
///
/// # Examples
///
/// ```
/// use clapdoc_core::{OptionNameError, parse_option_names};
///
/// let names = parse_option_names("upper,u").unwrap();
/// assert_eq!(names.short.as_deref(), Some("u"));
/// assert_eq!(names.long.as_deref(), Some("upper"));
///
/// assert_eq!(parse_option_names("h"), Err(OptionNameError::Reserved));
/// assert!(parse_option_names("a,b,c").is_err());
/// ```
pub fn parse_option_names(list: &str) -> Result<OptionNames, OptionNameError> {
    let names: Vec<&str> = list
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    let parsed = match names.as_slice() {
        [] => return Err(OptionNameError::NoNames),
        [one] if is_short(one) => OptionNames {
            short: Some(one.to_string()),
            long: None,
        },
        [one] => OptionNames {
            short: None,
            long: Some(one.to_string()),
        },
        [a, b] => match (is_short(a), is_short(b)) {
            (true, false) => OptionNames {
                short: Some(a.to_string()),
                long: Some(b.to_string()),
            },
            (false, true) => OptionNames {
                short: Some(b.to_string()),
                long: Some(a.to_string()),
            },
            (false, false) => {
                return Err(OptionNameError::TwoLongNames(a.to_string(), b.to_string()));
            }
            (true, true) => {
                return Err(OptionNameError::TwoShortNames(a.to_string(), b.to_string()));
            }
        },
        _ => return Err(OptionNameError::TooManyNames(list.to_string())),
    };

    if parsed.short.as_deref() == Some(HELP_SHORT) || parsed.long.as_deref() == Some(HELP_LONG) {
        return Err(OptionNameError::Reserved);
    }
    Ok(parsed)
}

fn is_short(name: &str) -> bool {
    name.chars().count() == 1
}

/// Validates a command tree.
///
/// Stops at the first problem found; an empty vector means the tree is
/// valid.
pub fn validate_command(root: &Command) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_recursive(root, &mut errors);
    errors
}

fn validate_recursive(cmd: &Command, errors: &mut Vec<ValidationError>) {
    let path = cmd.path();
    if cmd.name.trim().is_empty() {
        errors.push(ValidationError::EmptyCommandName(path));
        return;
    }
    if let Some(name) = cmd.all_names().find(|n| !OPTION_NAME_RE.is_match(n)) {
        errors.push(ValidationError::InvalidCommandName {
            command: path,
            name: name.to_string(),
        });
        return;
    }
    if !TYPE_NAME_RE.is_match(&cmd.type_name) {
        errors.push(ValidationError::InvalidTypeName {
            command: path,
            name: cmd.type_name.clone(),
        });
        return;
    }
    let fields = cmd
        .field_options()
        .map(|o| &o.field_name)
        .chain(cmd.arguments.iter().map(|a| &a.field_name))
        .chain(cmd.subcommands.iter().map(|s| &s.field_name));
    for field in fields {
        if !FIELD_NAME_RE.is_match(field) {
            errors.push(ValidationError::InvalidFieldName {
                command: path,
                name: field.clone(),
            });
            return;
        }
    }

    errors.extend(validate_options(&path, &cmd.options));
    if !errors.is_empty() {
        return;
    }

    errors.extend(validate_arguments(&path, &cmd.arguments));
    if !errors.is_empty() {
        return;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for sub in &cmd.subcommands {
        for name in sub.all_names() {
            if !seen.insert(name) {
                errors.push(ValidationError::DuplicateSubcommand {
                    command: path,
                    name: name.to_string(),
                });
                return;
            }
        }
    }

    for sub in &cmd.subcommands {
        validate_recursive(sub, errors);
        if !errors.is_empty() {
            return;
        }
    }
}

fn validate_options(path: &str, options: &[OptionSpec]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut help_count = 0;

    for opt in options {
        if opt.short.is_none() && opt.long.is_none() {
            errors.push(ValidationError::MissingOptionName {
                command: path.to_string(),
                field: opt.field_name.clone(),
            });
            return errors;
        }

        if let Some(short) = &opt.short {
            if short.chars().count() != 1 {
                errors.push(ValidationError::InvalidShortOption {
                    command: path.to_string(),
                    name: short.clone(),
                });
                return errors;
            }
        }

        if opt.is_help() {
            help_count += 1;
        } else if let Some(name) = opt.names().find(|n| *n == HELP_SHORT || *n == HELP_LONG) {
            errors.push(ValidationError::ReservedOptionName {
                command: path.to_string(),
                name: name.to_string(),
            });
            return errors;
        }

        for name in opt.names() {
            if !OPTION_NAME_RE.is_match(name) {
                errors.push(ValidationError::InvalidOptionName {
                    command: path.to_string(),
                    name: name.to_string(),
                });
                return errors;
            }
            if !seen.insert(name) {
                errors.push(ValidationError::DuplicateOption {
                    command: path.to_string(),
                    name: name.to_string(),
                });
                return errors;
            }
        }

        if let Some(env) = &opt.env {
            if !ENV_NAME_RE.is_match(env) {
                errors.push(ValidationError::InvalidEnvName {
                    command: path.to_string(),
                    name: env.clone(),
                });
                return errors;
            }
        }
    }

    if help_count == 0 {
        errors.push(ValidationError::MissingHelpOption(path.to_string()));
    }
    errors
}

fn validate_arguments(path: &str, arguments: &[Argument]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for arg in arguments {
        if arg.kind.is_bool() {
            errors.push(ValidationError::BoolArgument {
                command: path.to_string(),
                name: arg.name.clone(),
            });
            return errors;
        }
        if !OPTION_NAME_RE.is_match(&arg.name) {
            errors.push(ValidationError::InvalidArgumentName {
                command: path.to_string(),
                name: arg.name.clone(),
            });
            return errors;
        }
        if let Some(env) = &arg.env {
            if !ENV_NAME_RE.is_match(env) {
                errors.push(ValidationError::InvalidEnvName {
                    command: path.to_string(),
                    name: env.clone(),
                });
                return errors;
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use crate::TypeKind;

    use super::*;

    fn command_with(options: Vec<OptionSpec>) -> Command {
        let mut cmd = Command::new("Cli", "", "cli");
        cmd.options = options;
        cmd.options.push(OptionSpec::help());
        cmd
    }

    #[test]
    fn test_parse_option_names_orders_short_and_long() {
        let names = parse_option_names("u,upper").unwrap();
        assert_eq!(names.short.as_deref(), Some("u"));
        assert_eq!(names.long.as_deref(), Some("upper"));

        let names = parse_option_names("upper").unwrap();
        assert_eq!(names.short, None);
        assert_eq!(names.long.as_deref(), Some("upper"));

        let names = parse_option_names(" v , ").unwrap();
        assert_eq!(names.short.as_deref(), Some("v"));
    }

    #[test]
    fn test_parse_option_names_errors() {
        assert_eq!(parse_option_names(""), Err(OptionNameError::NoNames));
        assert_eq!(parse_option_names(",,"), Err(OptionNameError::NoNames));
        assert_eq!(
            parse_option_names("upper,lower"),
            Err(OptionNameError::TwoLongNames(
                "upper".to_string(),
                "lower".to_string()
            ))
        );
        assert_eq!(
            parse_option_names("a,b,c"),
            Err(OptionNameError::TooManyNames("a,b,c".to_string()))
        );
        assert_eq!(parse_option_names("help,x"), Err(OptionNameError::Reserved));
    }

    #[test]
    fn test_validate_accepts_valid_tree() {
        let cmd = command_with(vec![OptionSpec::new(
            "prefix",
            Some("p"),
            Some("prefix"),
            TypeKind::String,
        )]);
        assert!(validate_command(&cmd).is_empty());
    }

    #[test]
    fn test_validate_rejects_reserved_field_option() {
        let cmd = command_with(vec![OptionSpec::new("h", Some("h"), None, TypeKind::Bool)]);
        assert_eq!(
            validate_command(&cmd),
            vec![ValidationError::ReservedOptionName {
                command: "cli".to_string(),
                name: "h".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_help() {
        let mut cmd = command_with(Vec::new());
        cmd.options.push(OptionSpec::help());
        assert!(matches!(
            validate_command(&cmd).as_slice(),
            [ValidationError::DuplicateOption { .. }]
        ));
    }

    #[test]
    fn test_validate_requires_help() {
        let cmd = Command::new("Cli", "", "cli");
        assert_eq!(
            validate_command(&cmd),
            vec![ValidationError::MissingHelpOption("cli".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let cmd = command_with(vec![OptionSpec::new(
            "x",
            None,
            Some("with space"),
            TypeKind::Bool,
        )]);
        assert!(matches!(
            validate_command(&cmd).as_slice(),
            [ValidationError::InvalidOptionName { .. }]
        ));

        let cmd = command_with(vec![
            OptionSpec::new("x", None, Some("x-ray"), TypeKind::Bool).with_env("1BAD"),
        ]);
        assert!(matches!(
            validate_command(&cmd).as_slice(),
            [ValidationError::InvalidEnvName { .. }]
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_subcommand_alias() {
        let mut root = command_with(Vec::new());
        let mut remove = command_with(Vec::new());
        remove.name = "remove".to_string();
        remove.field_name = "remove".to_string();
        remove.aliases = vec!["rm".to_string()];
        let mut rm = command_with(Vec::new());
        rm.name = "rm".to_string();
        rm.field_name = "rm".to_string();
        root.subcommands = vec![remove, rm];

        assert_eq!(
            validate_command(&root),
            vec![ValidationError::DuplicateSubcommand {
                command: "cli".to_string(),
                name: "rm".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_rejects_bool_argument() {
        let mut cmd = command_with(Vec::new());
        cmd.arguments.push(Argument::new("flag", TypeKind::Bool));
        assert!(matches!(
            validate_command(&cmd).as_slice(),
            [ValidationError::BoolArgument { .. }]
        ));
    }

    #[test]
    fn test_validate_rejects_quoted_argument_name() {
        let mut cmd = command_with(Vec::new());
        let mut arg = Argument::new("input", TypeKind::String);
        arg.name = "say\"hi".to_string();
        cmd.arguments.push(arg);
        assert_eq!(
            validate_command(&cmd),
            vec![ValidationError::InvalidArgumentName {
                command: "cli".to_string(),
                name: "say\"hi".to_string(),
            }]
        );

        cmd.arguments[0].name = "file-name".to_string();
        assert!(validate_command(&cmd).is_empty());
    }

    #[test]
    fn test_validate_rejects_spaced_command_names() {
        let mut cmd = command_with(Vec::new());
        cmd.name = "two words".to_string();
        assert!(matches!(
            validate_command(&cmd).as_slice(),
            [ValidationError::InvalidCommandName { name, .. }] if name == "two words"
        ));

        let mut cmd = command_with(Vec::new());
        cmd.aliases = vec!["ok".to_string(), "r m".to_string()];
        assert!(matches!(
            validate_command(&cmd).as_slice(),
            [ValidationError::InvalidCommandName { name, .. }] if name == "r m"
        ));
    }

    #[test]
    fn test_validate_rejects_non_identifier_fields() {
        let cmd = command_with(vec![OptionSpec::new(
            "dry-run",
            None,
            Some("dry-run"),
            TypeKind::Bool,
        )]);
        assert!(matches!(
            validate_command(&cmd).as_slice(),
            [ValidationError::InvalidFieldName { name, .. }] if name == "dry-run"
        ));

        let mut cmd = command_with(Vec::new());
        cmd.type_name = "Cli<T>".to_string();
        assert!(matches!(
            validate_command(&cmd).as_slice(),
            [ValidationError::InvalidTypeName { .. }]
        ));
    }
}
