//! Command tree type definitions.
//!
//! The command tree is the intermediate representation shared by the schema
//! builder, the usage layout engine and the code generator. It is built once
//! per generation run and only read afterwards. All types serialize with
//! [`serde`] so a tree can be dumped as JSON or YAML for inspection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{AnnotatedText, TypeKind};

/// Short name of the synthesized help option.
pub const HELP_SHORT: &str = "h";
/// Long name of the synthesized help option.
pub const HELP_LONG: &str = "help";
/// Description of the synthesized help option.
pub const HELP_BLURB: &str = "show this help message";

/// An option (flag) of a command.
///
/// At least one of `short` and `long` is set. Boolean options never take a
/// separate value token.
///
/// # Examples
///
/// ```
/// use clapdoc_core::{OptionSpec, TypeKind};
///
/// let opt = OptionSpec::new("upper", Some("u"), Some("upper"), TypeKind::Bool);
/// assert!(opt.matches("u"));
/// assert!(opt.matches("upper"));
/// assert_eq!(opt.display_name(), "--upper");
/// assert_eq!(opt.value_placeholder(), None);
///
/// let help = OptionSpec::help();
/// assert!(help.is_help());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Field receiving the value (empty for the help option).
    pub field_name: String,
    /// Single-character name, used as `-x`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    /// Multi-character name, used as `--name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    /// Kind of the value.
    pub kind: TypeKind,
    /// Placeholder shown for the option's value (`opt_arg_name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_name: Option<String>,
    /// Environment variable supplying a fallback value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Documentation.
    #[serde(default)]
    pub text: AnnotatedText,
}

impl OptionSpec {
    /// Creates an option bound to `field_name`.
    pub fn new(field_name: &str, short: Option<&str>, long: Option<&str>, kind: TypeKind) -> Self {
        Self {
            field_name: field_name.to_string(),
            short: short.map(String::from),
            long: long.map(String::from),
            kind,
            value_name: None,
            env: None,
            text: AnnotatedText::default(),
        }
    }

    /// The `-h, --help` option every command receives.
    pub fn help() -> Self {
        let mut help = Self::new("", Some(HELP_SHORT), Some(HELP_LONG), TypeKind::Bool);
        help.text = AnnotatedText::with_blurb(HELP_BLURB);
        help
    }

    pub fn with_env(mut self, var: &str) -> Self {
        self.env = Some(var.to_string());
        self
    }

    pub fn with_text(mut self, text: AnnotatedText) -> Self {
        self.text = text;
        self
    }

    /// Returns `true` for the synthesized help option.
    pub fn is_help(&self) -> bool {
        self.field_name.is_empty()
            && self.short.as_deref() == Some(HELP_SHORT)
            && self.long.as_deref() == Some(HELP_LONG)
    }

    /// Checks a bare option name (without dashes) against both forms.
    pub fn matches(&self, name: &str) -> bool {
        self.short.as_deref() == Some(name) || self.long.as_deref() == Some(name)
    }

    /// Iterates over the names that select this option, long form first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.long.as_deref().into_iter().chain(self.short.as_deref())
    }

    /// Dashed name used in messages (long form preferred).
    pub fn display_name(&self) -> String {
        match (&self.long, &self.short) {
            (Some(long), _) => format!("--{long}"),
            (None, Some(short)) => format!("-{short}"),
            (None, None) => "-?".to_string(),
        }
    }

    /// Value placeholder such as `<arg>`; `None` for boolean options.
    pub fn value_placeholder(&self) -> Option<String> {
        if self.kind.is_bool() {
            return None;
        }
        Some(format!("<{}>", self.value_name.as_deref().unwrap_or("arg")))
    }
}

/// A positional argument of a command.
///
/// # Examples
///
/// ```
/// use clapdoc_core::{Argument, TypeKind};
///
/// let arg = Argument::new("Input", TypeKind::String).required();
/// assert_eq!(arg.name, "input");
/// assert_eq!(arg.usage_name(), "<input>");
///
/// let arg = Argument::new("count", TypeKind::U32);
/// assert_eq!(arg.usage_name(), "[count]");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Field receiving the value.
    pub field_name: String,
    /// Display name (lower-cased field name unless overridden).
    pub name: String,
    /// Kind of the value; never [`TypeKind::Bool`].
    pub kind: TypeKind,
    /// Whether the argument must be supplied.
    pub required: bool,
    /// Environment variable supplying a fallback value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Documentation.
    #[serde(default)]
    pub text: AnnotatedText,
}

impl Argument {
    /// Creates an optional argument named after its field.
    pub fn new(field_name: &str, kind: TypeKind) -> Self {
        Self {
            field_name: field_name.to_string(),
            name: field_name.to_lowercase(),
            kind,
            required: false,
            env: None,
            text: AnnotatedText::default(),
        }
    }

    /// Marks the argument as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_env(mut self, var: &str) -> Self {
        self.env = Some(var.to_string());
        self
    }

    /// `<name>` for required arguments, `[name]` otherwise.
    pub fn usage_name(&self) -> String {
        if self.required {
            format!("<{}>", self.name)
        } else {
            format!("[{}]", self.name)
        }
    }
}

/// A command: the root of the tree or a subcommand.
///
/// # Examples
///
/// ```
/// use clapdoc_core::{Argument, Command, OptionSpec, TypeKind};
///
/// let mut root = Command::new("Strops", "", "strops");
/// root.options.push(OptionSpec::new("upper", Some("u"), Some("upper"), TypeKind::Bool));
/// root.options.push(OptionSpec::help());
/// root.arguments.push(Argument::new("input", TypeKind::String).required());
///
/// let mut add = Command::new("Add", "add", "add");
/// add.parent_names = vec!["strops".into()];
/// add.options.push(OptionSpec::help());
/// root.subcommands.push(add);
///
/// assert_eq!(root.subcommands[0].path(), "strops add");
/// assert!(root.find_subcommand("add").is_some());
/// assert_eq!(root.post_order().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Record type this command was built from.
    pub type_name: String,
    /// Name of the field in the parent record; empty for the root.
    pub field_name: String,
    /// Invocation name.
    pub name: String,
    /// Invocation names of all ancestors, root first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_names: Vec<String>,
    /// Alternative invocation names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Custom usage lines (without the leading command name).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usage_overrides: Vec<String>,
    /// Documentation.
    #[serde(default)]
    pub text: AnnotatedText,
    /// Options, ending with the help option.
    pub options: Vec<OptionSpec>,
    /// Positional arguments in declared order.
    #[serde(default)]
    pub arguments: Vec<Argument>,
    /// Subcommands in declared order.
    #[serde(default)]
    pub subcommands: Vec<Command>,
}

impl Command {
    /// Creates an empty command.
    pub fn new(type_name: &str, field_name: &str, name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.field_name.is_empty()
    }

    /// Full invocation path, e.g. `"git remote add"`.
    pub fn path(&self) -> String {
        self.parent_names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns `true` if `token` is this command's name or one of its aliases.
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| a == token)
    }

    /// Invocation name followed by aliases.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn has_subcommands(&self) -> bool {
        !self.subcommands.is_empty()
    }

    /// Finds a direct subcommand by exact name or alias.
    pub fn find_subcommand(&self, token: &str) -> Option<&Command> {
        self.subcommands.iter().find(|c| c.matches(token))
    }

    /// Finds an option by bare short or long name.
    pub fn find_option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.matches(name))
    }

    /// Options other than the synthesized help option.
    pub fn field_options(&self) -> impl Iterator<Item = &OptionSpec> {
        self.options.iter().filter(|o| !o.is_help())
    }

    /// All commands of the subtree, children before their parent.
    pub fn post_order(&self) -> Vec<&Command> {
        let mut out = Vec::new();
        self.collect_post_order(&mut out);
        out
    }

    fn collect_post_order<'a>(&'a self, out: &mut Vec<&'a Command>) {
        for sub in &self.subcommands {
            sub.collect_post_order(out);
        }
        out.push(self);
    }

    /// Kinds used by options and arguments anywhere in the subtree.
    ///
    /// The help option is not counted.
    pub fn kinds_used(&self) -> BTreeSet<TypeKind> {
        let mut kinds = BTreeSet::new();
        for cmd in self.post_order() {
            kinds.extend(cmd.field_options().map(|o| o.kind));
            kinds.extend(cmd.arguments.iter().map(|a| a.kind));
        }
        kinds
    }

    /// Returns `true` if any option or argument in the subtree has an env binding.
    pub fn uses_env(&self) -> bool {
        self.post_order().into_iter().any(|cmd| {
            cmd.options.iter().any(|o| o.env.is_some())
                || cmd.arguments.iter().any(|a| a.env.is_some())
        })
    }
}
