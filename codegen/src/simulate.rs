//! In-process model of the generated parsers.
//!
//! [`simulate`] runs a command tree against an argument list the same way
//! the generated `clap_parse_*` functions do, but reports the outcome as a
//! value instead of assigning fields and exiting the process. It backs
//! `clapdoc try` and lets tests check parser behavior without compiling
//! generated code.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use clapdoc_core::{Command, OptionSpec, TypeKind, Value};
use serde::Serialize;
use tracing::debug;

use crate::layout::{LayoutConfig, render_usage};

/// Source of environment variable values.
pub trait EnvLookup {
    fn get(&self, name: &str) -> Option<String>;
}

/// The environment of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

impl EnvLookup for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        BTreeMap::get(self, name).cloned()
    }
}

/// Field values assigned while parsing one command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedCommand {
    /// Invocation path of the command.
    pub path: String,
    /// Assigned fields by field name. Fields left at their default are absent.
    pub values: BTreeMap<String, Value>,
    /// The dispatched subcommand, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<Box<ParsedCommand>>,
}

impl ParsedCommand {
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Follows the chain of dispatched subcommands to the innermost one.
    pub fn leaf(&self) -> &ParsedCommand {
        match &self.subcommand {
            Some(sub) => sub.leaf(),
            None => self,
        }
    }
}

/// A parse error as the generated code would report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error: {}.\nRun '{} -h' for usage.",
            self.message, self.path
        )
    }
}

/// Exit status of the generated code on a parse error.
pub const FAILURE_STATUS: i32 = 2;

/// Result of a simulated invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Parsing succeeded.
    Parsed(ParsedCommand),
    /// `-h`/`--help` was given; `text` is what would be printed.
    Help { path: String, text: String },
    /// Parsing failed.
    Failed(ParseFailure),
}

impl Outcome {
    /// Process exit status the generated code would produce.
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::Parsed(_) | Self::Help { .. } => 0,
            Self::Failed(_) => FAILURE_STATUS,
        }
    }

    pub fn parsed(&self) -> Option<&ParsedCommand> {
        match self {
            Self::Parsed(parsed) => Some(parsed),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

enum Stop {
    Help { path: String, text: String },
    Failed(ParseFailure),
}

/// Simulates invoking the generated parser of `root` with `args` (program
/// name excluded).
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use clapdoc_codegen::simulate::{Outcome, simulate};
/// use clapdoc_codegen::LayoutConfig;
/// use clapdoc_core::{Command, OptionSpec, TypeKind, Value};
///
/// let mut root = Command::new("Cli", "", "cli");
/// root.options.push(OptionSpec::new("count", Some("n"), None, TypeKind::U8));
/// root.options.push(OptionSpec::help());
///
/// let env = HashMap::new();
/// let outcome = simulate(&root, &["-n", "0x10"], &env, &LayoutConfig::default());
/// assert_eq!(outcome.parsed().unwrap().value("count"), Some(&Value::Int(16)));
///
/// let outcome = simulate(&root, &["-n", "300"], &env, &LayoutConfig::default());
/// assert_eq!(
///     outcome.failure().unwrap().message,
///     "invalid u8 value \"300\" for option 'n'"
/// );
/// ```
pub fn simulate<S: AsRef<str>>(
    root: &Command,
    args: &[S],
    env: &dyn EnvLookup,
    layout: &LayoutConfig,
) -> Outcome {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    debug!(command = %root.name, args = ?args, "Simulating invocation");
    match run(root, &args, env, layout) {
        Ok(parsed) => Outcome::Parsed(parsed),
        Err(Stop::Help { path, text }) => Outcome::Help { path, text },
        Err(Stop::Failed(failure)) => Outcome::Failed(failure),
    }
}

struct Scanner<'a, 'b> {
    cmd: &'a Command,
    layout: &'a LayoutConfig,
    args: &'b [&'b str],
    idx: usize,
    eq_val: Option<String>,
}

impl<'a, 'b> Scanner<'a, 'b> {
    fn fail(&self, message: impl Into<String>) -> Stop {
        Stop::Failed(ParseFailure {
            path: self.cmd.path(),
            message: message.into(),
        })
    }

    fn help(&self) -> Stop {
        Stop::Help {
            path: self.cmd.path(),
            text: render_usage(self.cmd, self.layout),
        }
    }

    fn stage_opt(&mut self) -> Result<Option<String>, Stop> {
        let args = self.args;
        let Some(name) = args.get(self.idx).and_then(|a| a.strip_prefix('-')) else {
            return Ok(None);
        };
        if name.is_empty() {
            return Err(self.fail("empty option ('-') found"));
        }
        self.idx += 1;
        let name = name.strip_prefix('-').unwrap_or(name);
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(match name.split_once('=') {
            Some((name, val)) => {
                self.eq_val = Some(val.to_string());
                name.to_string()
            }
            None => {
                self.eq_val = None;
                name.to_string()
            }
        }))
    }

    fn next_str(&mut self, name: &str) -> Result<String, Stop> {
        if let Some(val) = self.eq_val.take() {
            return Ok(val);
        }
        let args = self.args;
        let Some(val) = args.get(self.idx) else {
            return Err(self.fail(format!("option '{name}' needs an argument")));
        };
        self.idx += 1;
        Ok(val.to_string())
    }

    fn rest(&self) -> &'b [&'b str] {
        let args = self.args;
        &args[self.idx..]
    }

    fn convert(&self, kind: TypeKind, text: &str, context: &str) -> Result<Value, Stop> {
        kind.parse_value(text)
            .map_err(|err| self.fail(format!("{err} for {context}")))
    }

    fn option_value(&mut self, opt: &OptionSpec, name: &str) -> Result<Value, Stop> {
        if opt.kind.is_bool() {
            return match self.eq_val.take() {
                None => Ok(Value::Bool(true)),
                Some(val) => self.convert(opt.kind, &val, &format!("option '{name}'")),
            };
        }
        let text = self.next_str(name)?;
        self.convert(opt.kind, &text, &format!("option '{name}'"))
    }
}

fn run(
    cmd: &Command,
    args: &[&str],
    env: &dyn EnvLookup,
    layout: &LayoutConfig,
) -> Result<ParsedCommand, Stop> {
    let mut scanner = Scanner {
        cmd,
        layout,
        args,
        idx: 0,
        eq_val: None,
    };
    let mut parsed = ParsedCommand {
        path: cmd.path(),
        ..Default::default()
    };

    let env_args = apply_env(&scanner, &mut parsed, env)?;

    while let Some(name) = scanner.stage_opt()? {
        if name == "help" || name == "h" {
            return Err(scanner.help());
        }
        let Some(opt) = cmd.field_options().find(|o| o.matches(&name)) else {
            return Err(scanner.fail(format!("unknown option '{name}'")));
        };
        let value = scanner.option_value(opt, &name)?;
        parsed.values.insert(opt.field_name.clone(), value);
    }

    let rest = scanner.rest();
    for (idx, arg) in cmd.arguments.iter().enumerate() {
        let Some(text) = rest.get(idx) else {
            if arg.required && !env_args.contains(&arg.field_name) {
                return Err(scanner.fail(format!(
                    "missing required argument {}",
                    arg.usage_name()
                )));
            }
            break;
        };
        let context = format!("argument {}", arg.usage_name());
        let value = scanner.convert(arg.kind, text, &context)?;
        parsed.values.insert(arg.field_name.clone(), value);
    }

    if cmd.has_subcommands() {
        let rest = rest.get(cmd.arguments.len()..).unwrap_or_default();
        let Some((name, rest)) = rest.split_first() else {
            return Err(scanner.fail("no command provided"));
        };
        let Some(sub) = cmd.find_subcommand(name) else {
            return Err(scanner.fail(format!("unknown command '{name}'")));
        };
        parsed.subcommand = Some(Box::new(run(sub, rest, env, layout)?));
    }

    Ok(parsed)
}

/// Assigns env fallbacks; returns the arguments whose env var was set.
fn apply_env(
    scanner: &Scanner<'_, '_>,
    parsed: &mut ParsedCommand,
    env: &dyn EnvLookup,
) -> Result<Vec<String>, Stop> {
    let cmd = scanner.cmd;
    for opt in cmd.field_options() {
        let Some(var) = &opt.env else { continue };
        if let Some(text) = env.get(var) {
            let value = scanner.convert(opt.kind, &text, &format!("env var \"{var}\""))?;
            parsed.values.insert(opt.field_name.clone(), value);
        }
    }

    let mut set = Vec::new();
    for arg in &cmd.arguments {
        let Some(var) = &arg.env else { continue };
        if let Some(text) = env.get(var) {
            let value = scanner.convert(arg.kind, &text, &format!("env var \"{var}\""))?;
            parsed.values.insert(arg.field_name.clone(), value);
            set.push(arg.field_name.clone());
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use clapdoc_core::{AnnotatedText, Argument};

    use super::*;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    fn cli() -> Command {
        let mut root = Command::new("Cli", "", "cli");
        root.text = AnnotatedText::with_blurb("do things");
        root.options.push(OptionSpec::new("verbose", Some("v"), Some("verbose"), TypeKind::Bool));
        root.options.push(OptionSpec::new("name", None, Some("name"), TypeKind::String));
        root.options.push(OptionSpec::help());
        root.arguments.push(Argument::new("first", TypeKind::String).required());
        root.arguments.push(Argument::new("second", TypeKind::I32));
        root
    }

    fn sim(cmd: &Command, args: &[&str]) -> Outcome {
        simulate(cmd, args, &no_env(), &LayoutConfig::default())
    }

    #[test]
    fn test_options_then_positionals() {
        let outcome = sim(&cli(), &["-v", "--name=x", "a", "-5"]);
        let parsed = outcome.parsed().unwrap();
        assert_eq!(parsed.value("verbose"), Some(&Value::Bool(true)));
        assert_eq!(parsed.value("name"), Some(&Value::Str("x".into())));
        assert_eq!(parsed.value("first"), Some(&Value::Str("a".into())));
        assert_eq!(parsed.value("second"), Some(&Value::Int(-5)));
    }

    #[test]
    fn test_terminator_ends_options() {
        let outcome = sim(&cli(), &["--", "-v"]);
        let parsed = outcome.parsed().unwrap();
        assert_eq!(parsed.value("first"), Some(&Value::Str("-v".into())));
        assert_eq!(parsed.value("verbose"), None);
    }

    #[test]
    fn test_bool_equals_forms() {
        for (arg, expected) in [("--verbose=", true), ("-v=1", true), ("-v=false", false), ("-v=0", false)] {
            let outcome = sim(&cli(), &[arg, "a"]);
            assert_eq!(
                outcome.parsed().unwrap().value("verbose"),
                Some(&Value::Bool(expected)),
                "{arg}"
            );
        }
        let outcome = sim(&cli(), &["-v=maybe", "a"]);
        assert_eq!(
            outcome.failure().unwrap().message,
            "invalid bool value \"maybe\" for option 'v'"
        );
    }

    #[test]
    fn test_option_errors() {
        let cases = [
            (vec!["-"], "empty option ('-') found"),
            (vec!["--bogus"], "unknown option 'bogus'"),
            (vec!["--name"], "option 'name' needs an argument"),
            (vec![], "missing required argument <first>"),
            (vec!["a", "x"], "invalid i32 value \"x\" for argument [second]"),
        ];
        for (args, message) in cases {
            let outcome = sim(&cli(), &args);
            let failure = outcome.failure().unwrap_or_else(|| panic!("{args:?} should fail"));
            assert_eq!(failure.message, message);
            assert_eq!(failure.path, "cli");
            assert_eq!(outcome.exit_status(), 2);
        }
    }

    #[test]
    fn test_help_wins_over_later_errors() {
        let outcome = sim(&cli(), &["-h", "--bogus"]);
        match outcome {
            Outcome::Help { path, text } => {
                assert_eq!(path, "cli");
                assert!(text.starts_with("cli - do things"));
            }
            other => panic!("expected help, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_display_matches_generated_output() {
        let failure = ParseFailure {
            path: "git remote".into(),
            message: "no command provided".into(),
        };
        assert_eq!(
            failure.to_string(),
            "error: no command provided.\nRun 'git remote -h' for usage."
        );
    }

    #[test]
    fn test_required_argument_satisfied_by_env() {
        let mut root = Command::new("Cli", "", "cli");
        root.options.push(OptionSpec::help());
        root.arguments
            .push(Argument::new("input", TypeKind::String).required().with_env("MY_INPUT"));

        let env: HashMap<String, String> =
            [("MY_INPUT".to_string(), "from-env".to_string())].into();
        let outcome = simulate(&root, &[] as &[&str], &env, &LayoutConfig::default());
        assert_eq!(
            outcome.parsed().unwrap().value("input"),
            Some(&Value::Str("from-env".into()))
        );

        let outcome = simulate(&root, &["explicit"], &env, &LayoutConfig::default());
        assert_eq!(
            outcome.parsed().unwrap().value("input"),
            Some(&Value::Str("explicit".into()))
        );
    }

    #[test]
    fn test_invalid_env_value_fails() {
        let mut root = Command::new("Cli", "", "cli");
        root.options
            .push(OptionSpec::new("count", None, Some("count"), TypeKind::U32).with_env("COUNT"));
        root.options.push(OptionSpec::help());

        let env: HashMap<String, String> = [("COUNT".to_string(), "-1".to_string())].into();
        let outcome = simulate(&root, &["--count", "3"], &env, &LayoutConfig::default());
        assert_eq!(
            outcome.failure().unwrap().message,
            "invalid u32 value \"-1\" for env var \"COUNT\""
        );
    }
}
