//! Shared runtime code emitted once at the top of a generated file.
//!
//! Only the pieces a command tree actually needs are emitted: a tree with
//! no float fields gets no float parser, a tree without env bindings gets
//! no env lookup, and so on.

use std::collections::BTreeSet;

use clapdoc_core::{Command, TypeCategory, TypeKind};
use serde::Serialize;

/// What the generated code for one tree needs from the preamble.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreambleNeeds {
    /// Kinds used by options and arguments anywhere in the tree.
    pub kinds: BTreeSet<TypeKind>,
    /// Some option is boolean.
    pub bool_options: bool,
    /// Some option takes a value.
    pub value_options: bool,
    /// Some command has positional arguments or subcommands.
    pub positionals: bool,
    /// Some option or argument has an env binding.
    pub env: bool,
    /// The root has subcommands.
    pub subcommands: bool,
}

impl PreambleNeeds {
    /// Collects the needs of the whole tree in one walk.
    ///
    /// # Examples
    ///
    /// ```
    /// use clapdoc_codegen::PreambleNeeds;
    /// use clapdoc_core::{Argument, Command, OptionSpec, TypeKind};
    ///
    /// let mut root = Command::new("Cli", "", "cli");
    /// root.options.push(OptionSpec::new("n", Some("n"), None, TypeKind::U16));
    /// root.options.push(OptionSpec::help());
    ///
    /// let needs = PreambleNeeds::scan(&root);
    /// assert!(needs.ints());
    /// assert!(!needs.floats());
    /// assert!(needs.value_options);
    /// assert!(!needs.bool_options);
    /// ```
    pub fn scan(root: &Command) -> Self {
        let mut needs = Self {
            subcommands: root.has_subcommands(),
            ..Self::default()
        };
        for cmd in root.post_order() {
            for opt in cmd.field_options() {
                needs.kinds.insert(opt.kind);
                needs.bool_options |= opt.kind.is_bool();
                needs.value_options |= !opt.kind.is_bool();
                needs.env |= opt.env.is_some();
            }
            for arg in &cmd.arguments {
                needs.kinds.insert(arg.kind);
                needs.env |= arg.env.is_some();
            }
            needs.positionals |= !cmd.arguments.is_empty() || cmd.has_subcommands();
        }
        needs
    }

    pub fn bools(&self) -> bool {
        self.has_category(TypeCategory::Bool)
    }

    pub fn ints(&self) -> bool {
        self.kinds.iter().any(|kind| kind.is_integer())
    }

    pub fn floats(&self) -> bool {
        self.has_category(TypeCategory::Float)
    }

    fn has_category(&self, category: TypeCategory) -> bool {
        self.kinds.iter().any(|kind| kind.category() == category)
    }

    /// Renders the preamble.
    pub fn render(&self) -> String {
        let mut parts = vec![PARSER];
        if self.value_options {
            parts.push(NEXT_STR);
        }
        if self.bool_options {
            parts.push(THIS_BOOL);
        }
        if self.positionals {
            parts.push(REST);
        }
        if self.subcommands {
            parts.push(NEXT_COMMAND);
        }
        if self.bools() {
            parts.push(PARSE_BOOL);
        }
        if self.ints() {
            parts.push(PARSE_INT);
        }
        if self.floats() {
            parts.push(PARSE_FLOAT);
        }
        if self.env {
            parts.push(ENV);
        }
        parts.join("\n")
    }
}

const PARSER: &str = r#"struct ClapParser<'a> {
    path: &'static str,
    usage: fn() -> &'static str,
    args: &'a [String],
    idx: usize,
    eq_val: Option<String>,
}

impl<'a> ClapParser<'a> {
    fn new(path: &'static str, usage: fn() -> &'static str, args: &'a [String]) -> Self {
        Self {
            path,
            usage,
            args,
            idx: 0,
            eq_val: None,
        }
    }

    fn fail(&self, msg: &str) -> ! {
        eprintln!("error: {msg}.\nRun '{} -h' for usage.", self.path);
        std::process::exit(2);
    }

    fn exit_usage(&self) -> ! {
        println!("{}", (self.usage)());
        std::process::exit(0);
    }

    /// Consumes the next option token and returns its name; `None` once the
    /// options end.
    fn stage_opt(&mut self) -> Option<String> {
        let args = self.args;
        let name = args.get(self.idx)?.strip_prefix('-')?;
        if name.is_empty() {
            self.fail("empty option ('-') found");
        }
        self.idx += 1;
        let name = name.strip_prefix('-').unwrap_or(name);
        if name.is_empty() {
            return None;
        }
        match name.split_once('=') {
            Some((name, val)) => {
                self.eq_val = Some(val.to_string());
                Some(name.to_string())
            }
            None => {
                self.eq_val = None;
                Some(name.to_string())
            }
        }
    }
}
"#;

const NEXT_STR: &str = r#"impl ClapParser<'_> {
    fn next_str(&mut self, name: &str) -> String {
        if let Some(val) = self.eq_val.take() {
            return val;
        }
        let args = self.args;
        let Some(val) = args.get(self.idx) else {
            self.fail(&format!("option '{name}' needs an argument"));
        };
        self.idx += 1;
        val.clone()
    }
}
"#;

const THIS_BOOL: &str = r#"impl ClapParser<'_> {
    fn this_bool(&mut self, name: &str) -> bool {
        match self.eq_val.take() {
            None => true,
            Some(val) => clap_parse_bool(&val)
                .unwrap_or_else(|e| self.fail(&format!("{e} for option '{name}'"))),
        }
    }
}
"#;

const REST: &str = r#"impl<'a> ClapParser<'a> {
    fn rest(&self) -> &'a [String] {
        let args = self.args;
        &args[self.idx..]
    }
}
"#;

const NEXT_COMMAND: &str = r#"impl<'a> ClapParser<'a> {
    fn next_command(&self, rest: &'a [String]) -> (&'a str, &'a [String]) {
        match rest.split_first() {
            Some((name, rest)) => (name.as_str(), rest),
            None => self.fail("no command provided"),
        }
    }
}
"#;

const PARSE_BOOL: &str = r#"fn clap_parse_bool(text: &str) -> Result<bool, String> {
    match text {
        "" | "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("invalid bool value \"{text}\"")),
    }
}
"#;

const PARSE_INT: &str = r#"fn clap_parse_int<T: TryFrom<i128>>(text: &str, kind: &str) -> Result<T, String> {
    let invalid = || format!("invalid {kind} value \"{text}\"");
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = if let Some(d) = body.strip_prefix("0x").or(body.strip_prefix("0X")) {
        (16, d)
    } else if let Some(d) = body.strip_prefix("0o").or(body.strip_prefix("0O")) {
        (8, d)
    } else if let Some(d) = body.strip_prefix("0b").or(body.strip_prefix("0B")) {
        (2, d)
    } else {
        (10, body)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(invalid());
    }
    let magnitude = i128::from_str_radix(digits, radix).map_err(|_| invalid())?;
    let value = if negative { -magnitude } else { magnitude };
    T::try_from(value).map_err(|_| invalid())
}
"#;

const PARSE_FLOAT: &str = r#"fn clap_parse_float<T: std::str::FromStr>(text: &str, kind: &str) -> Result<T, String> {
    text.parse()
        .map_err(|_| format!("invalid {kind} value \"{text}\""))
}
"#;

const ENV: &str = r#"fn clap_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
"#;
