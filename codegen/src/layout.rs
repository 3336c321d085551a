//! Help text layout.
//!
//! Every command renders to one block of text:
//!
//! ```text
//! strops - perform different string operations
//!
//! usage:
//!    strops [options] <input>
//!
//! options:
//!    -u, --upper   make the input uppercase
//!    -h, --help    show this help message
//!
//! arguments:
//!    <input>   the string on which to operate
//! ```
//!
//! Tables size their name column to the longest entry. Descriptions are
//! word wrapped to [`LayoutConfig::width`].

use clapdoc_core::{Argument, Command, OptionSpec};
use serde::{Deserialize, Serialize};

/// Default maximum line width.
pub const DEFAULT_WIDTH: usize = 90;

const INDENT: usize = 3;
const GAP: usize = 3;

/// How table entries are arranged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStyle {
    /// Name and description on one line, continuation lines aligned under
    /// the description.
    #[default]
    Packed,
    /// Name alone on a line, description indented below it, a blank line
    /// between entries.
    Roomy,
}

/// Layout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub width: usize,
    pub style: LayoutStyle,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            style: LayoutStyle::Packed,
        }
    }
}

impl LayoutConfig {
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_style(mut self, style: LayoutStyle) -> Self {
        self.style = style;
        self
    }
}

/// Greedy word wrap.
///
/// Every output line starts with `indent` spaces. Lines are filled word by
/// word and broken before a word that would exceed `width`; a single word
/// longer than the line stands alone. Newlines in `text` are kept as hard
/// breaks and trailing whitespace is stripped from every line.
///
/// # Examples
///
/// ```
/// use clapdoc_codegen::layout::wrap;
///
/// assert_eq!(wrap("one two three", 2, 9), "  one two\n  three");
/// assert_eq!(wrap("keep\nbreaks", 0, 80), "keep\nbreaks");
/// ```
pub fn wrap(text: &str, indent: usize, width: usize) -> String {
    let pad = " ".repeat(indent);
    let mut lines: Vec<String> = Vec::new();
    let mut line = pad.clone();
    let mut line_len = indent;
    let mut word = String::new();
    let mut word_len = 0;

    let mut take_line = |line: &mut String, line_len: &mut usize| {
        lines.push(line.trim_end().to_string());
        line.clone_from(&pad);
        *line_len = indent;
    };

    for ch in text.trim().chars() {
        if !ch.is_whitespace() {
            word.push(ch);
            word_len += 1;
            continue;
        }
        if line_len > indent && line_len + word_len > width {
            take_line(&mut line, &mut line_len);
        }
        line.push_str(&word);
        line_len += word_len;
        word.clear();
        word_len = 0;
        if ch == '\n' {
            take_line(&mut line, &mut line_len);
        } else {
            line.push(ch);
            line_len += 1;
        }
    }
    if word_len > 0 {
        if line_len > indent && line_len + word_len > width {
            take_line(&mut line, &mut line_len);
        }
        line.push_str(&word);
    }
    take_line(&mut line, &mut line_len);

    lines.join("\n")
}

/// Wraps `text` under a hanging `prefix`: the first line starts with the
/// prefix, continuation lines are indented to the prefix's width.
fn wrap_hanging(prefix: &str, text: &str, width: usize) -> String {
    let indent = prefix.chars().count();
    let wrapped = wrap(text, indent, width);
    let mut out = String::from(prefix);
    out.push_str(wrapped.trim_start_matches(' '));
    out.trim_end().to_string()
}

/// Name column of an option: `-s, --long  <arg>`.
///
/// A missing short name is replaced by spaces so long names line up.
///
/// # Examples
///
/// ```
/// use clapdoc_codegen::layout::option_column;
/// use clapdoc_core::{OptionSpec, TypeKind};
///
/// let opt = OptionSpec::new("upper", Some("u"), Some("upper"), TypeKind::Bool);
/// assert_eq!(option_column(&opt), "-u, --upper");
///
/// let opt = OptionSpec::new("count", None, Some("count"), TypeKind::U32);
/// assert_eq!(option_column(&opt), "    --count  <arg>");
/// ```
pub fn option_column(opt: &OptionSpec) -> String {
    let mut s = String::new();
    match &opt.short {
        Some(short) => {
            s.push('-');
            s.push_str(short);
        }
        None => s.push_str("  "),
    }
    if opt.short.is_some() && opt.long.is_some() {
        s.push_str(", ");
    } else {
        s.push_str("  ");
    }
    if let Some(long) = &opt.long {
        s.push_str("--");
        s.push_str(long);
    }
    if let Some(placeholder) = opt.value_placeholder() {
        s.push_str("  ");
        s.push_str(&placeholder);
    }
    s.trim_end().to_string()
}

/// Invocation lines for the `usage:` section.
///
/// `cmd_usage` overrides replace the synthesized line.
pub fn usage_lines(cmd: &Command) -> Vec<String> {
    let path = cmd.path();
    if !cmd.usage_overrides.is_empty() {
        return cmd
            .usage_overrides
            .iter()
            .map(|text| format!("{path} {text}"))
            .collect();
    }

    let mut line = format!("{path} [options]");
    if cmd.has_subcommands() {
        line.push_str(" <command>");
    }
    for arg in &cmd.arguments {
        line.push(' ');
        line.push_str(&arg.usage_name());
    }
    vec![line]
}

fn with_env(blurb: &str, env: Option<&str>) -> String {
    match env {
        Some(var) if blurb.is_empty() => format!("[${var}]"),
        Some(var) => format!("{blurb} [${var}]"),
        None => blurb.to_string(),
    }
}

fn option_description(opt: &OptionSpec) -> String {
    with_env(&opt.text.blurb, opt.env.as_deref())
}

fn argument_description(arg: &Argument) -> String {
    with_env(&arg.text.blurb, arg.env.as_deref())
}

/// Renders `(name, description)` rows as an aligned table.
fn render_table(rows: &[(String, String)], config: &LayoutConfig) -> String {
    let name_width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0);
    let pad = " ".repeat(INDENT);

    match config.style {
        LayoutStyle::Packed => rows
            .iter()
            .map(|(name, desc)| {
                let prefix = format!("{pad}{name:<name_width$}{}", " ".repeat(GAP));
                wrap_hanging(&prefix, desc, config.width)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        LayoutStyle::Roomy => rows
            .iter()
            .map(|(name, desc)| {
                let mut entry = format!("{pad}{name}");
                if !desc.is_empty() {
                    entry.push('\n');
                    entry.push_str(&wrap(desc, INDENT + GAP, config.width));
                }
                entry
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Renders the complete help block of a command.
///
/// The result has no trailing newline.
///
/// # Examples
///
/// ```
/// use clapdoc_codegen::layout::{LayoutConfig, render_usage};
/// use clapdoc_core::{AnnotatedText, Argument, Command, OptionSpec};
/// use clapdoc_core::TypeKind;
///
/// let mut cmd = Command::new("Echo", "", "echo");
/// cmd.text = AnnotatedText::with_blurb("print the input");
/// cmd.options.push(OptionSpec::help());
/// cmd.arguments.push(Argument::new("input", TypeKind::String).required());
///
/// let usage = render_usage(&cmd, &LayoutConfig::default());
/// assert!(usage.starts_with("echo - print the input\n\nusage:\n   echo [options] <input>\n"));
/// assert!(usage.contains("options:\n   -h, --help   show this help message"));
/// ```
pub fn render_usage(cmd: &Command, config: &LayoutConfig) -> String {
    let mut out = cmd.path();
    if !cmd.text.blurb.is_empty() {
        out.push_str(" - ");
        out.push_str(&cmd.text.blurb);
    }

    if !cmd.text.overview.is_empty() {
        out.push_str("\n\noverview:\n");
        let paragraphs: Vec<String> = cmd
            .text
            .overview
            .iter()
            .map(|para| wrap(para, INDENT, config.width))
            .collect();
        out.push_str(&paragraphs.join("\n\n"));
    }

    out.push_str("\n\nusage:\n");
    let lines: Vec<String> = usage_lines(cmd)
        .into_iter()
        .map(|line| format!("{}{line}", " ".repeat(INDENT)))
        .collect();
    out.push_str(&lines.join("\n"));

    if !cmd.options.is_empty() {
        let rows: Vec<_> = cmd
            .options
            .iter()
            .map(|opt| (option_column(opt), option_description(opt)))
            .collect();
        out.push_str("\n\noptions:\n");
        out.push_str(&render_table(&rows, config));
    }

    if !cmd.arguments.is_empty() {
        let rows: Vec<_> = cmd
            .arguments
            .iter()
            .map(|arg| (arg.usage_name(), argument_description(arg)))
            .collect();
        out.push_str("\n\narguments:\n");
        out.push_str(&render_table(&rows, config));
    }

    if cmd.has_subcommands() {
        let rows: Vec<_> = cmd
            .subcommands
            .iter()
            .map(|sub| (sub.name.clone(), sub.text.blurb.clone()))
            .collect();
        out.push_str("\n\nsubcommands:\n");
        out.push_str(&render_table(&rows, config));
    }

    out
}
