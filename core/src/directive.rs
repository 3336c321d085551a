//! Directive comments and annotated documentation text.
//!
//! Documentation attached to a record type or one of its fields is split into
//! three parts:
//!
//! - a one-line *blurb* used in summary lines and help tables,
//! - zero or more *overview* paragraphs (only rendered for commands),
//! - the `clap:` directives that configure how the item is exposed.
//!
//! # Examples
//!
//! ```
//! use clapdoc_core::AnnotatedText;
//!
//! let doc = "Make the input uppercase.\n\nclap:opt u,upper\n";
//! let text = AnnotatedText::parse(Some(doc));
//!
//! assert_eq!(text.blurb, "make the input uppercase");
//! assert!(text.overview.is_empty());
//! assert_eq!(text.value_of("opt"), Some("u,upper"));
//! ```

use serde::{Deserialize, Serialize};

/// Line prefix that marks a documentation line as a directive.
pub const DIRECTIVE_MARKER: &str = "clap:";

/// A `clap:key value` configuration line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Text between the marker and the first space.
    pub key: String,
    /// Everything after the first space, if there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Directive {
    /// Creates a directive from its parts.
    pub fn new(key: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            key: key.into(),
            value: value.map(String::from),
        }
    }

    /// Parses a single documentation line.
    ///
    /// Returns `None` when the line does not start with [`DIRECTIVE_MARKER`].
    /// A bare marker yields a directive with an empty key.
    ///
    /// # Examples
    ///
    /// ```
    /// use clapdoc_core::Directive;
    ///
    /// let d = Directive::parse("clap:env MY_FLAG").unwrap();
    /// assert_eq!(d.key, "env");
    /// assert_eq!(d.value.as_deref(), Some("MY_FLAG"));
    ///
    /// let d = Directive::parse("clap:arg_required").unwrap();
    /// assert_eq!(d.value, None);
    ///
    /// assert!(Directive::parse("not a directive").is_none());
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix(DIRECTIVE_MARKER)?;
        Some(match rest.split_once(' ') {
            Some((key, value)) => Self::new(key, Some(value)),
            None => Self::new(rest, None),
        })
    }

    /// Serializes the directive back into the line it was parsed from.
    pub fn to_line(&self) -> String {
        match &self.value {
            Some(value) => format!("{DIRECTIVE_MARKER}{} {value}", self.key),
            None => format!("{DIRECTIVE_MARKER}{}", self.key),
        }
    }

    /// Returns the value, or an empty string for valueless directives.
    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Documentation text split into blurb, overview, and directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedText {
    /// One-line summary.
    pub blurb: String,
    /// Paragraphs after the first blank line; lines within a paragraph are
    /// joined with `\n`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overview: Vec<String>,
    /// Directives in top-to-bottom order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
}

impl AnnotatedText {
    /// Parses raw documentation text (comment markers already stripped).
    ///
    /// # Examples
    ///
    /// ```
    /// use clapdoc_core::AnnotatedText;
    ///
    /// let doc = "Print a string.\n\nFirst paragraph\ncontinues here.\n\nSecond one.\n\nclap:cmd_name p";
    /// let text = AnnotatedText::parse(Some(doc));
    ///
    /// assert_eq!(text.blurb, "print a string");
    /// assert_eq!(text.overview, vec!["First paragraph\ncontinues here.", "Second one."]);
    /// assert_eq!(text.value_of("cmd_name"), Some("p"));
    ///
    /// assert_eq!(AnnotatedText::parse(None), AnnotatedText::default());
    /// ```
    pub fn parse(doc: Option<&str>) -> Self {
        let Some(doc) = doc else {
            return Self::default();
        };

        let mut directives = Vec::new();
        let mut lines = Vec::new();
        for line in doc.lines() {
            match Directive::parse(line) {
                Some(directive) => directives.push(directive),
                None => lines.push(line),
            }
        }

        let split = lines
            .iter()
            .position(|line| line.trim().is_empty())
            .unwrap_or(lines.len());
        let blurb = normalize_blurb(&lines[..split].join(" "));
        let overview = paragraphs(lines.get(split + 1..).unwrap_or_default());

        Self {
            blurb,
            overview,
            directives,
        }
    }

    /// Creates text holding only a blurb.
    pub fn with_blurb(blurb: &str) -> Self {
        Self {
            blurb: blurb.to_string(),
            ..Default::default()
        }
    }

    /// Returns the first directive with the given key.
    pub fn directive(&self, key: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.key == key)
    }

    /// Returns the value of the first directive with the given key.
    ///
    /// Valueless directives report an empty string so that presence can be
    /// told apart from absence.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.directive(key).map(Directive::value_or_empty)
    }

    /// Returns the values of every directive with the given key, in order.
    pub fn values_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.directives
            .iter()
            .filter(move |d| d.key == key)
            .map(Directive::value_or_empty)
    }

    /// Returns `true` if a directive with the given key is present.
    pub fn has(&self, key: &str) -> bool {
        self.directive(key).is_some()
    }

    /// Returns `true` if any directive key starts with `prefix`.
    pub fn has_key_prefix(&self, prefix: &str) -> bool {
        self.directives.iter().any(|d| d.key.starts_with(prefix))
    }

    /// Renders the text back into documentation form.
    ///
    /// Parsing the result yields the same directives; the blurb is emitted
    /// in its normalized form.
    pub fn to_doc(&self) -> String {
        let mut out = self.blurb.clone();
        for para in &self.overview {
            out.push_str("\n\n");
            out.push_str(para);
        }
        if !self.directives.is_empty() {
            out.push('\n');
            for directive in &self.directives {
                out.push('\n');
                out.push_str(&directive.to_line());
            }
        }
        out
    }
}

fn normalize_blurb(raw: &str) -> String {
    let trimmed = raw.trim();
    let blurb = trimmed.strip_suffix('.').unwrap_or(trimmed);

    let split = blurb.find(char::is_whitespace).unwrap_or(blurb.len());
    let (word, rest) = blurb.split_at(split);
    if word == "A" || !is_all_upper(word) {
        format!("{}{rest}", word.to_lowercase())
    } else {
        blurb.to_string()
    }
}

fn is_all_upper(word: &str) -> bool {
    !word.chars().any(char::is_lowercase)
}

fn paragraphs(lines: &[&str]) -> Vec<String> {
    lines
        .split(|line| line.trim().is_empty())
        .filter(|group| !group.is_empty())
        .map(|group| group.join("\n"))
        .collect()
}
