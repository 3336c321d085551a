//! Type declaration sources.
//!
//! The schema builder never reads source files itself. It asks a
//! [`TypeDeclSource`] for the fields of a named record type and for the
//! documentation attached to that type. [`Declarations`] is the in-memory
//! implementation; it can be assembled in code or loaded from a YAML or JSON
//! declaration file.
//!
//! # Example YAML
//!
//! ```yaml
//! records:
//!   - name: Strops
//!     doc: Perform different string operations.
//!     fields:
//!       - name: upper
//!         type: bool
//!         doc: |
//!           Make the input uppercase.
//!
//!           clap:opt u,upper
//!       - name: input
//!         type: String
//!         doc: |
//!           The string on which to operate.
//!
//!           clap:arg_required
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// A field's declared type, reduced to the shapes the builder cares about.
///
/// # Examples
///
/// ```
/// use clapdoc_builder::TypeRef;
///
/// assert_eq!(TypeRef::parse("u32"), TypeRef::Named("u32".into()));
/// assert_eq!(
///     TypeRef::parse("Option<Box<Add>>"),
///     TypeRef::Pointer(Box::new(TypeRef::Named("Add".into())))
/// );
/// assert_eq!(
///     TypeRef::parse("*Add"),
///     TypeRef::Pointer(Box::new(TypeRef::Named("Add".into())))
/// );
/// assert_eq!(TypeRef::parse("struct { a: u8 }"), TypeRef::InlineRecord);
/// assert!(matches!(TypeRef::parse("Vec<String>"), TypeRef::Other(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A plain type name.
    Named(String),
    /// One level of indirection (`*T`, `Box<T>`, `Option<T>`, `Option<Box<T>>`).
    Pointer(Box<TypeRef>),
    /// An anonymous record type declared in place.
    InlineRecord,
    /// Any other type expression.
    Other(String),
}

impl TypeRef {
    /// Parses a textual type reference.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        if let Some(inner) = text.strip_prefix('*') {
            return Self::Pointer(Box::new(Self::parse(inner)));
        }
        if let Some(inner) = strip_generic(text, "Option") {
            let inner = strip_generic(inner, "Box").unwrap_or(inner);
            return Self::Pointer(Box::new(Self::parse(inner)));
        }
        if let Some(inner) = strip_generic(text, "Box") {
            return Self::Pointer(Box::new(Self::parse(inner)));
        }
        if text.starts_with('{') || text == "struct" || text.starts_with("struct ") {
            return Self::InlineRecord;
        }
        let plain = !text.is_empty()
            && text
                .chars()
                .all(|ch| ch.is_alphanumeric() || ch == '_' || ch == ':');
        if plain {
            Self::Named(text.to_string())
        } else {
            Self::Other(text.to_string())
        }
    }
}

fn strip_generic<'a>(text: &'a str, wrapper: &str) -> Option<&'a str> {
    text.strip_prefix(wrapper)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Pointer(inner) => write!(f, "*{inner}"),
            Self::InlineRecord => f.write_str("struct {..}"),
            Self::Other(text) => f.write_str(text),
        }
    }
}

impl From<String> for TypeRef {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

/// A field of a record declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldDecl {
    /// Declared names; exactly one for fields the builder can use.
    #[serde(
        rename = "name",
        alias = "names",
        deserialize_with = "one_or_many",
        default
    )]
    pub names: Vec<String>,
    /// Declared type.
    #[serde(rename = "type", deserialize_with = "type_ref")]
    pub ty: TypeRef,
    /// Raw documentation text.
    #[serde(default)]
    pub doc: Option<String>,
}

impl FieldDecl {
    /// Creates a single-named field.
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            names: vec![name.to_string()],
            ty: TypeRef::parse(ty),
            doc: None,
        }
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(de)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}

fn type_ref<'de, D: Deserializer<'de>>(de: D) -> Result<TypeRef, D::Error> {
    String::deserialize(de).map(TypeRef::from)
}

/// A named record type with its fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    /// Documentation attached to the type declaration.
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl RecordDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            doc: None,
            fields: Vec::new(),
        }
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

/// Provides record declarations to the schema builder.
pub trait TypeDeclSource {
    /// Returns the record declaration for `type_name`, if it is a record.
    fn resolve(&self, type_name: &str) -> Option<&RecordDecl>;

    /// Returns the documentation attached to the declaration of `type_name`.
    fn documentation_of(&self, type_name: &str) -> Option<String> {
        self.resolve(type_name).and_then(|record| record.doc.clone())
    }
}

/// Errors loading a declaration file.
#[derive(Debug, Error)]
pub enum SourceError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Two records share a name.
    #[error("duplicate record type '{0}'")]
    DuplicateRecord(String),
}

/// In-memory set of record declarations.
///
/// # Examples
///
/// ```
/// use clapdoc_builder::{Declarations, FieldDecl, RecordDecl, TypeDeclSource};
///
/// let decls = Declarations::new()
///     .with_record(
///         RecordDecl::new("Cli")
///             .doc("Do things.")
///             .field(FieldDecl::new("verbose", "bool").doc("Be loud.\n\nclap:opt v")),
///     );
///
/// assert_eq!(decls.resolve("Cli").unwrap().fields.len(), 1);
/// assert_eq!(decls.documentation_of("Cli").as_deref(), Some("Do things."));
/// assert!(decls.resolve("Missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub records: Vec<RecordDecl>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record declaration.
    pub fn with_record(mut self, record: RecordDecl) -> Self {
        self.records.push(record);
        self
    }

    /// Parses declarations from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, SourceError> {
        let decls: Self = serde_yaml::from_str(text)?;
        decls.check_unique()
    }

    /// Parses declarations from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, SourceError> {
        let decls: Self = serde_json::from_str(text)?;
        decls.check_unique()
    }

    /// Loads a declaration file; `.json` files are read as JSON, anything
    /// else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the file cannot be read, a parse
    /// error for malformed content, or [`SourceError::DuplicateRecord`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    fn check_unique(self) -> Result<Self, SourceError> {
        for (idx, record) in self.records.iter().enumerate() {
            if self.records[..idx].iter().any(|r| r.name == record.name) {
                return Err(SourceError::DuplicateRecord(record.name.clone()));
            }
        }
        Ok(self)
    }
}

impl TypeDeclSource for Declarations {
    fn resolve(&self, type_name: &str) -> Option<&RecordDecl> {
        self.records.iter().find(|r| r.name == type_name)
    }
}
