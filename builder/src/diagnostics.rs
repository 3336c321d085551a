//! Non-fatal findings collected while building a command tree.

use std::fmt;

use serde::Serialize;
use tracing::warn;

/// Why a field or type produced a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum WarningKind {
    /// Field declared without a name.
    EmbeddedField,
    /// Field declaring several names at once.
    MultiNameField(Vec<String>),
    /// Field whose type is an anonymous record.
    InlineRecord,
    /// Record type used by value instead of through a pointer.
    RecordByValue(String),
    /// Pointer whose target is not a named record.
    NonRecordPointer(String),
    /// Pointer to a type the declaration source does not know.
    UnresolvedRecord(String),
    /// Scalar type outside the supported set.
    UnsupportedType(String),
    /// Root type documentation has no blurb.
    MissingRootDescription,
}

/// A single warning, tied to the record type and field it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl Warning {
    /// `Type.field`, or just `Type` for type-level warnings.
    pub fn location(&self) -> String {
        match &self.field {
            Some(field) => format!("{}.{field}", self.type_name),
            None => self.type_name.clone(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = self.location();
        match &self.kind {
            WarningKind::EmbeddedField => {
                write!(f, "skipping embedded field in '{at}'")
            }
            WarningKind::MultiNameField(names) => write!(
                f,
                "skipping '{}.{}' (declare fields one per line)",
                self.type_name,
                names.join(", ")
            ),
            WarningKind::InlineRecord => {
                write!(f, "skipping '{at}' (commands must be record pointers)")
            }
            WarningKind::RecordByValue(ty) => write!(
                f,
                "skipping '{at}' (record '{ty}' must be referenced through a pointer)"
            ),
            WarningKind::NonRecordPointer(ty) => {
                write!(f, "skipping '{at}' (pointer to non-record type '{ty}')")
            }
            WarningKind::UnresolvedRecord(ty) => {
                write!(f, "skipping '{at}' (could not find record type '{ty}')")
            }
            WarningKind::UnsupportedType(ty) => {
                write!(f, "skipping '{at}' (unsupported type '{ty}')")
            }
            WarningKind::MissingRootDescription => write!(
                f,
                "no description for root type '{at}', add a doc comment for better help text"
            ),
        }
    }
}

/// Warnings gathered during one build, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and logs it.
    pub fn push(&mut self, type_name: &str, field: Option<&str>, kind: WarningKind) {
        let warning = Warning {
            type_name: type_name.to_string(),
            field: field.map(String::from),
            kind,
        };
        warn!(location = %warning.location(), "{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Rendered messages, one per warning.
    pub fn messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    /// Returns `true` if any warning has the given kind.
    pub fn contains(&self, kind: &WarningKind) -> bool {
        self.warnings.iter().any(|w| &w.kind == kind)
    }
}
