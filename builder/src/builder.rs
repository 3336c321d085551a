//! Command tree construction.
//!
//! [`SchemaBuilder`] walks record declarations starting at a root type and
//! turns every usable field into an option, a positional argument or a
//! subcommand. Fields the builder cannot use are skipped with a warning;
//! configuration mistakes are hard errors.

use clapdoc_core::{
    AnnotatedText, Argument, Command, OptionNameError, OptionSpec, TypeKind, parse_option_names,
    validate_command,
};
use tracing::debug;

use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::{Result, SchemaError};
use crate::source::{FieldDecl, RecordDecl, TypeDeclSource, TypeRef};

/// A built command tree together with the warnings raised while building it.
#[derive(Debug, Clone)]
pub struct Built {
    pub root: Command,
    pub diagnostics: Diagnostics,
}

/// Builds a [`Command`] tree from a [`TypeDeclSource`].
///
/// # Examples
///
/// ```
/// use clapdoc_builder::{Declarations, FieldDecl, RecordDecl, SchemaBuilder};
///
/// let decls = Declarations::new().with_record(
///     RecordDecl::new("Strops")
///         .doc("Perform different string operations.")
///         .field(FieldDecl::new("upper", "bool").doc("Make it uppercase.\n\nclap:opt u,upper"))
///         .field(FieldDecl::new("input", "String").doc("The input.\n\nclap:arg_required")),
/// );
///
/// let built = SchemaBuilder::new(&decls).build("Strops").unwrap();
/// assert_eq!(built.root.name, "strops");
/// assert_eq!(built.root.options.len(), 2);
/// assert!(built.root.arguments[0].required);
/// assert!(built.diagnostics.is_empty());
/// ```
pub struct SchemaBuilder<'a, S: TypeDeclSource + ?Sized> {
    source: &'a S,
    program_name: Option<String>,
}

impl<'a, S: TypeDeclSource + ?Sized> SchemaBuilder<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            program_name: None,
        }
    }

    /// Sets the invocation name of the root command.
    ///
    /// Without it the root's `cmd_name` directive is used, falling back to
    /// the lower-cased root type name.
    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    /// Builds and validates the tree rooted at `root_type`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the root type is unknown, a field's
    /// directives are contradictory or malformed, or the finished tree fails
    /// [`validate_command`].
    pub fn build(&self, root_type: &str) -> Result<Built> {
        let record = self
            .source
            .resolve(root_type)
            .ok_or_else(|| SchemaError::RootNotFound(root_type.to_string()))?;

        let mut run = BuildRun {
            source: self.source,
            diagnostics: Diagnostics::new(),
            ancestors: Vec::new(),
        };

        let text = AnnotatedText::parse(self.source.documentation_of(root_type).as_deref());
        if text.blurb.is_empty() {
            run.diagnostics
                .push(root_type, None, WarningKind::MissingRootDescription);
        }

        let name = self
            .program_name
            .clone()
            .or_else(|| non_empty(text.value_of("cmd_name")))
            .unwrap_or_else(|| root_type.to_lowercase());

        let mut root = Command::new(root_type, "", &name);
        apply_command_directives(&mut root, text);
        run.add_fields(&mut root, record)?;

        if let Some(err) = validate_command(&root).into_iter().next() {
            return Err(SchemaError::Invalid(err));
        }

        debug!(
            root = %root.name,
            commands = root.post_order().len(),
            warnings = run.diagnostics.len(),
            "Built command tree"
        );
        Ok(Built {
            root,
            diagnostics: run.diagnostics,
        })
    }
}

/// Builds the tree rooted at `root_type` with default settings.
pub fn build<S: TypeDeclSource + ?Sized>(source: &S, root_type: &str) -> Result<Built> {
    SchemaBuilder::new(source).build(root_type)
}

struct BuildRun<'a, S: TypeDeclSource + ?Sized> {
    source: &'a S,
    diagnostics: Diagnostics,
    /// Record types of the commands currently being built, root first.
    ancestors: Vec<String>,
}

impl<S: TypeDeclSource + ?Sized> BuildRun<'_, S> {
    fn add_fields(&mut self, cmd: &mut Command, record: &RecordDecl) -> Result<()> {
        debug!(command = %cmd.path(), fields = record.fields.len(), "Adding fields");
        self.ancestors.push(record.name.clone());

        for field in &record.fields {
            let field_name = match field.names.as_slice() {
                [name] => name,
                [] => {
                    self.diagnostics
                        .push(&record.name, None, WarningKind::EmbeddedField);
                    continue;
                }
                names => {
                    self.diagnostics.push(
                        &record.name,
                        None,
                        WarningKind::MultiNameField(names.to_vec()),
                    );
                    continue;
                }
            };
            self.add_field(cmd, record, field_name, field)?;
        }

        self.ancestors.pop();
        cmd.options.push(OptionSpec::help());
        Ok(())
    }

    fn add_field(
        &mut self,
        cmd: &mut Command,
        record: &RecordDecl,
        field_name: &str,
        field: &FieldDecl,
    ) -> Result<()> {
        let source = self.source;
        let warn = |diagnostics: &mut Diagnostics, kind| {
            diagnostics.push(&record.name, Some(field_name), kind);
        };

        match &field.ty {
            TypeRef::InlineRecord => warn(&mut self.diagnostics, WarningKind::InlineRecord),
            TypeRef::Pointer(target) => match target.as_ref() {
                TypeRef::Named(target) => match source.resolve(target) {
                    Some(sub_record) => {
                        let sub = self.build_subcommand(cmd, record, field_name, sub_record)?;
                        cmd.subcommands.push(sub);
                    }
                    None if TypeKind::classify(target).is_some() => warn(
                        &mut self.diagnostics,
                        WarningKind::NonRecordPointer(target.clone()),
                    ),
                    None => warn(
                        &mut self.diagnostics,
                        WarningKind::UnresolvedRecord(target.clone()),
                    ),
                },
                other => warn(
                    &mut self.diagnostics,
                    WarningKind::NonRecordPointer(other.to_string()),
                ),
            },
            TypeRef::Named(type_name) => match TypeKind::classify(type_name) {
                Some(kind) => add_scalar(cmd, record, field_name, kind, field.doc.as_deref())?,
                None if source.resolve(type_name).is_some() => warn(
                    &mut self.diagnostics,
                    WarningKind::RecordByValue(type_name.clone()),
                ),
                None => warn(
                    &mut self.diagnostics,
                    WarningKind::UnsupportedType(type_name.clone()),
                ),
            },
            TypeRef::Other(text) => warn(
                &mut self.diagnostics,
                WarningKind::UnsupportedType(text.clone()),
            ),
        }
        Ok(())
    }

    fn build_subcommand(
        &mut self,
        parent: &Command,
        record: &RecordDecl,
        field_name: &str,
        sub_record: &RecordDecl,
    ) -> Result<Command> {
        if self.ancestors.contains(&sub_record.name) {
            return Err(SchemaError::RecursiveCommand {
                type_name: record.name.clone(),
                field: field_name.to_string(),
                target: sub_record.name.clone(),
            });
        }

        let text = AnnotatedText::parse(
            self.source
                .documentation_of(&sub_record.name)
                .as_deref(),
        );
        let name = non_empty(text.value_of("cmd_name"))
            .unwrap_or_else(|| field_name.to_lowercase());

        let mut sub = Command::new(&sub_record.name, field_name, &name);
        sub.parent_names = parent.parent_names.clone();
        sub.parent_names.push(parent.name.clone());
        apply_command_directives(&mut sub, text);

        self.add_fields(&mut sub, sub_record)?;
        Ok(sub)
    }
}

fn apply_command_directives(cmd: &mut Command, text: AnnotatedText) {
    if let Some(aliases) = text.value_of("cmd_aliases") {
        cmd.aliases = aliases
            .split(',')
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .map(String::from)
            .collect();
    }
    cmd.usage_overrides = text.values_of("cmd_usage").map(String::from).collect();
    cmd.text = text;
}

fn add_scalar(
    cmd: &mut Command,
    record: &RecordDecl,
    field_name: &str,
    kind: TypeKind,
    doc: Option<&str>,
) -> Result<()> {
    let text = AnnotatedText::parse(doc);
    let is_option = text.has_key_prefix("opt");
    let is_argument = text.has_key_prefix("arg");
    let env = non_empty(text.value_of("env"));

    if is_option && is_argument {
        return Err(SchemaError::OptionArgumentConflict {
            type_name: record.name.clone(),
            field: field_name.to_string(),
        });
    }

    if is_option {
        let invalid = |source| SchemaError::InvalidOption {
            type_name: record.name.clone(),
            field: field_name.to_string(),
            source,
        };
        let list = text
            .value_of("opt")
            .ok_or_else(|| invalid(OptionNameError::MissingOptDirective))?;
        let names = parse_option_names(list).map_err(invalid)?;

        let mut opt = OptionSpec::new(
            field_name,
            names.short.as_deref(),
            names.long.as_deref(),
            kind,
        );
        opt.value_name = non_empty(text.value_of("opt_arg_name"));
        opt.env = env;
        opt.text = text;
        debug!(command = %cmd.path(), option = %opt.display_name(), kind = %kind, "Added option");
        cmd.options.push(opt);
        return Ok(());
    }

    if kind.is_bool() {
        return Err(SchemaError::BoolArgument {
            type_name: record.name.clone(),
            field: field_name.to_string(),
        });
    }

    let mut arg = Argument::new(field_name, kind);
    if let Some(name) = non_empty(text.value_of("arg_name")) {
        arg.name = name;
    }
    arg.required = text.has("arg_required");
    arg.env = env;
    arg.text = text;
    debug!(command = %cmd.path(), argument = %arg.name, kind = %kind, "Added argument");
    cmd.arguments.push(arg);
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clapdoc_core::ValidationError;

    use crate::source::{Declarations, FieldDecl};

    fn strops() -> Declarations {
        Declarations::new().with_record(
            RecordDecl::new("Strops")
                .doc("Perform different string operations.\n\nclap:cmd_usage [-u] <input>")
                .field(FieldDecl::new("upper", "bool").doc("Make the input uppercase.\n\nclap:opt u,upper"))
                .field(FieldDecl::new("repeat", "u32").doc("Repeat the output.\n\nclap:opt_arg_name n\nclap:opt repeat,r\nclap:env STROPS_REPEAT"))
                .field(FieldDecl::new("input", "String").doc("The string on which to operate.\n\nclap:arg_required")),
        )
    }

    #[test]
    fn test_root_fields_classified() {
        let built = SchemaBuilder::new(&strops()).build("Strops").unwrap();
        let root = &built.root;

        assert_eq!(root.name, "strops");
        assert!(root.is_root());
        assert_eq!(root.text.blurb, "perform different string operations");
        assert_eq!(root.usage_overrides, vec!["[-u] <input>"]);

        let upper = root.find_option("u").unwrap();
        assert_eq!(upper.long.as_deref(), Some("upper"));
        assert_eq!(upper.kind, TypeKind::Bool);

        let repeat = root.find_option("repeat").unwrap();
        assert_eq!(repeat.short.as_deref(), Some("r"));
        assert_eq!(repeat.value_name.as_deref(), Some("n"));
        assert_eq!(repeat.env.as_deref(), Some("STROPS_REPEAT"));

        assert_eq!(root.arguments.len(), 1);
        assert_eq!(root.arguments[0].name, "input");
        assert!(root.arguments[0].required);
    }

    #[test]
    fn test_help_option_appended_last() {
        let built = SchemaBuilder::new(&strops()).build("Strops").unwrap();
        let options = &built.root.options;
        assert!(options.last().unwrap().is_help());
        assert_eq!(options.iter().filter(|o| o.is_help()).count(), 1);
    }

    #[test]
    fn test_program_name_precedence() {
        let decls = Declarations::new()
            .with_record(RecordDecl::new("Cli").doc("Do it.\n\nclap:cmd_name tool"));

        assert_eq!(build(&decls, "Cli").unwrap().root.name, "tool");
        let named = SchemaBuilder::new(&decls)
            .program_name("other")
            .build("Cli")
            .unwrap();
        assert_eq!(named.root.name, "other");

        let plain = Declarations::new().with_record(RecordDecl::new("MyTool").doc("Do it."));
        assert_eq!(build(&plain, "MyTool").unwrap().root.name, "mytool");
    }

    #[test]
    fn test_root_not_found() {
        let err = build(&Declarations::new(), "Nope").unwrap_err();
        assert_eq!(err, SchemaError::RootNotFound("Nope".to_string()));
    }

    #[test]
    fn test_option_directive_without_opt() {
        let decls = Declarations::new().with_record(
            RecordDecl::new("Cli")
                .doc("Do it.")
                .field(FieldDecl::new("count", "i32").doc("How many.\n\nclap:opt_arg_name n")),
        );
        let err = build(&decls, "Cli").unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidOption {
                type_name: "Cli".to_string(),
                field: "count".to_string(),
                source: OptionNameError::MissingOptDirective,
            }
        );
    }

    #[test]
    fn test_valueless_opt_directive() {
        let decls = Declarations::new().with_record(
            RecordDecl::new("Cli")
                .doc("Do it.")
                .field(FieldDecl::new("count", "i32").doc("How many.\n\nclap:opt")),
        );
        let err = build(&decls, "Cli").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidOption { source: OptionNameError::NoNames, .. }
        ));
    }

    #[test]
    fn test_bool_argument_rejected() {
        let decls = Declarations::new().with_record(
            RecordDecl::new("Cli")
                .doc("Do it.")
                .field(FieldDecl::new("flag", "bool").doc("A flag.")),
        );
        let err = build(&decls, "Cli").unwrap_err();
        assert_eq!(err.to_string(), "'Cli.flag': arguments cannot be type bool");
    }

    #[test]
    fn test_recursive_record_rejected() {
        let decls = Declarations::new().with_record(
            RecordDecl::new("Node")
                .doc("A node.")
                .field(FieldDecl::new("child", "Option<Box<Node>>")),
        );
        let err = build(&decls, "Node").unwrap_err();
        assert!(matches!(err, SchemaError::RecursiveCommand { target, .. } if target == "Node"));
    }

    #[test]
    fn test_skipped_fields_warn() {
        let decls = Declarations::new()
            .with_record(
                RecordDecl::new("Cli")
                    .doc("Do it.")
                    .field(FieldDecl::new("sub", "Sub"))
                    .field(FieldDecl::new("num", "*u32"))
                    .field(FieldDecl::new("ghost", "*Ghost"))
                    .field(FieldDecl::new("list", "Vec<String>"))
                    .field(FieldDecl::new("inline", "struct { a: u8 }"))
                    .field(FieldDecl::new("when", "Duration")),
            )
            .with_record(RecordDecl::new("Sub").doc("Sub."));

        let built = build(&decls, "Cli").unwrap();
        let kinds: Vec<_> = built
            .diagnostics
            .warnings()
            .iter()
            .map(|w| w.kind.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                WarningKind::RecordByValue("Sub".into()),
                WarningKind::NonRecordPointer("u32".into()),
                WarningKind::UnresolvedRecord("Ghost".into()),
                WarningKind::UnsupportedType("Vec<String>".into()),
                WarningKind::InlineRecord,
                WarningKind::UnsupportedType("Duration".into()),
            ]
        );
        assert!(built.root.subcommands.is_empty());
        assert_eq!(built.root.options.len(), 1);
    }

    #[test]
    fn test_missing_root_description_warns() {
        let decls = Declarations::new().with_record(RecordDecl::new("Cli"));
        let built = build(&decls, "Cli").unwrap();
        assert!(
            built
                .diagnostics
                .contains(&WarningKind::MissingRootDescription)
        );
    }

    #[test]
    fn test_same_record_reused_at_two_positions() {
        let decls = Declarations::new()
            .with_record(
                RecordDecl::new("Cli")
                    .doc("Do it.")
                    .field(FieldDecl::new("first", "*Leaf"))
                    .field(FieldDecl::new("second", "Option<Leaf>")),
            )
            .with_record(RecordDecl::new("Leaf").doc("A leaf."));

        let root = build(&decls, "Cli").unwrap().root;
        let names: Vec<_> = root.subcommands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(root.subcommands.iter().all(|c| c.type_name == "Leaf"));
    }

    #[test]
    fn test_duplicate_option_names_fail_validation() {
        let decls = Declarations::new().with_record(
            RecordDecl::new("Cli")
                .doc("Do it.")
                .field(FieldDecl::new("a", "bool").doc("A.\n\nclap:opt x"))
                .field(FieldDecl::new("b", "bool").doc("B.\n\nclap:opt x")),
        );
        let err = build(&decls, "Cli").unwrap_err();
        assert!(matches!(err, SchemaError::Invalid(_)));
        assert!(err.to_string().contains("duplicate option 'x'"));
    }

    #[test]
    fn test_unquotable_names_fail_validation() {
        let decls = Declarations::new().with_record(
            RecordDecl::new("Cli")
                .doc("Do it.")
                .field(FieldDecl::new("input", "String").doc("Input.\n\nclap:arg_name say\"hi")),
        );
        let err = build(&decls, "Cli").unwrap_err();
        assert_eq!(
            err,
            SchemaError::Invalid(ValidationError::InvalidArgumentName {
                command: "cli".to_string(),
                name: "say\"hi".to_string(),
            })
        );

        let decls = Declarations::new()
            .with_record(
                RecordDecl::new("Cli")
                    .doc("Do it.")
                    .field(FieldDecl::new("run", "*Run")),
            )
            .with_record(RecordDecl::new("Run").doc("Run.\n\nclap:cmd_name run fast"));
        let err = build(&decls, "Cli").unwrap_err();
        assert!(err.to_string().contains("invalid command name 'run fast'"), "{err}");
    }
}
