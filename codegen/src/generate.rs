//! Rust parser generation.
//!
//! A generated file holds the preamble, one usage function and one parse
//! function per command, and an `impl` block on the root record type:
//!
//! ```text
//! fn clap_usage_root_remote() -> &'static str { .. }
//! fn clap_parse_root_remote(c: &mut Remote, args: &[String]) { .. }
//! fn clap_usage_root() -> &'static str { .. }
//! fn clap_parse_root(c: &mut Git, args: &[String]) { .. }
//! impl Git {
//!     pub fn usage_help() -> &'static str { .. }
//!     pub fn parse(&mut self) { .. }
//!     pub fn parse_args(&mut self, args: &[String]) { .. }
//! }
//! ```
//!
//! Functions are named by the field path from the root, so one record type
//! can appear at several places in the tree. A path whose name is already
//! taken (`remote_add` next to `remote` → `add`) gets a numeric suffix.
//! Commands are emitted children first.

use std::collections::BTreeSet;

use clapdoc_core::{Argument, Command, OptionSpec, TypeCategory, TypeKind};
use rayon::prelude::*;
use tracing::debug;

use crate::config::GenerateConfig;
use crate::layout::render_usage;
use crate::preamble::PreambleNeeds;

/// A command together with the identifier suffix of its generated functions.
#[derive(Debug, Clone)]
struct Unit<'a> {
    suffix: String,
    cmd: &'a Command,
    /// Suffixes of the subcommands, in subcommand order.
    children: Vec<String>,
}

/// Renders Rust source for a command tree.
///
/// # Examples
///
/// ```
/// use clapdoc_codegen::{GenerateConfig, Generator};
/// use clapdoc_core::{Command, OptionSpec, TypeKind};
///
/// let mut root = Command::new("Cli", "", "cli");
/// root.options.push(OptionSpec::new("verbose", Some("v"), None, TypeKind::Bool));
/// root.options.push(OptionSpec::help());
///
/// let code = Generator::new(GenerateConfig::default()).generate(&root);
/// assert!(code.starts_with("// Code generated by clapdoc; DO NOT EDIT."));
/// assert!(code.contains("fn clap_parse_root(c: &mut Cli, args: &[String])"));
/// assert!(code.contains(r#""v" => c.verbose = p.this_bool(&name),"#));
/// assert!(code.contains("impl Cli {"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GenerateConfig,
}

impl Generator {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerateConfig {
        &self.config
    }

    /// Generates the complete source file for the tree rooted at `root`.
    ///
    /// Output depends only on the tree and the configuration.
    pub fn generate(&self, root: &Command) -> String {
        let needs = PreambleNeeds::scan(root);

        let mut taken = BTreeSet::from(["root".to_string()]);
        let mut units = Vec::new();
        collect_units(root, "root".to_string(), &mut taken, &mut units);

        debug!(
            root = %root.name,
            commands = units.len(),
            kinds = ?needs.kinds,
            "Generating parser"
        );

        let rendered: Vec<String> = units
            .par_iter()
            .map(|unit| self.render_unit(unit))
            .collect();

        let mut out = self.header();
        out.push('\n');
        out.push_str(&needs.render());
        for unit in rendered {
            out.push('\n');
            out.push_str(&unit);
        }
        out.push('\n');
        out.push_str(&root_impl(root));
        out
    }

    fn header(&self) -> String {
        if self.config.stamp_version {
            format!(
                "// Code generated by clapdoc v{}; DO NOT EDIT.\n",
                env!("CARGO_PKG_VERSION")
            )
        } else {
            "// Code generated by clapdoc; DO NOT EDIT.\n".to_string()
        }
    }

    fn render_unit(&self, unit: &Unit<'_>) -> String {
        let mut out = usage_fn(unit, &render_usage(unit.cmd, &self.config.layout));
        out.push('\n');
        out.push_str(&parse_fn(unit));
        out
    }
}

/// Convenience wrapper around [`Generator::generate`].
pub fn generate(root: &Command, config: &GenerateConfig) -> String {
    Generator::new(config.clone()).generate(root)
}

/// Post-order list of units. Every suffix is claimed in `taken` exactly once.
fn collect_units<'a>(
    cmd: &'a Command,
    suffix: String,
    taken: &mut BTreeSet<String>,
    out: &mut Vec<Unit<'a>>,
) {
    let mut children = Vec::with_capacity(cmd.subcommands.len());
    for sub in &cmd.subcommands {
        let child = claim_suffix(format!("{suffix}_{}", ident_part(&sub.field_name)), taken);
        collect_units(sub, child.clone(), taken, out);
        children.push(child);
    }
    out.push(Unit {
        suffix,
        cmd,
        children,
    });
}

fn claim_suffix(base: String, taken: &mut BTreeSet<String>) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn ident_part(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where",
    "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

/// Field access expression on `c`, escaping keywords.
fn field(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("c.r#{name}")
    } else {
        format!("c.{name}")
    }
}

/// A raw string literal holding `text`.
fn raw_string(text: &str) -> String {
    let mut hashes = 1;
    while text.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let guard = "#".repeat(hashes);
    format!("r{guard}\"{text}\"{guard}")
}

fn quoted(text: &str) -> String {
    format!("{text:?}")
}

fn usage_fn(unit: &Unit<'_>, usage: &str) -> String {
    format!(
        "fn clap_usage_{}() -> &'static str {{\n    {}\n}}\n",
        unit.suffix,
        raw_string(usage)
    )
}

/// What a failed conversion names in its error message.
enum Context {
    /// The option currently held in `name`.
    Option,
    /// Fixed text, emitted as a string literal.
    Literal(String),
}

/// Expression converting the string `src` into a value of `kind`, failing
/// with `context` appended to the message.
fn convert(kind: TypeKind, src: &str, context: &Context) -> String {
    let fail = match context {
        Context::Option => "|e| p.fail(&format!(\"{e} for option '{name}'\"))".to_string(),
        Context::Literal(text) => {
            format!("|e| p.fail(&format!(\"{{e}} for {{}}\", {}))", quoted(text))
        }
    };
    match kind.category() {
        TypeCategory::String => format!("{src}.to_string()"),
        TypeCategory::Bool => format!("clap_parse_bool(&{src}).unwrap_or_else({fail})"),
        TypeCategory::SignedInt | TypeCategory::UnsignedInt => format!(
            "clap_parse_int(&{src}, {}).unwrap_or_else({fail})",
            quoted(kind.label())
        ),
        TypeCategory::Float => format!(
            "clap_parse_float(&{src}, {}).unwrap_or_else({fail})",
            quoted(kind.label())
        ),
    }
}

fn env_context(var: &str) -> Context {
    Context::Literal(format!("env var \"{var}\""))
}

fn env_holder(arg: &Argument) -> String {
    format!("env_{}", ident_part(&arg.field_name))
}

/// Required arguments with an env binding remember whether the env var was
/// set, so a missing token is not an error.
fn tracks_env(arg: &Argument) -> bool {
    arg.required && arg.env.is_some()
}

fn parse_fn(unit: &Unit<'_>) -> String {
    let cmd = unit.cmd;
    let writes_fields = cmd.field_options().next().is_some()
        || !cmd.arguments.is_empty()
        || cmd.has_subcommands();
    let target = if writes_fields { "c" } else { "_c" };
    let mut out = String::new();
    out.push_str(&format!(
        "fn clap_parse_{}({target}: &mut {}, args: &[String]) {{\n",
        unit.suffix, cmd.type_name
    ));
    out.push_str(&format!(
        "    let mut p = ClapParser::new({}, clap_usage_{}, args);\n",
        quoted(&cmd.path()),
        unit.suffix
    ));

    env_fallbacks(cmd, &mut out);
    option_loop(cmd, &mut out);
    if !cmd.arguments.is_empty() || cmd.has_subcommands() {
        out.push_str("    let rest = p.rest();\n");
    }
    positionals(cmd, &mut out);
    dispatch(unit, &mut out);

    out.push_str("}\n");
    out
}

fn env_fallbacks(cmd: &Command, out: &mut String) {
    for opt in cmd.field_options() {
        let Some(var) = &opt.env else { continue };
        out.push_str(&format!("    if let Some(v) = clap_env({}) {{\n", quoted(var)));
        out.push_str(&format!(
            "        {} = {};\n",
            field(&opt.field_name),
            convert(opt.kind, "v", &env_context(var))
        ));
        out.push_str("    }\n");
    }
    for arg in &cmd.arguments {
        let Some(var) = &arg.env else { continue };
        let assign = format!(
            "        {} = {};\n",
            field(&arg.field_name),
            convert(arg.kind, "v", &env_context(var))
        );
        if tracks_env(arg) {
            let holder = env_holder(arg);
            out.push_str(&format!("    let {holder} = clap_env({});\n", quoted(var)));
            out.push_str(&format!("    if let Some(v) = &{holder} {{\n"));
        } else {
            out.push_str(&format!("    if let Some(v) = clap_env({}) {{\n", quoted(var)));
        }
        out.push_str(&assign);
        out.push_str("    }\n");
    }
}

fn match_pattern(opt: &OptionSpec) -> String {
    opt.names().map(quoted).collect::<Vec<_>>().join(" | ")
}

fn option_loop(cmd: &Command, out: &mut String) {
    out.push_str("    while let Some(name) = p.stage_opt() {\n");
    out.push_str("        match name.as_str() {\n");
    for opt in cmd.field_options() {
        let target = field(&opt.field_name);
        let pattern = match_pattern(opt);
        match opt.kind.category() {
            TypeCategory::Bool => {
                out.push_str(&format!(
                    "            {pattern} => {target} = p.this_bool(&name),\n"
                ));
            }
            TypeCategory::String => {
                out.push_str(&format!(
                    "            {pattern} => {target} = p.next_str(&name),\n"
                ));
            }
            _ => {
                out.push_str(&format!("            {pattern} => {{\n"));
                out.push_str("                let v = p.next_str(&name);\n");
                out.push_str(&format!(
                    "                {target} = {};\n",
                    convert(opt.kind, "v", &Context::Option)
                ));
                out.push_str("            }\n");
            }
        }
    }
    out.push_str("            \"help\" | \"h\" => p.exit_usage(),\n");
    out.push_str("            _ => p.fail(&format!(\"unknown option '{name}'\")),\n");
    out.push_str("        }\n");
    out.push_str("    }\n");
}

fn positionals(cmd: &Command, out: &mut String) {
    if cmd.arguments.is_empty() {
        return;
    }
    let labeled = cmd
        .arguments
        .iter()
        .any(|arg| !arg.required || arg.env.is_some());
    let indent = if labeled { "        " } else { "    " };
    if labeled {
        out.push_str("    'positionals: {\n");
    }

    for (idx, arg) in cmd.arguments.iter().enumerate() {
        let missing = format!(
            "p.fail({})",
            quoted(&format!("missing required argument {}", arg.usage_name()))
        );
        out.push_str(&format!("{indent}let Some(v) = rest.get({idx}) else {{\n"));
        if !arg.required {
            out.push_str(&format!("{indent}    break 'positionals;\n"));
        } else if tracks_env(arg) {
            out.push_str(&format!(
                "{indent}    if {}.is_none() {{\n{indent}        {missing};\n{indent}    }}\n",
                env_holder(arg)
            ));
            out.push_str(&format!("{indent}    break 'positionals;\n"));
        } else {
            out.push_str(&format!("{indent}    {missing};\n"));
        }
        out.push_str(&format!("{indent}}};\n"));
        let context = Context::Literal(format!("argument {}", arg.usage_name()));
        out.push_str(&format!(
            "{indent}{} = {};\n",
            field(&arg.field_name),
            convert(arg.kind, "v", &context)
        ));
    }

    if labeled {
        out.push_str("    }\n");
    }
}

fn dispatch(unit: &Unit<'_>, out: &mut String) {
    let cmd = unit.cmd;
    if !cmd.has_subcommands() {
        return;
    }
    let count = cmd.arguments.len();
    if count == 0 {
        out.push_str("    let (cmd, rest) = p.next_command(rest);\n");
    } else {
        out.push_str(&format!(
            "    let (cmd, rest) = p.next_command(rest.get({count}..).unwrap_or_default());\n"
        ));
    }
    out.push_str("    match cmd {\n");
    for (sub, suffix) in cmd.subcommands.iter().zip(&unit.children) {
        let pattern = sub.all_names().map(quoted).collect::<Vec<_>>().join(" | ");
        let target = field(&sub.field_name);
        out.push_str(&format!("        {pattern} => {{\n"));
        out.push_str(&format!("            {target} = Some(Default::default());\n"));
        out.push_str(&format!("            if let Some(sub) = {target}.as_mut() {{\n"));
        out.push_str(&format!("                clap_parse_{suffix}(sub, rest);\n"));
        out.push_str("            }\n");
        out.push_str("        }\n");
    }
    out.push_str("        _ => p.fail(&format!(\"unknown command '{cmd}'\")),\n");
    out.push_str("    }\n");
}

fn root_impl(root: &Command) -> String {
    format!(
        r#"impl {ty} {{
    /// Returns the help text of `{name}`.
    pub fn usage_help() -> &'static str {{
        clap_usage_root()
    }}

    /// Parses the process arguments into `self`.
    ///
    /// Prints the help text and exits on `-h`/`--help`; prints an error and
    /// exits with status 2 on invalid input.
    pub fn parse(&mut self) {{
        let args: Vec<String> = std::env::args().skip(1).collect();
        self.parse_args(&args);
    }}

    /// Parses `args`, which must not include the program name.
    pub fn parse_args(&mut self, args: &[String]) {{
        clap_parse_root(self, args);
    }}
}}
"#,
        ty = root.type_name,
        name = root.name,
    )
}

#[cfg(test)]
mod tests {
    use clapdoc_core::AnnotatedText;

    use super::*;
    use crate::layout::LayoutConfig;

    fn git() -> Command {
        let mut root = Command::new("Git", "", "git");
        root.text = AnnotatedText::with_blurb("the stupid content tracker");
        root.options.push(OptionSpec::new("verbose", Some("v"), Some("verbose"), TypeKind::Bool));
        root.options.push(OptionSpec::help());

        let mut remote = Command::new("Remote", "remote", "remote");
        remote.parent_names = vec!["git".into()];
        remote.aliases = vec!["r".into()];
        remote.options.push(OptionSpec::help());

        let mut add = Command::new("RemoteAdd", "add", "add");
        add.parent_names = vec!["git".into(), "remote".into()];
        add.options.push(OptionSpec::help());
        add.arguments.push(Argument::new("name", TypeKind::String).required());
        add.arguments.push(Argument::new("url", TypeKind::String).required());

        remote.subcommands.push(add);
        root.subcommands.push(remote);
        root
    }

    #[test]
    fn test_output_is_deterministic() {
        let config = GenerateConfig::default();
        assert_eq!(generate(&git(), &config), generate(&git(), &config));
    }

    #[test]
    fn test_units_are_emitted_children_first() {
        let code = generate(&git(), &GenerateConfig::default());
        let add = code.find("fn clap_parse_root_remote_add(c: &mut RemoteAdd").unwrap();
        let remote = code.find("fn clap_parse_root_remote(c: &mut Remote").unwrap();
        let root = code.find("fn clap_parse_root(c: &mut Git").unwrap();
        let imp = code.find("impl Git {").unwrap();
        assert!(add < remote && remote < root && root < imp);
    }

    #[test]
    fn test_dispatch_matches_aliases() {
        let code = generate(&git(), &GenerateConfig::default());
        assert!(code.contains("        \"remote\" | \"r\" => {\n"));
        assert!(code.contains("            c.remote = Some(Default::default());\n"));
        assert!(code.contains("                clap_parse_root_remote(sub, rest);\n"));
        assert!(code.contains("_ => p.fail(&format!(\"unknown command '{cmd}'\")),"));
        assert!(code.contains("ClapParser::new(\"git remote add\", clap_usage_root_remote_add, args)"));
    }

    #[test]
    fn test_stamp_version_header() {
        let config = GenerateConfig {
            stamp_version: true,
            ..GenerateConfig::default()
        };
        let code = generate(&git(), &config);
        let expected = format!(
            "// Code generated by clapdoc v{}; DO NOT EDIT.\n",
            env!("CARGO_PKG_VERSION")
        );
        assert!(code.starts_with(&expected));
    }

    #[test]
    fn test_layout_config_reaches_usage_text() {
        let roomy = GenerateConfig {
            layout: LayoutConfig::default().with_style(crate::layout::LayoutStyle::Roomy),
            ..GenerateConfig::default()
        };
        let packed = generate(&git(), &GenerateConfig::default());
        assert_ne!(generate(&git(), &roomy), packed);
    }

    #[test]
    fn test_raw_string_guard_grows() {
        assert_eq!(raw_string("plain"), "r#\"plain\"#");
        assert_eq!(raw_string("say \"hi\""), "r#\"say \"hi\"\"#");
        assert_eq!(raw_string("tricky \"# end"), "r##\"tricky \"# end\"##");
    }

    #[test]
    fn test_keyword_fields_are_escaped() {
        assert_eq!(field("type"), "c.r#type");
        assert_eq!(field("kind"), "c.kind");
        assert_eq!(ident_part("dry-run"), "dry_run");
        assert_eq!(ident_part("Remote"), "remote");
    }

    #[test]
    fn test_numeric_option_converts_with_context() {
        let mut root = Command::new("Cli", "", "cli");
        root.options.push(OptionSpec::new("count", Some("n"), Some("count"), TypeKind::U16));
        root.options.push(OptionSpec::help());

        let code = generate(&root, &GenerateConfig::default());
        assert!(code.contains(
            "c.count = clap_parse_int(&v, \"u16\").unwrap_or_else(|e| p.fail(&format!(\"{e} for option '{name}'\")));"
        ));
        assert!(code.contains("\"count\" | \"n\" => {"));
    }

    #[test]
    fn test_env_fallback_precedes_option_loop() {
        let mut root = Command::new("Cli", "", "cli");
        root.options
            .push(OptionSpec::new("token", None, Some("token"), TypeKind::String).with_env("TOKEN"));
        root.options.push(OptionSpec::help());

        let code = generate(&root, &GenerateConfig::default());
        let env = code.find("if let Some(v) = clap_env(\"TOKEN\") {").unwrap();
        let scan = code.find("while let Some(name) = p.stage_opt()").unwrap();
        assert!(env < scan);
        assert!(code.contains("fn clap_env(name: &str)"));
    }

    #[test]
    fn test_positional_block_label_only_when_needed() {
        let code = generate(&git(), &GenerateConfig::default());
        assert!(!code.contains("'positionals"));
        assert!(code.contains("let Some(v) = rest.get(1) else {\n        p.fail(\"missing required argument <url>\");\n    };"));

        let mut root = Command::new("Cli", "", "cli");
        root.options.push(OptionSpec::help());
        root.arguments
            .push(Argument::new("input", TypeKind::String).required().with_env("INPUT"));
        root.arguments.push(Argument::new("level", TypeKind::I8));

        let code = generate(&root, &GenerateConfig::default());
        assert!(code.contains("    'positionals: {\n"));
        assert!(code.contains("    let env_input = clap_env(\"INPUT\");\n"));
        assert!(code.contains("            if env_input.is_none() {\n"));
        assert!(code.contains(
            "c.level = clap_parse_int(&v, \"i8\").unwrap_or_else(|e| p.fail(&format!(\"{e} for {}\", \"argument [level]\")));"
        ));
    }

    #[test]
    fn test_colliding_field_paths_get_distinct_functions() {
        let mut root = git();
        let mut flat = Command::new("RemoteAdd", "remote_add", "remote-add");
        flat.parent_names = vec!["git".into()];
        flat.options.push(OptionSpec::help());
        root.subcommands.insert(0, flat);

        let code = generate(&root, &GenerateConfig::default());
        let names: Vec<&str> = code
            .lines()
            .filter_map(|line| line.strip_prefix("fn clap_parse_"))
            .filter_map(|rest| rest.split('(').next())
            .filter(|name| name.starts_with("root"))
            .collect();
        assert_eq!(
            names,
            vec!["root_remote_add", "root_remote_add_2", "root_remote", "root"]
        );

        assert!(code.contains("                clap_parse_root_remote_add(sub, rest);\n"));
        assert!(code.contains("                clap_parse_root_remote_add_2(sub, rest);\n"));
        assert!(code.contains("ClapParser::new(\"git remote add\", clap_usage_root_remote_add_2, args)"));
        assert!(code.contains("ClapParser::new(\"git remote-add\", clap_usage_root_remote_add, args)"));
    }

    #[test]
    fn test_leaf_without_fields_ignores_target() {
        let code = generate(&git(), &GenerateConfig::default());
        assert!(code.contains("fn clap_parse_root_remote(c: &mut Remote, args: &[String]) {"));

        let mut root = Command::new("Cli", "", "cli");
        root.options.push(OptionSpec::help());
        let code = generate(&root, &GenerateConfig::default());
        assert!(code.contains("fn clap_parse_root(_c: &mut Cli, args: &[String]) {"));
    }

    #[test]
    fn test_argument_context_is_a_string_literal() {
        let mut root = Command::new("Cli", "", "cli");
        root.options.push(OptionSpec::help());
        let mut arg = Argument::new("count", TypeKind::U8).required();
        arg.name = "{n}".to_string();
        root.arguments.push(arg);

        let code = generate(&root, &GenerateConfig::default());
        assert!(code.contains("p.fail(&format!(\"{e} for {}\", \"argument <{n}>\"))"));
    }
}
