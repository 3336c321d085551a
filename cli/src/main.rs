use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clapdoc_builder::{Built, Declarations, SchemaBuilder};
use clapdoc_codegen::{GenerateConfig, Generator, LayoutStyle, Outcome, ProcessEnv, simulate};
use serde::Serialize;
use tracing::{debug, info};

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliLayoutStyle {
    Packed,
    Roomy,
}

impl From<CliLayoutStyle> for LayoutStyle {
    fn from(style: CliLayoutStyle) -> Self {
        match style {
            CliLayoutStyle::Packed => Self::Packed,
            CliLayoutStyle::Roomy => Self::Roomy,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "clapdoc", version)]
#[command(about = "Generate command-line parsers from documented record declarations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate Rust parser source for a root record.
    Generate(GenerateArgs),
    /// Build the command tree and report warnings.
    Check(CheckArgs),
    /// Print the help text of a command.
    Usage(UsageArgs),
    /// Dump the command tree.
    Tree(TreeArgs),
    /// Run an argument list through the parser without generating code.
    Try(TryArgs),
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Declaration file (YAML or JSON, chosen by extension).
    #[arg(long)]
    decls: PathBuf,
    /// Root record type.
    #[arg(long = "type", value_name = "TYPE")]
    root_type: String,
    /// Program name used in usage text (default: the root's cmd_name, else
    /// the lower-cased type name).
    #[arg(long)]
    name: Option<String>,
}

#[derive(Debug, Args)]
struct LayoutArgs {
    /// YAML generation config; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum help text line width.
    #[arg(long)]
    width: Option<usize>,
    /// Help table layout.
    #[arg(long)]
    style: Option<CliLayoutStyle>,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    layout: LayoutArgs,
    /// Output file (default: stdout).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Include the generator version in the header comment.
    #[arg(long)]
    stamp_version: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Report format (default: one line per warning).
    #[arg(long)]
    format: Option<CliOutputFormat>,
}

#[derive(Debug, Args)]
struct UsageArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    layout: LayoutArgs,
    /// Subcommand names leading from the root to the command to show.
    #[arg(long, num_args = 1..)]
    path: Vec<String>,
}

#[derive(Debug, Args)]
struct TreeArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct TryArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    layout: LayoutArgs,
    /// Output format for the parsed values.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Arguments to parse, after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let result = match cli.command {
        Command::Generate(args) => run_generate(args).map(|()| 0),
        Command::Check(args) => run_check(args).map(|()| 0),
        Command::Usage(args) => run_usage(args).map(|()| 0),
        Command::Tree(args) => run_tree(args).map(|()| 0),
        Command::Try(args) => run_try(args),
    };

    match result {
        Ok(0) => {}
        Ok(status) => std::process::exit(status),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn build_tree(args: &SchemaArgs) -> Result<Built, String> {
    let decls = Declarations::load(&args.decls)
        .map_err(|err| format!("Failed to load '{}': {err}", args.decls.display()))?;
    debug!(path = %args.decls.display(), records = decls.records.len(), "Loaded declarations");

    let mut builder = SchemaBuilder::new(&decls);
    if let Some(name) = &args.name {
        builder = builder.program_name(name.as_str());
    }
    builder.build(&args.root_type).map_err(|err| err.to_string())
}

/// Config file first, then command-line overrides.
fn resolve_config(args: &LayoutArgs, stamp_version: bool) -> Result<GenerateConfig, String> {
    let mut config = match &args.config {
        Some(path) => GenerateConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => GenerateConfig::default(),
    };
    if let Some(width) = args.width {
        config.layout.width = width;
    }
    if let Some(style) = args.style {
        config.layout.style = style.into();
    }
    config.stamp_version |= stamp_version;
    config.validate().map_err(|err| err.to_string())
}

fn find_command<'a>(
    root: &'a clapdoc_core::Command,
    path: &[String],
) -> Result<&'a clapdoc_core::Command, String> {
    let mut cmd = root;
    for name in path {
        cmd = cmd
            .find_subcommand(name)
            .ok_or_else(|| format!("unknown command '{name}' under '{}'", cmd.path()))?;
    }
    Ok(cmd)
}

fn render<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|err| format!("Failed to serialize output: {err}")),
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|err| format!("Failed to serialize output: {err}"))
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), String> {
    let config = resolve_config(&args.layout, args.stamp_version)?;
    let built = build_tree(&args.schema)?;
    let code = Generator::new(config).generate(&built.root);

    let Some(out) = args.out else {
        print!("{code}");
        return Ok(());
    };

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    fs::write(&out, code).map_err(|err| format!("Failed to write '{}': {err}", out.display()))?;

    let commands = built.root.post_order().len();
    info!(path = %out.display(), commands, "Wrote parser");
    println!(
        "Generated parser for {commands} command(s) into '{}'.",
        out.display()
    );
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let built = build_tree(&args.schema)?;
    let warnings = built.diagnostics.warnings();

    if let Some(format) = args.format {
        println!("{}", render(&warnings, format)?);
        return Ok(());
    }

    for warning in warnings {
        println!("warning: {warning}");
    }
    println!(
        "Checked '{}': {} command(s), {} warning(s).",
        built.root.name,
        built.root.post_order().len(),
        warnings.len()
    );
    Ok(())
}

fn run_usage(args: UsageArgs) -> Result<(), String> {
    let config = resolve_config(&args.layout, false)?;
    let built = build_tree(&args.schema)?;
    let cmd = find_command(&built.root, &args.path)?;
    println!("{}", clapdoc_codegen::render_usage(cmd, &config.layout));
    Ok(())
}

fn run_tree(args: TreeArgs) -> Result<(), String> {
    let built = build_tree(&args.schema)?;
    println!("{}", render(&built.root, args.format)?);
    Ok(())
}

fn run_try(args: TryArgs) -> Result<i32, String> {
    let config = resolve_config(&args.layout, false)?;
    let built = build_tree(&args.schema)?;

    let outcome = simulate(&built.root, &args.args, &ProcessEnv, &config.layout);
    match &outcome {
        Outcome::Parsed(parsed) => println!("{}", render(parsed, args.format)?),
        Outcome::Help { text, .. } => println!("{text}"),
        Outcome::Failed(failure) => eprintln!("{failure}"),
    }
    Ok(outcome.exit_status())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clapdoc_core::{OptionSpec, TypeKind};

    use super::*;

    fn layout_args() -> LayoutArgs {
        LayoutArgs {
            config: None,
            width: None,
            style: None,
        }
    }

    #[test]
    fn test_resolve_config_defaults() {
        let config = resolve_config(&layout_args(), false).unwrap();
        assert_eq!(config, GenerateConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "layout:\n  width: 60\n  style: roomy").unwrap();

        let args = LayoutArgs {
            config: Some(file.path().to_path_buf()),
            width: Some(70),
            style: None,
        };
        let config = resolve_config(&args, true).unwrap();
        assert_eq!(config.layout.width, 70);
        assert_eq!(config.layout.style, LayoutStyle::Roomy);
        assert!(config.stamp_version);
    }

    #[test]
    fn test_tiny_width_rejected() {
        let args = LayoutArgs {
            width: Some(3),
            ..layout_args()
        };
        let err = resolve_config(&args, false).unwrap_err();
        assert!(err.contains("at least"), "{err}");
    }

    #[test]
    fn test_find_command_walks_names_and_aliases() {
        let mut root = clapdoc_core::Command::new("Git", "", "git");
        root.options.push(OptionSpec::help());
        let mut remote = clapdoc_core::Command::new("Remote", "remote", "remote");
        remote.parent_names = vec!["git".into()];
        remote.aliases = vec!["r".into()];
        remote.options.push(OptionSpec::new("v", Some("v"), None, TypeKind::Bool));
        root.subcommands.push(remote);

        let found = find_command(&root, &["r".to_string()]).unwrap();
        assert_eq!(found.path(), "git remote");
        assert_eq!(find_command(&root, &[]).unwrap().name, "git");

        let err = find_command(&root, &["remote".into(), "add".into()]).unwrap_err();
        assert_eq!(err, "unknown command 'add' under 'git remote'");
    }
}
