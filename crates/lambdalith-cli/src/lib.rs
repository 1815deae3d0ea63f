// Target-specific transitive dependency split (mio/crossterm stack) is accepted for now.
#![allow(clippy::multiple_crate_versions)]

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use lambdalith_domain::OrderedPlan;
use lambdalith_engine::{DEFAULT_REGION, DEFAULT_STACK_NAME, StackSettings, synthesize_from_env};
use lambdalith_report::{ColorChoice, OutputFormat, RenderOptions, redact_sensitive, render_plan};
use minus::{ExitStrategy, Pager, page_all};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod error;

pub use error::CliError;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "LAMBDALITH_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "lambdalith",
    about = "Synthesize the lambdalith deployment into an ordered provisioning plan"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Declare the stack and print its provisioning order
    Synth(SynthArgs),
}

#[derive(Debug, Clone, Args)]
struct SynthArgs {
    /// Directory containing functions/back and functions/front
    #[arg(long, default_value = ".")]
    project_root: PathBuf,
    #[arg(long, default_value = DEFAULT_STACK_NAME)]
    stack_name: String,
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,
    /// Write the plan to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    render: RenderFlags,
}

impl SynthArgs {
    fn settings(&self) -> StackSettings {
        StackSettings {
            stack_name: self.stack_name.clone(),
            project_root: self.project_root.clone(),
            region: self.region.clone(),
            ..StackSettings::default()
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Args)]
struct RenderFlags {
    #[arg(long, value_enum, default_value_t = ColorArg::Auto)]
    color: ColorArg,
    #[arg(long)]
    verbose: bool,
}

impl RenderFlags {
    fn render_options(&self, target: &str) -> RenderOptions {
        RenderOptions {
            color: self.color.into(),
            verbose: self.verbose,
            target: Some(target.to_string()),
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

impl From<ColorArg> for ColorChoice {
    fn from(value: ColorArg) -> Self {
        match value {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Run the CLI using process arguments.
///
/// # Errors
///
/// Returns an error when argument parsing fails (excluding help/version) or command
/// execution fails.
pub fn run() -> std::result::Result<i32, CliError> {
    init_logging();
    run_from(std::env::args_os())
}

fn run_from<I, T>(args: I) -> std::result::Result<i32, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(error.into()),
        },
    };

    match cli.command {
        Commands::Synth(args) => run_synth(&args),
    }
}

fn run_synth(args: &SynthArgs) -> std::result::Result<i32, CliError> {
    let settings = args.settings();
    debug!(
        stack = %settings.stack_name,
        root = %settings.project_root.display(),
        "synthesizing"
    );

    let (plan, sensitive_values) = synthesize_from_env(&settings)?;
    publish_plan(args, &plan, &sensitive_values)
}

fn publish_plan(
    args: &SynthArgs,
    plan: &OrderedPlan,
    sensitive_values: &BTreeSet<String>,
) -> std::result::Result<i32, CliError> {
    let output_format: OutputFormat = args.format.into();
    let render_options = args
        .render
        .render_options(&args.project_root.display().to_string());
    let rendered = render_plan(plan, output_format, &render_options)?;

    match &args.output {
        Some(path) => write_output(path, &rendered, sensitive_values)?,
        None => emit_output(&rendered, output_format, sensitive_values),
    }
    Ok(0)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn write_output(
    path: &Path,
    rendered: &str,
    sensitive_values: &BTreeSet<String>,
) -> std::result::Result<(), CliError> {
    let mut redacted = redact_sensitive(rendered, sensitive_values);
    if !redacted.ends_with('\n') {
        redacted.push('\n');
    }
    fs::write(path, redacted).map_err(|source| CliError::WriteOutput {
        path: path.to_path_buf(),
        source,
    })
}

fn emit_output(rendered: &str, format: OutputFormat, sensitive_values: &BTreeSet<String>) {
    let redacted = redact_sensitive(rendered, sensitive_values);

    if format == OutputFormat::Text && should_use_pager() && page_output(&redacted).is_ok() {
        return;
    }

    if redacted.ends_with('\n') {
        print!("{redacted}");
    } else {
        println!("{redacted}");
    }
}

fn should_use_pager() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_PAGER").is_none()
}

fn page_output(rendered: &str) -> std::result::Result<(), minus::MinusError> {
    let pager = Pager::new();
    pager.set_exit_strategy(ExitStrategy::PagerQuit)?;
    pager.set_text(rendered)?;
    page_all(pager)
}
