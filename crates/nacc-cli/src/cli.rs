//! Command line arguments for `nacc`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "nacc",
    version,
    about = "NACC identifier and form gears",
    long_about = "Run the NACC gears on local files.\n\n\
                  Each subcommand reads one CSV file, reports file errors and \
                  writes the gear's output. Settings not given on the command \
                  line are read from nacc.toml (or the file named by NACC_CONFIG)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Include participant identifiers and row values in logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Configuration file.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert allele pairs to NACC APOE codes.
    Apoe(ApoeArgs),

    /// Split a file into one CSV per center.
    SplitCenters(SplitCentersArgs),

    /// Split a file into one JSON document per subject.
    SplitSubjects(SplitSubjectsArgs),

    /// Add NACCIDs to a center's form file.
    LookupNaccid(LookupNaccidArgs),

    /// Add ADCID and PTID to rows keyed by NACCID.
    LookupCenter(LookupCenterArgs),

    /// Provision NACCIDs from an enrollment file.
    Provision(ProvisionArgs),

    /// Normalize form records and group them by subject.
    Transform(TransformArgs),

    /// Submit queued project files in round-robin module order.
    Schedule(ScheduleArgs),

    /// Inspect the identifier registry.
    Identifiers {
        #[command(subcommand)]
        command: IdentifiersCommand,
    },
}

/// Input file and error report shared by the file gears.
#[derive(Args)]
pub struct InputArgs {
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write file errors to this path (.json for JSON, CSV otherwise).
    #[arg(long = "errors", value_name = "PATH")]
    pub errors: Option<PathBuf>,
}

#[derive(Args)]
pub struct DatabaseArgs {
    /// Identifier registry database (overrides `identifiers.database`).
    #[arg(long = "db", value_name = "PATH", env = "NACC_DATABASE")]
    pub db: Option<PathBuf>,
}

#[derive(Args)]
pub struct ApoeArgs {
    #[command(flatten)]
    pub file: InputArgs,

    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct SplitCentersArgs {
    #[command(flatten)]
    pub file: InputArgs,

    /// Directory receiving one `adcid-<center>` folder per center.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Column holding the center id.
    #[arg(long = "key", value_name = "COLUMN")]
    pub key: Option<String>,
}

#[derive(Args)]
pub struct SplitSubjectsArgs {
    #[command(flatten)]
    pub file: InputArgs,

    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Columns that must be non-empty in every row (naccid is always required).
    #[arg(long = "require", value_name = "COLUMN", value_delimiter = ',')]
    pub require: Vec<String>,
}

#[derive(Args)]
pub struct LookupNaccidArgs {
    #[command(flatten)]
    pub file: InputArgs,

    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Center every row must belong to.
    #[arg(long = "adcid")]
    pub adcid: Option<u32>,

    /// Module name written to the `module` column.
    #[arg(long = "module")]
    pub module: Option<String>,

    /// Visit date column of the module.
    #[arg(long = "date-field", value_name = "COLUMN")]
    pub date_field: Option<String>,
}

#[derive(Args)]
pub struct LookupCenterArgs {
    #[command(flatten)]
    pub file: InputArgs,

    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

#[derive(Args)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub file: InputArgs,

    /// Write recorded transfers to this YAML file.
    #[arg(long = "transfers", value_name = "PATH")]
    pub transfers: Option<PathBuf>,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Module value expected in every row.
    #[arg(long = "form-name")]
    pub form_name: Option<String>,
}

#[derive(Args)]
pub struct TransformArgs {
    #[command(flatten)]
    pub file: InputArgs,

    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// JSON field filter definitions.
    #[arg(long = "transformations", value_name = "PATH")]
    pub transformations: Option<PathBuf>,
}

#[derive(Args)]
pub struct ScheduleArgs {
    /// Project directory holding the queued files and `tags.yaml`.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Module order (overrides `scheduler.module_order`).
    #[arg(long = "modules", value_name = "MODULE", value_delimiter = ',')]
    pub modules: Vec<String>,

    /// Queue tags (overrides `scheduler.queue_tags`).
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Subcommand)]
pub enum IdentifiersCommand {
    /// List registry records.
    List {
        #[command(flatten)]
        database: DatabaseArgs,

        /// Only records of this center.
        #[arg(long = "adcid")]
        adcid: Option<u32>,
    },

    /// Show the record for one participant.
    Get {
        #[command(flatten)]
        database: DatabaseArgs,

        #[arg(long = "naccid", conflicts_with_all = ["guid", "adcid", "ptid"])]
        naccid: Option<String>,

        #[arg(long = "guid", conflicts_with_all = ["adcid", "ptid"])]
        guid: Option<String>,

        #[arg(long = "adcid", requires = "ptid")]
        adcid: Option<u32>,

        #[arg(long = "ptid", requires = "adcid")]
        ptid: Option<String>,
    },
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
