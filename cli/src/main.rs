use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use spec_history_chain::{
    FailurePolicy, History, HistoryConfig, MigrateOptions, OutputFormat, ProvenanceManifest,
    emit_all,
};

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(fmt: CliOutputFormat) -> Self {
        match fmt {
            CliOutputFormat::Json => Self::Json,
            CliOutputFormat::Yaml => Self::Yaml,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "spec-history", version)]
#[command(about = "Merge version-tagged API specification fragments into cumulative documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge every group in a spec folder and print the resulting documents.
    Merge(MergeArgs),
    /// List discovered groups and their fragment versions.
    Groups(GroupsArgs),
    /// Write the provenance manifest (which version touched what) as JSON.
    Provenance(ProvenanceArgs),
}

#[derive(Debug, Args)]
struct MergeArgs {
    /// Folder holding `<group>.<major>_<minor>_<patch>.yml` fragments.
    /// Overrides `spec_folder` from `--config`.
    #[arg(required_unless_present = "config")]
    dir: Option<PathBuf>,
    /// Output format (default: json, or the config value).
    #[arg(long)]
    format: Option<CliOutputFormat>,
    /// Number of groups merged in parallel.
    #[arg(long)]
    jobs: Option<usize>,
    /// Leave failing groups out instead of aborting the whole run.
    #[arg(long)]
    skip_failed: bool,
    /// YAML run configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct GroupsArgs {
    /// Folder holding the fragments.
    dir: PathBuf,
}

#[derive(Debug, Args)]
struct ProvenanceArgs {
    /// Folder holding the fragments.
    dir: PathBuf,
    /// Output file (default: stdout).
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Merge(args) => run_merge(args),
        Command::Groups(args) => run_groups(args),
        Command::Provenance(args) => run_provenance(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_merge(args: MergeArgs) -> Result<(), String> {
    let config = resolve_config(&args)?;
    let mut history = History::from_config(&config).map_err(|e| e.to_string())?;
    let run = history
        .migrate(&config.migrate_options())
        .map_err(|e| e.to_string())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    emit_all(&mut out, &run, config.format).map_err(|e| e.to_string())?;

    for failure in &run.failures {
        eprintln!("skipped: {failure}");
    }
    close(&mut history);
    Ok(())
}

fn run_groups(args: GroupsArgs) -> Result<(), String> {
    let mut history = History::open(&args.dir).map_err(|e| e.to_string())?;

    let mut out = std::io::stdout().lock();
    for (name, group) in history.groups() {
        let versions: Vec<String> = group.versions().iter().map(|v| v.to_string()).collect();
        writeln!(out, "{name}: {}", versions.join(", ")).map_err(|e| e.to_string())?;
    }
    if history.groups().is_empty() {
        eprintln!("No fragments found in {}.", args.dir.display());
    }

    close(&mut history);
    Ok(())
}

fn run_provenance(args: ProvenanceArgs) -> Result<(), String> {
    let mut history = History::open(&args.dir).map_err(|e| e.to_string())?;
    let run = history
        .migrate(&MigrateOptions::default())
        .map_err(|e| e.to_string())?;
    let manifest = ProvenanceManifest::from_run(PACKAGE_VERSION, &history, &run);

    match args.output {
        Some(path) => {
            manifest.save(&path).map_err(|e| e.to_string())?;
            println!(
                "Provenance for {} group(s) written to {}",
                manifest.groups.len(),
                path.display()
            );
        }
        None => {
            let json = manifest.to_json().map_err(|e| e.to_string())?;
            println!("{json}");
        }
    }

    close(&mut history);
    Ok(())
}

/// Builds the run configuration: config file first, then command-line
/// overrides.
fn resolve_config(args: &MergeArgs) -> Result<HistoryConfig, String> {
    let mut config = match (&args.config, &args.dir) {
        (Some(path), _) => HistoryConfig::load(path).map_err(|e| e.to_string())?,
        (None, Some(dir)) => HistoryConfig::new(dir),
        (None, None) => return Err("a spec folder or --config is required".to_string()),
    };

    if let Some(dir) = &args.dir {
        config.spec_folder = dir.clone();
    }
    if let Some(format) = args.format {
        config.format = format.into();
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if args.skip_failed {
        config.failure_policy = FailurePolicy::SkipGroup;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Release failures never invalidate output already written.
fn close(history: &mut History) {
    if let Err(err) = history.close() {
        eprintln!("warning: {err}");
    }
}
