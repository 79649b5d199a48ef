use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use locpatch::attempt::{AttemptRecord, RepairSession};
use locpatch::config::{load_from_path, EngineConfig};
use locpatch::locate::{parse_location_block, resolve, LineInterval, LocationSpec};
use locpatch::render::render;
use locpatch::skeleton::compress;
use locpatch::RepositoryIndex;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "locpatch")]
#[command(about = "Localize code from model output and turn model edits into validated patches", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the repository structure
    Index {
        /// Repository root
        root: PathBuf,

        /// Print per-file declarations as JSON instead of the tree
        #[arg(long)]
        json: bool,
    },

    /// Print a file's skeleton
    Skeleton {
        /// Repository root
        root: PathBuf,

        /// File path relative to the root
        file: String,

        /// Engine config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Resolve a location block and render the context
    Context {
        /// Repository root
        root: PathBuf,

        /// File with model-written locations (paths followed by `class:`/`function:`/`line:` lines)
        #[arg(short, long)]
        locations: PathBuf,

        /// Engine config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Turn model responses into validated patches
    Repair {
        /// Repository root
        root: PathBuf,

        /// Location block naming the files shown to the model
        #[arg(short, long)]
        locations: PathBuf,

        /// Model responses, one sample per file
        #[arg(short, long = "response", required = true, num_args = 1..)]
        responses: Vec<PathBuf>,

        /// Print one JSON record per sample
        #[arg(long)]
        json: bool,

        /// Write the first accepted patch into the repository
        #[arg(short, long)]
        write: bool,

        /// Engine config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Index { root, json } => cmd_index(&root, json),
        Commands::Skeleton { root, file, config } => cmd_skeleton(&root, &file, config),
        Commands::Context {
            root,
            locations,
            config,
        } => cmd_context(&root, &locations, config),
        Commands::Repair {
            root,
            locations,
            responses,
            json,
            write,
            config,
        } => cmd_repair(&root, &locations, &responses, json, write, config),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "locpatch=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => Ok(load_from_path(&path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn build_index(root: &Path) -> Result<RepositoryIndex> {
    RepositoryIndex::build(root).with_context(|| format!("failed to index {}", root.display()))
}

fn read_locations(path: &Path) -> Result<IndexMap<String, Vec<LocationSpec>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read locations from {}", path.display()))?;
    Ok(parse_location_block(&text))
}

fn cmd_index(root: &Path, json: bool) -> Result<ExitCode> {
    let repo = build_index(root)?;
    if json {
        let files: IndexMap<String, _> = repo.files().into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        print!("{}", repo.render_tree());
        let invalid: Vec<_> = repo
            .files()
            .into_iter()
            .filter(|(_, index)| !index.syntax_valid)
            .map(|(path, _)| path)
            .collect();
        for path in invalid {
            eprintln!("{}", format!("warning: {path} does not parse").yellow());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_skeleton(root: &Path, file: &str, config: Option<PathBuf>) -> Result<ExitCode> {
    let config = load_config(config)?;
    let repo = build_index(root)?;
    let index = repo
        .get(file)
        .with_context(|| format!("{file} is not an indexed source file"))?;
    print!("{}", compress(index, &index.text(), config.skeleton.keep_globals));
    Ok(ExitCode::SUCCESS)
}

/// Resolve every file of the location block; files with no evidence are left out.
fn resolve_block(
    repo: &RepositoryIndex,
    block: &IndexMap<String, Vec<LocationSpec>>,
    config: &EngineConfig,
) -> IndexMap<String, Vec<LineInterval>> {
    let options = config.localization.resolve_options();
    block
        .iter()
        .filter_map(|(path, specs)| {
            let file = repo.get(path)?;
            let intervals = resolve(specs, file, &options);
            (!intervals.is_empty()).then(|| (path.clone(), intervals))
        })
        .collect()
}

fn cmd_context(root: &Path, locations: &Path, config: Option<PathBuf>) -> Result<ExitCode> {
    let config = load_config(config)?;
    let repo = build_index(root)?;
    let block = read_locations(locations)?;
    let intervals = resolve_block(&repo, &block, &config);
    if intervals.is_empty() {
        eprintln!("{}", "No location resolved to any indexed file".yellow());
        return Ok(ExitCode::FAILURE);
    }

    let rendered = render(&repo.contents(), &intervals, &config.render);
    print!("{}", rendered.text);
    for path in &rendered.dropped {
        eprintln!("{}", format!("dropped {path} to fit the budget").dimmed());
    }
    if rendered.budget_exceeded {
        eprintln!("{}", "warning: context exceeds the budget".yellow());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_repair(
    root: &Path,
    locations: &Path,
    responses: &[PathBuf],
    json: bool,
    write: bool,
    config: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = load_config(config)?;
    let repo = build_index(root)?;
    let block = read_locations(locations)?;

    let file_contents: HashMap<String, String> = block
        .keys()
        .filter_map(|path| Some((path.clone(), repo.get(path)?.text())))
        .collect();
    if file_contents.is_empty() {
        anyhow::bail!("none of the located files are indexed under {}", root.display());
    }

    let samples = responses
        .iter()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("failed to read response {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let session = RepairSession::new(file_contents, config.repair.syntax)
        .with_policy(config.repair.file_policy);
    let records = session.run_samples(&samples);

    for record in &records {
        if json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            print_record(record);
        }
    }

    let Some(accepted) = records.iter().find(|r| r.is_accepted()) else {
        eprintln!("{}", "No sample produced an acceptable patch".red());
        return Ok(ExitCode::FAILURE);
    };
    if write {
        for (path, content) in &accepted.new_contents {
            let target = root.join(path);
            atomic_write(&target, content.as_bytes())
                .with_context(|| format!("failed to write {}", target.display()))?;
            if !json {
                println!("{}", format!("wrote {}", target.display()).green());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_record(record: &AttemptRecord) {
    let file = record.edited_file.as_deref().unwrap_or("-");
    match record.reject_reason {
        None => println!(
            "{} sample {} {}",
            "✓".green(),
            record.sample_index,
            file.bold()
        ),
        Some(reason) => println!(
            "{} sample {} {}: {}",
            "✗".red(),
            record.sample_index,
            file,
            reason
        ),
    }
    for failed in &record.failed_operations {
        println!(
            "  {} operation {}: {}",
            "!".yellow(),
            failed.index,
            failed.error
        );
    }
    display_diff(&record.raw_model_patch);
}

/// Colour a unified diff for the terminal.
fn display_diff(diff: &str) {
    for line in diff.lines() {
        let styled = if line.starts_with("---") || line.starts_with("+++") {
            line.dimmed()
        } else if line.starts_with("@@") {
            line.cyan()
        } else if line.starts_with('-') {
            line.red()
        } else if line.starts_with('+') {
            line.green()
        } else {
            line.normal()
        };
        println!("{styled}");
    }
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("{} has no parent directory", path.display()))?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
