use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use untangle_core::api::Diff;
use untangle_core::clean::DiffCleaner;
use untangle_core::config::{Config, CONFIG_FILE_NAME};
use untangle_core::evaluation::{evaluate_commit, normalize_files, CommitDiffs};
use untangle_core::metrics::{DiffMetrics, TruthMetrics};
use untangle_core::repository::Repository;
use untangle_core::tools::{DecompositionRequest, ToolService};
use untangle_core::truth::{
    append_score, parse_diff_bytes, read_diff, read_ground_truth, score_to_csv, write_diff,
    write_ground_truth, write_tool_assignments,
};

const STDIN: &str = "-";

#[derive(Debug, Parser)]
#[command(
    name = "untangle",
    version,
    about = "Build commit-untangling ground truth and score untangling tools"
)]
struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: Utf8PathBuf,

    /// Log debug output to standard error
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Suppress non-code and self-cancelling edits in a diff
    Clean {
        /// Unified diff to clean
        diff: Utf8PathBuf,
        /// Output file; standard output when omitted
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Label every changed line of a tangled diff as fix, other or both
    Truth {
        /// Tangled version-control diff, or `-` for standard input
        #[arg(long)]
        original: Utf8PathBuf,
        /// Bug-fixing diff
        #[arg(long)]
        fix: Utf8PathBuf,
        /// Non-bug-fixing diff
        #[arg(long)]
        nonfix: Utf8PathBuf,
        /// Ground-truth CSV to write
        #[arg(short, long)]
        output: Utf8PathBuf,
        /// Align the diffs without cleaning them first
        #[arg(long)]
        raw: bool,
    },

    /// Translate raw tool output into a line-level decomposition
    Decompose {
        /// Registered tool identifier
        tool: String,
        /// Raw tool output (file or directory)
        result_path: Utf8PathBuf,
        /// Ground truth of the commit
        #[arg(long)]
        truth: Utf8PathBuf,
        /// Decomposition CSV to write
        #[arg(short, long)]
        output: Utf8PathBuf,
    },

    /// Join a tool decomposition onto the ground-truth lines
    Normalize {
        /// Ground truth of the commit
        #[arg(long)]
        truth: Utf8PathBuf,
        /// Tool decomposition; a missing file puts every line in group `o`
        #[arg(long)]
        tool: Utf8PathBuf,
        /// Normalized CSV to write
        #[arg(short, long)]
        output: Utf8PathBuf,
    },

    /// Score every tool decomposition of one commit
    Score {
        /// Directory holding the ground truth and tool decompositions
        eval_dir: Utf8PathBuf,
        project: String,
        bug_id: String,
        /// Append the row to this aggregate CSV instead of printing it
        #[arg(long)]
        append: Option<Utf8PathBuf>,
    },

    /// Print descriptive statistics as one CSV row
    Metrics {
        #[command(subcommand)]
        kind: MetricsCommand,
    },

    /// Render the diff of a commit against its first parent
    VcDiff {
        /// Path inside the repository
        repo: Utf8PathBuf,
        /// Revision to render
        rev: String,
        /// Output file; standard output when omitted
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// List registered tool adapters
    Tools,
}

#[derive(Debug, Subcommand)]
enum MetricsCommand {
    /// Size and tangledness of a commit's diffs
    Diff {
        /// Tangled version-control diff
        #[arg(long)]
        original: Utf8PathBuf,
        /// Bug-fixing diff
        #[arg(long)]
        fix: Utf8PathBuf,
        /// Non-bug-fixing diff
        #[arg(long)]
        nonfix: Utf8PathBuf,
        project: String,
        bug_id: String,
    },
    /// Label counts of a ground truth
    Truth {
        /// Ground-truth CSV
        truth: Utf8PathBuf,
        project: String,
        bug_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    run(cli.command, &config)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Clean { diff, output } => {
            let parsed = read_diff(diff.as_std_path())
                .with_context(|| format!("failed to read {diff}"))?;
            let cleaned = DiffCleaner::new(config.cleaning.clone()).clean(&parsed);
            write_diff_output(&cleaned, output.as_deref())
        }
        Command::Truth {
            original,
            fix,
            nonfix,
            output,
            raw,
        } => {
            let diffs = CommitDiffs {
                original: read_diff_or_stdin(&original)?,
                fix: read_diff(fix.as_std_path()).with_context(|| format!("failed to read {fix}"))?,
                nonfix: read_diff(nonfix.as_std_path())
                    .with_context(|| format!("failed to read {nonfix}"))?,
            };
            let diffs = if raw {
                diffs
            } else {
                diffs.cleaned(&DiffCleaner::new(config.cleaning.clone()))
            };
            let rows = diffs.ground_truth();
            write_ground_truth(output.as_std_path(), &rows)
                .with_context(|| format!("failed to write {output}"))
        }
        Command::Decompose {
            tool,
            result_path,
            truth,
            output,
        } => {
            let truth_rows = read_ground_truth(truth.as_std_path())
                .with_context(|| format!("failed to read {truth}"))?;
            let request = DecompositionRequest::new(result_path.as_std_path(), &truth_rows);
            let rows = ToolService::default()
                .decompose(&tool, &request)
                .with_context(|| format!("failed to decompose {result_path} with {tool}"))?;
            write_tool_assignments(output.as_std_path(), &rows)
                .with_context(|| format!("failed to write {output}"))
        }
        Command::Normalize {
            truth,
            tool,
            output,
        } => {
            let rows = normalize_files(truth.as_std_path(), tool.as_std_path())
                .with_context(|| format!("failed to normalize {tool} against {truth}"))?;
            write_tool_assignments(output.as_std_path(), &rows)
                .with_context(|| format!("failed to write {output}"))
        }
        Command::Score {
            eval_dir,
            project,
            bug_id,
            append,
        } => {
            let row = evaluate_commit(eval_dir.as_std_path(), &project, &bug_id, &config.evaluation)
                .with_context(|| format!("failed to score {project}-{bug_id} in {eval_dir}"))?;
            match append {
                Some(path) => append_score(path.as_std_path(), &row)
                    .with_context(|| format!("failed to append to {path}")),
                None => write_stdout(score_to_csv(&row)?.as_bytes()),
            }
        }
        Command::Metrics { kind } => run_metrics(kind, config),
        Command::VcDiff { repo, rev, output } => {
            let repository =
                Repository::open(repo.as_std_path()).with_context(|| format!("failed to open {repo}"))?;
            let patch = repository
                .commit_patch(&rev)
                .with_context(|| format!("failed to render {rev} in {repo}"))?;
            match output {
                Some(path) => std::fs::write(path.as_std_path(), patch)
                    .with_context(|| format!("failed to write {path}")),
                None => write_stdout(&patch),
            }
        }
        Command::Tools => {
            let mut text = String::new();
            for summary in ToolService::default().summaries() {
                text.push_str(&format!(
                    "{}\t{}\t{}\n",
                    summary.id, summary.label, summary.output_file
                ));
            }
            write_stdout(text.as_bytes())
        }
    }
}

fn run_metrics(kind: MetricsCommand, config: &Config) -> Result<()> {
    match kind {
        MetricsCommand::Diff {
            original,
            fix,
            nonfix,
            project,
            bug_id,
        } => {
            let raw = CommitDiffs::read(
                original.as_std_path(),
                fix.as_std_path(),
                nonfix.as_std_path(),
            )
            .context("failed to read commit diffs")?;
            let cleaned = raw.cleaned(&DiffCleaner::new(config.cleaning.clone()));
            let metrics = DiffMetrics::compute(project, bug_id, &raw.original, &cleaned)
                .with_context(|| format!("failed to compute metrics for {original}"))?;
            write_csv_row(&metrics)
        }
        MetricsCommand::Truth {
            truth,
            project,
            bug_id,
        } => {
            let rows = read_ground_truth(truth.as_std_path())
                .with_context(|| format!("failed to read {truth}"))?;
            write_csv_row(&TruthMetrics::compute(project, bug_id, &rows))
        }
    }
}

fn read_diff_or_stdin(path: &Utf8Path) -> Result<Diff> {
    if path.as_str() != STDIN {
        return read_diff(path.as_std_path()).with_context(|| format!("failed to read {path}"));
    }
    let mut bytes = Vec::new();
    io::stdin()
        .read_to_end(&mut bytes)
        .context("failed to read diff from standard input")?;
    parse_diff_bytes(path.as_std_path(), &bytes).context("failed to parse diff from standard input")
}

fn write_diff_output(diff: &Diff, output: Option<&Utf8Path>) -> Result<()> {
    match output {
        Some(path) => {
            write_diff(path.as_std_path(), diff).with_context(|| format!("failed to write {path}"))
        }
        None => write_stdout(&untangle_core::api::encode_latin1(&diff.to_string())),
    }
}

fn write_csv_row<T: serde::Serialize>(row: &T) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    writer.serialize(row).context("failed to write csv row")?;
    writer.flush().context("failed to flush standard output")
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.flush())
        .context("failed to write to standard output")
}
