//! CLI entry point for tasker.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tasker_app::{AppConfig, StateFile};
use time::OffsetDateTime;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// Personal task manager with a one-line quick-add syntax.
#[derive(Parser, Debug)]
#[command(
    name = "tasker",
    version,
    about = "tasker: quick-add tasks with @due !priority #tag ~list"
)]
struct Cli {
    /// State file (defaults to the configured or platform data path).
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Configuration file (defaults to <config dir>/tasker/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quick-add a task, e.g. `tasker add Pay rent @tomorrow !high #home ~personal`.
    Add {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Add a subtask to a top-level task.
    Sub {
        parent: String,
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        title: Vec<String>,
    },

    /// List top-level tasks with their subtasks.
    Ls(LsArgs),

    /// Show a task and its subtasks as JSON.
    Show { task: String },

    /// Toggle completion.
    Done { task: String },

    /// Edit task fields.
    Edit(EditArgs),

    /// Delete a task and its subtasks.
    Rm { task: String },

    /// Show completion candidates for the sigil word at the end of the text.
    Suggest {
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Show what a quick-add line would create without creating it.
    Preview {
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Manage lists.
    #[command(subcommand)]
    List(ListCommand),

    /// Manage tags.
    #[command(subcommand)]
    Tag(TagCommand),

    /// Change the default list for `ls` and quick-add (`all` clears it).
    Select { list: String },

    /// Change the stored sort.
    Sort {
        field: String,
        #[arg(long)]
        desc: bool,
    },

    /// Toggle between light and dark theme.
    Theme,

    /// Export tasks as Markdown or CSV.
    Export(ExportArgs),

    /// Print the whole state document.
    Dump,

    /// Replace the state with a previously dumped document.
    Import { file: PathBuf },
}

#[derive(Args, Debug, Default)]
struct LsArgs {
    /// List name or id; `all` shows every list.
    #[arg(long)]
    list: Option<String>,
    /// Only completed tasks.
    #[arg(long, conflicts_with = "pending")]
    completed: bool,
    /// Only open tasks.
    #[arg(long)]
    pending: bool,
    /// Required priority (none, low, medium, high or 1-4).
    #[arg(long)]
    priority: Option<String>,
    /// Tag names; a task matches when it has any of them.
    #[arg(short = 't', long = "tag")]
    tags: Vec<String>,
    /// Text searched in title and description.
    #[arg(long)]
    search: Option<String>,
    /// Earliest due date (inclusive).
    #[arg(long)]
    due_from: Option<String>,
    /// Latest due date (inclusive).
    #[arg(long)]
    due_until: Option<String>,
    /// Sort field (order, title, priority, due, created, updated).
    #[arg(long)]
    sort: Option<String>,
    /// Reverse the sort.
    #[arg(long)]
    desc: bool,
    /// Keep the filter and sort for later listings.
    #[arg(long)]
    save: bool,
    #[arg(long, value_enum, default_value_t = LsFormat::Table)]
    format: LsFormat,
}

#[derive(Args, Debug, Default)]
struct EditArgs {
    task: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    description: Option<String>,
    #[arg(long)]
    clear_description: bool,
    #[arg(long)]
    priority: Option<String>,
    /// List name or id. Subtasks follow their parent.
    #[arg(long)]
    list: Option<String>,
    /// Due date in quick-add syntax, e.g. `tomorrow` or `2025-07-01`.
    #[arg(long, conflicts_with = "clear_due")]
    due: Option<String>,
    #[arg(long)]
    clear_due: bool,
    /// Attach a tag by name, creating it when missing.
    #[arg(long = "tag")]
    add_tags: Vec<String>,
    /// Detach a tag by name.
    #[arg(long = "untag")]
    remove_tags: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum ListCommand {
    /// Create a list.
    Add {
        name: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Rename a list.
    Rename { list: String, name: String },
    /// Delete a list; its tasks move to the inbox.
    Rm { list: String },
    /// Show lists with task counts.
    Ls,
}

#[derive(Subcommand, Debug)]
enum TagCommand {
    /// Create a tag.
    Add {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Rename a tag.
    Rename { tag: String, name: String },
    /// Delete a tag and detach it from every task.
    Rm { tag: String },
    /// Show tags.
    Ls,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(long, value_enum, default_value_t = ExportFormatArg::Markdown)]
    format: ExportFormatArg,
    /// Restrict to one list (name or id).
    #[arg(long)]
    list: Option<String>,
    #[arg(long)]
    no_completed: bool,
    #[arg(long)]
    no_subtasks: bool,
    /// Write to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LsFormat {
    #[default]
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExportFormatArg {
    Markdown,
    Csv,
}

impl From<ExportFormatArg> for tasker_app::ExportFormat {
    fn from(value: ExportFormatArg) -> Self {
        match value {
            ExportFormatArg::Markdown => Self::Markdown,
            ExportFormatArg::Csv => Self::Csv,
        }
    }
}

fn main() -> Result<()> {
    let Cli { state, config, cmd } = Cli::parse();
    install_tracing();

    let config = AppConfig::load(config.as_deref())?;
    let state_path = match state {
        Some(path) => path,
        None => config.state_path()?,
    };
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());

    let file = StateFile::new(state_path);
    let book = file
        .load(now)
        .with_context(|| format!("failed to load {}", file.path().display()))?;
    let mut session = commands::Session::new(file, book, config.defaults);
    let stdout = io::stdout();
    session.run(cmd, now, &mut stdout.lock())
}

fn install_tracing() {
    // RUST_LOG overrides the default INFO level.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(io::stderr)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_add_joins_free_text() {
        let cli = Cli::parse_from(["tasker", "add", "Pay", "rent", "@tomorrow", "!high", "#home"]);
        match cli.cmd {
            Command::Add { text, description } => {
                assert_eq!(text.join(" "), "Pay rent @tomorrow !high #home");
                assert!(description.is_none());
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn parse_global_state_after_subcommand() {
        let cli = Cli::parse_from(["tasker", "ls", "--state", "/tmp/state.json", "--tag", "work", "--desc"]);
        assert_eq!(cli.state, Some(PathBuf::from("/tmp/state.json")));
        match cli.cmd {
            Command::Ls(args) => {
                assert_eq!(args.tags, vec!["work"]);
                assert!(args.desc);
                assert_eq!(args.format, LsFormat::Table);
            }
            _ => panic!("expected ls command"),
        }
    }

    #[test]
    fn completed_and_pending_conflict() {
        assert!(Cli::try_parse_from(["tasker", "ls", "--completed", "--pending"]).is_err());
    }

    #[test]
    fn parse_nested_list_command() {
        let cli = Cli::parse_from(["tasker", "list", "add", "Errands", "--color", "#ff0000"]);
        match cli.cmd {
            Command::List(ListCommand::Add { name, color, icon }) => {
                assert_eq!(name, "Errands");
                assert_eq!(color.as_deref(), Some("#ff0000"));
                assert!(icon.is_none());
            }
            _ => panic!("expected list add command"),
        }
    }

    #[test]
    fn parse_export_command() {
        let cli = Cli::parse_from(["tasker", "export", "--format", "csv", "--no-subtasks"]);
        match cli.cmd {
            Command::Export(args) => {
                assert_eq!(args.format, ExportFormatArg::Csv);
                assert!(args.no_subtasks);
                assert!(!args.no_completed);
            }
            _ => panic!("expected export command"),
        }
    }
}
