use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use eyre::Result;
use std::io::Write;
use std::path::PathBuf;
use todostore::backend::StorageBackend;
use todostore::snapshot::PersistedState;
use todostore::{BackendKind, Column, Config, Filter, Task, TaskId, TaskPatch, TaskStore, View, dnd, jsonl};
use tracing::Level;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "todostore CLI - Todo list with pending/completed columns and local persistence")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Config file (default: {config_dir}/todostore/config.yaml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the stored state (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    /// Storage key (overrides config)
    #[arg(short, long)]
    key: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List tasks
    List {
        #[arg(long, value_enum, default_value_t = ViewArg::All)]
        view: ViewArg,
    },

    /// Show a single task
    Show { id: i64 },

    /// Change fields of a task
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Flip a task between pending and completed
    Toggle { id: i64 },

    /// Drop a task into a column
    Move {
        id: i64,
        #[arg(long, value_enum)]
        to: ColumnArg,
    },

    /// Move a task to a position in the list (0-based)
    Reorder { id: i64, index: usize },

    /// Delete a task
    Delete { id: i64 },

    /// Find tasks whose title contains the query (case-insensitive)
    Search { query: String },

    /// Delete every completed task
    ClearCompleted,

    /// Delete every task
    ClearAll,

    /// Print all tasks to stdout
    Export {
        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
    },

    /// Add tasks from a JSONL file (fresh ids are assigned)
    Import { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    File,
    Sqlite,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::File => BackendKind::File,
            BackendArg::Sqlite => BackendKind::Sqlite,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    All,
    Pending,
    Completed,
}

impl From<ViewArg> for View {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::All => View::All,
            ViewArg::Pending => View::Pending,
            ViewArg::Completed => View::Completed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ColumnArg {
    Pending,
    Completed,
}

impl From<ColumnArg> for Column {
    fn from(arg: ColumnArg) -> Self {
        match arg {
            ColumnArg::Pending => Column::Pending,
            ColumnArg::Completed => Column::Completed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Yaml,
    Jsonl,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }
    if let Some(key) = cli.key {
        config.storage_key = key;
    }

    let mut store = config.open_store()?;
    run(&mut store, cli.command)
}

fn run(store: &mut TaskStore<Box<dyn StorageBackend>>, command: Commands) -> Result<()> {
    match command {
        Commands::Add { title, description } => {
            let id = store.add(&title, &description)?;
            println!("Added task {}", id);
        }
        Commands::List { view } => {
            let view = View::from(view);
            if view == View::All {
                print_column("Pending Tasks", &store.pending());
                println!();
                print_column("Completed Tasks", &store.completed());
            } else {
                print_tasks(&store.list(&Filter::view(view)));
            }
        }
        Commands::Show { id } => match store.get(TaskId::new(id)) {
            Some(task) => print_details(task),
            None => not_found(id),
        },
        Commands::Edit {
            id,
            title,
            description,
            completed,
        } => {
            let patch = TaskPatch {
                title,
                description,
                completed,
            };
            if patch.is_empty() {
                println!("Nothing to change");
            } else if store.update(TaskId::new(id), patch)? {
                println!("Updated task {}", id);
            } else {
                not_found(id);
            }
        }
        Commands::Toggle { id } => {
            if store.toggle_complete(TaskId::new(id))? {
                if let Some(task) = store.get(TaskId::new(id)) {
                    print_task(task);
                }
            } else {
                not_found(id);
            }
        }
        Commands::Move { id, to } => {
            let column = Column::from(to);
            let payload = match store.get(TaskId::new(id)) {
                Some(task) => dnd::drag_payload(task)?,
                None => {
                    not_found(id);
                    return Ok(());
                }
            };
            dnd::handle_drop(store, &payload, column)?;
            println!("Task {} is now {}", id, column);
        }
        Commands::Reorder { id, index } => {
            if store.move_task(TaskId::new(id), index)? {
                println!("Moved task {} to position {}", id, index.min(store.len() - 1));
            } else {
                not_found(id);
            }
        }
        Commands::Delete { id } => {
            if store.delete(TaskId::new(id))? {
                println!("Deleted task {}", id);
            } else {
                not_found(id);
            }
        }
        Commands::Search { query } => {
            let found = store.search(&query);
            if found.is_empty() {
                println!("No tasks match {:?}", query);
            } else {
                print_tasks(&found);
            }
        }
        Commands::ClearCompleted => {
            let removed = store.clear_completed()?;
            println!("Removed {} completed {}", removed, plural(removed));
        }
        Commands::ClearAll => {
            let removed = store.clear_all()?;
            println!("Removed {} {}", removed, plural(removed));
        }
        Commands::Export { format } => {
            let tasks = store.tasks();
            match format {
                FormatArg::Json => {
                    let state = PersistedState::new(tasks.to_vec());
                    println!("{}", serde_json::to_string_pretty(&state)?);
                }
                FormatArg::Yaml => print!("{}", serde_yaml::to_string(tasks)?),
                FormatArg::Jsonl => {
                    let stdout = std::io::stdout();
                    let mut out = stdout.lock();
                    jsonl::write_jsonl_to(&mut out, tasks)?;
                    out.flush()?;
                }
            }
        }
        Commands::Import { path } => {
            let tasks = jsonl::read_jsonl(&path)?;
            let ids = store.import(tasks)?;
            println!("Imported {} {}", ids.len(), plural(ids.len()));
        }
    }

    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "task" } else { "tasks" }
}

fn not_found(id: i64) {
    println!("{} no task with id {}", "note:".yellow(), id);
}

fn print_column(title: &str, tasks: &[&Task]) {
    println!("{} ({} {})", title.bold(), tasks.len(), plural(tasks.len()));
    if tasks.is_empty() {
        println!("  {}", "(empty)".dimmed());
    } else {
        print_tasks(tasks);
    }
}

fn print_tasks(tasks: &[&Task]) {
    for task in tasks {
        print_task(task);
    }
}

fn print_task(task: &Task) {
    let mark = if task.completed { "[x]".green() } else { "[ ]".yellow() };
    let title = if task.completed {
        task.title.strikethrough()
    } else {
        task.title.normal()
    };
    println!("  {} {} {}", mark, task.id.to_string().dimmed(), title);
    if !task.description.is_empty() {
        println!("      {}", task.description.dimmed());
    }
}

fn print_details(task: &Task) {
    let status = if task.completed {
        "completed".green()
    } else {
        "pending".yellow()
    };
    println!("{}", task.title.bold());
    println!("  id:          {}", task.id);
    println!("  status:      {}", status);
    println!("  created:     {}", task.created_at.to_rfc3339());
    if !task.description.is_empty() {
        println!("  description: {}", task.description);
    }
}
