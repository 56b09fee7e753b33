use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskbook", about = "Owner-scoped task store with live queries")]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.taskbook/taskbook.db]
    #[arg(long, env = "TASKBOOK_DB", global = true)]
    pub db: Option<String>,

    /// Acting user id (see `taskbook user add`)
    #[arg(long, env = "TASKBOOK_USER", global = true)]
    pub user: Option<i64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create database and tables (idempotent)
    Init,

    /// Manage user accounts (stand-in for the auth provider)
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Show the acting user
    Whoami,

    /// Add a task
    Add {
        /// Task name
        name: String,
        /// Status (not-started, in-progress, completed)
        #[arg(short, long, default_value = "not-started")]
        status: String,
        /// Task description
        #[arg(short, long)]
        desc: Option<String>,
        /// Due date as unix epoch milliseconds
        #[arg(long)]
        due: Option<String>,
        /// Priority (high, medium, low)
        #[arg(short, long)]
        priority: Option<String>,
        /// Subject reference
        #[arg(long)]
        subject: Option<String>,
    },

    /// Edit a task; only the supplied fields change
    Edit {
        /// Task id
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New status (not-started, in-progress, completed)
        #[arg(short, long)]
        status: Option<String>,
        /// New description
        #[arg(short, long)]
        desc: Option<String>,
        /// New due date as unix epoch milliseconds
        #[arg(long)]
        due: Option<String>,
        /// New priority (high, medium, low)
        #[arg(short, long)]
        priority: Option<String>,
        /// New subject reference
        #[arg(long)]
        subject: Option<String>,
    },

    /// Remove a task
    Rm {
        /// Task id
        id: i64,
    },

    /// Show task details
    Show {
        /// Task id
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the acting user's tasks
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Full-text search over task names
    Search {
        /// Search text
        query: String,
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
        /// Filter by priority
        #[arg(long)]
        priority: Option<String>,
        /// Return one page of at most this many rows
        #[arg(long)]
        page_size: Option<usize>,
        /// Continuation cursor from a previous page
        #[arg(long)]
        cursor: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Page through the acting user's tasks in insertion order
    Page {
        /// Rows per page
        #[arg(long, default_value = "20")]
        page_size: usize,
        /// Continuation cursor from a previous page
        #[arg(long)]
        cursor: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Block until the store changes
    Wait,

    /// Launch the interactive TUI
    Ui,
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user and print the new id
    Add {
        /// Display name
        name: String,
        /// Email address (unique)
        email: String,
    },
    /// List registered users
    List,
}
