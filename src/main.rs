mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command, UserCommand};
use taskbook::auth::{self, Caller};
use taskbook::model::{NewTask, Priority, Status, TaskPatch};
use taskbook::page::{Cursor, PageRequest};
use taskbook::search::SearchFilters;
use taskbook::store::Store;
use taskbook::subscribe::QueryKey;
use taskbook::{output, tui, watch};

fn default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".taskbook").join("taskbook.db"))
}

fn resolve_db_path(cli_db: Option<String>) -> Result<String> {
    match cli_db {
        Some(p) => Ok(p),
        None => {
            let path = default_db_path()?;
            Ok(path
                .to_str()
                .context("default DB path is not valid UTF-8")?
                .to_string())
        }
    }
}

fn ensure_db_dir(db_path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn caller_from(user: Option<i64>) -> Caller {
    match user {
        Some(id) => Caller::User(id),
        None => Caller::Anonymous,
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db)?;
    ensure_db_dir(&db_path)?;
    let caller = caller_from(cli.user);

    match cli.command {
        Command::Init => {
            let _store = Store::open(&db_path)?;
            eprintln!("Initialized database at {db_path}");
        }

        Command::User { command } => {
            let store = Store::open(&db_path)?;
            match command {
                UserCommand::Add { name, email } => {
                    let id = auth::register_user(store.conn(), &name, &email)?;
                    println!("{id}");
                    eprintln!("Registered user '{name}' with id {id}");
                }
                UserCommand::List => {
                    let users = auth::list_users(store.conn())?;
                    print!("{}", output::format_user_list(&users));
                }
            }
        }

        Command::Whoami => {
            let store = Store::open(&db_path)?;
            match store.get_current_user(caller)? {
                Some(user) => println!("#{} {} <{}>", user.id, user.name, user.email),
                None => {
                    eprintln!("Not signed in (set --user or TASKBOOK_USER)");
                    std::process::exit(1);
                }
            }
        }

        Command::Add {
            name,
            status,
            desc,
            due,
            priority,
            subject,
        } => {
            let store = Store::open(&db_path)?;
            let task = NewTask {
                name: name.clone(),
                status: Status::parse(&status)?,
                description: desc,
                due_date: due,
                priority: priority.as_deref().map(Priority::parse).transpose()?,
                subject_id: subject,
            };
            let id = store.create_task(caller, task)?;
            println!("{id}");
            eprintln!("Added task '{name}' with id {id}");
        }

        Command::Edit {
            id,
            name,
            status,
            desc,
            due,
            priority,
            subject,
        } => {
            let store = Store::open(&db_path)?;
            let patch = TaskPatch {
                name,
                status: status.as_deref().map(Status::parse).transpose()?,
                description: desc,
                due_date: due,
                priority: priority.as_deref().map(Priority::parse).transpose()?,
                updated_at: None,
                subject_id: subject,
            };
            store.update_task(caller, id, &patch)?;
            eprintln!("Updated task {id}");
        }

        Command::Rm { id } => {
            let store = Store::open(&db_path)?;
            store.remove_task(caller, id)?;
            eprintln!("Removed task {id}");
        }

        Command::Show { id, json } => {
            let store = Store::open(&db_path)?;
            match store.get_task_by_id(caller, id)? {
                Some(task) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&task)?);
                    } else {
                        print!("{}", output::format_task_detail(&task));
                    }
                }
                None => {
                    eprintln!("Task {id} not found");
                    std::process::exit(1);
                }
            }
        }

        Command::List { json } => {
            let store = Store::open(&db_path)?;
            let tasks = store.get_all_tasks(caller)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                print!("{}", output::format_task_list(&tasks));
            }
        }

        Command::Search {
            query,
            status,
            priority,
            page_size,
            cursor,
            json,
        } => {
            let store = Store::open(&db_path)?;
            let owner = caller.require()?;
            let filters = SearchFilters {
                status: status.as_deref().map(Status::parse).transpose()?,
                priority: priority.as_deref().map(Priority::parse).transpose()?,
            };
            match page_size {
                Some(num_items) => {
                    let request = PageRequest {
                        cursor: cursor.map(Cursor::from_raw),
                        num_items,
                    };
                    let page = store.search_tasks_page(owner, &query, &filters, &request)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&page)?);
                    } else {
                        print!("{}", output::format_task_list(&page.rows));
                        if page.is_done {
                            eprintln!("No more results");
                        } else if let Some(cursor) = page.continue_cursor {
                            eprintln!("More results: --cursor '{}'", cursor.as_str());
                        }
                    }
                }
                None => {
                    let tasks = store.search_tasks(owner, &query, &filters)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&tasks)?);
                    } else {
                        print!("{}", output::format_task_list(&tasks));
                    }
                }
            }
        }

        Command::Page {
            page_size,
            cursor,
            json,
        } => {
            let store = Store::open(&db_path)?;
            let owner = caller.require()?;
            let request = PageRequest {
                cursor: cursor.map(Cursor::from_raw),
                num_items: page_size,
            };
            let page = store.tasks_by_owner_page(owner, &request)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print!("{}", output::format_task_list(&page.rows));
                if page.is_done {
                    eprintln!("No more results");
                } else if let Some(cursor) = page.continue_cursor {
                    eprintln!("More results: --cursor '{}'", cursor.as_str());
                }
            }
        }

        Command::Wait => {
            let store = Store::open(&db_path)?;
            let subs = store.subscriptions();
            let rx = subs.subscribe(QueryKey::AllTasks {
                owner: cli.user.unwrap_or(0),
            });
            let _watcher = watch::watch_store(&db_path, subs)?;
            // Block until any change lands on the store
            let _ = rx.recv();
        }

        Command::Ui => {
            let store = Store::open(&db_path)?;
            tui::run(&db_path, &store, caller)?;
        }
    }

    Ok(())
}
