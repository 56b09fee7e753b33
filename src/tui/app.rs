use anyhow::Result;

use crate::auth::Caller;
use crate::model::{Priority, Status, Task, TaskPatch};
use crate::mutation::{self, Callbacks, MutateOptions, Tracker};
use crate::page::Pager;
use crate::search::SearchFilters;
use crate::store::Store;

const PAGE_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
}

/// View state for the live task list. All semantics live in the store; this
/// only holds what is on screen.
pub struct App<'a> {
    store: &'a Store,
    caller: Caller,
    owner: i64,
    pub pager: Pager<Task>,
    pub cursor: usize,
    pub mode: Mode,
    /// Committed search text; empty means the plain owner listing.
    pub query: String,
    /// Search box buffer while in search mode.
    pub input: String,
    pub status_filter: Option<Status>,
    pub priority_filter: Option<Priority>,
    mutation: Tracker<i64>,
    error: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(store: &'a Store, caller: Caller) -> Result<Self> {
        let owner = caller.require()?;
        let mut app = Self {
            store,
            caller,
            owner,
            pager: Pager::new(PAGE_SIZE),
            cursor: 0,
            mode: Mode::Normal,
            query: String::new(),
            input: String::new(),
            status_filter: None,
            priority_filter: None,
            mutation: Tracker::new(),
            error: None,
        };
        app.refresh();
        Ok(app)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().or_else(|| self.mutation.error())
    }

    pub fn selected(&self) -> Option<&Task> {
        self.pager.rows.get(self.cursor)
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.pager.rows.len() {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Drops collected pages and reloads the first one with the current
    /// query and filter.
    pub fn refresh(&mut self) {
        self.pager.reset();
        self.load_more();
        if self.cursor >= self.pager.rows.len() {
            self.cursor = self.pager.rows.len().saturating_sub(1);
        }
    }

    pub fn load_more(&mut self) {
        let store = self.store;
        let owner = self.owner;
        let query = self.query.clone();
        let filters = SearchFilters {
            status: self.status_filter,
            priority: self.priority_filter,
        };
        let result = self.pager.load_more(|request| {
            if query.trim().is_empty() {
                store.tasks_by_owner_page(owner, request)
            } else {
                store.search_tasks_page(owner, &query, &filters, request)
            }
        });
        self.error = result.err().map(|e| e.to_string());
    }

    pub fn start_search(&mut self) {
        self.mode = Mode::Search;
        self.input = self.query.clone();
    }

    pub fn cancel_search(&mut self) {
        self.mode = Mode::Normal;
        self.input.clear();
    }

    pub fn commit_search(&mut self) {
        self.mode = Mode::Normal;
        self.query = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.refresh();
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    /// The status and priority filters only narrow search results; the
    /// plain listing is the unfiltered owner index.
    pub fn cycle_filter(&mut self) {
        self.status_filter = match self.status_filter {
            None => Some(Status::NotStarted),
            Some(Status::NotStarted) => Some(Status::InProgress),
            Some(Status::InProgress) => Some(Status::Completed),
            Some(Status::Completed) => None,
        };
        self.refresh();
    }

    pub fn cycle_priority(&mut self) {
        self.priority_filter = match self.priority_filter {
            None => Some(Priority::High),
            Some(Priority::High) => Some(Priority::Medium),
            Some(Priority::Medium) => Some(Priority::Low),
            Some(Priority::Low) => None,
        };
        self.refresh();
    }

    /// Filter caption for the header, `None` while the plain listing is on
    /// screen where filters do not apply.
    pub fn filter_summary(&self) -> Option<String> {
        if self.query.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .status_filter
            .map(|s| s.to_string())
            .into_iter()
            .chain(self.priority_filter.map(|p| p.to_string()))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    pub fn complete_selected(&mut self) {
        let Some(task) = self.selected() else {
            return;
        };
        let id = task.id;
        let store = self.store;
        let caller = self.caller;
        let patch = TaskPatch {
            status: Some(Status::Completed),
            ..Default::default()
        };
        self.error = None;
        let _ = mutation::run(
            &mut self.mutation,
            || store.update_task(caller, id, &patch),
            &mut Callbacks::default(),
            &MutateOptions::default(),
        );
    }

    pub fn delete_selected(&mut self) {
        let Some(task) = self.selected() else {
            return;
        };
        let id = task.id;
        let store = self.store;
        let caller = self.caller;
        self.error = None;
        let _ = mutation::run(
            &mut self.mutation,
            || store.remove_task(caller, id),
            &mut Callbacks::default(),
            &MutateOptions::default(),
        );
    }
}
