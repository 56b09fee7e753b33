use std::sync::mpsc::Receiver;
use std::sync::Arc;

use anyhow::Result;
use rusqlite::Connection;

use crate::auth::Caller;
use crate::model::{NewTask, Task, TaskPatch};
use crate::ops;
use crate::page::{Page, PageRequest};
use crate::search::{Fts5Index, SearchFilters, SearchIndex};
use crate::subscribe::{QueryKey, Subscriptions, WriteEvent};
use crate::{auth, db};

/// The write path of the application. Owns the connection and the live-query
/// registry: every committed mutation publishes a `WriteEvent`, which is what
/// makes subscribed queries reactive. Reads going through the store see the
/// same connection the writes commit on.
pub struct Store {
    conn: Connection,
    subs: Arc<Subscriptions>,
    index: Box<dyn SearchIndex>,
}

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        let conn = db::open(path)?;
        db::init(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            subs: Arc::new(Subscriptions::new()),
            index: Box::new(Fts5Index),
        }
    }

    /// Swap the search technology. Everything else is unchanged.
    pub fn with_index(mut self, index: Box<dyn SearchIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn subscriptions(&self) -> Arc<Subscriptions> {
        Arc::clone(&self.subs)
    }

    pub fn subscribe(&self, key: QueryKey) -> Receiver<()> {
        self.subs.subscribe(key)
    }

    pub fn create_task(&self, caller: Caller, task: NewTask) -> Result<i64> {
        let owner = caller.require()?;
        let id = ops::create_task(&self.conn, caller, task)?;
        self.subs.publish(WriteEvent { owner, task_id: id });
        Ok(id)
    }

    pub fn update_task(&self, caller: Caller, id: i64, patch: &TaskPatch) -> Result<i64> {
        let owner = caller.require()?;
        let id = ops::update_task(&self.conn, caller, id, patch)?;
        self.subs.publish(WriteEvent { owner, task_id: id });
        Ok(id)
    }

    pub fn remove_task(&self, caller: Caller, id: i64) -> Result<i64> {
        let owner = caller.require()?;
        let id = ops::remove_task(&self.conn, caller, id)?;
        self.subs.publish(WriteEvent { owner, task_id: id });
        Ok(id)
    }

    pub fn get_all_tasks(&self, caller: Caller) -> Result<Vec<Task>> {
        ops::get_all_tasks(&self.conn, caller)
    }

    pub fn get_task_by_id(&self, caller: Caller, id: i64) -> Result<Option<Task>> {
        ops::get_task_by_id(&self.conn, caller, id)
    }

    pub fn search_tasks(
        &self,
        owner: i64,
        text: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Task>> {
        ops::search_tasks(&self.conn, self.index.as_ref(), owner, text, filters)
    }

    pub fn search_tasks_page(
        &self,
        owner: i64,
        text: &str,
        filters: &SearchFilters,
        request: &PageRequest,
    ) -> Result<Page<Task>> {
        ops::search_tasks_page(&self.conn, self.index.as_ref(), owner, text, filters, request)
    }

    pub fn tasks_by_owner_page(&self, owner: i64, request: &PageRequest) -> Result<Page<Task>> {
        ops::tasks_by_owner_page(&self.conn, owner, request)
    }

    pub fn get_current_user(&self, caller: Caller) -> Result<Option<crate::model::User>> {
        auth::get_current_user(&self.conn, caller)
    }
}
