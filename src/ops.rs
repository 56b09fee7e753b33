use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::auth::Caller;
use crate::error::TaskError;
use crate::model::{NewTask, Task, TaskPatch};
use crate::page::{Cursor, CursorKey, Page, PageRequest};
use crate::search::{SearchFilters, SearchIndex};
use crate::validate::{validate_due_date, validate_task_name};

const TASK_COLUMNS: &str =
    "id, owner, name, status, description, due_date, priority, updated_at, subject_id";

const INSERT_TASK: &str = "
INSERT INTO tasks (owner, name, status, description, due_date, priority, subject_id)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
";

fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        status: row.get(3)?,
        description: row.get(4)?,
        due_date: row.get(5)?,
        priority: row.get(6)?,
        updated_at: row.get(7)?,
        subject_id: row.get(8)?,
    })
}

/// Raw row fetch with no ownership check. Callers must apply one.
fn get_task_row(conn: &Connection, id: i64) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            [id],
            read_task_row,
        )
        .optional()?;
    Ok(task)
}

/// Resolves the caller, fetches the row, and verifies ownership. The hard
/// failure path shared by update and remove.
fn require_owned(conn: &Connection, caller: Caller, id: i64) -> Result<Task> {
    let user_id = caller.require()?;
    let task = get_task_row(conn, id)?.ok_or(TaskError::NotFound(id))?;
    if task.owner != user_id {
        return Err(TaskError::PermissionDenied(id).into());
    }
    Ok(task)
}

pub fn create_task(conn: &Connection, caller: Caller, task: NewTask) -> Result<i64> {
    let owner = caller.require()?;
    validate_task_name(&task.name)?;
    if let Some(ref due) = task.due_date {
        validate_due_date(due)?;
    }
    conn.execute(
        INSERT_TASK,
        rusqlite::params![
            owner,
            task.name,
            task.status,
            task.description,
            task.due_date,
            task.priority,
            task.subject_id,
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::debug!("user {owner} created task {id}");
    Ok(id)
}

pub fn update_task(conn: &Connection, caller: Caller, id: i64, patch: &TaskPatch) -> Result<i64> {
    require_owned(conn, caller, id)?;
    if patch.is_empty() {
        return Ok(id);
    }
    if let Some(ref name) = patch.name {
        validate_task_name(name)?;
    }
    if let Some(ref due) = patch.due_date {
        validate_due_date(due)?;
    }

    let mut sets: Vec<String> = Vec::new();
    let mut params: Vec<&dyn rusqlite::ToSql> = Vec::new();
    if let Some(ref v) = patch.name {
        sets.push(format!("name = ?{}", params.len() + 1));
        params.push(v);
    }
    if let Some(ref v) = patch.status {
        sets.push(format!("status = ?{}", params.len() + 1));
        params.push(v);
    }
    if let Some(ref v) = patch.description {
        sets.push(format!("description = ?{}", params.len() + 1));
        params.push(v);
    }
    if let Some(ref v) = patch.due_date {
        sets.push(format!("due_date = ?{}", params.len() + 1));
        params.push(v);
    }
    if let Some(ref v) = patch.priority {
        sets.push(format!("priority = ?{}", params.len() + 1));
        params.push(v);
    }
    if let Some(ref v) = patch.updated_at {
        sets.push(format!("updated_at = ?{}", params.len() + 1));
        params.push(v);
    }
    if let Some(ref v) = patch.subject_id {
        sets.push(format!("subject_id = ?{}", params.len() + 1));
        params.push(v);
    }

    let sql = format!(
        "UPDATE tasks SET {} WHERE id = ?{}",
        sets.join(", "),
        params.len() + 1
    );
    params.push(&id);
    conn.execute(&sql, rusqlite::params_from_iter(params))?;
    log::debug!("updated task {id}");
    Ok(id)
}

pub fn remove_task(conn: &Connection, caller: Caller, id: i64) -> Result<i64> {
    require_owned(conn, caller, id)?;
    conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
    log::debug!("removed task {id}");
    Ok(id)
}

/// Every task owned by the caller, in insertion order. Anonymous callers get
/// an empty list rather than an error.
pub fn get_all_tasks(conn: &Connection, caller: Caller) -> Result<Vec<Task>> {
    let Some(owner) = caller.user_id() else {
        return Ok(Vec::new());
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE owner = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([owner], read_task_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// `None` for a missing caller, a missing row, or a row owned by someone
/// else; the three cases are indistinguishable to the caller.
pub fn get_task_by_id(conn: &Connection, caller: Caller, id: i64) -> Result<Option<Task>> {
    let Some(user_id) = caller.user_id() else {
        return Ok(None);
    };
    let Some(task) = get_task_row(conn, id)? else {
        return Ok(None);
    };
    if task.owner != user_id {
        return Ok(None);
    }
    Ok(Some(task))
}

/// Full-text search over task names, status/priority pushed into the index
/// query, ownership applied as a post-filter on the ranked sequence.
pub fn search_tasks(
    conn: &Connection,
    index: &dyn SearchIndex,
    owner: i64,
    text: &str,
    filters: &SearchFilters,
) -> Result<Vec<Task>> {
    let hits = index.search(conn, text, filters)?;
    let mut tasks = Vec::new();
    for hit in hits {
        // the index may briefly trail the table; skip rows it no longer backs
        let Some(task) = get_task_row(conn, hit.id)? else {
            continue;
        };
        if task.owner == owner {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

fn at_or_before(rank: f64, id: i64, key_rank: f64, key_id: i64) -> bool {
    rank < key_rank || (rank == key_rank && id <= key_id)
}

/// Same matching semantics as `search_tasks`, one keyset page at a time.
pub fn search_tasks_page(
    conn: &Connection,
    index: &dyn SearchIndex,
    owner: i64,
    text: &str,
    filters: &SearchFilters,
    request: &PageRequest,
) -> Result<Page<Task>> {
    request.validate()?;
    let after = match &request.cursor {
        Some(cursor) => {
            let key = cursor.decode()?;
            let Some(rank) = key.rank else {
                return Err(
                    TaskError::Invalid("cursor does not belong to a search query".into()).into(),
                );
            };
            Some((rank, key.id))
        }
        None => None,
    };

    let hits = index.search(conn, text, filters)?;
    let mut rows: Vec<Task> = Vec::new();
    let mut last_key: Option<CursorKey> = None;
    let mut is_done = true;
    for hit in hits {
        if let Some((key_rank, key_id)) = after {
            if at_or_before(hit.rank, hit.id, key_rank, key_id) {
                continue;
            }
        }
        let Some(task) = get_task_row(conn, hit.id)? else {
            continue;
        };
        if task.owner != owner {
            continue;
        }
        if rows.len() == request.num_items {
            // one qualifying row past the page proves there is more
            is_done = false;
            break;
        }
        last_key = Some(CursorKey {
            rank: Some(hit.rank),
            id: hit.id,
        });
        rows.push(task);
    }

    let continue_cursor = last_key
        .map(Cursor::encode)
        .or_else(|| request.cursor.clone());
    Ok(Page {
        rows,
        continue_cursor,
        is_done,
    })
}

/// Index-scoped pagination over the caller-supplied owner, no text
/// predicate, ordered by row id.
pub fn tasks_by_owner_page(
    conn: &Connection,
    owner: i64,
    request: &PageRequest,
) -> Result<Page<Task>> {
    request.validate()?;
    let after = match &request.cursor {
        Some(cursor) => cursor.decode()?.id,
        None => 0,
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE owner = ?1 AND id > ?2
         ORDER BY id LIMIT ?3"
    ))?;
    // fetch one extra row to learn whether the sequence continues
    let limit = request.num_items as i64 + 1;
    let fetched = stmt.query_map(rusqlite::params![owner, after, limit], read_task_row)?;
    let mut rows = fetched.collect::<rusqlite::Result<Vec<Task>>>()?;

    let is_done = rows.len() <= request.num_items;
    rows.truncate(request.num_items);
    let continue_cursor = rows
        .last()
        .map(|task| {
            Cursor::encode(CursorKey {
                rank: None,
                id: task.id,
            })
        })
        .or_else(|| request.cursor.clone());
    Ok(Page {
        rows,
        continue_cursor,
        is_done,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::register_user;
    use crate::db;
    use crate::model::{Priority, Status};
    use crate::search::Fts5Index;

    fn setup() -> (Connection, Caller, Caller) {
        let conn = db::open_memory().unwrap();
        let a = register_user(&conn, "a", "a@example.com").unwrap();
        let b = register_user(&conn, "b", "b@example.com").unwrap();
        (conn, Caller::User(a), Caller::User(b))
    }

    fn full_task() -> NewTask {
        NewTask {
            name: "write lab report".into(),
            status: Status::InProgress,
            description: Some("chapters 3 and 4".into()),
            due_date: Some("1735689600000".into()),
            priority: Some(Priority::High),
            subject_id: Some("physics".into()),
        }
    }

    #[test]
    fn create_then_get_matches_input() {
        let (conn, a, _) = setup();
        let id = create_task(&conn, a, full_task()).unwrap();
        let task = get_task_by_id(&conn, a, id).unwrap().unwrap();
        assert_eq!(task.name, "write lab report");
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.description.as_deref(), Some("chapters 3 and 4"));
        assert_eq!(task.due_date.as_deref(), Some("1735689600000"));
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.subject_id.as_deref(), Some("physics"));
        assert_eq!(task.owner, a.user_id().unwrap());
    }

    #[test]
    fn unset_optionals_stay_absent() {
        let (conn, a, _) = setup();
        let id = create_task(&conn, a, NewTask::new("t", Status::NotStarted)).unwrap();
        let task = get_task_by_id(&conn, a, id).unwrap().unwrap();
        assert!(task.description.is_none());
        assert!(task.due_date.is_none());
        assert!(task.priority.is_none());
        assert!(task.updated_at.is_none());
        assert!(task.subject_id.is_none());
    }

    #[test]
    fn create_requires_auth_and_valid_input() {
        let (conn, a, _) = setup();
        let err = create_task(&conn, Caller::Anonymous, full_task()).unwrap_err();
        assert!(matches!(
            TaskError::from_anyhow(&err),
            Some(TaskError::Unauthenticated)
        ));

        let err = create_task(&conn, a, NewTask::new("  ", Status::NotStarted)).unwrap_err();
        assert!(matches!(
            TaskError::from_anyhow(&err),
            Some(TaskError::Invalid(_))
        ));

        let mut task = NewTask::new("t", Status::NotStarted);
        task.due_date = Some("next week".into());
        assert!(create_task(&conn, a, task).is_err());
    }

    #[test]
    fn duplicate_names_are_allowed() {
        let (conn, a, _) = setup();
        create_task(&conn, a, NewTask::new("same", Status::NotStarted)).unwrap();
        create_task(&conn, a, NewTask::new("same", Status::NotStarted)).unwrap();
        assert_eq!(get_all_tasks(&conn, a).unwrap().len(), 2);
    }

    #[test]
    fn cross_owner_rows_are_invisible_and_immutable() {
        let (conn, a, b) = setup();
        let id = create_task(&conn, a, full_task()).unwrap();

        assert!(get_task_by_id(&conn, b, id).unwrap().is_none());

        let patch = TaskPatch {
            status: Some(Status::Completed),
            ..Default::default()
        };
        let err = update_task(&conn, b, id, &patch).unwrap_err();
        assert!(matches!(
            TaskError::from_anyhow(&err),
            Some(TaskError::PermissionDenied(_))
        ));

        let err = remove_task(&conn, b, id).unwrap_err();
        assert!(matches!(
            TaskError::from_anyhow(&err),
            Some(TaskError::PermissionDenied(_))
        ));

        // the row is untouched
        let task = get_task_by_id(&conn, a, id).unwrap().unwrap();
        assert_eq!(task.status, Status::InProgress);
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let (conn, a, _) = setup();
        let err = update_task(&conn, a, 999, &TaskPatch::default()).unwrap_err();
        assert!(matches!(
            TaskError::from_anyhow(&err),
            Some(TaskError::NotFound(999))
        ));
        let err = remove_task(&conn, a, 999).unwrap_err();
        assert!(matches!(
            TaskError::from_anyhow(&err),
            Some(TaskError::NotFound(999))
        ));
    }

    #[test]
    fn partial_patch_touches_only_named_fields_and_is_idempotent() {
        let (conn, a, _) = setup();
        let id = create_task(&conn, a, full_task()).unwrap();
        let patch = TaskPatch {
            status: Some(Status::Completed),
            ..Default::default()
        };
        update_task(&conn, a, id, &patch).unwrap();
        let once = get_task_by_id(&conn, a, id).unwrap().unwrap();
        assert_eq!(once.status, Status::Completed);
        assert_eq!(once.name, "write lab report");
        assert_eq!(once.description.as_deref(), Some("chapters 3 and 4"));
        assert_eq!(once.due_date.as_deref(), Some("1735689600000"));
        assert_eq!(once.priority, Some(Priority::High));
        assert_eq!(once.subject_id.as_deref(), Some("physics"));

        update_task(&conn, a, id, &patch).unwrap();
        let twice = get_task_by_id(&conn, a, id).unwrap().unwrap();
        assert_eq!(format!("{once:?}"), format!("{twice:?}"));
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let (conn, a, _) = setup();
        let id = create_task(&conn, a, full_task()).unwrap();
        assert_eq!(update_task(&conn, a, id, &TaskPatch::default()).unwrap(), id);
        let task = get_task_by_id(&conn, a, id).unwrap().unwrap();
        assert_eq!(task.name, "write lab report");
    }

    #[test]
    fn remove_then_get_is_none() {
        let (conn, a, _) = setup();
        let id = create_task(&conn, a, full_task()).unwrap();
        assert_eq!(remove_task(&conn, a, id).unwrap(), id);
        assert!(get_task_by_id(&conn, a, id).unwrap().is_none());
    }

    #[test]
    fn get_all_is_owner_scoped() {
        let (conn, a, b) = setup();
        create_task(&conn, a, NewTask::new("mine", Status::NotStarted)).unwrap();
        create_task(&conn, b, NewTask::new("theirs", Status::NotStarted)).unwrap();
        let tasks = get_all_tasks(&conn, a).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "mine");
    }

    #[test]
    fn anonymous_get_all_is_empty_not_an_error() {
        let (conn, a, _) = setup();
        create_task(&conn, a, NewTask::new("t", Status::NotStarted)).unwrap();
        assert!(get_all_tasks(&conn, Caller::Anonymous).unwrap().is_empty());
        assert!(get_task_by_id(&conn, Caller::Anonymous, 1).unwrap().is_none());
    }

    #[test]
    fn search_scopes_to_the_searching_owner() {
        let (conn, a, b) = setup();
        create_task(&conn, a, NewTask::new("physics homework", Status::NotStarted)).unwrap();
        create_task(&conn, b, NewTask::new("physics homework", Status::NotStarted)).unwrap();

        let owner = a.user_id().unwrap();
        let hits = search_tasks(&conn, &Fts5Index, owner, "physics", &SearchFilters::default())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].owner, owner);
    }

    #[test]
    fn search_status_filter_returns_only_matching_status() {
        let (conn, a, b) = setup();
        let mut todo = NewTask::new("essay draft", Status::NotStarted);
        todo.priority = Some(Priority::Low);
        create_task(&conn, a, todo).unwrap();
        create_task(&conn, a, NewTask::new("essay final", Status::Completed)).unwrap();
        // another owner's completed match must not leak in
        create_task(&conn, b, NewTask::new("essay outline", Status::Completed)).unwrap();

        let owner = a.user_id().unwrap();
        let filters = SearchFilters {
            status: Some(Status::Completed),
            priority: None,
        };
        let hits = search_tasks(&conn, &Fts5Index, owner, "essay", &filters).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "essay final");

        let filters = SearchFilters {
            status: None,
            priority: Some(Priority::Low),
        };
        let hits = search_tasks(&conn, &Fts5Index, owner, "essay", &filters).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "essay draft");
    }

    #[test]
    fn blank_search_text_returns_nothing() {
        let (conn, a, _) = setup();
        create_task(&conn, a, NewTask::new("anything", Status::NotStarted)).unwrap();
        let hits = search_tasks(
            &conn,
            &Fts5Index,
            a.user_id().unwrap(),
            "   ",
            &SearchFilters::default(),
        )
        .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn paginated_search_walks_five_matches_as_2_2_1() {
        let (conn, a, b) = setup();
        for i in 0..5 {
            create_task(&conn, a, NewTask::new(format!("chore {i}"), Status::NotStarted))
                .unwrap();
        }
        // interleaved foreign rows exercise the ownership post-filter
        create_task(&conn, b, NewTask::new("chore foreign", Status::NotStarted)).unwrap();

        let owner = a.user_id().unwrap();
        let filters = SearchFilters::default();
        let mut cursor = None;
        let mut sizes = Vec::new();
        let mut seen = Vec::new();
        loop {
            let request = PageRequest {
                cursor: cursor.clone(),
                num_items: 2,
            };
            let page =
                search_tasks_page(&conn, &Fts5Index, owner, "chore", &filters, &request).unwrap();
            sizes.push(page.rows.len());
            seen.extend(page.rows.iter().map(|t| t.id));
            cursor = page.continue_cursor.clone();
            if page.is_done {
                break;
            }
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        // no duplicates, no foreign rows
        let mut deduped = seen.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), 5);
    }

    #[test]
    fn paginated_search_rejects_bad_cursors() {
        let (conn, a, _) = setup();
        let owner = a.user_id().unwrap();
        create_task(&conn, a, NewTask::new("chore one", Status::NotStarted)).unwrap();
        let request = PageRequest {
            cursor: Some(Cursor::from_raw("garbage")),
            num_items: 2,
        };
        let err = search_tasks_page(
            &conn,
            &Fts5Index,
            owner,
            "chore",
            &SearchFilters::default(),
            &request,
        )
        .unwrap_err();
        assert!(matches!(
            TaskError::from_anyhow(&err),
            Some(TaskError::Invalid(_))
        ));

        // an owner-scan cursor has no rank and cannot resume a search
        let foreign = tasks_by_owner_page(&conn, owner, &PageRequest::first(1)).unwrap();
        if let Some(cursor) = foreign.continue_cursor {
            let request = PageRequest {
                cursor: Some(cursor),
                num_items: 2,
            };
            assert!(search_tasks_page(
                &conn,
                &Fts5Index,
                owner,
                "chore",
                &SearchFilters::default(),
                &request,
            )
            .is_err());
        }
    }

    #[test]
    fn owner_page_walks_in_insertion_order() {
        let (conn, a, b) = setup();
        for i in 0..5 {
            create_task(&conn, a, NewTask::new(format!("t{i}"), Status::NotStarted)).unwrap();
        }
        create_task(&conn, b, NewTask::new("foreign", Status::NotStarted)).unwrap();

        let owner = a.user_id().unwrap();
        let first = tasks_by_owner_page(&conn, owner, &PageRequest::first(2)).unwrap();
        assert_eq!(first.rows.len(), 2);
        assert!(!first.is_done);

        let second = tasks_by_owner_page(
            &conn,
            owner,
            &PageRequest {
                cursor: first.continue_cursor.clone(),
                num_items: 2,
            },
        )
        .unwrap();
        assert_eq!(second.rows.len(), 2);
        assert!(!second.is_done);

        let third = tasks_by_owner_page(
            &conn,
            owner,
            &PageRequest {
                cursor: second.continue_cursor.clone(),
                num_items: 2,
            },
        )
        .unwrap();
        assert_eq!(third.rows.len(), 1);
        assert!(third.is_done);

        let names: Vec<&str> = first
            .rows
            .iter()
            .chain(&second.rows)
            .chain(&third.rows)
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["t0", "t1", "t2", "t3", "t4"]);
    }

    #[test]
    fn owner_page_with_zero_size_is_invalid() {
        let (conn, a, _) = setup();
        assert!(tasks_by_owner_page(&conn, a.user_id().unwrap(), &PageRequest::first(0)).is_err());
    }

    /// Canned index standing in for FTS5: proves the search surface works
    /// against any `SearchIndex`, including one that trails the table.
    struct FixedIndex(Vec<crate::search::Ranked>);

    impl SearchIndex for FixedIndex {
        fn search(
            &self,
            _conn: &Connection,
            _text: &str,
            _filters: &SearchFilters,
        ) -> Result<Vec<crate::search::Ranked>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn stale_index_entries_are_skipped() {
        use crate::search::Ranked;
        let (conn, a, _) = setup();
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(
                create_task(&conn, a, NewTask::new(format!("note {i}"), Status::NotStarted))
                    .unwrap(),
            );
        }
        let index = FixedIndex(vec![
            Ranked { id: ids[0], rank: -3.0 },
            Ranked { id: 9999, rank: -2.5 }, // no longer backed by a row
            Ranked { id: ids[1], rank: -2.0 },
            Ranked { id: ids[2], rank: -1.0 },
        ]);

        let owner = a.user_id().unwrap();
        let hits = search_tasks(&conn, &index, owner, "note", &SearchFilters::default()).unwrap();
        assert_eq!(hits.len(), 3);

        let first =
            search_tasks_page(&conn, &index, owner, "note", &SearchFilters::default(),
                &PageRequest::first(2))
            .unwrap();
        assert_eq!(first.rows.len(), 2);
        assert!(!first.is_done);

        let second = search_tasks_page(
            &conn,
            &index,
            owner,
            "note",
            &SearchFilters::default(),
            &PageRequest {
                cursor: first.continue_cursor,
                num_items: 2,
            },
        )
        .unwrap();
        assert_eq!(second.rows.len(), 1);
        assert_eq!(second.rows[0].id, ids[2]);
        assert!(second.is_done);
    }
}
