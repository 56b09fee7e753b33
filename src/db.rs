use anyhow::Result;
use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL CHECK(length(name) > 0),
    email      TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY,
    owner       INTEGER NOT NULL REFERENCES users(id),
    name        TEXT NOT NULL CHECK(length(name) > 0),
    status      TEXT NOT NULL CHECK(status IN ('not-started', 'in-progress', 'completed')),
    description TEXT,
    due_date    TEXT,
    priority    TEXT CHECK(priority IN ('high', 'medium', 'low')),
    updated_at  INTEGER,
    subject_id  TEXT
);

CREATE INDEX IF NOT EXISTS tasks_by_owner ON tasks(owner);

CREATE VIRTUAL TABLE IF NOT EXISTS tasks_fts USING fts5(
    name,
    content='tasks',
    content_rowid='id'
);

CREATE TRIGGER IF NOT EXISTS tasks_fts_insert AFTER INSERT ON tasks BEGIN
    INSERT INTO tasks_fts (rowid, name) VALUES (new.id, new.name);
END;

CREATE TRIGGER IF NOT EXISTS tasks_fts_delete AFTER DELETE ON tasks BEGIN
    INSERT INTO tasks_fts (tasks_fts, rowid, name) VALUES ('delete', old.id, old.name);
END;

CREATE TRIGGER IF NOT EXISTS tasks_fts_update AFTER UPDATE OF name ON tasks BEGIN
    INSERT INTO tasks_fts (tasks_fts, rowid, name) VALUES ('delete', old.id, old.name);
    INSERT INTO tasks_fts (rowid, name) VALUES (new.id, new.name);
END;
";

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    set_pragmas(&conn)?;
    Ok(conn)
}

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}
