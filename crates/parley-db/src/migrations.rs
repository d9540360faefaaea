use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            id              TEXT NOT NULL UNIQUE,
            sender          TEXT NOT NULL,
            sender_id       TEXT NOT NULL,
            body            TEXT NOT NULL,
            recipient_id    TEXT,
            is_private      INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        DROP INDEX IF EXISTS idx_messages_created;

        -- history reads the newest public rows by seq
        CREATE INDEX IF NOT EXISTS idx_messages_public_seq
            ON messages(is_private, seq);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'messages' AND sql IS NOT NULL ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    }

    #[test]
    fn fresh_store_gets_history_index() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        assert_eq!(index_names(&conn), ["idx_messages_public_seq"]);
    }

    #[test]
    fn existing_store_drops_timestamp_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                sender TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                body TEXT NOT NULL,
                recipient_id TEXT,
                is_private INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX idx_messages_created ON messages(created_at);
            ",
        )
        .unwrap();

        run(&conn).unwrap();

        assert_eq!(index_names(&conn), ["idx_messages_public_seq"]);
    }
}
