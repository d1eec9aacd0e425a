use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                email           TEXT PRIMARY KEY,
                password        TEXT NOT NULL,
                role            TEXT NOT NULL,
                status          TEXT,
                name            TEXT,
                bio             TEXT,
                contact         TEXT,
                profile_picture TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE ngos (
                email           TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                city            TEXT NOT NULL,
                full_address    TEXT NOT NULL,
                category        TEXT NOT NULL,
                registration_id TEXT NOT NULL,
                contact         TEXT NOT NULL,
                password        TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending',
                approved_by     TEXT,
                approved_at     TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_ngos_status ON ngos(status, city);

            -- ngo_email is a plain reference, not a foreign key
            CREATE TABLE requirements (
                id               TEXT PRIMARY KEY,
                ngo_email        TEXT NOT NULL,
                item             TEXT NOT NULL,
                quantity         INTEGER NOT NULL,
                description      TEXT NOT NULL DEFAULT '',
                status           TEXT NOT NULL DEFAULT 'pending',
                rejection_reason TEXT,
                reviewed_at      TEXT,
                created_at       TEXT NOT NULL,
                updated_at       TEXT
            );

            CREATE INDEX idx_requirements_ngo ON requirements(ngo_email, status);
            CREATE INDEX idx_requirements_status ON requirements(status);

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                from_email  TEXT NOT NULL,
                to_email    TEXT NOT NULL,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_created ON messages(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
