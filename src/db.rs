use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the embedded SQLite database.
///
/// All service calls go through one connection behind a mutex; the CMS is
/// admin-operated and writes are rare, so serialized access is enough.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database, create missing tables and seed the default
    /// language row (the default language must always exist).
    pub fn new(database_path: &str, default_language: &str) -> Result<Self> {
        let conn = Connection::open(database_path)
            .context(format!("Failed to open database at {}", database_path))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;

        Self::create_schema(&conn)?;
        Self::seed_default_language(&conn, default_language)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database for unit tests.
    #[cfg(test)]
    pub fn in_memory(default_language: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::create_schema(&conn)?;
        Self::seed_default_language(&conn, default_language)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS languages (
                code        TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                image_url   TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS events (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                state               TEXT NOT NULL,
                on_home             TEXT NOT NULL DEFAULT 'false',
                title               TEXT NOT NULL,
                geolink             TEXT NOT NULL,
                type                TEXT NOT NULL,
                location            TEXT,
                start_date          TEXT NOT NULL,
                end_date            TEXT NOT NULL,
                image_url           TEXT,
                ticket_purchase_url TEXT,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS event_translations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id    INTEGER NOT NULL
                            REFERENCES events(id) ON UPDATE CASCADE ON DELETE CASCADE,
                lang_code   TEXT NOT NULL
                            REFERENCES languages(code) ON UPDATE CASCADE ON DELETE CASCADE,
                description TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(event_id, lang_code)
            );

            CREATE TABLE IF NOT EXISTS messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                state       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS message_translations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id  INTEGER NOT NULL
                            REFERENCES messages(id) ON UPDATE CASCADE ON DELETE CASCADE,
                lang_code   TEXT NOT NULL
                            REFERENCES languages(code) ON UPDATE CASCADE ON DELETE CASCADE,
                title       TEXT NOT NULL DEFAULT '',
                body        TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(message_id, lang_code)
            );

            CREATE TABLE IF NOT EXISTS geocaches (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                state       TEXT NOT NULL,
                title       TEXT NOT NULL,
                geolink     TEXT,
                type        TEXT NOT NULL,
                difficulty  INTEGER NOT NULL,
                terrain     INTEGER NOT NULL,
                placed_on   TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS static_site_properties (
                property    TEXT PRIMARY KEY,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS static_site_contents (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                property    TEXT NOT NULL
                            REFERENCES static_site_properties(property)
                            ON UPDATE CASCADE ON DELETE CASCADE,
                lang_code   TEXT NOT NULL
                            REFERENCES languages(code) ON UPDATE CASCADE ON DELETE CASCADE,
                content     TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(property, lang_code)
            );

            CREATE TABLE IF NOT EXISTS socials (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                url         TEXT NOT NULL,
                image_url   TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contact_form_responses (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                email       TEXT NOT NULL,
                subject     TEXT NOT NULL,
                message     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );",
        )
        .context("Failed to create tables")?;

        Ok(())
    }

    fn seed_default_language(conn: &Connection, default_language: &str) -> Result<()> {
        let name = match default_language {
            "NL" => "Nederlands",
            "EN" => "English",
            other => other,
        };
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            "INSERT OR IGNORE INTO languages (code, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![default_language, name, now],
        )
        .context("Failed to seed default language")?;

        Ok(())
    }

    /// Check whether a language code is known (case-insensitive).
    pub fn language_exists(&self, code: &str) -> rusqlite::Result<bool> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM languages WHERE UPPER(code) = UPPER(?1)",
            params![code],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All known language codes, ordered.
    pub fn language_codes(&self) -> rusqlite::Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT code FROM languages ORDER BY code")?;
        let codes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(codes)
    }
}
