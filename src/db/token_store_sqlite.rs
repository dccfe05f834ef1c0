use std::{path::Path, sync::{Mutex, MutexGuard}};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::{encryption::Encryption, errors::AppError};

use super::{AccessToken, TokenStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS tokens (
    workspace_id TEXT PRIMARY KEY,
    token        TEXT NOT NULL
);";

/// Token store kept in a single SQLite file with one `tokens` table.
pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
    encryption: Option<Encryption>,
}

impl SqliteTokenStore {
    /// Opens or creates the database file and makes sure the `tokens` table exists.
    pub fn open(path: impl AsRef<Path>, encryption: Option<Encryption>) -> Result<SqliteTokenStore, AppError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened token store at {:?}, encrypted: {}", path.as_ref(), encryption.is_some());
        Ok(SqliteTokenStore { conn: Mutex::new(conn), encryption })
    }

    pub fn in_memory(encryption: Option<Encryption>) -> Result<SqliteTokenStore, AppError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(SqliteTokenStore { conn: Mutex::new(conn), encryption })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::UnexpectedError("token store lock poisoned".to_string()))
    }

    fn encode(&self, token: &str) -> Result<String, AppError> {
        match &self.encryption {
            Some(encryption) => encryption.seal(token),
            None => Ok(token.to_string()),
        }
    }

    fn decode(&self, stored: String) -> Result<String, AppError> {
        match &self.encryption {
            Some(encryption) => encryption.open(&stored),
            None => Ok(stored),
        }
    }
}

impl TokenStore for SqliteTokenStore {
    fn put(&self, access_token: &AccessToken) -> Result<(), AppError> {
        let stored = self.encode(&access_token.token)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO tokens (workspace_id, token) VALUES (?1, ?2)
             ON CONFLICT(workspace_id) DO UPDATE SET token = excluded.token",
            params![access_token.workspace_id, stored],
        )?;
        tx.commit()?;

        debug!("Saved {}", access_token);
        Ok(())
    }

    fn get(&self, workspace_id: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let stored: Option<String> = tx
            .query_row(
                "SELECT token FROM tokens WHERE workspace_id = ?1",
                params![workspace_id],
                |row| row.get(0),
            )
            .optional()?;
        tx.commit()?;
        drop(conn);

        stored.map(|token| self.decode(token)).transpose()
    }

    fn delete(&self, workspace_id: &str) -> Result<(), AppError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM tokens WHERE workspace_id = ?1", params![workspace_id])?;
        tx.commit()?;

        debug!("Deleted {} token(s) for workspace {}", removed, workspace_id);
        Ok(())
    }
}
