use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const SPLIT_COLORS_KEY: &str = "splitColors";

/// Errors that can occur while reading or writing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Display-mode change pushed to a page.
///
/// Messages on the channel may carry other keys; only a present
/// `splitColors` changes anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_colors: Option<bool>,
}

impl ModeMessage {
    pub fn split_colors(split_colors: bool) -> Self {
        Self {
            split_colors: Some(split_colors),
        }
    }
}

/// SQLite-backed store for indicator preferences.
///
/// A missing row means the default: colors split.
pub struct SettingsDb {
    conn: Connection,
}

impl SettingsDb {
    /// Open or create the settings database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Settings that live only as long as the process.
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Whether additions and deletions are drawn in separate colors.
    pub fn split_colors(&self) -> Result<bool> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![SPLIT_COLORS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value.as_deref() {
            None | Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(SettingsError::InvalidValue {
                key: SPLIT_COLORS_KEY.to_owned(),
                value: other.to_owned(),
            }),
        }
    }

    pub fn set_split_colors(&mut self, split_colors: bool) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![SPLIT_COLORS_KEY, split_colors.to_string()],
        )?;
        Ok(())
    }
}

/// Persist a new `splitColors` value and build the message announcing it.
pub fn store_split_colors(db: &mut SettingsDb, split_colors: bool) -> Result<ModeMessage> {
    db.set_split_colors(split_colors)?;
    Ok(ModeMessage::split_colors(split_colors))
}

/// Flip the persisted preference, returning the message for open pages.
pub fn toggle_split_colors(db: &mut SettingsDb) -> Result<ModeMessage> {
    let current = db.split_colors()?;
    store_split_colors(db, !current)
}
