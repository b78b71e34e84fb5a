use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("The blog database is locked by another process. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A value was rejected before it reached the database
    #[error("Invalid value: {0}")]
    InvalidInput(String),

    /// A stored value could not be decoded into its domain type
    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Entry Status
// ============================================================================

/// Visibility state of an entry. Stored as an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Draft,
    Hidden,
    Published,
}

impl EntryStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            EntryStatus::Draft => 0,
            EntryStatus::Hidden => 1,
            EntryStatus::Published => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(EntryStatus::Draft),
            1 => Some(EntryStatus::Hidden),
            2 => Some(EntryStatus::Published),
            _ => None,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryStatus::Draft => "draft",
            EntryStatus::Hidden => "hidden",
            EntryStatus::Published => "published",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Insert Types
// ============================================================================

/// Everything needed to create an entry together with its associations.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: EntryStatus,
    pub creation_date: NaiveDateTime,
    pub last_update: NaiveDateTime,
    /// Comma-joined tag slugs, in source order
    pub tags: String,
    pub site_id: i64,
    pub category_id: i64,
    pub author_id: i64,
}

impl NewEntry {
    /// Fields that decide whether this entry was already imported.
    ///
    /// `last_update` and `tags` are deliberately absent: an entry whose remote
    /// copy was edited after import still counts as the same entry.
    pub fn key(&self) -> EntryKey<'_> {
        EntryKey {
            site_id: self.site_id,
            author_id: self.author_id,
            category_id: self.category_id,
            status: self.status,
            title: &self.title,
            content: &self.content,
            creation_date: self.creation_date,
            slug: &self.slug,
        }
    }
}

/// Deduplication key for entries. All eight fields must match exactly.
#[derive(Debug, Clone, Copy)]
pub struct EntryKey<'a> {
    pub site_id: i64,
    pub author_id: i64,
    pub category_id: i64,
    pub status: EntryStatus,
    pub title: &'a str,
    pub content: &'a str,
    pub creation_date: NaiveDateTime,
    pub slug: &'a str,
}

/// A comment to get-or-create. Every field is part of the deduplication key.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub content_type_id: i64,
    pub object_pk: String,
    pub site_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub user_url: String,
    pub comment: String,
    pub submit_date: NaiveDateTime,
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for entry queries (used by sqlx FromRow).
/// Converts to [`Entry`] via `into_entry()` once the status column is checked.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntryDbRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: i64,
    pub creation_date: NaiveDateTime,
    pub last_update: NaiveDateTime,
    pub tags: String,
}

impl EntryDbRow {
    pub(crate) fn into_entry(self) -> Result<Entry, DatabaseError> {
        let status = EntryStatus::from_i64(self.status).ok_or_else(|| DatabaseError::Corrupt {
            table: "entries",
            reason: format!("unknown status {} for entry {}", self.status, self.id),
        })?;
        Ok(Entry {
            id: self.id,
            title: self.title,
            slug: self.slug,
            content: self.content,
            status,
            creation_date: self.creation_date,
            last_update: self.last_update,
            tags: self.tags,
        })
    }
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Site {
    pub id: i64,
    pub domain: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Identifies the kind of object a comment is attached to.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ContentType {
    pub id: i64,
    pub app_label: String,
    pub model: String,
}

/// Entry data from database
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: EntryStatus,
    pub creation_date: NaiveDateTime,
    pub last_update: NaiveDateTime,
    pub tags: String,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.status)
    }
}

/// Ids linked to an entry through its association tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryAssociations {
    pub site_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
    pub author_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub content_type_id: i64,
    pub object_pk: String,
    pub site_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub user_url: String,
    pub comment: String,
    pub submit_date: NaiveDateTime,
    pub is_public: bool,
    pub is_removed: bool,
}
