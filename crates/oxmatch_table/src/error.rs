use thiserror::Error;

/// Errors reported by table mutations. A failed call leaves the table unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// An entry with the same match and priority is already installed.
    #[error("an entry with this match at priority {priority} already exists")]
    DuplicateEntry { priority: u16 },
    /// No entry has exactly this match and priority.
    #[error("no entry with this match at priority {priority}")]
    EntryNotFound { priority: u16 },
    /// The configured entry limit is reached.
    #[error("table is full ({max_entries} entries)")]
    TableFull { max_entries: usize },
}

pub type TableResult<T> = Result<T, TableError>;
