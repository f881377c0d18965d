//! Favorites and reading list management.

use crate::catalog::BookSummary;
use crate::db::{Activity, ActivityKind, BookListEntry, Database, ListKind, now_timestamp};
use crate::error::Result;
use uuid::Uuid;

/// Book list service.
pub struct ListService {
    db: Database,
}

impl ListService {
    /// Create a new list service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add a book to one of the user's lists.
    ///
    /// Adding a book that is already on the list is a no-op and does not
    /// produce a duplicate activity entry.
    pub fn add(&self, user_id: &str, kind: ListKind, book: BookSummary) -> Result<BookListEntry> {
        let entry = BookListEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            book_id: book.id.clone(),
            kind,
            book,
            created_at: now_timestamp(),
        };

        let inserted = self.db.add_list_entry(&entry)?;
        if inserted {
            let activity_kind = match kind {
                ListKind::Favorite => ActivityKind::Favorite,
                ListKind::ReadingList => ActivityKind::ReadingList,
            };
            self.record_activity(&entry, activity_kind);
        }

        Ok(entry)
    }

    /// Remove a book from one of the user's lists.
    pub fn remove(&self, user_id: &str, kind: ListKind, book_id: &str) -> Result<bool> {
        self.db.remove_list_entry(user_id, book_id, kind)
    }

    /// Check whether a book is on one of the user's lists.
    pub fn contains(&self, user_id: &str, kind: ListKind, book_id: &str) -> Result<bool> {
        self.db.is_in_list(user_id, book_id, kind)
    }

    /// All entries on one of the user's lists, newest first.
    pub fn list(&self, user_id: &str, kind: ListKind) -> Result<Vec<BookListEntry>> {
        self.db.get_list_entries(user_id, kind)
    }

    /// Feed entries are best effort, a write failure never fails the
    /// list operation itself.
    fn record_activity(&self, entry: &BookListEntry, kind: ActivityKind) {
        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            user_id: entry.user_id.clone(),
            kind,
            book_id: Some(entry.book_id.clone()),
            book: Some(entry.book.clone()),
            related_id: Some(entry.id.clone()),
            created_at: entry.created_at,
        };

        if let Err(e) = self.db.insert_activity(&activity) {
            tracing::warn!(error = %e, "Failed to record list activity");
        }
    }
}
