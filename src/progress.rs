//! Reading progress tracking.
//!
//! One entry per (user, book). Status transitions stamp the start and
//! finish dates, keep page and percentage consistent when the snapshot
//! has a page count, and feed the yearly goal counters on completion.

use crate::catalog::BookSummary;
use crate::db::{
    Database, ReadingGoal, ReadingProgress, ReadingStatus, now_timestamp, timestamp_to_datetime,
};
use crate::error::{AppError, Result};
use crate::stats::{self, ReadingStatistics};
use chrono::{Datelike, Utc};
use uuid::Uuid;

/// One field change applied to a progress entry.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// Change the reading status.
    SetStatus(ReadingStatus),
    /// Set the progress percentage (0-100).
    SetPercentage(u8),
    /// Set the current page.
    SetPage(u32),
    /// Replace the notes.
    SetNotes(Option<String>),
}

/// Progress tracking service.
pub struct ProgressService {
    db: Database,
}

impl ProgressService {
    /// Create a new progress service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Start tracking a book for a user.
    ///
    /// If the book is already tracked this only applies the status, so
    /// repeated adds are harmless.
    pub fn add_book(
        &self,
        user_id: &str,
        book: BookSummary,
        status: ReadingStatus,
    ) -> Result<ReadingProgress> {
        if let Some(existing) = self.db.get_progress_by_user_book(user_id, &book.id)? {
            return self.update(user_id, &existing.id, &[ProgressUpdate::SetStatus(status)]);
        }

        let now = now_timestamp();
        let progress = ReadingProgress {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            book_id: book.id.clone(),
            current_page: None,
            progress_percentage: if status == ReadingStatus::Completed {
                100
            } else {
                0
            },
            started_at: (status != ReadingStatus::NotStarted).then_some(now),
            finished_at: (status == ReadingStatus::Completed).then_some(now),
            status,
            notes: None,
            created_at: now,
            updated_at: now,
            book,
        };

        self.db.insert_progress(&progress)?;

        if status == ReadingStatus::Completed {
            self.bump_goal(&progress);
        }

        Ok(progress)
    }

    /// Apply a batch of updates to a progress entry.
    ///
    /// Only the entry's owner may update it. Completing a book stamps
    /// the finish date, forces the percentage to 100 and credits the
    /// yearly goal once.
    pub fn update(
        &self,
        user_id: &str,
        progress_id: &str,
        updates: &[ProgressUpdate],
    ) -> Result<ReadingProgress> {
        let mut progress = self
            .db
            .get_progress(progress_id)?
            .ok_or_else(|| AppError::NotFound(format!("progress entry {}", progress_id)))?;

        if progress.user_id != user_id {
            return Err(AppError::Forbidden(
                "progress entry belongs to another user".to_string(),
            ));
        }

        let was_completed = progress.status == ReadingStatus::Completed;
        let now = now_timestamp();

        for update in updates {
            match update {
                ProgressUpdate::SetStatus(status) => {
                    progress.status = *status;
                    match status {
                        ReadingStatus::InProgress => {
                            if progress.started_at.is_none() {
                                progress.started_at = Some(now);
                            }
                        }
                        ReadingStatus::Completed => {
                            if progress.started_at.is_none() {
                                progress.started_at = Some(now);
                            }
                            if progress.finished_at.is_none() {
                                progress.finished_at = Some(now);
                            }
                            progress.progress_percentage = 100;
                            if let Some(pages) = progress.book.page_count {
                                progress.current_page = Some(pages);
                            }
                        }
                        ReadingStatus::NotStarted | ReadingStatus::Abandoned => {}
                    }
                }
                ProgressUpdate::SetPercentage(pct) => {
                    let pct = (*pct).min(100);
                    progress.progress_percentage = pct;
                    if let Some(pages) = progress.book.page_count {
                        progress.current_page = Some(stats::page_for_percentage(pct, pages));
                    }
                }
                ProgressUpdate::SetPage(page) => {
                    if let Some(pages) = progress.book.page_count {
                        let page = (*page).min(pages);
                        progress.current_page = Some(page);
                        progress.progress_percentage = stats::percentage_for_page(page, pages);
                    } else {
                        progress.current_page = Some(*page);
                    }
                }
                ProgressUpdate::SetNotes(notes) => {
                    progress.notes = notes.clone();
                }
            }
        }

        progress.updated_at = now;
        self.db.update_progress(&progress)?;

        if !was_completed && progress.status == ReadingStatus::Completed {
            self.bump_goal(&progress);
        }

        Ok(progress)
    }

    /// Stop tracking a book.
    pub fn remove(&self, user_id: &str, progress_id: &str) -> Result<()> {
        let progress = self
            .db
            .get_progress(progress_id)?
            .ok_or_else(|| AppError::NotFound(format!("progress entry {}", progress_id)))?;

        if progress.user_id != user_id {
            return Err(AppError::Forbidden(
                "progress entry belongs to another user".to_string(),
            ));
        }

        self.db.delete_progress(progress_id, user_id)?;
        Ok(())
    }

    /// Get the progress entry for a (user, book) pair, if any.
    pub fn status_of(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>> {
        self.db.get_progress_by_user_book(user_id, book_id)
    }

    /// All progress entries of a user, most recently updated first.
    pub fn list(&self, user_id: &str) -> Result<Vec<ReadingProgress>> {
        self.db.list_user_progress(user_id)
    }

    /// Compute the user's reading statistics.
    pub fn statistics(&self, user_id: &str) -> Result<ReadingStatistics> {
        let records = self.db.list_user_progress(user_id)?;
        Ok(stats::compute(&records, Utc::now().date_naive()))
    }

    /// Create or replace the yearly goal's targets.
    pub fn set_goal(
        &self,
        user_id: &str,
        year: i32,
        goal_books: i64,
        goal_pages: i64,
    ) -> Result<ReadingGoal> {
        if goal_books < 1 {
            return Err(AppError::Validation(
                "Goal must be at least one book".to_string(),
            ));
        }

        if let Some(existing) = self.db.get_goal(user_id, year)? {
            self.db
                .update_goal(&existing.id, user_id, goal_books, goal_pages)?;
            return self
                .db
                .get_goal_by_id(&existing.id)?
                .ok_or_else(|| AppError::Internal("Goal vanished during update".to_string()));
        }

        let now = now_timestamp();
        let goal = ReadingGoal {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            year,
            goal_books,
            goal_pages,
            books_read: 0,
            pages_read: 0,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_goal(&goal)?;
        Ok(goal)
    }

    /// Update an existing goal's targets, scoped to its owner.
    pub fn update_goal(
        &self,
        user_id: &str,
        goal_id: &str,
        goal_books: i64,
        goal_pages: i64,
    ) -> Result<ReadingGoal> {
        let goal = self
            .db
            .get_goal_by_id(goal_id)?
            .ok_or_else(|| AppError::NotFound(format!("goal {}", goal_id)))?;

        if goal.user_id != user_id {
            return Err(AppError::Forbidden(
                "goal belongs to another user".to_string(),
            ));
        }

        if goal_books < 1 {
            return Err(AppError::Validation(
                "Goal must be at least one book".to_string(),
            ));
        }

        self.db.update_goal(goal_id, user_id, goal_books, goal_pages)?;
        self.db
            .get_goal_by_id(goal_id)?
            .ok_or_else(|| AppError::Internal("Goal vanished during update".to_string()))
    }

    /// Get the user's goal for a year, if any.
    pub fn goal(&self, user_id: &str, year: i32) -> Result<Option<ReadingGoal>> {
        self.db.get_goal(user_id, year)
    }

    /// Credit a completion against the goal of the year it happened in.
    /// Best effort, a missing goal or a write failure never fails the
    /// progress update itself.
    fn bump_goal(&self, progress: &ReadingProgress) {
        let year = progress
            .finished_at
            .map(|ts| timestamp_to_datetime(ts).year())
            .unwrap_or_else(|| Utc::now().year());

        let pages = progress.book.page_count.map(i64::from).unwrap_or(0);

        match self.db.get_goal(&progress.user_id, year) {
            Ok(Some(goal)) => {
                if let Err(e) = self.db.increment_goal_progress(&goal.id, pages) {
                    tracing::warn!(error = %e, goal_id = %goal.id, "Failed to credit reading goal");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, user_id = %progress.user_id, "Failed to look up reading goal");
            }
        }
    }
}
