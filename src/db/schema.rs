use crate::catalog::BookSummary;
use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Serialize a book snapshot for storage.
fn book_to_json(book: &BookSummary) -> String {
    serde_json::to_string(book).unwrap_or_default()
}

/// Parse a stored book snapshot. Malformed snapshots are treated as
/// absent so a bad row never breaks aggregation.
fn book_from_json(json: &str) -> Option<BookSummary> {
    serde_json::from_str(json).ok()
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        Self::from_connection(conn)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Cascading deletes (account removal) rely on enforced foreign keys.
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| AppError::Internal(format!("Failed to enable foreign keys: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                display_name TEXT,
                bio TEXT,
                avatar_url TEXT,
                role TEXT NOT NULL DEFAULT 'user',
                created_at INTEGER NOT NULL,
                last_login INTEGER
            );

            -- Sessions table
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Reading progress table (one row per user and book)
            CREATE TABLE IF NOT EXISTS reading_progress (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                book_json TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'not_started',
                progress_percentage INTEGER NOT NULL DEFAULT 0,
                current_page INTEGER,
                started_at INTEGER,
                finished_at INTEGER,
                notes TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (user_id, book_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Reading goals table (one row per user and year)
            CREATE TABLE IF NOT EXISTS reading_goals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                goal_books INTEGER NOT NULL,
                goal_pages INTEGER NOT NULL DEFAULT 0,
                books_read INTEGER NOT NULL DEFAULT 0,
                pages_read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (user_id, year),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Book lists table (favorites and reading list)
            CREATE TABLE IF NOT EXISTS book_lists (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                book_json TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (user_id, book_id, kind),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Book reviews table (one review per user and book)
            CREATE TABLE IF NOT EXISTS book_reviews (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                rating INTEGER NOT NULL,
                review_text TEXT,
                book_json TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (user_id, book_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Exchange offers table
            CREATE TABLE IF NOT EXISTS exchange_offers (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                book_json TEXT NOT NULL,
                condition TEXT NOT NULL,
                description TEXT,
                exchange_type TEXT NOT NULL,
                location TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Exchange messages table
            CREATE TABLE IF NOT EXISTS exchange_messages (
                id TEXT PRIMARY KEY,
                offer_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                recipient_id TEXT NOT NULL,
                message TEXT NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (offer_id) REFERENCES exchange_offers(id) ON DELETE CASCADE,
                FOREIGN KEY (sender_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (recipient_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Exchange transactions table
            CREATE TABLE IF NOT EXISTS exchange_transactions (
                id TEXT PRIMARY KEY,
                offer_id TEXT NOT NULL,
                requester_id TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                transaction_type TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                completed_at INTEGER,
                FOREIGN KEY (offer_id) REFERENCES exchange_offers(id) ON DELETE CASCADE,
                FOREIGN KEY (requester_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Follow relations table
            CREATE TABLE IF NOT EXISTS follows (
                id TEXT PRIMARY KEY,
                follower_id TEXT NOT NULL,
                following_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (follower_id, following_id),
                FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (following_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Activity feed table
            CREATE TABLE IF NOT EXISTS activities (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                book_id TEXT,
                book_json TEXT,
                related_id TEXT,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Notifications table
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                related_id TEXT,
                message TEXT NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (sender_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
            CREATE INDEX IF NOT EXISTS idx_progress_user ON reading_progress(user_id);
            CREATE INDEX IF NOT EXISTS idx_goals_user_year ON reading_goals(user_id, year);
            CREATE INDEX IF NOT EXISTS idx_lists_user ON book_lists(user_id);
            CREATE INDEX IF NOT EXISTS idx_reviews_book ON book_reviews(book_id);
            CREATE INDEX IF NOT EXISTS idx_offers_book ON exchange_offers(book_id);
            CREATE INDEX IF NOT EXISTS idx_offers_user ON exchange_offers(user_id);
            CREATE INDEX IF NOT EXISTS idx_messages_offer ON exchange_messages(offer_id);
            CREATE INDEX IF NOT EXISTS idx_messages_recipient ON exchange_messages(recipient_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_offer ON exchange_transactions(offer_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_requester ON exchange_transactions(requester_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_owner ON exchange_transactions(owner_id);
            CREATE INDEX IF NOT EXISTS idx_follows_following ON follows(following_id);
            CREATE INDEX IF NOT EXISTS idx_activities_user ON activities(user_id);
            CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== USER OPERATIONS ==========

    /// Create a new user.
    pub fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, username, password_hash, display_name, bio, avatar_url, role, created_at, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id,
                user.username,
                user.password_hash,
                user.display_name,
                user.bio,
                user.avatar_url,
                user.role,
                user.created_at,
                user.last_login,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Validation(format!("Username '{}' already exists", user.username))
            } else {
                AppError::Internal(format!("Failed to create user: {}", e))
            }
        })?;
        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            display_name: row.get(3)?,
            bio: row.get(4)?,
            avatar_url: row.get(5)?,
            role: row.get(6)?,
            created_at: row.get(7)?,
            last_login: row.get(8)?,
        })
    }

    const USER_COLUMNS: &'static str =
        "id, username, password_hash, display_name, bio, avatar_url, role, created_at, last_login";

    /// Get user by username.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM users WHERE username = ?1",
                Self::USER_COLUMNS
            ),
            params![username],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", Self::USER_COLUMNS),
            params![id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM users ORDER BY username",
                Self::USER_COLUMNS
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map([], Self::row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to list users: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect users: {}", e)))?;

        Ok(users)
    }

    /// Update user password.
    pub fn update_user_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE users SET password_hash = ?1 WHERE username = ?2",
                params![password_hash, username],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update password: {}", e)))?;
        Ok(rows > 0)
    }

    /// Update user profile fields.
    pub fn update_user_profile(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE users SET display_name = ?1, bio = ?2, avatar_url = ?3 WHERE id = ?4",
                params![display_name, bio, avatar_url, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update profile: {}", e)))?;
        Ok(rows > 0)
    }

    /// Update user last login.
    pub fn update_user_last_login(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![now_timestamp(), user_id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to update last login: {}", e)))?;
        Ok(())
    }

    /// Delete user by username.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM users WHERE username = ?1", params![username])
            .map_err(|e| AppError::Internal(format!("Failed to delete user: {}", e)))?;
        Ok(rows > 0)
    }

    /// Delete user by ID. Owned rows cascade.
    pub fn delete_user_by_id(&self, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM users WHERE id = ?1", params![user_id])
            .map_err(|e| AppError::Internal(format!("Failed to delete user: {}", e)))?;
        Ok(rows > 0)
    }

    // ========== SESSION OPERATIONS ==========

    /// Create session.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![session.token, session.user_id, session.expires_at],
        )
        .map_err(|e| AppError::Internal(format!("Failed to create session: {}", e)))?;
        Ok(())
    }

    /// Get session by token.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT token, user_id, expires_at FROM sessions WHERE token = ?1",
            params![token],
            |row| {
                Ok(Session {
                    token: row.get(0)?,
                    user_id: row.get(1)?,
                    expires_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get session: {}", e)))
    }

    /// Delete session.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(|e| AppError::Internal(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }

    /// Cleanup expired sessions.
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                params![now_timestamp()],
            )
            .map_err(|e| AppError::Internal(format!("Failed to cleanup sessions: {}", e)))?;
        Ok(rows)
    }

    // ========== READING PROGRESS OPERATIONS ==========

    const PROGRESS_COLUMNS: &'static str = "id, user_id, book_id, book_json, status, \
         progress_percentage, current_page, started_at, finished_at, notes, created_at, updated_at";

    fn row_to_progress(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<ReadingProgress>> {
        let book_json: String = row.get(3)?;
        let status: String = row.get(4)?;

        let (Some(book), Some(status)) = (book_from_json(&book_json), ReadingStatus::parse(&status))
        else {
            return Ok(None);
        };

        Ok(Some(ReadingProgress {
            id: row.get(0)?,
            user_id: row.get(1)?,
            book_id: row.get(2)?,
            book,
            status,
            progress_percentage: row.get::<_, i64>(5)?.clamp(0, 100) as u8,
            current_page: row.get::<_, Option<i64>>(6)?.map(|p| p.max(0) as u32),
            started_at: row.get(7)?,
            finished_at: row.get(8)?,
            notes: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        }))
    }

    /// Insert a reading progress entry.
    pub fn insert_progress(&self, progress: &ReadingProgress) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reading_progress
             (id, user_id, book_id, book_json, status, progress_percentage,
              current_page, started_at, finished_at, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                progress.id,
                progress.user_id,
                progress.book_id,
                book_to_json(&progress.book),
                progress.status.as_str(),
                progress.progress_percentage as i64,
                progress.current_page.map(|p| p as i64),
                progress.started_at,
                progress.finished_at,
                progress.notes,
                progress.created_at,
                progress.updated_at,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Validation("Book is already tracked".to_string())
            } else {
                AppError::Internal(format!("Failed to insert progress: {}", e))
            }
        })?;
        Ok(())
    }

    /// Update a reading progress entry, scoped to its owner.
    pub fn update_progress(&self, progress: &ReadingProgress) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE reading_progress SET
                    status = ?1, progress_percentage = ?2, current_page = ?3,
                    started_at = ?4, finished_at = ?5, notes = ?6, updated_at = ?7
                 WHERE id = ?8 AND user_id = ?9",
                params![
                    progress.status.as_str(),
                    progress.progress_percentage as i64,
                    progress.current_page.map(|p| p as i64),
                    progress.started_at,
                    progress.finished_at,
                    progress.notes,
                    progress.updated_at,
                    progress.id,
                    progress.user_id,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update progress: {}", e)))?;
        Ok(rows > 0)
    }

    /// Get a reading progress entry by ID.
    pub fn get_progress(&self, id: &str) -> Result<Option<ReadingProgress>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM reading_progress WHERE id = ?1",
                Self::PROGRESS_COLUMNS
            ),
            params![id],
            Self::row_to_progress,
        )
        .optional()
        .map(|o| o.flatten())
        .map_err(|e| AppError::Internal(format!("Failed to get progress: {}", e)))
    }

    /// Get the progress entry for a (user, book) pair.
    pub fn get_progress_by_user_book(
        &self,
        user_id: &str,
        book_id: &str,
    ) -> Result<Option<ReadingProgress>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM reading_progress WHERE user_id = ?1 AND book_id = ?2",
                Self::PROGRESS_COLUMNS
            ),
            params![user_id, book_id],
            Self::row_to_progress,
        )
        .optional()
        .map(|o| o.flatten())
        .map_err(|e| AppError::Internal(format!("Failed to get progress: {}", e)))
    }

    /// List all progress entries for a user, most recently updated first.
    pub fn list_user_progress(&self, user_id: &str) -> Result<Vec<ReadingProgress>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM reading_progress WHERE user_id = ?1 ORDER BY updated_at DESC",
                Self::PROGRESS_COLUMNS
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let entries = stmt
            .query_map(params![user_id], Self::row_to_progress)
            .map_err(|e| AppError::Internal(format!("Failed to list progress: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect progress: {}", e)))?;

        Ok(entries.into_iter().flatten().collect())
    }

    /// Delete a progress entry, scoped to its owner.
    pub fn delete_progress(&self, id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM reading_progress WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to delete progress: {}", e)))?;
        Ok(rows > 0)
    }

    // ========== READING GOAL OPERATIONS ==========

    const GOAL_COLUMNS: &'static str =
        "id, user_id, year, goal_books, goal_pages, books_read, pages_read, created_at, updated_at";

    fn row_to_goal(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReadingGoal> {
        Ok(ReadingGoal {
            id: row.get(0)?,
            user_id: row.get(1)?,
            year: row.get(2)?,
            goal_books: row.get(3)?,
            goal_pages: row.get(4)?,
            books_read: row.get(5)?,
            pages_read: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// Insert a reading goal.
    pub fn insert_goal(&self, goal: &ReadingGoal) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reading_goals
             (id, user_id, year, goal_books, goal_pages, books_read, pages_read, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                goal.id,
                goal.user_id,
                goal.year,
                goal.goal_books,
                goal.goal_pages,
                goal.books_read,
                goal.pages_read,
                goal.created_at,
                goal.updated_at,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Validation("A goal for this year already exists".to_string())
            } else {
                AppError::Internal(format!("Failed to insert goal: {}", e))
            }
        })?;
        Ok(())
    }

    /// Update a goal's targets, scoped to its owner.
    pub fn update_goal(
        &self,
        id: &str,
        user_id: &str,
        goal_books: i64,
        goal_pages: i64,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE reading_goals SET goal_books = ?1, goal_pages = ?2, updated_at = ?3
                 WHERE id = ?4 AND user_id = ?5",
                params![goal_books, goal_pages, now_timestamp(), id, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update goal: {}", e)))?;
        Ok(rows > 0)
    }

    /// Get a goal by ID.
    pub fn get_goal_by_id(&self, id: &str) -> Result<Option<ReadingGoal>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM reading_goals WHERE id = ?1",
                Self::GOAL_COLUMNS
            ),
            params![id],
            Self::row_to_goal,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get goal: {}", e)))
    }

    /// Get the goal for a (user, year) pair.
    pub fn get_goal(&self, user_id: &str, year: i32) -> Result<Option<ReadingGoal>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM reading_goals WHERE user_id = ?1 AND year = ?2",
                Self::GOAL_COLUMNS
            ),
            params![user_id, year],
            Self::row_to_goal,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get goal: {}", e)))
    }

    /// Add one completed book and its pages to a goal's running counters.
    pub fn increment_goal_progress(&self, goal_id: &str, pages: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE reading_goals SET
                    books_read = books_read + 1,
                    pages_read = pages_read + ?1,
                    updated_at = ?2
                 WHERE id = ?3",
                params![pages, now_timestamp(), goal_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to increment goal: {}", e)))?;
        Ok(rows > 0)
    }

    // ========== BOOK LIST OPERATIONS ==========

    fn row_to_list_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<BookListEntry>> {
        let kind: String = row.get(3)?;
        let book_json: String = row.get(4)?;

        let (Some(kind), Some(book)) = (ListKind::parse(&kind), book_from_json(&book_json)) else {
            return Ok(None);
        };

        Ok(Some(BookListEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            book_id: row.get(2)?,
            kind,
            book,
            created_at: row.get(5)?,
        }))
    }

    /// Add a book to a user's list. Already-present entries are kept as-is.
    pub fn add_list_entry(&self, entry: &BookListEntry) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "INSERT INTO book_lists (id, user_id, book_id, kind, book_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (user_id, book_id, kind) DO NOTHING",
                params![
                    entry.id,
                    entry.user_id,
                    entry.book_id,
                    entry.kind.as_str(),
                    book_to_json(&entry.book),
                    entry.created_at,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to add list entry: {}", e)))?;
        Ok(rows > 0)
    }

    /// Remove a book from a user's list.
    pub fn remove_list_entry(&self, user_id: &str, book_id: &str, kind: ListKind) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM book_lists WHERE user_id = ?1 AND book_id = ?2 AND kind = ?3",
                params![user_id, book_id, kind.as_str()],
            )
            .map_err(|e| AppError::Internal(format!("Failed to remove list entry: {}", e)))?;
        Ok(rows > 0)
    }

    /// Check list membership.
    pub fn is_in_list(&self, user_id: &str, book_id: &str, kind: ListKind) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM book_lists WHERE user_id = ?1 AND book_id = ?2 AND kind = ?3",
                params![user_id, book_id, kind.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Internal(format!("Failed to check list: {}", e)))?;
        Ok(count > 0)
    }

    /// Get all entries in one of a user's lists, newest first.
    pub fn get_list_entries(&self, user_id: &str, kind: ListKind) -> Result<Vec<BookListEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, book_id, kind, book_json, created_at
                 FROM book_lists WHERE user_id = ?1 AND kind = ?2
                 ORDER BY created_at DESC",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let entries = stmt
            .query_map(params![user_id, kind.as_str()], Self::row_to_list_entry)
            .map_err(|e| AppError::Internal(format!("Failed to list entries: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect entries: {}", e)))?;

        Ok(entries.into_iter().flatten().collect())
    }

    // ========== REVIEW OPERATIONS ==========

    const REVIEW_COLUMNS: &'static str =
        "id, user_id, book_id, rating, review_text, book_json, created_at, updated_at";

    fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<BookReview>> {
        let book_json: String = row.get(5)?;
        let Some(book) = book_from_json(&book_json) else {
            return Ok(None);
        };

        Ok(Some(BookReview {
            id: row.get(0)?,
            user_id: row.get(1)?,
            book_id: row.get(2)?,
            rating: row.get::<_, i64>(3)?.clamp(1, 5) as u8,
            review_text: row.get(4)?,
            book,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        }))
    }

    /// Insert a review.
    pub fn insert_review(&self, review: &BookReview) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO book_reviews
             (id, user_id, book_id, rating, review_text, book_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                review.id,
                review.user_id,
                review.book_id,
                review.rating as i64,
                review.review_text,
                book_to_json(&review.book),
                review.created_at,
                review.updated_at,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Validation("You have already reviewed this book".to_string())
            } else {
                AppError::Internal(format!("Failed to insert review: {}", e))
            }
        })?;
        Ok(())
    }

    /// Update a review's rating and text, scoped to its author.
    pub fn update_review(
        &self,
        id: &str,
        user_id: &str,
        rating: u8,
        review_text: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE book_reviews SET rating = ?1, review_text = ?2, updated_at = ?3
                 WHERE id = ?4 AND user_id = ?5",
                params![rating as i64, review_text, now_timestamp(), id, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update review: {}", e)))?;
        Ok(rows > 0)
    }

    /// Get a review by ID.
    pub fn get_review(&self, id: &str) -> Result<Option<BookReview>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM book_reviews WHERE id = ?1",
                Self::REVIEW_COLUMNS
            ),
            params![id],
            Self::row_to_review,
        )
        .optional()
        .map(|o| o.flatten())
        .map_err(|e| AppError::Internal(format!("Failed to get review: {}", e)))
    }

    /// Get a user's review for a book.
    pub fn get_review_by_user_book(
        &self,
        user_id: &str,
        book_id: &str,
    ) -> Result<Option<BookReview>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM book_reviews WHERE user_id = ?1 AND book_id = ?2",
                Self::REVIEW_COLUMNS
            ),
            params![user_id, book_id],
            Self::row_to_review,
        )
        .optional()
        .map(|o| o.flatten())
        .map_err(|e| AppError::Internal(format!("Failed to get review: {}", e)))
    }

    /// Get all reviews for a book, newest first.
    pub fn get_book_reviews(&self, book_id: &str) -> Result<Vec<BookReview>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM book_reviews WHERE book_id = ?1 ORDER BY created_at DESC",
                Self::REVIEW_COLUMNS
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let reviews = stmt
            .query_map(params![book_id], Self::row_to_review)
            .map_err(|e| AppError::Internal(format!("Failed to list reviews: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect reviews: {}", e)))?;

        Ok(reviews.into_iter().flatten().collect())
    }

    /// Delete a review, scoped to its author.
    pub fn delete_review(&self, id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM book_reviews WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to delete review: {}", e)))?;
        Ok(rows > 0)
    }

    // ========== EXCHANGE OFFER OPERATIONS ==========

    const OFFER_COLUMNS: &'static str = "id, user_id, book_id, book_json, condition, description, \
         exchange_type, location, active, created_at, updated_at";

    fn row_to_offer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<ExchangeOffer>> {
        let book_json: String = row.get(3)?;
        let condition: String = row.get(4)?;
        let exchange_type: String = row.get(6)?;

        let (Some(book), Some(condition), Some(exchange_type)) = (
            book_from_json(&book_json),
            BookCondition::parse(&condition),
            ExchangeType::parse(&exchange_type),
        ) else {
            return Ok(None);
        };

        Ok(Some(ExchangeOffer {
            id: row.get(0)?,
            user_id: row.get(1)?,
            book_id: row.get(2)?,
            book,
            condition,
            description: row.get(5)?,
            exchange_type,
            location: row.get(7)?,
            active: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        }))
    }

    /// Insert an exchange offer.
    pub fn insert_offer(&self, offer: &ExchangeOffer) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO exchange_offers
             (id, user_id, book_id, book_json, condition, description, exchange_type,
              location, active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                offer.id,
                offer.user_id,
                offer.book_id,
                book_to_json(&offer.book),
                offer.condition.as_str(),
                offer.description,
                offer.exchange_type.as_str(),
                offer.location,
                offer.active,
                offer.created_at,
                offer.updated_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to insert offer: {}", e)))?;
        Ok(())
    }

    /// Update an offer's editable fields, scoped to its owner.
    pub fn update_offer(&self, offer: &ExchangeOffer) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE exchange_offers SET
                    condition = ?1, description = ?2, exchange_type = ?3,
                    location = ?4, active = ?5, updated_at = ?6
                 WHERE id = ?7 AND user_id = ?8",
                params![
                    offer.condition.as_str(),
                    offer.description,
                    offer.exchange_type.as_str(),
                    offer.location,
                    offer.active,
                    offer.updated_at,
                    offer.id,
                    offer.user_id,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update offer: {}", e)))?;
        Ok(rows > 0)
    }

    /// Toggle an offer's visibility, scoped to its owner.
    pub fn set_offer_active(&self, id: &str, user_id: &str, active: bool) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE exchange_offers SET active = ?1, updated_at = ?2
                 WHERE id = ?3 AND user_id = ?4",
                params![active, now_timestamp(), id, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update offer: {}", e)))?;
        Ok(rows > 0)
    }

    /// Delete an offer, scoped to its owner.
    pub fn delete_offer(&self, id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM exchange_offers WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to delete offer: {}", e)))?;
        Ok(rows > 0)
    }

    /// Get an offer by ID.
    pub fn get_offer(&self, id: &str) -> Result<Option<ExchangeOffer>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM exchange_offers WHERE id = ?1",
                Self::OFFER_COLUMNS
            ),
            params![id],
            Self::row_to_offer,
        )
        .optional()
        .map(|o| o.flatten())
        .map_err(|e| AppError::Internal(format!("Failed to get offer: {}", e)))
    }

    /// Get active offers for a book, newest first.
    pub fn get_offers_by_book(&self, book_id: &str) -> Result<Vec<ExchangeOffer>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM exchange_offers WHERE book_id = ?1 AND active = 1
                 ORDER BY created_at DESC",
                Self::OFFER_COLUMNS
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let offers = stmt
            .query_map(params![book_id], Self::row_to_offer)
            .map_err(|e| AppError::Internal(format!("Failed to list offers: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect offers: {}", e)))?;

        Ok(offers.into_iter().flatten().collect())
    }

    /// Get all offers by a user, newest first.
    pub fn get_user_offers(&self, user_id: &str) -> Result<Vec<ExchangeOffer>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM exchange_offers WHERE user_id = ?1 ORDER BY created_at DESC",
                Self::OFFER_COLUMNS
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let offers = stmt
            .query_map(params![user_id], Self::row_to_offer)
            .map_err(|e| AppError::Internal(format!("Failed to list offers: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect offers: {}", e)))?;

        Ok(offers.into_iter().flatten().collect())
    }

    // ========== EXCHANGE MESSAGE OPERATIONS ==========

    fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExchangeMessage> {
        Ok(ExchangeMessage {
            id: row.get(0)?,
            offer_id: row.get(1)?,
            sender_id: row.get(2)?,
            recipient_id: row.get(3)?,
            message: row.get(4)?,
            read: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    /// Insert an exchange message.
    pub fn insert_message(&self, message: &ExchangeMessage) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO exchange_messages
             (id, offer_id, sender_id, recipient_id, message, read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id,
                message.offer_id,
                message.sender_id,
                message.recipient_id,
                message.message,
                message.read,
                message.created_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to insert message: {}", e)))?;
        Ok(())
    }

    /// Get all messages for an offer, oldest first.
    pub fn get_offer_messages(&self, offer_id: &str) -> Result<Vec<ExchangeMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, offer_id, sender_id, recipient_id, message, read, created_at
                 FROM exchange_messages WHERE offer_id = ?1 ORDER BY created_at",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let messages = stmt
            .query_map(params![offer_id], Self::row_to_message)
            .map_err(|e| AppError::Internal(format!("Failed to list messages: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect messages: {}", e)))?;

        Ok(messages)
    }

    /// Get a message by ID.
    pub fn get_message(&self, id: &str) -> Result<Option<ExchangeMessage>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, offer_id, sender_id, recipient_id, message, read, created_at
             FROM exchange_messages WHERE id = ?1",
            params![id],
            Self::row_to_message,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get message: {}", e)))
    }

    /// Mark a message as read, scoped to its recipient.
    pub fn mark_message_read(&self, id: &str, recipient_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE exchange_messages SET read = 1 WHERE id = ?1 AND recipient_id = ?2",
                params![id, recipient_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to mark message read: {}", e)))?;
        Ok(rows > 0)
    }

    /// Count unread messages for a user.
    pub fn count_unread_messages(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM exchange_messages WHERE recipient_id = ?1 AND read = 0",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Internal(format!("Failed to count messages: {}", e)))
    }

    // ========== EXCHANGE TRANSACTION OPERATIONS ==========

    const TRANSACTION_COLUMNS: &'static str = "id, offer_id, requester_id, owner_id, status, \
         transaction_type, created_at, updated_at, completed_at";

    fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<ExchangeTransaction>> {
        let status: String = row.get(4)?;
        let transaction_type: String = row.get(5)?;

        let (Some(status), Some(transaction_type)) = (
            TransactionStatus::parse(&status),
            ExchangeType::parse(&transaction_type),
        ) else {
            return Ok(None);
        };

        Ok(Some(ExchangeTransaction {
            id: row.get(0)?,
            offer_id: row.get(1)?,
            requester_id: row.get(2)?,
            owner_id: row.get(3)?,
            status,
            transaction_type,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            completed_at: row.get(8)?,
        }))
    }

    /// Insert an exchange transaction.
    pub fn insert_transaction(&self, tx: &ExchangeTransaction) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO exchange_transactions
             (id, offer_id, requester_id, owner_id, status, transaction_type,
              created_at, updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                tx.id,
                tx.offer_id,
                tx.requester_id,
                tx.owner_id,
                tx.status.as_str(),
                tx.transaction_type.as_str(),
                tx.created_at,
                tx.updated_at,
                tx.completed_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to insert transaction: {}", e)))?;
        Ok(())
    }

    /// Get a transaction by ID.
    pub fn get_transaction(&self, id: &str) -> Result<Option<ExchangeTransaction>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM exchange_transactions WHERE id = ?1",
                Self::TRANSACTION_COLUMNS
            ),
            params![id],
            Self::row_to_transaction,
        )
        .optional()
        .map(|o| o.flatten())
        .map_err(|e| AppError::Internal(format!("Failed to get transaction: {}", e)))
    }

    /// Find a requester's transaction on an offer that is still pending
    /// or accepted.
    pub fn get_active_transaction(
        &self,
        offer_id: &str,
        requester_id: &str,
    ) -> Result<Option<ExchangeTransaction>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM exchange_transactions
                 WHERE offer_id = ?1 AND requester_id = ?2 AND status IN ('pending', 'accepted')",
                Self::TRANSACTION_COLUMNS
            ),
            params![offer_id, requester_id],
            Self::row_to_transaction,
        )
        .optional()
        .map(|o| o.flatten())
        .map_err(|e| AppError::Internal(format!("Failed to get transaction: {}", e)))
    }

    /// Update a transaction's status.
    pub fn update_transaction_status(
        &self,
        id: &str,
        status: TransactionStatus,
        completed_at: Option<i64>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE exchange_transactions SET status = ?1, completed_at = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![status.as_str(), completed_at, now_timestamp(), id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update transaction: {}", e)))?;
        Ok(rows > 0)
    }

    /// Get all transactions a user participates in, newest first.
    pub fn list_user_transactions(&self, user_id: &str) -> Result<Vec<ExchangeTransaction>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM exchange_transactions
                 WHERE requester_id = ?1 OR owner_id = ?1
                 ORDER BY created_at DESC",
                Self::TRANSACTION_COLUMNS
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let transactions = stmt
            .query_map(params![user_id], Self::row_to_transaction)
            .map_err(|e| AppError::Internal(format!("Failed to list transactions: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect transactions: {}", e)))?;

        Ok(transactions.into_iter().flatten().collect())
    }

    // ========== FOLLOW OPERATIONS ==========

    /// Insert a follow relation.
    pub fn insert_follow(&self, follow: &FollowRelation) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO follows (id, follower_id, following_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                follow.id,
                follow.follower_id,
                follow.following_id,
                follow.created_at,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Validation("Already following this user".to_string())
            } else {
                AppError::Internal(format!("Failed to insert follow: {}", e))
            }
        })?;
        Ok(())
    }

    /// Delete a follow relation.
    pub fn delete_follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                params![follower_id, following_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to delete follow: {}", e)))?;
        Ok(rows > 0)
    }

    /// Check whether one user follows another.
    pub fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                params![follower_id, following_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Internal(format!("Failed to check follow: {}", e)))?;
        Ok(count > 0)
    }

    /// Users who follow the given user.
    pub fn list_followers(&self, user_id: &str) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM users u
                 JOIN follows f ON u.id = f.follower_id
                 WHERE f.following_id = ?1
                 ORDER BY f.created_at DESC",
                Self::USER_COLUMNS
                    .split(", ")
                    .map(|c| format!("u.{}", c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map(params![user_id], Self::row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to list followers: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect followers: {}", e)))?;

        Ok(users)
    }

    /// Users the given user follows.
    pub fn list_following(&self, user_id: &str) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM users u
                 JOIN follows f ON u.id = f.following_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.created_at DESC",
                Self::USER_COLUMNS
                    .split(", ")
                    .map(|c| format!("u.{}", c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map(params![user_id], Self::row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to list following: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect following: {}", e)))?;

        Ok(users)
    }

    /// Count followers of a user.
    pub fn count_followers(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Internal(format!("Failed to count followers: {}", e)))
    }

    /// Count users a user follows.
    pub fn count_following(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Internal(format!("Failed to count following: {}", e)))
    }

    // ========== ACTIVITY OPERATIONS ==========

    fn row_to_activity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<Activity>> {
        let kind: String = row.get(2)?;
        let Some(kind) = ActivityKind::parse(&kind) else {
            return Ok(None);
        };

        let book_json: Option<String> = row.get(4)?;

        Ok(Some(Activity {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind,
            book_id: row.get(3)?,
            book: book_json.as_deref().and_then(book_from_json),
            related_id: row.get(5)?,
            created_at: row.get(6)?,
        }))
    }

    /// Insert an activity item.
    pub fn insert_activity(&self, activity: &Activity) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO activities (id, user_id, kind, book_id, book_json, related_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                activity.id,
                activity.user_id,
                activity.kind.as_str(),
                activity.book_id,
                activity.book.as_ref().map(book_to_json),
                activity.related_id,
                activity.created_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to insert activity: {}", e)))?;
        Ok(())
    }

    /// Get a user's own activity, newest first.
    pub fn list_user_activity(&self, user_id: &str, limit: u32) -> Result<Vec<Activity>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, kind, book_id, book_json, related_id, created_at
                 FROM activities WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let activities = stmt
            .query_map(params![user_id, limit], Self::row_to_activity)
            .map_err(|e| AppError::Internal(format!("Failed to list activity: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect activity: {}", e)))?;

        Ok(activities.into_iter().flatten().collect())
    }

    /// Get activity of everyone the user follows, newest first.
    pub fn list_following_activity(&self, user_id: &str, limit: u32) -> Result<Vec<Activity>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT a.id, a.user_id, a.kind, a.book_id, a.book_json, a.related_id, a.created_at
                 FROM activities a
                 JOIN follows f ON a.user_id = f.following_id
                 WHERE f.follower_id = ?1
                 ORDER BY a.created_at DESC LIMIT ?2",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let activities = stmt
            .query_map(params![user_id, limit], Self::row_to_activity)
            .map_err(|e| AppError::Internal(format!("Failed to list activity: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect activity: {}", e)))?;

        Ok(activities.into_iter().flatten().collect())
    }

    // ========== NOTIFICATION OPERATIONS ==========

    fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<Notification>> {
        let kind: String = row.get(3)?;
        let Some(kind) = NotificationKind::parse(&kind) else {
            return Ok(None);
        };

        Ok(Some(Notification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            sender_id: row.get(2)?,
            kind,
            related_id: row.get(4)?,
            message: row.get(5)?,
            read: row.get(6)?,
            created_at: row.get(7)?,
        }))
    }

    /// Insert a notification.
    pub fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO notifications
             (id, user_id, sender_id, kind, related_id, message, read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                notification.id,
                notification.user_id,
                notification.sender_id,
                notification.kind.as_str(),
                notification.related_id,
                notification.message,
                notification.read,
                notification.created_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to insert notification: {}", e)))?;
        Ok(())
    }

    /// Get a user's notifications, newest first.
    pub fn list_notifications(&self, user_id: &str, limit: u32) -> Result<Vec<Notification>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, sender_id, kind, related_id, message, read, created_at
                 FROM notifications WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let notifications = stmt
            .query_map(params![user_id, limit], Self::row_to_notification)
            .map_err(|e| AppError::Internal(format!("Failed to list notifications: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect notifications: {}", e)))?;

        Ok(notifications.into_iter().flatten().collect())
    }

    /// Mark one notification as read, scoped to its recipient.
    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to mark notification read: {}", e)))?;
        Ok(rows > 0)
    }

    /// Mark all of a user's notifications as read.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                params![user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to mark notifications read: {}", e)))?;
        Ok(rows)
    }

    /// Count unread notifications for a user.
    pub fn count_unread_notifications(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Internal(format!("Failed to count notifications: {}", e)))
    }
}
