mod schema;

pub use schema::Database;

use crate::catalog::BookSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Username for login.
    pub username: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Short profile bio.
    pub bio: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
    /// User role: "admin" or "user".
    pub role: String,
    /// Account creation timestamp.
    pub created_at: i64,
    /// Last login timestamp.
    pub last_login: Option<i64>,
}

/// Authentication session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session token.
    pub token: String,
    /// User ID.
    pub user_id: String,
    /// Expiration timestamp.
    pub expires_at: i64,
}

/// Reading status of a tracked book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    /// Tracked but not yet started.
    NotStarted,
    /// Currently being read.
    InProgress,
    /// Finished.
    Completed,
    /// Given up on.
    Abandoned,
}

impl ReadingStatus {
    /// Database column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::NotStarted => "not_started",
            ReadingStatus::InProgress => "in_progress",
            ReadingStatus::Completed => "completed",
            ReadingStatus::Abandoned => "abandoned",
        }
    }

    /// Parse from the database column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(ReadingStatus::NotStarted),
            "in_progress" => Some(ReadingStatus::InProgress),
            "completed" => Some(ReadingStatus::Completed),
            "abandoned" => Some(ReadingStatus::Abandoned),
            _ => None,
        }
    }
}

/// Reading progress for one (user, book) pair.
///
/// Holds a frozen snapshot of the catalog metadata so progress and
/// statistics stay stable even if the catalog entry changes or disappears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingProgress {
    /// Progress entry ID.
    pub id: String,
    /// Owning user ID.
    pub user_id: String,
    /// External catalog ID of the book.
    pub book_id: String,
    /// Frozen book metadata captured at tracking time.
    pub book: BookSummary,
    /// Reading status.
    pub status: ReadingStatus,
    /// Progress percentage (0-100).
    pub progress_percentage: u8,
    /// Current page, kept consistent with the percentage when the
    /// snapshot has a page count.
    pub current_page: Option<u32>,
    /// When reading started.
    pub started_at: Option<i64>,
    /// When reading finished.
    pub finished_at: Option<i64>,
    /// Free-form user notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Yearly reading goal. At most one per (user, year).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingGoal {
    /// Goal ID.
    pub id: String,
    /// Owning user ID.
    pub user_id: String,
    /// Calendar year the goal applies to.
    pub year: i32,
    /// Target number of books.
    pub goal_books: i64,
    /// Target number of pages (0 when unset).
    pub goal_pages: i64,
    /// Books completed so far this year.
    pub books_read: i64,
    /// Pages completed so far this year.
    pub pages_read: i64,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Which user-scoped book list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// Favorite books.
    Favorite,
    /// Books to read later.
    ReadingList,
}

impl ListKind {
    /// Database column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Favorite => "favorite",
            ListKind::ReadingList => "reading_list",
        }
    }

    /// Parse from the database column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "favorite" => Some(ListKind::Favorite),
            "reading_list" => Some(ListKind::ReadingList),
            _ => None,
        }
    }
}

/// Entry in a user's favorites or reading list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookListEntry {
    /// Entry ID.
    pub id: String,
    /// Owning user ID.
    pub user_id: String,
    /// External catalog ID of the book.
    pub book_id: String,
    /// Which list this entry belongs to.
    pub kind: ListKind,
    /// Frozen book metadata.
    pub book: BookSummary,
    /// Creation timestamp.
    pub created_at: i64,
}

/// User review of a book. One per (user, book).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookReview {
    /// Review ID.
    pub id: String,
    /// Author user ID.
    pub user_id: String,
    /// External catalog ID of the book.
    pub book_id: String,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Optional review text.
    pub review_text: Option<String>,
    /// Frozen book metadata.
    pub book: BookSummary,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Physical condition of an offered book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookCondition {
    /// Like new.
    New,
    /// Very good.
    VeryGood,
    /// Good.
    Good,
    /// Noticeable wear.
    Fair,
    /// Damaged, needs repair.
    NeedsRepair,
}

impl BookCondition {
    /// Database column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookCondition::New => "new",
            BookCondition::VeryGood => "very_good",
            BookCondition::Good => "good",
            BookCondition::Fair => "fair",
            BookCondition::NeedsRepair => "needs_repair",
        }
    }

    /// Parse from the database column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(BookCondition::New),
            "very_good" => Some(BookCondition::VeryGood),
            "good" => Some(BookCondition::Good),
            "fair" => Some(BookCondition::Fair),
            "needs_repair" => Some(BookCondition::NeedsRepair),
            _ => None,
        }
    }
}

/// Kind of exchange an offer proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeType {
    /// Swap for another book.
    Swap,
    /// Lend temporarily.
    Lend,
    /// Give away.
    Giveaway,
}

impl ExchangeType {
    /// Database column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeType::Swap => "swap",
            ExchangeType::Lend => "lend",
            ExchangeType::Giveaway => "giveaway",
        }
    }

    /// Parse from the database column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "swap" => Some(ExchangeType::Swap),
            "lend" => Some(ExchangeType::Lend),
            "giveaway" => Some(ExchangeType::Giveaway),
            _ => None,
        }
    }
}

/// Status of an exchange transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Waiting for the owner's response.
    Pending,
    /// Accepted by the owner.
    Accepted,
    /// Rejected by the owner.
    Rejected,
    /// Both sides finished the exchange.
    Completed,
    /// Withdrawn by either side.
    Cancelled,
}

impl TransactionStatus {
    /// Database column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Accepted => "accepted",
            TransactionStatus::Rejected => "rejected",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from the database column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "accepted" => Some(TransactionStatus::Accepted),
            "rejected" => Some(TransactionStatus::Rejected),
            "completed" => Some(TransactionStatus::Completed),
            "cancelled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }
}

/// Offer to exchange a physical book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeOffer {
    /// Offer ID.
    pub id: String,
    /// Offering user ID.
    pub user_id: String,
    /// External catalog ID of the book.
    pub book_id: String,
    /// Frozen book metadata.
    pub book: BookSummary,
    /// Physical condition.
    pub condition: BookCondition,
    /// Free-form description.
    pub description: Option<String>,
    /// Kind of exchange proposed.
    pub exchange_type: ExchangeType,
    /// Pick-up location.
    pub location: Option<String>,
    /// Whether the offer is visible to other users.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Message between two users about an exchange offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeMessage {
    /// Message ID.
    pub id: String,
    /// Offer the message refers to.
    pub offer_id: String,
    /// Sending user ID.
    pub sender_id: String,
    /// Receiving user ID.
    pub recipient_id: String,
    /// Message body.
    pub message: String,
    /// Whether the recipient has read it.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Exchange transaction between a requester and an offer owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeTransaction {
    /// Transaction ID.
    pub id: String,
    /// Offer the transaction is for.
    pub offer_id: String,
    /// Requesting user ID.
    pub requester_id: String,
    /// Offer owner user ID.
    pub owner_id: String,
    /// Current status.
    pub status: TransactionStatus,
    /// Kind of exchange, copied from the offer at request time.
    pub transaction_type: ExchangeType,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
    /// When the transaction completed.
    pub completed_at: Option<i64>,
}

/// Follow relation between two users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowRelation {
    /// Relation ID.
    pub id: String,
    /// The user who follows.
    pub follower_id: String,
    /// The user being followed.
    pub following_id: String,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Kind of activity recorded in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Reviewed a book.
    Review,
    /// Added a book to favorites.
    Favorite,
    /// Added a book to the reading list.
    ReadingList,
    /// Created an exchange offer.
    ExchangeOffer,
    /// Followed another user.
    Follow,
}

impl ActivityKind {
    /// Database column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Review => "review",
            ActivityKind::Favorite => "favorite",
            ActivityKind::ReadingList => "reading_list",
            ActivityKind::ExchangeOffer => "exchange_offer",
            ActivityKind::Follow => "follow",
        }
    }

    /// Parse from the database column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "review" => Some(ActivityKind::Review),
            "favorite" => Some(ActivityKind::Favorite),
            "reading_list" => Some(ActivityKind::ReadingList),
            "exchange_offer" => Some(ActivityKind::ExchangeOffer),
            "follow" => Some(ActivityKind::Follow),
            _ => None,
        }
    }
}

/// Feed entry describing something a user did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Activity ID.
    pub id: String,
    /// Acting user ID.
    pub user_id: String,
    /// What happened.
    pub kind: ActivityKind,
    /// Book involved, if any.
    pub book_id: Option<String>,
    /// Frozen book metadata, if a book was involved.
    pub book: Option<BookSummary>,
    /// ID of the related row (review, offer, follow relation).
    pub related_id: Option<String>,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Kind of notification delivered to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone followed you.
    Follow,
    /// Someone requested one of your exchange offers.
    ExchangeRequest,
    /// A transaction you participate in changed status.
    ExchangeStatus,
}

impl NotificationKind {
    /// Database column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::ExchangeRequest => "exchange_request",
            NotificationKind::ExchangeStatus => "exchange_status",
        }
    }

    /// Parse from the database column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "follow" => Some(NotificationKind::Follow),
            "exchange_request" => Some(NotificationKind::ExchangeRequest),
            "exchange_status" => Some(NotificationKind::ExchangeStatus),
            _ => None,
        }
    }
}

/// Notification delivered to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Notification ID.
    pub id: String,
    /// Receiving user ID.
    pub user_id: String,
    /// User who caused the notification.
    pub sender_id: String,
    /// What kind of event this is.
    pub kind: NotificationKind,
    /// ID of the related row.
    pub related_id: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Whether the user has read it.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Convert timestamp to DateTime.
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}
