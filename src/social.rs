//! Social graph: follows, profiles, activity feed and notifications.

use crate::db::{
    Activity, ActivityKind, Database, FollowRelation, Notification, NotificationKind, User,
    now_timestamp,
};
use crate::error::{AppError, Result};
use serde::Serialize;
use uuid::Uuid;

/// Public profile of a user, with follower counts.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// User ID.
    pub id: String,
    /// Username.
    pub username: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Profile bio.
    pub bio: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
    /// Account creation timestamp.
    pub created_at: i64,
    /// How many users follow this one.
    pub followers: i64,
    /// How many users this one follows.
    pub following: i64,
}

/// Default feed and notification page size.
const DEFAULT_LIMIT: u32 = 50;

/// Social service.
pub struct SocialService {
    db: Database,
}

impl SocialService {
    /// Create a new social service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Public profile of a user. Counts are derived from the follow
    /// table so they can never drift.
    pub fn profile(&self, user_id: &str) -> Result<UserProfile> {
        let user = self.user(user_id)?;
        Ok(UserProfile {
            followers: self.db.count_followers(user_id)?,
            following: self.db.count_following(user_id)?,
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        })
    }

    /// Follow another user.
    pub fn follow(&self, follower_id: &str, following_id: &str) -> Result<FollowRelation> {
        if follower_id == following_id {
            return Err(AppError::Validation(
                "Cannot follow yourself".to_string(),
            ));
        }

        let follower = self.user(follower_id)?;
        self.user(following_id)?;

        let relation = FollowRelation {
            id: Uuid::new_v4().to_string(),
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            created_at: now_timestamp(),
        };

        self.db.insert_follow(&relation)?;

        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            user_id: follower_id.to_string(),
            kind: ActivityKind::Follow,
            book_id: None,
            book: None,
            related_id: Some(following_id.to_string()),
            created_at: relation.created_at,
        };
        if let Err(e) = self.db.insert_activity(&activity) {
            tracing::warn!(error = %e, "Failed to record follow activity");
        }

        let display = follower.display_name.unwrap_or(follower.username);
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: following_id.to_string(),
            sender_id: follower_id.to_string(),
            kind: NotificationKind::Follow,
            related_id: Some(relation.id.clone()),
            message: format!("{} started following you", display),
            read: false,
            created_at: relation.created_at,
        };
        if let Err(e) = self.db.insert_notification(&notification) {
            tracing::warn!(error = %e, "Failed to deliver follow notification");
        }

        Ok(relation)
    }

    /// Stop following a user.
    pub fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.db.delete_follow(follower_id, following_id)
    }

    /// Whether one user follows another.
    pub fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.db.is_following(follower_id, following_id)
    }

    /// Users who follow the given user.
    pub fn followers(&self, user_id: &str) -> Result<Vec<User>> {
        self.db.list_followers(user_id)
    }

    /// Users the given user follows.
    pub fn following(&self, user_id: &str) -> Result<Vec<User>> {
        self.db.list_following(user_id)
    }

    /// A user's own recent activity, newest first.
    pub fn activity(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<Activity>> {
        self.db
            .list_user_activity(user_id, limit.unwrap_or(DEFAULT_LIMIT))
    }

    /// Recent activity of everyone the user follows, newest first.
    pub fn feed(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<Activity>> {
        self.db
            .list_following_activity(user_id, limit.unwrap_or(DEFAULT_LIMIT))
    }

    /// A user's notifications, newest first.
    pub fn notifications(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<Notification>> {
        self.db
            .list_notifications(user_id, limit.unwrap_or(DEFAULT_LIMIT))
    }

    /// Mark one notification as read.
    pub fn mark_notification_read(&self, user_id: &str, notification_id: &str) -> Result<()> {
        if !self.db.mark_notification_read(notification_id, user_id)? {
            return Err(AppError::NotFound(format!(
                "notification {}",
                notification_id
            )));
        }
        Ok(())
    }

    /// Mark all of a user's notifications as read.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        self.db.mark_all_notifications_read(user_id)
    }

    /// Count a user's unread notifications.
    pub fn unread_notification_count(&self, user_id: &str) -> Result<i64> {
        self.db.count_unread_notifications(user_id)
    }

    fn user(&self, user_id: &str) -> Result<User> {
        self.db
            .get_user_by_id(user_id)?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
    }
}
