use crate::auth::AuthService;
use crate::catalog::BookSummary;
use crate::db::{
    Database, ListKind, ReadingStatus, TransactionStatus, User, now_timestamp,
};
use crate::db::{ActivityKind, BookCondition, ExchangeType, NotificationKind};
use crate::exchange::ExchangeService;
use crate::lists::ListService;
use crate::progress::{ProgressService, ProgressUpdate};
use crate::reviews::ReviewService;
use crate::social::SocialService;

fn test_db() -> Database {
    Database::open_memory().unwrap()
}

fn create_user(db: &Database, id: &str, username: &str) {
    let user = User {
        id: id.to_string(),
        username: username.to_string(),
        password_hash: "hash".to_string(),
        display_name: None,
        bio: None,
        avatar_url: None,
        role: "user".to_string(),
        created_at: now_timestamp(),
        last_login: None,
    };
    db.create_user(&user).unwrap();
}

fn book(id: &str, pages: Option<u32>) -> BookSummary {
    BookSummary {
        id: id.to_string(),
        title: format!("Book {}", id),
        authors: vec!["Author".to_string()],
        description: None,
        published_date: None,
        page_count: pages,
        categories: vec!["Fiction".to_string()],
        image_links: None,
        language: Some("en".to_string()),
        average_rating: None,
        publisher: None,
    }
}

// ============================================================================
// AUTH
// ============================================================================

#[test]
fn auth_register_login_logout() {
    let db = test_db();
    let auth = AuthService::new(db.clone(), 30, true);

    let user = auth.register("alice", "secret").unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.role, "user");

    let (logged_in, token) = auth.login("alice", "secret").unwrap();
    assert_eq!(logged_in.id, user.id);

    let validated = auth.validate_token(&token).unwrap().unwrap();
    assert_eq!(validated.id, user.id);

    auth.logout(&token).unwrap();
    assert!(auth.validate_token(&token).unwrap().is_none());
}

#[test]
fn auth_register_disabled() {
    let db = test_db();
    let auth = AuthService::new(db, 30, false);
    assert!(auth.register("alice", "secret").is_err());
}

#[test]
fn auth_wrong_password_rejected() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);
    auth.register("alice", "secret").unwrap();
    assert!(auth.login("alice", "wrong").is_err());
    assert!(auth.login("nobody", "secret").is_err());
}

#[test]
fn auth_duplicate_username_rejected() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);
    auth.register("alice", "secret").unwrap();
    assert!(auth.register("alice", "other").is_err());
}

#[test]
fn auth_profile_update() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);
    let user = auth.register("alice", "secret").unwrap();

    let updated = auth
        .update_profile(
            &user.id,
            Some("Alice".to_string()),
            Some("Reads a lot".to_string()),
            None,
        )
        .unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Alice"));
    assert_eq!(updated.bio.as_deref(), Some("Reads a lot"));
}

#[test]
fn auth_delete_account_cascades() {
    let db = test_db();
    let auth = AuthService::new(db.clone(), 30, true);
    let progress = ProgressService::new(db.clone());

    let user = auth.register("alice", "secret").unwrap();
    progress
        .add_book(&user.id, book("b1", Some(100)), ReadingStatus::InProgress)
        .unwrap();

    assert!(auth.delete_account(&user.id).unwrap());
    assert!(db.get_user_by_id(&user.id).unwrap().is_none());
    assert!(db.list_user_progress(&user.id).unwrap().is_empty());
}

// ============================================================================
// READING PROGRESS
// ============================================================================

#[test]
fn progress_add_and_status() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let progress = ProgressService::new(db.clone());

    let entry = progress
        .add_book("u1", book("b1", Some(200)), ReadingStatus::InProgress)
        .unwrap();
    assert_eq!(entry.status, ReadingStatus::InProgress);
    assert!(entry.started_at.is_some());
    assert!(entry.finished_at.is_none());

    let found = progress.status_of("u1", "b1").unwrap().unwrap();
    assert_eq!(found.id, entry.id);
    assert!(progress.status_of("u1", "missing").unwrap().is_none());
}

#[test]
fn progress_add_twice_updates_status() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let progress = ProgressService::new(db.clone());

    let first = progress
        .add_book("u1", book("b1", Some(200)), ReadingStatus::NotStarted)
        .unwrap();
    let second = progress
        .add_book("u1", book("b1", Some(200)), ReadingStatus::InProgress)
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, ReadingStatus::InProgress);
    assert_eq!(progress.list("u1").unwrap().len(), 1);
}

#[test]
fn progress_completion_stamps_and_fills() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let progress = ProgressService::new(db.clone());

    let entry = progress
        .add_book("u1", book("b1", Some(320)), ReadingStatus::InProgress)
        .unwrap();

    let done = progress
        .update(
            "u1",
            &entry.id,
            &[ProgressUpdate::SetStatus(ReadingStatus::Completed)],
        )
        .unwrap();

    assert_eq!(done.status, ReadingStatus::Completed);
    assert_eq!(done.progress_percentage, 100);
    assert_eq!(done.current_page, Some(320));
    assert!(done.finished_at.is_some());

    // Completing again keeps the original finish date.
    let again = progress
        .update(
            "u1",
            &entry.id,
            &[ProgressUpdate::SetStatus(ReadingStatus::Completed)],
        )
        .unwrap();
    assert_eq!(again.finished_at, done.finished_at);
}

#[test]
fn progress_percentage_and_page_stay_consistent() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let progress = ProgressService::new(db.clone());

    let entry = progress
        .add_book("u1", book("b1", Some(200)), ReadingStatus::InProgress)
        .unwrap();

    let updated = progress
        .update("u1", &entry.id, &[ProgressUpdate::SetPercentage(50)])
        .unwrap();
    assert_eq!(updated.current_page, Some(100));

    let updated = progress
        .update("u1", &entry.id, &[ProgressUpdate::SetPage(150)])
        .unwrap();
    assert_eq!(updated.progress_percentage, 75);

    // Pages past the end clamp to the book length.
    let updated = progress
        .update("u1", &entry.id, &[ProgressUpdate::SetPage(999)])
        .unwrap();
    assert_eq!(updated.current_page, Some(200));
    assert_eq!(updated.progress_percentage, 100);
}

#[test]
fn progress_other_user_cannot_touch() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let progress = ProgressService::new(db.clone());

    let entry = progress
        .add_book("u1", book("b1", None), ReadingStatus::InProgress)
        .unwrap();

    assert!(
        progress
            .update(
                "u2",
                &entry.id,
                &[ProgressUpdate::SetStatus(ReadingStatus::Completed)]
            )
            .is_err()
    );
    assert!(progress.remove("u2", &entry.id).is_err());

    // Owner can.
    progress.remove("u1", &entry.id).unwrap();
    assert!(progress.status_of("u1", "b1").unwrap().is_none());
}

#[test]
fn progress_statistics_reflect_completions() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let progress = ProgressService::new(db.clone());

    for id in ["b1", "b2"] {
        let entry = progress
            .add_book("u1", book(id, Some(100)), ReadingStatus::InProgress)
            .unwrap();
        progress
            .update(
                "u1",
                &entry.id,
                &[ProgressUpdate::SetStatus(ReadingStatus::Completed)],
            )
            .unwrap();
    }
    progress
        .add_book("u1", book("b3", Some(100)), ReadingStatus::InProgress)
        .unwrap();

    let stats = progress.statistics("u1").unwrap();
    assert_eq!(stats.total_books_read, 2);
    assert_eq!(stats.total_pages_read, 200);
    assert_eq!(stats.books_in_progress, 1);
    // Both finished today.
    assert_eq!(stats.current_streak_days, 1);
    assert_eq!(stats.favorite_genres[0].genre, "Fiction");
    assert_eq!(stats.last_completed_books.len(), 2);
}

// ============================================================================
// READING GOALS
// ============================================================================

#[test]
fn goal_set_and_replace() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let progress = ProgressService::new(db.clone());

    let goal = progress.set_goal("u1", 2024, 12, 0).unwrap();
    assert_eq!(goal.goal_books, 12);

    // Setting again for the same year replaces the targets.
    let replaced = progress.set_goal("u1", 2024, 24, 5000).unwrap();
    assert_eq!(replaced.id, goal.id);
    assert_eq!(replaced.goal_books, 24);
    assert_eq!(replaced.goal_pages, 5000);

    assert!(progress.set_goal("u1", 2024, 0, 0).is_err());
}

#[test]
fn goal_credited_on_completion() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let progress = ProgressService::new(db.clone());

    let year = chrono::Datelike::year(&chrono::Utc::now());
    progress.set_goal("u1", year, 12, 0).unwrap();

    let entry = progress
        .add_book("u1", book("b1", Some(250)), ReadingStatus::InProgress)
        .unwrap();
    progress
        .update(
            "u1",
            &entry.id,
            &[ProgressUpdate::SetStatus(ReadingStatus::Completed)],
        )
        .unwrap();

    let goal = progress.goal("u1", year).unwrap().unwrap();
    assert_eq!(goal.books_read, 1);
    assert_eq!(goal.pages_read, 250);

    // Completing an already-completed book does not double count.
    progress
        .update(
            "u1",
            &entry.id,
            &[ProgressUpdate::SetStatus(ReadingStatus::Completed)],
        )
        .unwrap();
    let goal = progress.goal("u1", year).unwrap().unwrap();
    assert_eq!(goal.books_read, 1);
}

#[test]
fn goal_update_checks_ownership() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let progress = ProgressService::new(db.clone());

    let goal = progress.set_goal("u1", 2024, 12, 0).unwrap();
    assert!(progress.update_goal("u2", &goal.id, 50, 0).is_err());

    let updated = progress.update_goal("u1", &goal.id, 50, 0).unwrap();
    assert_eq!(updated.goal_books, 50);
}

// ============================================================================
// BOOK LISTS
// ============================================================================

#[test]
fn lists_add_remove_contains() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let lists = ListService::new(db.clone());

    lists.add("u1", ListKind::Favorite, book("b1", None)).unwrap();
    assert!(lists.contains("u1", ListKind::Favorite, "b1").unwrap());
    assert!(!lists.contains("u1", ListKind::ReadingList, "b1").unwrap());

    // Same book on the other list is independent.
    lists
        .add("u1", ListKind::ReadingList, book("b1", None))
        .unwrap();
    assert_eq!(lists.list("u1", ListKind::Favorite).unwrap().len(), 1);
    assert_eq!(lists.list("u1", ListKind::ReadingList).unwrap().len(), 1);

    assert!(lists.remove("u1", ListKind::Favorite, "b1").unwrap());
    assert!(!lists.contains("u1", ListKind::Favorite, "b1").unwrap());
    assert!(!lists.remove("u1", ListKind::Favorite, "b1").unwrap());
}

#[test]
fn lists_duplicate_add_is_noop() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let lists = ListService::new(db.clone());
    let social = SocialService::new(db.clone());

    lists.add("u1", ListKind::Favorite, book("b1", None)).unwrap();
    lists.add("u1", ListKind::Favorite, book("b1", None)).unwrap();

    assert_eq!(lists.list("u1", ListKind::Favorite).unwrap().len(), 1);
    // Only one activity entry too.
    let activity = social.activity("u1", None).unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].kind, ActivityKind::Favorite);
}

// ============================================================================
// REVIEWS
// ============================================================================

#[test]
fn reviews_one_per_book() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let reviews = ReviewService::new(db.clone());

    let first = reviews
        .submit("u1", book("b1", None), 4, Some("Good".to_string()))
        .unwrap();
    // Second submission updates in place.
    let second = reviews
        .submit("u1", book("b1", None), 5, Some("Great".to_string()))
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.rating, 5);

    let (all, summary) = reviews.book_reviews("b1").unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(summary.total_reviews, 1);
    assert_eq!(summary.average_rating, 5.0);
}

#[test]
fn reviews_rating_bounds() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let reviews = ReviewService::new(db.clone());

    assert!(reviews.submit("u1", book("b1", None), 0, None).is_err());
    assert!(reviews.submit("u1", book("b1", None), 6, None).is_err());
}

#[test]
fn reviews_summary_across_users() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    create_user(&db, "u3", "carol");
    let reviews = ReviewService::new(db.clone());

    reviews.submit("u1", book("b1", None), 5, None).unwrap();
    reviews.submit("u2", book("b1", None), 4, None).unwrap();
    reviews.submit("u3", book("b1", None), 4, None).unwrap();

    let (all, summary) = reviews.book_reviews("b1").unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(summary.average_rating, 4.3);
    assert_eq!(summary.rating_distribution, [0, 0, 0, 2, 1]);
}

#[test]
fn reviews_delete_checks_ownership() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let reviews = ReviewService::new(db.clone());

    let review = reviews.submit("u1", book("b1", None), 3, None).unwrap();
    assert!(reviews.delete("u2", &review.id).is_err());
    reviews.delete("u1", &review.id).unwrap();

    let (all, _) = reviews.book_reviews("b1").unwrap();
    assert!(all.is_empty());
}

// ============================================================================
// EXCHANGE
// ============================================================================

fn make_offer(exchange: &ExchangeService, user_id: &str, book_id: &str) -> String {
    exchange
        .create_offer(
            user_id,
            book(book_id, None),
            BookCondition::Good,
            ExchangeType::Swap,
            None,
            Some("Warsaw".to_string()),
        )
        .unwrap()
        .id
}

#[test]
fn exchange_offer_lifecycle() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    let exchange = ExchangeService::new(db.clone());

    let offer_id = make_offer(&exchange, "u1", "b1");
    assert_eq!(exchange.offers_for_book("b1").unwrap().len(), 1);

    // Deactivated offers are hidden from book listings but not from the owner.
    exchange.set_offer_active("u1", &offer_id, false).unwrap();
    assert!(exchange.offers_for_book("b1").unwrap().is_empty());
    assert_eq!(exchange.user_offers("u1").unwrap().len(), 1);

    exchange.delete_offer("u1", &offer_id).unwrap();
    assert!(exchange.user_offers("u1").unwrap().is_empty());
}

#[test]
fn exchange_cannot_request_own_or_inactive_offer() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let exchange = ExchangeService::new(db.clone());

    let offer_id = make_offer(&exchange, "u1", "b1");
    assert!(exchange.request_exchange("u1", &offer_id).is_err());

    exchange.set_offer_active("u1", &offer_id, false).unwrap();
    assert!(exchange.request_exchange("u2", &offer_id).is_err());
}

#[test]
fn exchange_duplicate_request_rejected() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let exchange = ExchangeService::new(db.clone());

    let offer_id = make_offer(&exchange, "u1", "b1");
    exchange.request_exchange("u2", &offer_id).unwrap();
    assert!(exchange.request_exchange("u2", &offer_id).is_err());
}

#[test]
fn exchange_transaction_transitions() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let exchange = ExchangeService::new(db.clone());

    let offer_id = make_offer(&exchange, "u1", "b1");
    let tx = exchange.request_exchange("u2", &offer_id).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.transaction_type, ExchangeType::Swap);

    // Only the owner can accept.
    assert!(
        exchange
            .update_transaction_status("u2", &tx.id, TransactionStatus::Accepted)
            .is_err()
    );
    let accepted = exchange
        .update_transaction_status("u1", &tx.id, TransactionStatus::Accepted)
        .unwrap();
    assert_eq!(accepted.status, TransactionStatus::Accepted);

    // Either side can complete an accepted transaction.
    let completed = exchange
        .update_transaction_status("u2", &tx.id, TransactionStatus::Completed)
        .unwrap();
    assert_eq!(completed.status, TransactionStatus::Completed);
    assert!(completed.completed_at.is_some());

    // Completed is terminal.
    assert!(
        exchange
            .update_transaction_status("u1", &tx.id, TransactionStatus::Cancelled)
            .is_err()
    );
}

#[test]
fn exchange_request_notifies_owner() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let exchange = ExchangeService::new(db.clone());
    let social = SocialService::new(db.clone());

    let offer_id = make_offer(&exchange, "u1", "b1");
    exchange.request_exchange("u2", &offer_id).unwrap();

    let notifications = social.notifications("u1", None).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::ExchangeRequest);
    assert_eq!(social.unread_notification_count("u1").unwrap(), 1);
}

#[test]
fn exchange_messages_guarded() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    create_user(&db, "u3", "carol");
    let exchange = ExchangeService::new(db.clone());

    let offer_id = make_offer(&exchange, "u1", "b1");

    let msg = exchange
        .send_message("u2", &offer_id, "u1", "Still available?")
        .unwrap();
    exchange.send_message("u1", &offer_id, "u2", "Yes!").unwrap();

    // Empty bodies and conversations without the owner are rejected.
    assert!(exchange.send_message("u2", &offer_id, "u1", "   ").is_err());
    assert!(exchange.send_message("u2", &offer_id, "u3", "psst").is_err());

    assert_eq!(exchange.offer_messages("u1", &offer_id).unwrap().len(), 2);
    assert!(exchange.offer_messages("u3", &offer_id).is_err());

    // Only the recipient can mark as read.
    assert!(exchange.mark_message_read("u2", &msg.id).is_err());
    assert_eq!(exchange.unread_message_count("u1").unwrap(), 1);
    exchange.mark_message_read("u1", &msg.id).unwrap();
    assert_eq!(exchange.unread_message_count("u1").unwrap(), 0);
}

// ============================================================================
// SOCIAL
// ============================================================================

#[test]
fn social_follow_unfollow() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let social = SocialService::new(db.clone());

    social.follow("u1", "u2").unwrap();
    assert!(social.is_following("u1", "u2").unwrap());
    assert!(!social.is_following("u2", "u1").unwrap());

    let profile = social.profile("u2").unwrap();
    assert_eq!(profile.followers, 1);
    assert_eq!(profile.following, 0);

    assert!(social.unfollow("u1", "u2").unwrap());
    assert!(!social.is_following("u1", "u2").unwrap());
}

#[test]
fn social_follow_guards() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let social = SocialService::new(db.clone());

    assert!(social.follow("u1", "u1").is_err());
    assert!(social.follow("u1", "ghost").is_err());

    social.follow("u1", "u2").unwrap();
    assert!(social.follow("u1", "u2").is_err());
}

#[test]
fn social_follow_notifies_target() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    let social = SocialService::new(db.clone());

    social.follow("u1", "u2").unwrap();

    let notifications = social.notifications("u2", None).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Follow);

    social
        .mark_notification_read("u2", &notifications[0].id)
        .unwrap();
    assert_eq!(social.unread_notification_count("u2").unwrap(), 0);

    // Others cannot mark someone else's notification.
    assert!(social.mark_notification_read("u1", &notifications[0].id).is_err());
}

#[test]
fn social_feed_shows_followed_activity_only() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    create_user(&db, "u3", "carol");
    let social = SocialService::new(db.clone());
    let lists = ListService::new(db.clone());
    let reviews = ReviewService::new(db.clone());

    social.follow("u1", "u2").unwrap();

    lists.add("u2", ListKind::Favorite, book("b1", None)).unwrap();
    reviews.submit("u2", book("b2", None), 5, None).unwrap();
    // Carol is not followed, her activity stays out of the feed.
    lists.add("u3", ListKind::Favorite, book("b3", None)).unwrap();

    let feed = social.feed("u1", None).unwrap();
    assert_eq!(feed.len(), 2);
    assert!(feed.iter().all(|a| a.user_id == "u2"));
}

#[test]
fn social_mark_all_notifications_read() {
    let db = test_db();
    create_user(&db, "u1", "alice");
    create_user(&db, "u2", "bob");
    create_user(&db, "u3", "carol");
    let social = SocialService::new(db.clone());

    social.follow("u2", "u1").unwrap();
    social.follow("u3", "u1").unwrap();
    assert_eq!(social.unread_notification_count("u1").unwrap(), 2);

    assert_eq!(social.mark_all_notifications_read("u1").unwrap(), 2);
    assert_eq!(social.unread_notification_count("u1").unwrap(), 0);
}

// ============================================================================
// DATABASE
// ============================================================================

#[test]
fn db_open_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("bookclub.db");

    let db = Database::open(&path).unwrap();
    create_user(&db, "u1", "alice");
    assert!(db.get_user_by_id("u1").unwrap().is_some());
    assert!(path.exists());
}

#[test]
fn db_session_round_trip() {
    let db = test_db();
    create_user(&db, "u1", "alice");

    let session = crate::db::Session {
        token: "tok".to_string(),
        user_id: "u1".to_string(),
        expires_at: now_timestamp() + 3600,
    };
    db.create_session(&session).unwrap();
    assert!(db.get_session("tok").unwrap().is_some());
    db.delete_session("tok").unwrap();
    assert!(db.get_session("tok").unwrap().is_none());
}

#[test]
fn db_cleanup_expired_sessions() {
    let db = test_db();
    create_user(&db, "u1", "alice");

    let expired = crate::db::Session {
        token: "old".to_string(),
        user_id: "u1".to_string(),
        expires_at: now_timestamp() - 10,
    };
    let live = crate::db::Session {
        token: "new".to_string(),
        user_id: "u1".to_string(),
        expires_at: now_timestamp() + 3600,
    };
    db.create_session(&expired).unwrap();
    db.create_session(&live).unwrap();

    assert_eq!(db.cleanup_expired_sessions().unwrap(), 1);
    assert!(db.get_session("old").unwrap().is_none());
    assert!(db.get_session("new").unwrap().is_some());
}
