//! HTTP request handlers.

use crate::catalog::SearchResults;
use crate::db::{
    self, Activity, BookCondition, BookListEntry, BookReview, ExchangeMessage, ExchangeOffer,
    ExchangeTransaction, ExchangeType, ListKind, Notification, ReadingGoal, ReadingProgress,
    ReadingStatus, TransactionStatus, User,
};
use crate::error::{AppError, Result};
use crate::progress::ProgressUpdate;
use crate::reviews::RatingSummary;
use crate::server::AppState;
use crate::social::UserProfile;
use crate::stats::ReadingStatistics;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::Html,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

// ============================================================================
// WEB PAGES
// ============================================================================

/// Index page (simple HTML).
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; max-width: 600px; margin: 2rem auto; padding: 0 1rem; }}
        h1 {{ color: #333; }}
        a {{ color: #0066cc; }}
        code {{ background: #e8e8e8; padding: 0.2rem 0.4rem; border-radius: 4px; }}
    </style>
</head>
<body>
    <h1>📚 {title}</h1>
    <p>Book discovery and social reading server.</p>
    <h2>API</h2>
    <ul>
        <li><code>POST /api/auth/register</code></li>
        <li><code>POST /api/auth/login</code></li>
        <li><code>GET /api/books/search?q=...</code></li>
        <li><code>GET /api/progress/stats</code></li>
    </ul>
</body>
</html>"#,
        title = state.config.server.title,
    );

    Html(html)
}

// ============================================================================
// AUTH API
// ============================================================================

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
    user_id: String,
    username: String,
    role: String,
}

/// Register request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    username: String,
    password: String,
}

/// Auth login.
pub async fn auth_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (user, token) = state.auth.login(&req.username, &req.password)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

/// Auth register.
pub async fn auth_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>> {
    let _user = state.auth.register(&req.username, &req.password)?;
    let (user, token) = state.auth.login(&req.username, &req.password)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

/// Auth logout.
pub async fn auth_logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    if let Some(token) = extract_token(&headers) {
        state.auth.logout(&token)?;
    }
    Ok(StatusCode::OK)
}

/// Get current user info.
pub async fn auth_me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(user))
}

/// Profile update request.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    display_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
}

/// Update the current user's profile.
pub async fn auth_update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<User>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let updated = state
        .auth
        .update_profile(&user.id, req.display_name, req.bio, req.avatar_url)?;
    Ok(Json(updated))
}

/// Delete the current user's account.
pub async fn auth_delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.auth.delete_account(&user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// BOOK CATALOG API
// ============================================================================

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
    max_results: Option<u32>,
    start_index: Option<u32>,
    lang: Option<String>,
}

/// Search the book catalog.
pub async fn books_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>> {
    let max_results = params
        .max_results
        .unwrap_or(state.config.catalog.max_results)
        .min(40);

    let results = state
        .catalog
        .search(
            &params.q,
            max_results,
            params.start_index.unwrap_or(0),
            params.lang.as_deref(),
        )
        .await?;

    Ok(Json(results))
}

/// Fetch one book from the catalog.
pub async fn books_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<crate::catalog::BookSummary>> {
    let book = state.catalog.get_book(&id).await?;
    Ok(Json(book))
}

// ============================================================================
// BOOK LIST API
// ============================================================================

fn parse_list_kind(kind: &str) -> Result<ListKind> {
    ListKind::parse(kind)
        .ok_or_else(|| AppError::Validation(format!("Unknown list kind '{}'", kind)))
}

/// List add request.
#[derive(Debug, Deserialize)]
pub struct ListAddRequest {
    book_id: String,
}

/// Get one of the current user's lists.
pub async fn lists_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(kind): Path<String>,
) -> Result<Json<Vec<BookListEntry>>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let kind = parse_list_kind(&kind)?;
    Ok(Json(state.lists.list(&user.id, kind)?))
}

/// Add a book to one of the current user's lists.
pub async fn lists_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    Json(req): Json<ListAddRequest>,
) -> Result<Json<BookListEntry>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let kind = parse_list_kind(&kind)?;
    let book = state.catalog.get_book(&req.book_id).await?;
    Ok(Json(state.lists.add(&user.id, kind, book)?))
}

/// Membership response.
#[derive(Debug, Serialize)]
pub struct ContainsResponse {
    contains: bool,
}

/// Check whether a book is on one of the current user's lists.
pub async fn lists_contains(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((kind, book_id)): Path<(String, String)>,
) -> Result<Json<ContainsResponse>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let kind = parse_list_kind(&kind)?;
    Ok(Json(ContainsResponse {
        contains: state.lists.contains(&user.id, kind, &book_id)?,
    }))
}

/// Remove a book from one of the current user's lists.
pub async fn lists_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((kind, book_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    let kind = parse_list_kind(&kind)?;
    state.lists.remove(&user.id, kind, &book_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// REVIEW API
// ============================================================================

/// Review submit request.
#[derive(Debug, Deserialize)]
pub struct ReviewSubmitRequest {
    book_id: String,
    rating: u8,
    review_text: Option<String>,
}

/// Review update request.
#[derive(Debug, Deserialize)]
pub struct ReviewUpdateRequest {
    rating: u8,
    review_text: Option<String>,
}

/// Reviews for one book plus their rating summary.
#[derive(Debug, Serialize)]
pub struct BookReviewsResponse {
    reviews: Vec<BookReview>,
    summary: RatingSummary,
}

/// All reviews for a book.
pub async fn reviews_for_book(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> Result<Json<BookReviewsResponse>> {
    let (reviews, summary) = state.reviews.book_reviews(&book_id)?;
    Ok(Json(BookReviewsResponse { reviews, summary }))
}

/// Submit a review.
pub async fn reviews_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReviewSubmitRequest>,
) -> Result<Json<BookReview>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let book = state.catalog.get_book(&req.book_id).await?;
    let review = state
        .reviews
        .submit(&user.id, book, req.rating, req.review_text)?;
    Ok(Json(review))
}

/// Update a review.
pub async fn reviews_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ReviewUpdateRequest>,
) -> Result<Json<BookReview>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let review = state
        .reviews
        .update(&user.id, &id, req.rating, req.review_text)?;
    Ok(Json(review))
}

/// Delete a review.
pub async fn reviews_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.reviews.delete(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// READING PROGRESS API
// ============================================================================

/// Progress add request.
#[derive(Debug, Deserialize)]
pub struct ProgressAddRequest {
    book_id: String,
    status: Option<ReadingStatus>,
}

/// Progress update request. Absent fields are left unchanged; an empty
/// notes string clears the notes.
#[derive(Debug, Deserialize)]
pub struct ProgressUpdateRequest {
    status: Option<ReadingStatus>,
    progress_percentage: Option<u8>,
    current_page: Option<u32>,
    notes: Option<String>,
}

impl ProgressUpdateRequest {
    fn into_updates(self) -> Vec<ProgressUpdate> {
        let mut updates = Vec::new();
        if let Some(status) = self.status {
            updates.push(ProgressUpdate::SetStatus(status));
        }
        if let Some(pct) = self.progress_percentage {
            updates.push(ProgressUpdate::SetPercentage(pct));
        }
        if let Some(page) = self.current_page {
            updates.push(ProgressUpdate::SetPage(page));
        }
        if let Some(notes) = self.notes {
            let notes = (!notes.is_empty()).then_some(notes);
            updates.push(ProgressUpdate::SetNotes(notes));
        }
        updates
    }
}

/// All of the current user's progress entries.
pub async fn progress_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ReadingProgress>>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.progress.list(&user.id)?))
}

/// Start tracking a book.
pub async fn progress_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProgressAddRequest>,
) -> Result<Json<ReadingProgress>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let book = state.catalog.get_book(&req.book_id).await?;
    let status = req.status.unwrap_or(ReadingStatus::NotStarted);
    Ok(Json(state.progress.add_book(&user.id, book, status)?))
}

/// Update a progress entry.
pub async fn progress_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ProgressUpdateRequest>,
) -> Result<Json<ReadingProgress>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let updates = req.into_updates();
    Ok(Json(state.progress.update(&user.id, &id, &updates)?))
}

/// Stop tracking a book.
pub async fn progress_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.progress.remove(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reading status of a book for the current user.
pub async fn progress_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
) -> Result<Json<Option<ReadingProgress>>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.progress.status_of(&user.id, &book_id)?))
}

/// Reading statistics of the current user.
pub async fn progress_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReadingStatistics>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.progress.statistics(&user.id)?))
}

// ============================================================================
// READING GOAL API
// ============================================================================

/// Goal query parameters.
#[derive(Debug, Deserialize)]
pub struct GoalParams {
    year: Option<i32>,
}

/// Goal set request.
#[derive(Debug, Deserialize)]
pub struct GoalSetRequest {
    year: Option<i32>,
    goal_books: i64,
    #[serde(default)]
    goal_pages: i64,
}

/// Goal update request.
#[derive(Debug, Deserialize)]
pub struct GoalUpdateRequest {
    goal_books: i64,
    #[serde(default)]
    goal_pages: i64,
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Get the current user's goal for a year.
pub async fn goals_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<GoalParams>,
) -> Result<Json<Option<ReadingGoal>>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let year = params.year.unwrap_or_else(current_year);
    Ok(Json(state.progress.goal(&user.id, year)?))
}

/// Create or replace the current user's yearly goal.
pub async fn goals_set(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GoalSetRequest>,
) -> Result<Json<ReadingGoal>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let year = req.year.unwrap_or_else(current_year);
    Ok(Json(state.progress.set_goal(
        &user.id,
        year,
        req.goal_books,
        req.goal_pages,
    )?))
}

/// Update an existing goal's targets.
pub async fn goals_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<GoalUpdateRequest>,
) -> Result<Json<ReadingGoal>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.progress.update_goal(
        &user.id,
        &id,
        req.goal_books,
        req.goal_pages,
    )?))
}

// ============================================================================
// EXCHANGE API
// ============================================================================

/// Offer create request.
#[derive(Debug, Deserialize)]
pub struct OfferCreateRequest {
    book_id: String,
    condition: BookCondition,
    exchange_type: ExchangeType,
    description: Option<String>,
    location: Option<String>,
}

/// Offer update request.
#[derive(Debug, Deserialize)]
pub struct OfferUpdateRequest {
    condition: BookCondition,
    exchange_type: ExchangeType,
    description: Option<String>,
    location: Option<String>,
}

/// Offer visibility request.
#[derive(Debug, Deserialize)]
pub struct OfferActiveRequest {
    active: bool,
}

/// Publish an exchange offer.
pub async fn exchange_create_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<OfferCreateRequest>,
) -> Result<Json<ExchangeOffer>> {
    let user = get_authenticated_user(&state, &headers).await?;
    let book = state.catalog.get_book(&req.book_id).await?;
    Ok(Json(state.exchange.create_offer(
        &user.id,
        book,
        req.condition,
        req.exchange_type,
        req.description,
        req.location,
    )?))
}

/// The current user's own offers.
pub async fn exchange_my_offers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ExchangeOffer>>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.exchange.user_offers(&user.id)?))
}

/// Active offers for a book.
pub async fn exchange_book_offers(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> Result<Json<Vec<ExchangeOffer>>> {
    Ok(Json(state.exchange.offers_for_book(&book_id)?))
}

/// Get one offer.
pub async fn exchange_get_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExchangeOffer>> {
    Ok(Json(state.exchange.offer(&id)?))
}

/// Update an offer.
pub async fn exchange_update_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<OfferUpdateRequest>,
) -> Result<Json<ExchangeOffer>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.exchange.update_offer(
        &user.id,
        &id,
        req.condition,
        req.exchange_type,
        req.description,
        req.location,
    )?))
}

/// Delete an offer.
pub async fn exchange_delete_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.exchange.delete_offer(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Hide or re-publish an offer.
pub async fn exchange_set_active(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<OfferActiveRequest>,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.exchange.set_offer_active(&user.id, &id, req.active)?;
    Ok(StatusCode::OK)
}

/// Message send request.
#[derive(Debug, Deserialize)]
pub struct MessageSendRequest {
    recipient_id: String,
    message: String,
}

/// Conversation on an offer.
pub async fn exchange_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<ExchangeMessage>>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.exchange.offer_messages(&user.id, &id)?))
}

/// Send a message about an offer.
pub async fn exchange_send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<MessageSendRequest>,
) -> Result<Json<ExchangeMessage>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.exchange.send_message(
        &user.id,
        &id,
        &req.recipient_id,
        &req.message,
    )?))
}

/// Unread count response.
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    unread: i64,
}

/// Count the current user's unread exchange messages.
pub async fn exchange_unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UnreadCountResponse>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(UnreadCountResponse {
        unread: state.exchange.unread_message_count(&user.id)?,
    }))
}

/// Mark an exchange message as read.
pub async fn exchange_mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.exchange.mark_message_read(&user.id, &id)?;
    Ok(StatusCode::OK)
}

/// Exchange request body.
#[derive(Debug, Deserialize)]
pub struct ExchangeRequestBody {
    offer_id: String,
}

/// Transaction status request.
#[derive(Debug, Deserialize)]
pub struct TransactionStatusRequest {
    status: TransactionStatus,
}

/// The current user's transactions.
pub async fn exchange_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ExchangeTransaction>>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.exchange.user_transactions(&user.id)?))
}

/// Request an exchange on an offer.
pub async fn exchange_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ExchangeRequestBody>,
) -> Result<Json<ExchangeTransaction>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.exchange.request_exchange(&user.id, &req.offer_id)?))
}

/// Move a transaction to a new status.
pub async fn exchange_update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<TransactionStatusRequest>,
) -> Result<Json<ExchangeTransaction>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.exchange.update_transaction_status(
        &user.id, &id, req.status,
    )?))
}

// ============================================================================
// SOCIAL API
// ============================================================================

/// Feed query parameters.
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    limit: Option<u32>,
}

/// Public profile of a user.
pub async fn social_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.social.profile(&id)?))
}

/// Followers of a user.
pub async fn social_followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.social.followers(&id)?))
}

/// Users a user follows.
pub async fn social_following(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.social.following(&id)?))
}

/// Follow check response.
#[derive(Debug, Serialize)]
pub struct FollowingResponse {
    following: bool,
}

/// Whether the current user follows another user.
pub async fn social_is_following(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<FollowingResponse>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(FollowingResponse {
        following: state.social.is_following(&user.id, &id)?,
    }))
}

/// Follow another user.
pub async fn social_follow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.social.follow(&user.id, &id)?;
    Ok(StatusCode::CREATED)
}

/// Stop following another user.
pub async fn social_unfollow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.social.unfollow(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// A user's recent activity.
pub async fn social_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<Activity>>> {
    Ok(Json(state.social.activity(&id, params.limit)?))
}

/// The current user's feed: activity of everyone they follow.
pub async fn social_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<Activity>>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.social.feed(&user.id, params.limit)?))
}

/// The current user's notifications.
pub async fn social_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<Notification>>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(state.social.notifications(&user.id, params.limit)?))
}

/// Count the current user's unread notifications.
pub async fn social_unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UnreadCountResponse>> {
    let user = get_authenticated_user(&state, &headers).await?;
    Ok(Json(UnreadCountResponse {
        unread: state.social.unread_notification_count(&user.id)?,
    }))
}

/// Mark all notifications as read.
pub async fn social_mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.social.mark_all_notifications_read(&user.id)?;
    Ok(StatusCode::OK)
}

/// Mark one notification as read.
pub async fn social_mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = get_authenticated_user(&state, &headers).await?;
    state.social.mark_notification_read(&user.id, &id)?;
    Ok(StatusCode::OK)
}

// ============================================================================
// HELPERS
// ============================================================================

/// Extract bearer token from headers.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Get authenticated user from token.
async fn get_authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<db::User> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    state
        .auth
        .validate_token(&token)?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
}
