//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth_login))
        .route("/register", post(handlers::auth_register))
        .route("/logout", post(handlers::auth_logout))
        .route("/me", get(handlers::auth_me))
        .route("/me", put(handlers::auth_update_profile))
        .route("/me", delete(handlers::auth_delete_account));

    let book_routes = Router::new()
        .route("/search", get(handlers::books_search))
        .route("/{id}", get(handlers::books_get));

    let list_routes = Router::new()
        .route("/{kind}", get(handlers::lists_get))
        .route("/{kind}", post(handlers::lists_add))
        .route("/{kind}/{book_id}", get(handlers::lists_contains))
        .route("/{kind}/{book_id}", delete(handlers::lists_remove));

    let review_routes = Router::new()
        .route("/book/{book_id}", get(handlers::reviews_for_book))
        .route("/", post(handlers::reviews_submit))
        .route("/{id}", put(handlers::reviews_update))
        .route("/{id}", delete(handlers::reviews_delete));

    let progress_routes = Router::new()
        .route("/", get(handlers::progress_list))
        .route("/", post(handlers::progress_add))
        .route("/{id}", put(handlers::progress_update))
        .route("/{id}", delete(handlers::progress_remove))
        .route("/status/{book_id}", get(handlers::progress_status))
        .route("/stats", get(handlers::progress_stats));

    let goal_routes = Router::new()
        .route("/", get(handlers::goals_get))
        .route("/", post(handlers::goals_set))
        .route("/{id}", put(handlers::goals_update));

    let exchange_routes = Router::new()
        .route("/offers", post(handlers::exchange_create_offer))
        .route("/offers/mine", get(handlers::exchange_my_offers))
        .route("/offers/book/{book_id}", get(handlers::exchange_book_offers))
        .route("/offers/{id}", get(handlers::exchange_get_offer))
        .route("/offers/{id}", put(handlers::exchange_update_offer))
        .route("/offers/{id}", delete(handlers::exchange_delete_offer))
        .route("/offers/{id}/active", put(handlers::exchange_set_active))
        .route("/offers/{id}/messages", get(handlers::exchange_messages))
        .route("/offers/{id}/messages", post(handlers::exchange_send_message))
        .route(
            "/messages/unread-count",
            get(handlers::exchange_unread_count),
        )
        .route("/messages/{id}/read", put(handlers::exchange_mark_read))
        .route("/transactions", get(handlers::exchange_transactions))
        .route("/transactions", post(handlers::exchange_request))
        .route(
            "/transactions/{id}/status",
            put(handlers::exchange_update_status),
        );

    let social_routes = Router::new()
        .route("/users/{id}", get(handlers::social_profile))
        .route("/users/{id}/followers", get(handlers::social_followers))
        .route("/users/{id}/following", get(handlers::social_following))
        .route("/users/{id}/follow", get(handlers::social_is_following))
        .route("/users/{id}/follow", post(handlers::social_follow))
        .route("/users/{id}/follow", delete(handlers::social_unfollow))
        .route("/users/{id}/activity", get(handlers::social_activity))
        .route("/feed", get(handlers::social_feed))
        .route("/notifications", get(handlers::social_notifications))
        .route(
            "/notifications/unread-count",
            get(handlers::social_unread_count),
        )
        .route(
            "/notifications/read-all",
            put(handlers::social_mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::social_mark_read),
        );

    Router::new()
        .route("/", get(handlers::index))
        .nest("/api/auth", auth_routes)
        .nest("/api/books", book_routes)
        .nest("/api/lists", list_routes)
        .nest("/api/reviews", review_routes)
        .nest("/api/progress", progress_routes)
        .nest("/api/goals", goal_routes)
        .nest("/api/exchange", exchange_routes)
        .nest("/api/social", social_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
