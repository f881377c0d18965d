//! Book reviews and rating summaries.

use crate::catalog::BookSummary;
use crate::db::{Activity, ActivityKind, BookReview, Database, now_timestamp};
use crate::error::{AppError, Result};
use serde::Serialize;
use uuid::Uuid;

/// Aggregated rating picture for one book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    /// Mean rating, rounded to one decimal. Zero when unreviewed.
    pub average_rating: f64,
    /// Number of reviews.
    pub total_reviews: u32,
    /// How many reviews gave 1 through 5 stars.
    pub rating_distribution: [u32; 5],
}

/// Compute the rating summary for a set of reviews of one book.
pub fn rating_summary(reviews: &[BookReview]) -> RatingSummary {
    let mut distribution = [0u32; 5];
    let mut sum: u64 = 0;

    for review in reviews {
        let rating = review.rating.clamp(1, 5);
        distribution[rating as usize - 1] += 1;
        sum += rating as u64;
    }

    let total = reviews.len() as u32;
    let average = if total == 0 {
        0.0
    } else {
        (sum as f64 / total as f64 * 10.0).round() / 10.0
    };

    RatingSummary {
        average_rating: average,
        total_reviews: total,
        rating_distribution: distribution,
    }
}

/// Review service.
pub struct ReviewService {
    db: Database,
}

impl ReviewService {
    /// Create a new review service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Submit a review for a book.
    ///
    /// A user has at most one review per book; submitting again updates
    /// the existing one in place.
    pub fn submit(
        &self,
        user_id: &str,
        book: BookSummary,
        rating: u8,
        review_text: Option<String>,
    ) -> Result<BookReview> {
        validate_rating(rating)?;

        if let Some(existing) = self.db.get_review_by_user_book(user_id, &book.id)? {
            return self.update(user_id, &existing.id, rating, review_text);
        }

        let now = now_timestamp();
        let review = BookReview {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            book_id: book.id.clone(),
            rating,
            review_text,
            book,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_review(&review)?;
        self.record_activity(&review);
        Ok(review)
    }

    /// Update an existing review, scoped to its author.
    pub fn update(
        &self,
        user_id: &str,
        review_id: &str,
        rating: u8,
        review_text: Option<String>,
    ) -> Result<BookReview> {
        validate_rating(rating)?;

        let review = self
            .db
            .get_review(review_id)?
            .ok_or_else(|| AppError::NotFound(format!("review {}", review_id)))?;

        if review.user_id != user_id {
            return Err(AppError::Forbidden(
                "review belongs to another user".to_string(),
            ));
        }

        self.db
            .update_review(review_id, user_id, rating, review_text.as_deref())?;
        self.db
            .get_review(review_id)?
            .ok_or_else(|| AppError::Internal("Review vanished during update".to_string()))
    }

    /// Delete a review, scoped to its author.
    pub fn delete(&self, user_id: &str, review_id: &str) -> Result<()> {
        let review = self
            .db
            .get_review(review_id)?
            .ok_or_else(|| AppError::NotFound(format!("review {}", review_id)))?;

        if review.user_id != user_id {
            return Err(AppError::Forbidden(
                "review belongs to another user".to_string(),
            ));
        }

        self.db.delete_review(review_id, user_id)?;
        Ok(())
    }

    /// All reviews for a book plus their rating summary, newest first.
    pub fn book_reviews(&self, book_id: &str) -> Result<(Vec<BookReview>, RatingSummary)> {
        let reviews = self.db.get_book_reviews(book_id)?;
        let summary = rating_summary(&reviews);
        Ok((reviews, summary))
    }

    /// The acting user's review of a book, if any.
    pub fn user_review(&self, user_id: &str, book_id: &str) -> Result<Option<BookReview>> {
        self.db.get_review_by_user_book(user_id, book_id)
    }

    fn record_activity(&self, review: &BookReview) {
        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            user_id: review.user_id.clone(),
            kind: ActivityKind::Review,
            book_id: Some(review.book_id.clone()),
            book: Some(review.book.clone()),
            related_id: Some(review.id.clone()),
            created_at: review.created_at,
        };

        if let Err(e) = self.db.insert_activity(&activity) {
            tracing::warn!(error = %e, "Failed to record review activity");
        }
    }
}

fn validate_rating(rating: u8) -> Result<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: u8) -> BookReview {
        BookReview {
            id: Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            book_id: "b1".to_string(),
            rating,
            review_text: None,
            book: BookSummary {
                id: "b1".to_string(),
                title: "Book".to_string(),
                authors: vec![],
                description: None,
                published_date: None,
                page_count: None,
                categories: vec![],
                image_links: None,
                language: None,
                average_rating: None,
                publisher: None,
            },
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn empty_summary_is_zeroed() {
        let summary = rating_summary(&[]);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.rating_distribution, [0; 5]);
    }

    #[test]
    fn summary_average_rounds_to_one_decimal() {
        let reviews = vec![review(5), review(4), review(4)];
        let summary = rating_summary(&reviews);
        assert_eq!(summary.average_rating, 4.3);
        assert_eq!(summary.total_reviews, 3);
        assert_eq!(summary.rating_distribution, [0, 0, 0, 2, 1]);
    }
}
