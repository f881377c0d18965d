//! Reading statistics aggregation.
//!
//! All aggregates are computed from the user's progress entries in one
//! pass over an in-memory slice, so the numbers always agree with each
//! other and with what the progress endpoints return.

use crate::db::{ReadingProgress, ReadingStatus, timestamp_to_datetime};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// How often a genre appears among completed books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreCount {
    /// Genre name as the catalog reports it.
    pub genre: String,
    /// Number of completed books carrying it.
    pub count: u32,
}

/// Books completed in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    /// Month in `YYYY-MM` form.
    pub month: String,
    /// Books completed that month.
    pub count: u32,
}

/// Aggregated reading statistics for one user.
#[derive(Debug, Clone, Serialize)]
pub struct ReadingStatistics {
    /// Completed books.
    pub total_books_read: u32,
    /// Pages across completed books with a known page count.
    pub total_pages_read: u64,
    /// Abandoned books.
    pub total_books_abandoned: u32,
    /// Books currently in progress.
    pub books_in_progress: u32,
    /// Average days from start to finish, rounded to whole days, over
    /// completed books with both dates. Zero when no such book exists.
    pub average_completion_days: f64,
    /// Consecutive days with a completion, ending today or yesterday.
    pub current_streak_days: u32,
    /// Longest run of consecutive completion days ever.
    pub longest_streak_days: u32,
    /// Genres among completed books, most frequent first.
    pub favorite_genres: Vec<GenreCount>,
    /// Completions per calendar month, oldest first.
    pub reading_by_month: Vec<MonthlyCount>,
    /// The five most recently completed books.
    pub last_completed_books: Vec<ReadingProgress>,
}

/// Number of recently completed books reported.
const LAST_COMPLETED_LIMIT: usize = 5;

/// Compute statistics from a user's progress entries.
///
/// `today` anchors the current-streak check; a streak only counts as
/// current if its last completion day is today or yesterday.
pub fn compute(records: &[ReadingProgress], today: NaiveDate) -> ReadingStatistics {
    let mut completed: Vec<&ReadingProgress> = records
        .iter()
        .filter(|r| r.status == ReadingStatus::Completed)
        .collect();

    // Completion order drives streaks, months and the recent list.
    // Entries without a finish date sort first so they never displace
    // dated ones at the recent end.
    completed.sort_by_key(|r| r.finished_at.unwrap_or(i64::MIN));

    let total_books_read = completed.len() as u32;
    let total_pages_read = completed
        .iter()
        .filter_map(|r| r.book.page_count)
        .map(u64::from)
        .sum();

    let total_books_abandoned = records
        .iter()
        .filter(|r| r.status == ReadingStatus::Abandoned)
        .count() as u32;
    let books_in_progress = records
        .iter()
        .filter(|r| r.status == ReadingStatus::InProgress)
        .count() as u32;

    let average_completion_days = average_completion_days(&completed);
    let (current_streak_days, longest_streak_days) = streaks(&completed, today);
    let favorite_genres = favorite_genres(&completed);
    let reading_by_month = reading_by_month(&completed);

    let last_completed_books = completed
        .iter()
        .rev()
        .filter(|r| r.finished_at.is_some())
        .take(LAST_COMPLETED_LIMIT)
        .map(|r| (*r).clone())
        .collect();

    ReadingStatistics {
        total_books_read,
        total_pages_read,
        total_books_abandoned,
        books_in_progress,
        average_completion_days,
        current_streak_days,
        longest_streak_days,
        favorite_genres,
        reading_by_month,
        last_completed_books,
    }
}

fn average_completion_days(completed: &[&ReadingProgress]) -> f64 {
    let durations: Vec<i64> = completed
        .iter()
        .filter_map(|r| match (r.started_at, r.finished_at) {
            (Some(start), Some(end)) if end >= start => Some(((end - start) as u64).div_ceil(86_400) as i64),
            _ => None,
        })
        .collect();

    if durations.is_empty() {
        return 0.0;
    }

    let avg = durations.iter().sum::<i64>() as f64 / durations.len() as f64;
    avg.round()
}

/// Current and longest streaks of consecutive completion days.
///
/// Works on distinct calendar days: finishing two books on the same day
/// extends no streak, and a one-day gap breaks it.
fn streaks(completed: &[&ReadingProgress], today: NaiveDate) -> (u32, u32) {
    let days: Vec<NaiveDate> = completed
        .iter()
        .filter_map(|r| r.finished_at)
        .map(|ts| timestamp_to_datetime(ts).date_naive())
        .collect();

    let Some((&first, rest)) = days.split_first() else {
        return (0, 0);
    };

    let mut current: u32 = 1;
    let mut longest: u32 = 1;
    let mut prev = first;

    for &day in rest {
        let gap = (day - prev).num_days();
        if gap == 1 {
            current += 1;
        } else if gap != 0 {
            current = 1;
        }
        longest = longest.max(current);
        prev = day;
    }

    // The run only counts as current if it reaches into today.
    let reaches_today = (today - prev).num_days() <= 1;
    (if reaches_today { current } else { 0 }, longest)
}

fn favorite_genres(completed: &[&ReadingProgress]) -> Vec<GenreCount> {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for record in completed {
        for genre in &record.book.categories {
            *counts.entry(genre.as_str()).or_default() += 1;
        }
    }

    let mut genres: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre: genre.to_string(),
            count,
        })
        .collect();

    // Ties resolve alphabetically, which the BTreeMap ordering already
    // guarantees under a stable sort.
    genres.sort_by(|a, b| b.count.cmp(&a.count));
    genres
}

fn reading_by_month(completed: &[&ReadingProgress]) -> Vec<MonthlyCount> {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for record in completed {
        if let Some(ts) = record.finished_at {
            let date = timestamp_to_datetime(ts).date_naive();
            let key = format!("{:04}-{:02}", date.year(), date.month());
            *counts.entry(key).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}

/// Page reached for a given percentage, when the page count is known.
pub fn page_for_percentage(percentage: u8, page_count: u32) -> u32 {
    if page_count == 0 {
        return 0;
    }
    let page = (percentage.min(100) as f64 / 100.0 * page_count as f64).round() as u32;
    page.min(page_count)
}

/// Percentage corresponding to a page, when the page count is known.
pub fn percentage_for_page(page: u32, page_count: u32) -> u8 {
    if page_count == 0 {
        return 0;
    }
    let pct = (page.min(page_count) as f64 / page_count as f64 * 100.0).round() as u8;
    pct.min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BookSummary;
    use crate::db::now_timestamp;

    const DAY: i64 = 86_400;

    fn book(id: &str, pages: Option<u32>, categories: &[&str]) -> BookSummary {
        BookSummary {
            id: id.to_string(),
            title: format!("Book {}", id),
            authors: vec!["Author".to_string()],
            description: None,
            published_date: None,
            page_count: pages,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            image_links: None,
            language: None,
            average_rating: None,
            publisher: None,
        }
    }

    fn completed(id: &str, pages: Option<u32>, categories: &[&str], finished_at: i64) -> ReadingProgress {
        ReadingProgress {
            id: id.to_string(),
            user_id: "u1".to_string(),
            book_id: id.to_string(),
            book: book(id, pages, categories),
            status: ReadingStatus::Completed,
            progress_percentage: 100,
            current_page: pages,
            started_at: Some(finished_at - 3 * DAY),
            finished_at: Some(finished_at),
            notes: None,
            created_at: finished_at - 3 * DAY,
            updated_at: finished_at,
        }
    }

    fn with_status(mut record: ReadingProgress, status: ReadingStatus) -> ReadingProgress {
        record.status = status;
        record.progress_percentage = 40;
        record.finished_at = None;
        record
    }

    fn day(ts: i64) -> NaiveDate {
        timestamp_to_datetime(ts).date_naive()
    }

    #[test]
    fn empty_input_yields_zeroed_stats() {
        let stats = compute(&[], day(now_timestamp()));
        assert_eq!(stats.total_books_read, 0);
        assert_eq!(stats.total_pages_read, 0);
        assert_eq!(stats.current_streak_days, 0);
        assert_eq!(stats.longest_streak_days, 0);
        assert_eq!(stats.average_completion_days, 0.0);
        assert!(stats.favorite_genres.is_empty());
        assert!(stats.reading_by_month.is_empty());
        assert!(stats.last_completed_books.is_empty());
    }

    #[test]
    fn counts_by_status() {
        let base = 1_700_000_000;
        let records = vec![
            completed("a", Some(200), &[], base),
            completed("b", Some(300), &[], base + DAY),
            completed("c", None, &[], base + 2 * DAY),
            with_status(completed("d", Some(100), &[], base), ReadingStatus::InProgress),
            with_status(completed("e", Some(100), &[], base), ReadingStatus::Abandoned),
        ];

        let stats = compute(&records, day(base + 2 * DAY));
        assert_eq!(stats.total_books_read, 3);
        // Unknown page counts contribute nothing.
        assert_eq!(stats.total_pages_read, 500);
        assert_eq!(stats.books_in_progress, 1);
        assert_eq!(stats.total_books_abandoned, 1);
    }

    #[test]
    fn streak_over_consecutive_days() {
        let base = 1_700_000_000;
        let records = vec![
            completed("a", None, &[], base),
            completed("b", None, &[], base + DAY),
            completed("c", None, &[], base + 2 * DAY),
        ];

        let stats = compute(&records, day(base + 2 * DAY));
        assert_eq!(stats.current_streak_days, 3);
        assert_eq!(stats.longest_streak_days, 3);
    }

    #[test]
    fn same_day_completions_count_once() {
        let base = 1_700_000_000;
        let records = vec![
            completed("a", None, &[], base),
            completed("b", None, &[], base + 3600),
            completed("c", None, &[], base + DAY),
        ];

        let stats = compute(&records, day(base + DAY));
        assert_eq!(stats.current_streak_days, 2);
        assert_eq!(stats.longest_streak_days, 2);
    }

    #[test]
    fn gap_breaks_streak_but_longest_survives() {
        let base = 1_700_000_000;
        let records = vec![
            completed("a", None, &[], base),
            completed("b", None, &[], base + DAY),
            completed("c", None, &[], base + 2 * DAY),
            // Two-day gap.
            completed("d", None, &[], base + 5 * DAY),
        ];

        let stats = compute(&records, day(base + 5 * DAY));
        assert_eq!(stats.current_streak_days, 1);
        assert_eq!(stats.longest_streak_days, 3);
    }

    #[test]
    fn stale_streak_reports_zero_current() {
        let base = 1_700_000_000;
        let records = vec![
            completed("a", None, &[], base),
            completed("b", None, &[], base + DAY),
        ];

        // Last completion was a week ago.
        let stats = compute(&records, day(base + 8 * DAY));
        assert_eq!(stats.current_streak_days, 0);
        assert_eq!(stats.longest_streak_days, 2);
    }

    #[test]
    fn streak_ending_yesterday_still_counts() {
        let base = 1_700_000_000;
        let records = vec![
            completed("a", None, &[], base),
            completed("b", None, &[], base + DAY),
        ];

        let stats = compute(&records, day(base + 2 * DAY));
        assert_eq!(stats.current_streak_days, 2);
    }

    #[test]
    fn unsorted_input_is_sorted_before_folding() {
        let base = 1_700_000_000;
        // Deliberately out of order.
        let records = vec![
            completed("c", None, &[], base + 2 * DAY),
            completed("a", None, &[], base),
            completed("b", None, &[], base + DAY),
        ];

        let stats = compute(&records, day(base + 2 * DAY));
        assert_eq!(stats.current_streak_days, 3);
        assert_eq!(stats.longest_streak_days, 3);
    }

    #[test]
    fn average_completion_days_ignores_missing_dates() {
        let base = 1_700_000_000;
        let mut quick = completed("a", None, &[], base);
        quick.started_at = Some(base - 2 * DAY);

        let mut slow = completed("b", None, &[], base + DAY);
        slow.started_at = Some(base + DAY - 4 * DAY);

        let mut undated = completed("c", None, &[], base + 2 * DAY);
        undated.started_at = None;

        let stats = compute(&[quick, slow, undated], day(base + 2 * DAY));
        assert_eq!(stats.average_completion_days, 3.0);
    }

    #[test]
    fn average_completion_days_mixed_durations() {
        let base = 1_700_000_000;
        let mut three_days = completed("a", None, &[], base + 3 * DAY);
        three_days.started_at = Some(base);

        let mut seven_days = completed("b", None, &[], base + 7 * DAY);
        seven_days.started_at = Some(base);

        let stats = compute(&[three_days, seven_days], day(base + 7 * DAY));
        assert_eq!(stats.average_completion_days, 5.0);
    }

    #[test]
    fn average_completion_days_rounds_to_whole_days() {
        let base = 1_700_000_000;
        let mut three_days = completed("a", None, &[], base + 3 * DAY);
        three_days.started_at = Some(base);

        let mut four_days = completed("b", None, &[], base + 4 * DAY);
        four_days.started_at = Some(base);

        // Mean of 3 and 4 days reports as 4, not 3.5.
        let stats = compute(&[three_days, four_days], day(base + 4 * DAY));
        assert_eq!(stats.average_completion_days, 4.0);
    }

    #[test]
    fn favorite_genres_order_and_tiebreak() {
        let base = 1_700_000_000;
        let records = vec![
            completed("a", None, &["Fantasy", "Adventure"], base),
            completed("b", None, &["Fantasy"], base + DAY),
            completed("c", None, &["Sci-Fi"], base + 2 * DAY),
        ];

        let stats = compute(&records, day(base + 2 * DAY));
        let genres: Vec<(&str, u32)> = stats
            .favorite_genres
            .iter()
            .map(|g| (g.genre.as_str(), g.count))
            .collect();

        // Equal counts fall back to alphabetical order.
        assert_eq!(
            genres,
            vec![("Fantasy", 2), ("Adventure", 1), ("Sci-Fi", 1)]
        );
    }

    #[test]
    fn favorite_genres_lists_every_genre() {
        let base = 1_700_000_000;
        let records = vec![
            completed("a", None, &["Fantasy", "Adventure", "Sci-Fi"], base),
            completed("b", None, &["Fantasy", "History", "Poetry", "Travel"], base + DAY),
        ];

        let stats = compute(&records, day(base + DAY));
        assert_eq!(stats.favorite_genres.len(), 6);
        assert_eq!(stats.favorite_genres[0].genre, "Fantasy");
        assert_eq!(stats.favorite_genres[0].count, 2);
    }

    #[test]
    fn monthly_counts_ascending() {
        // 2023-11-14 and onward.
        let nov = 1_700_000_000;
        let dec = nov + 30 * DAY;
        let records = vec![
            completed("a", None, &[], dec),
            completed("b", None, &[], nov),
            completed("c", None, &[], nov + DAY),
        ];

        let stats = compute(&records, day(dec));
        let months: Vec<(&str, u32)> = stats
            .reading_by_month
            .iter()
            .map(|m| (m.month.as_str(), m.count))
            .collect();
        assert_eq!(months, vec![("2023-11", 2), ("2023-12", 1)]);
    }

    #[test]
    fn last_completed_books_newest_first_capped_at_five() {
        let base = 1_700_000_000;
        let records: Vec<ReadingProgress> = (0..7)
            .map(|i| completed(&format!("b{}", i), None, &[], base + i * DAY))
            .collect();

        let stats = compute(&records, day(base + 6 * DAY));
        let ids: Vec<&str> = stats
            .last_completed_books
            .iter()
            .map(|r| r.book_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b6", "b5", "b4", "b3", "b2"]);
    }

    #[test]
    fn page_percentage_conversions() {
        assert_eq!(page_for_percentage(0, 250), 0);
        assert_eq!(page_for_percentage(50, 250), 125);
        assert_eq!(page_for_percentage(100, 250), 250);
        assert_eq!(page_for_percentage(100, 0), 0);

        assert_eq!(percentage_for_page(0, 250), 0);
        assert_eq!(percentage_for_page(125, 250), 50);
        assert_eq!(percentage_for_page(250, 250), 100);
        // Pages past the end clamp instead of exceeding 100%.
        assert_eq!(percentage_for_page(400, 250), 100);
    }

    #[test]
    fn conversion_round_trip_is_close() {
        for &pages in &[1u32, 37, 100, 250] {
            for pct in 0..=100u8 {
                let page = page_for_percentage(pct, pages);
                let back = percentage_for_page(page, pages);
                let tolerance = (100 / pages.max(1)).max(1) as i32;
                assert!(
                    (back as i32 - pct as i32).abs() <= tolerance,
                    "pages={} pct={} page={} back={}",
                    pages,
                    pct,
                    page,
                    back
                );
            }
        }
    }
}
