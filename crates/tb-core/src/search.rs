//! # Weighted-tag post ranking
//!
//! The core retrieval algorithm: given a snapshot of the post collection, a
//! target year, and a tag-id → weight map, select the posts whose tags overlap
//! the weighted set and order them by year proximity, breaking ties with the
//! single best-matching tag weight.
//!
//! The ranker is a pure function over its inputs: no I/O, no mutation of the
//! collection, safe to call concurrently. Media-URL decoration happens in the
//! API layer after ordering is fixed.

use crate::models::Post;
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

/// Posts further than this many years from the target never match.
pub const YEAR_WINDOW: i32 = 2;

/// Whether the year filter applies. `Unbounded` preserves the behaviour of an
/// earlier revision of search that took no year at all; `YearBounded` is the
/// canonical variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPolicy {
    #[default]
    YearBounded,
    Unbounded,
}

/// How a post's tag weights combine into its score. `MaxWeight` (canonical):
/// the single best-matching tag drives the score. `SumWeight` preserves the
/// superseded cumulative-overlap prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorePolicy {
    #[default]
    MaxWeight,
    SumWeight,
}

/// Distance from the target year: 0 = exact match, up to `YEAR_WINDOW`.
/// None for posts with no year or outside the window.
fn year_proximity(post_year: Option<i32>, target_year: i32) -> Option<i32> {
    let diff = (post_year? - target_year).abs();
    (diff <= YEAR_WINDOW).then_some(diff)
}

/// The primary sort key, smaller is better. Under `Unbounded` every post
/// collapses to the same rank and ordering falls through to the tag score.
/// The `YEAR_WINDOW + 1` fallback is unreachable past the year filter; it is
/// kept as a defensive default only.
fn proximity_rank(policy: FilterPolicy, post_year: Option<i32>, target_year: i32) -> i32 {
    match policy {
        FilterPolicy::Unbounded => 0,
        FilterPolicy::YearBounded => {
            year_proximity(post_year, target_year).unwrap_or(YEAR_WINDOW + 1)
        }
    }
}

/// The secondary sort key, larger is better. Tag ids absent from `weights`
/// contribute 0; duplicate ids cannot double-count under `MaxWeight`.
fn tag_score(tags: &[Uuid], weights: &HashMap<Uuid, f64>, policy: ScorePolicy) -> f64 {
    let matched = tags.iter().map(|t| weights.get(t).copied().unwrap_or(0.0));
    match policy {
        ScorePolicy::MaxWeight => matched.fold(0.0, f64::max),
        ScorePolicy::SumWeight => matched.sum(),
    }
}

/// Filters and orders `posts` for a search centred on `target_year`.
///
/// A post is retained iff at least one of its tag ids is a key in `weights`
/// and (under `YearBounded`) its year lies within ±`YEAR_WINDOW` of the
/// target. Ordering is proximity rank ascending, then tag score descending;
/// equal (rank, score) pairs keep their stable relative order, which callers
/// must not depend on.
pub fn rank_posts(
    posts: Vec<Post>,
    target_year: i32,
    weights: &HashMap<Uuid, f64>,
    filter: FilterPolicy,
    score: ScorePolicy,
) -> Vec<Post> {
    let mut matching: Vec<Post> = posts
        .into_iter()
        .filter(|post| {
            let has_matching_tag = post.tags.iter().any(|t| weights.contains_key(t));
            let in_window = match filter {
                FilterPolicy::Unbounded => true,
                FilterPolicy::YearBounded => year_proximity(post.year, target_year).is_some(),
            };
            has_matching_tag && in_window
        })
        .collect();

    matching.sort_by(|a, b| {
        let rank_a = proximity_rank(filter, a.year, target_year);
        let rank_b = proximity_rank(filter, b.year, target_year);
        rank_a.cmp(&rank_b).then_with(|| {
            let score_a = tag_score(&a.tags, weights, score);
            let score_b = tag_score(&b.tags, weights, score);
            score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
        })
    });

    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(n: u128, tags: &[Uuid], year: Option<i32>) -> Post {
        Post {
            id: Uuid::from_u128(n),
            title: format!("post {n}"),
            description: String::new(),
            tags: tags.to_vec(),
            year,
            owner: "owner".to_string(),
            media_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn rank(posts: Vec<Post>, target_year: i32, weights: &HashMap<Uuid, f64>) -> Vec<u128> {
        rank_posts(
            posts,
            target_year,
            weights,
            FilterPolicy::default(),
            ScorePolicy::default(),
        )
        .into_iter()
        .map(|p| p.id.as_u128())
        .collect()
    }

    #[test]
    fn excludes_posts_outside_year_window() {
        // cars at 1975 (|Δ|=2, kept), trucks at 1970 (|Δ|=3, dropped)
        let cars = Uuid::now_v7();
        let trucks = Uuid::now_v7();
        let weights = HashMap::from([(cars, 1.0), (trucks, 0.9)]);
        let posts = vec![post(1, &[cars], Some(1975)), post(2, &[trucks], Some(1970))];

        assert_eq!(rank(posts, 1973, &weights), vec![1]);
    }

    #[test]
    fn ties_on_year_break_on_weight_descending() {
        let cars = Uuid::now_v7();
        let trucks = Uuid::now_v7();
        let weights = HashMap::from([(cars, 0.5), (trucks, 0.9)]);
        let posts = vec![post(1, &[cars], Some(1973)), post(2, &[trucks], Some(1973))];

        assert_eq!(rank(posts, 1973, &weights), vec![2, 1]);
    }

    #[test]
    fn excludes_posts_with_no_tag_overlap() {
        let cars = Uuid::now_v7();
        let weights = HashMap::from([(cars, 1.0)]);

        assert!(rank(vec![post(1, &[], Some(1973))], 1973, &weights).is_empty());

        // Year match alone is never enough
        let other = Uuid::now_v7();
        assert!(rank(vec![post(1, &[other], Some(1973))], 1973, &weights).is_empty());
    }

    #[test]
    fn excludes_posts_without_a_year() {
        let cars = Uuid::now_v7();
        let weights = HashMap::from([(cars, 1.0)]);

        assert!(rank(vec![post(1, &[cars], None)], 1973, &weights).is_empty());
    }

    #[test]
    fn empty_weights_match_nothing() {
        let posts = vec![post(1, &[Uuid::now_v7()], Some(1973))];
        assert!(rank(posts, 1973, &HashMap::new()).is_empty());
    }

    #[test]
    fn year_window_is_inclusive_at_both_edges() {
        let cars = Uuid::now_v7();
        let weights = HashMap::from([(cars, 1.0)]);
        let posts = vec![
            post(1, &[cars], Some(1971)),
            post(2, &[cars], Some(1975)),
            post(3, &[cars], Some(1976)),
        ];

        assert_eq!(rank(posts, 1973, &weights), vec![1, 2]);
    }

    #[test]
    fn year_proximity_beats_any_tag_weight() {
        let cars = Uuid::now_v7();
        let trucks = Uuid::now_v7();
        let weights = HashMap::from([(cars, 0.1), (trucks, 1.0)]);
        // Weak tag at the exact year outranks a perfect tag one year off.
        let posts = vec![post(1, &[trucks], Some(1974)), post(2, &[cars], Some(1973))];

        assert_eq!(rank(posts, 1973, &weights), vec![2, 1]);
    }

    #[test]
    fn score_is_max_not_sum() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let c = Uuid::now_v7();
        let weights = HashMap::from([(a, 0.9), (b, 0.5), (c, 0.4)]);
        // Sum-based scoring would tie these at 0.9; max must rank post 1 first.
        let posts = vec![post(1, &[a], Some(1973)), post(2, &[b, c], Some(1973))];

        assert_eq!(rank(posts, 1973, &weights), vec![1, 2]);
    }

    #[test]
    fn duplicate_tags_do_not_double_count() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let weights = HashMap::from([(a, 0.5), (b, 0.8)]);
        // [a, a] must stay at 0.5, below b's 0.8
        let posts = vec![post(1, &[a, a], Some(1973)), post(2, &[b], Some(1973))];

        assert_eq!(rank(posts, 1973, &weights), vec![2, 1]);
    }

    #[test]
    fn dangling_tag_ids_are_ignored_in_scoring() {
        let cars = Uuid::now_v7();
        let dangling = Uuid::now_v7();
        let weights = HashMap::from([(cars, 0.3)]);
        let posts = vec![post(1, &[cars, dangling], Some(1973))];

        let out = rank_posts(
            posts,
            1973,
            &weights,
            FilterPolicy::YearBounded,
            ScorePolicy::MaxWeight,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(tag_score(&out[0].tags, &weights, ScorePolicy::MaxWeight), 0.3);
    }

    #[test]
    fn unbounded_filter_ranks_yearless_posts_by_score() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let weights = HashMap::from([(a, 0.4), (b, 0.9)]);
        let posts = vec![post(1, &[a], None), post(2, &[b], Some(1800))];

        let out: Vec<u128> = rank_posts(
            posts,
            1973,
            &weights,
            FilterPolicy::Unbounded,
            ScorePolicy::MaxWeight,
        )
        .into_iter()
        .map(|p| p.id.as_u128())
        .collect();

        assert_eq!(out, vec![2, 1]);
    }

    #[test]
    fn sum_policy_accumulates_overlap() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let c = Uuid::now_v7();
        let weights = HashMap::from([(a, 0.5), (b, 0.4), (c, 0.8)]);
        let posts = vec![post(1, &[a, b], Some(1973)), post(2, &[c], Some(1973))];

        let out: Vec<u128> = rank_posts(
            posts,
            1973,
            &weights,
            FilterPolicy::YearBounded,
            ScorePolicy::SumWeight,
        )
        .into_iter()
        .map(|p| p.id.as_u128())
        .collect();

        // 0.5 + 0.4 > 0.8
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn ranking_is_idempotent() {
        let cars = Uuid::now_v7();
        let trucks = Uuid::now_v7();
        let weights = HashMap::from([(cars, 0.7), (trucks, 0.9)]);
        let posts = vec![
            post(1, &[cars], Some(1974)),
            post(2, &[trucks], Some(1973)),
            post(3, &[cars, trucks], Some(1975)),
        ];

        let first = rank(posts.clone(), 1973, &weights);
        let second = rank(posts, 1973, &weights);
        assert_eq!(first, second);
        assert_eq!(first, vec![2, 1, 3]);
    }
}
