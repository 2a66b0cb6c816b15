//! Review Anomaly Detector
//!
//! Flags review bursts: the trailing window is cut into fixed-width buckets
//! and a listing is suspicious when one bucket dwarfs the others both
//! relatively (ratio against the mean of the rest) and absolutely (floor).
//!
//! The reference instant comes from [`CheckContext::now`], so a fixed "now"
//! and fixed input always produce identical statistics.

use crate::record::{Field, ListingRecord};
use crate::types::{CheckContext, CheckError, CheckName, CheckOutcome, ListingCheck};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use listing_common::time::days;
use serde::Serialize;
use tracing::debug;

/// Minimum total reviews before the spike analysis runs
pub const MIN_REVIEWS: usize = 10;

/// Length of the trailing analysis window
pub const WINDOW_DAYS: i64 = 90;

/// Width of one bucket
pub const BUCKET_DAYS: i64 = 7;

/// Max bucket must exceed this multiple of the other buckets' mean
pub const SPIKE_RATIO: f64 = 3.0;

/// Max bucket must also exceed this absolute count
pub const SPIKE_FLOOR: usize = 10;

/// Per-bucket statistics of one analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewWindowStats {
    /// Review count per bucket, oldest first
    pub bucket_counts: Vec<usize>,
    /// Index of the first bucket holding the maximum
    pub max_bucket: usize,
    pub max_count: usize,
    /// Mean of every bucket except `max_bucket`
    pub other_mean: f64,
    pub suspicious: bool,
}

/// Number of buckets covering the window (final partial bucket included)
pub fn bucket_count() -> usize {
    ((WINDOW_DAYS + BUCKET_DAYS - 1) / BUCKET_DAYS) as usize
}

/// Count timestamps per bucket of the window ending at `now`
///
/// Timestamps outside `[now - WINDOW_DAYS, now]` are ignored.
pub fn bucket_reviews(timestamps: &[DateTime<Utc>], now: DateTime<Utc>) -> Vec<usize> {
    let buckets = bucket_count();
    let window_start = now - days(WINDOW_DAYS);
    let bucket_secs = days(BUCKET_DAYS).num_seconds();
    let mut counts = vec![0usize; buckets];

    for ts in timestamps {
        if *ts < window_start || *ts > now {
            continue;
        }
        let offset = (*ts - window_start).num_seconds();
        let index = ((offset / bucket_secs) as usize).min(buckets - 1);
        counts[index] += 1;
    }
    counts
}

/// Spike statistics over pre-computed bucket counts
pub fn analyze_window(bucket_counts: Vec<usize>) -> ReviewWindowStats {
    // max_by_key keeps the last maximum; fold keeps the first
    let (max_bucket, max_count) = bucket_counts
        .iter()
        .copied()
        .enumerate()
        .fold((0, 0), |best, (i, c)| if c > best.1 { (i, c) } else { best });

    let others = bucket_counts.len().saturating_sub(1);
    let other_mean = if others == 0 {
        0.0
    } else {
        let other_total: usize = bucket_counts.iter().sum::<usize>() - max_count;
        other_total as f64 / others as f64
    };

    let suspicious = (max_count as f64) > SPIKE_RATIO * other_mean && max_count > SPIKE_FLOOR;

    ReviewWindowStats {
        bucket_counts,
        max_bucket,
        max_count,
        other_mean,
        suspicious,
    }
}

/// Full detector: threshold, bucketing, spike test
///
/// Returns `None` when there are too few reviews to analyze (not suspicious).
pub fn detect_review_spike(
    timestamps: &[DateTime<Utc>],
    now: DateTime<Utc>,
) -> Option<ReviewWindowStats> {
    if timestamps.len() < MIN_REVIEWS {
        return None;
    }
    Some(analyze_window(bucket_reviews(timestamps, now)))
}

/// Suspicious review burst
pub struct ReviewSpikeCheck;

#[async_trait]
impl ListingCheck for ReviewSpikeCheck {
    fn name(&self) -> CheckName {
        CheckName::SuspiciousReviews
    }

    async fn evaluate(
        &self,
        record: &ListingRecord,
        ctx: &CheckContext,
    ) -> Result<CheckOutcome, CheckError> {
        let timestamps = match &record.review_timestamps {
            Field::Absent => return Ok(CheckOutcome::not_applicable()),
            Field::Malformed(reason) => {
                return Ok(CheckOutcome::indeterminate(format!(
                    "reviews_dates: {}",
                    reason
                )))
            }
            Field::Value(timestamps) => timestamps,
        };

        match detect_review_spike(timestamps, ctx.now) {
            None => {
                debug!(
                    listing_id = %ctx.listing_id,
                    reviews = timestamps.len(),
                    "Too few reviews for spike analysis"
                );
                Ok(CheckOutcome::from_bool(false))
            }
            Some(stats) => {
                debug!(
                    listing_id = %ctx.listing_id,
                    buckets = ?stats.bucket_counts,
                    max_bucket = stats.max_bucket,
                    max_count = stats.max_count,
                    other_mean = stats.other_mean,
                    suspicious = stats.suspicious,
                    "Review window analyzed"
                );
                Ok(CheckOutcome::from_bool(stats.suspicious))
            }
        }
    }
}
