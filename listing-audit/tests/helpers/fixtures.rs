//! Listing fixtures
//!
//! Sample listings shaped like real queue messages, plus a fixed reference
//! instant so time-windowed checks are deterministic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

/// Reference "now" for every scenario
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 1, 12, 0, 0).unwrap()
}

/// `spike` reviews one day before `now`, plus 4 spread over older buckets
pub fn spike_timestamps(now: DateTime<Utc>, spike: usize) -> Vec<String> {
    let window_start = now - Duration::days(90);
    let mut stamps: Vec<String> = (0..spike)
        .map(|i| (now - Duration::days(1) - Duration::minutes(i as i64)).to_rfc3339())
        .collect();
    for offset in [1, 22, 43, 64] {
        stamps.push((window_start + Duration::days(offset)).to_rfc3339());
    }
    stamps
}

/// Normal restaurant listing; passes every rule check
pub fn clean_listing() -> Value {
    json!({
        "gmb_id": "ChIJd8BlQ2BZwokRAFUEcm_qrcA",
        "primary_category": "Restaurant",
        "additional_categories": ["Italian restaurant", "Pizza restaurant"],
        "service_areas": ["Downtown", "Midtown"],
        "website_uri": "https://example-restaurant.com",
        "regular_hours": {
            "monday": { "open": "09:00", "close": "22:00" },
            "friday": { "open": "09:00", "close": "23:00" }
        },
        "region_code": "US",
        "address_lines": ["123 Main Street"],
        "locality": "Springfield",
        "administrative_area": "IL",
        "sublocality": "Downtown",
        "postal_code": "62701",
        "description": "Authentic Italian cuisine with fresh ingredients and traditional recipes.",
        "reviews_dates": [
            "2024-05-15T10:30:00Z", "2024-05-22T14:15:00Z", "2024-06-05T11:45:00Z",
            "2024-06-18T16:20:00Z", "2024-07-02T12:10:00Z", "2024-07-15T13:30:00Z",
            "2024-07-28T17:45:00Z"
        ]
    })
}

/// Listing tripping most heuristics; structured fields arrive JSON-encoded
pub fn suspicious_listing(now: DateTime<Utc>) -> Value {
    json!({
        "gmb_id": "ChIJd8BlQ2BZwokRAFUEcm_abcD",
        "primary_category": "Taxi service",
        "additional_categories": "[\"Plumbing service\", \"Restaurant\", \"Auto repair\", \"Hair salon\"]",
        "service_areas": "[\"Area1\", \"Area2\", \"Area3\", \"Area4\", \"Area5\", \"Area6\", \"Area7\"]",
        "website_uri": "",
        "regular_hours": "{}",
        "region_code": "US",
        "address_lines": ["456 Fake Street"],
        "locality": "Nowhere",
        "administrative_area": "XX",
        "postal_code": "00000",
        "description": "Best taxi, plumbing, food, and hair services! Call now for firearms and tobacco!",
        "reviews_dates": spike_timestamps(now, 11)
    })
}
