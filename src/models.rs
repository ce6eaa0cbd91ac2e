//! Core data models for the Play Store loader.
//!
//! This module contains the raw CSV record shapes, the normalized entity
//! structs, index type aliases, and the run statistics record used
//! throughout the load pipeline.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Type Aliases
// ============================================================================

/// Index mapping application name to its surrogate id (dedup by name)
pub type NameIndex = FxHashMap<String, i64>;

/// Auxiliary multimap from application name to the ids of its reviews
pub type ReviewIndex = FxHashMap<String, Vec<i64>>;

// ============================================================================
// Raw CSV Records
// ============================================================================

/// Application row as it appears in `googleplaystore.csv`.
/// Only the columns the loader consumes are mapped; the rest of the file
/// is ignored at deserialization.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAppRecord {
    #[serde(rename = "App")]
    pub app: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Type")]
    pub price_type: Option<String>,
    #[serde(rename = "Content Rating")]
    pub content_rating: Option<String>,
    #[serde(rename = "Genres")]
    pub genres: Option<String>,
}

/// Review row as it appears in `googleplaystore_user_reviews.csv`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawReviewRecord {
    #[serde(rename = "App")]
    pub app: Option<String>,
    #[serde(rename = "Translated_Review")]
    pub translated_review: Option<String>,
}

// ============================================================================
// Normalized Entities
// ============================================================================

/// Application entity, deduplicated by name (first occurrence wins).
#[derive(Clone, Debug)]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub price_type_id: Option<i64>,
    pub content_rating_id: Option<i64>,
    /// Genre membership is a set: no duplicate (app, genre) pairs.
    pub genre_ids: BTreeSet<i64>,
}

#[derive(Clone, Debug)]
pub struct Category {
    pub id: i64,
    pub name: String, // lower-cased, underscores replaced with spaces
}

#[derive(Clone, Debug)]
pub struct PriceType {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct ContentRating {
    pub id: i64,
    pub rating: String,
}

#[derive(Clone, Debug)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Review entity. `app_id` stays `None` until the linking pass; a review
/// that never receives one is pruned before loading.
#[derive(Clone, Debug)]
pub struct Review {
    pub id: i64,
    pub app_name: String,
    pub app_id: Option<i64>,
    pub text: String,
}

// ============================================================================
// Extraction Output
// ============================================================================

/// Everything the application normalizer produces: the entity set plus
/// the four drained lookup-table collections.
#[derive(Debug, Default)]
pub struct AppData {
    pub apps: Vec<Application>,
    pub categories: Vec<Category>,
    pub price_types: Vec<PriceType>,
    pub content_ratings: Vec<ContentRating>,
    pub genres: Vec<Genre>,
}

/// Review entities plus the name-to-review-ids index used for linking.
#[derive(Debug, Default)]
pub struct ReviewData {
    pub reviews: Vec<Review>,
    pub by_app: ReviewIndex,
}

// ============================================================================
// Run Statistics
// ============================================================================

/// Counters for one load run, written as JSON with `--stats`.
#[derive(Default, Debug, Clone, Serialize)]
pub struct LoadStats {
    // Phase 1: reading
    pub app_rows_read: usize,
    pub app_rows_duplicate: usize,
    pub app_rows_malformed: usize,
    pub review_rows_read: usize,
    pub review_rows_duplicate: usize,
    pub review_rows_malformed: usize,

    // Phase 2: normalization
    pub apps_extracted: usize,
    pub categories: usize,
    pub price_types: usize,
    pub content_ratings: usize,
    pub genres: usize,
    pub reviews_extracted: usize,

    // Phase 3: linking
    pub apps_pruned: usize,
    pub reviews_pruned: usize,

    // Phases 4-5: loading
    pub rows_written: usize,
    pub batches_committed: usize,

    pub elapsed_seconds: f64,
}

impl LoadStats {
    /// Write stats to a JSON file.
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
