//! Normalization of raw dataset rows into the relational entity model.
//!
//! Two independent passes: `extract_apps` deduplicates applications by
//! name and resolves their lookup attributes through interners;
//! `extract_reviews` keeps every usable review row and builds the
//! name-to-review-ids index consumed by the linking pass. The passes
//! share no mutable state and may run in parallel.

use std::collections::BTreeSet;

use crate::intern::Interner;
use crate::models::{
    Application, Category, ContentRating, Genre, NameIndex, PriceType, RawAppRecord,
    RawReviewRecord, Review, ReviewData, ReviewIndex,
};

/// Record validator: the field's value, iff it is a non-empty string.
///
/// Absent fields and empty strings are unusable. No trimming or other
/// cleanup happens at this layer.
pub fn usable_str(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Normalize a raw category token: lower-case, underscores to spaces.
/// `"GAME_ACTION"` becomes `"game action"`.
pub fn tokenize_category(raw: &str) -> String {
    raw.to_lowercase().split('_').collect::<Vec<_>>().join(" ")
}

/// Normalize application rows into entities.
///
/// Rows are deduplicated by name (first occurrence wins, later
/// duplicates dropped outright, attributes included) and rows with no
/// usable name are dropped without consuming an id. Each optional
/// attribute is interned only when its source field is usable; absence
/// stays `None` on the entity.
pub fn extract_apps(
    rows: &[RawAppRecord],
    categories: &mut Interner<Category>,
    price_types: &mut Interner<PriceType>,
    content_ratings: &mut Interner<ContentRating>,
    genres: &mut Interner<Genre>,
) -> Vec<Application> {
    let mut apps = Vec::new();
    let mut name_index = NameIndex::default();

    for row in rows {
        if let Some(name) = row.app.as_deref() {
            if name_index.contains_key(name) {
                continue;
            }
        }
        let Some(name) = usable_str(&row.app) else {
            continue;
        };

        let category_id = usable_str(&row.category).map(|raw| {
            let name = tokenize_category(raw);
            categories.intern(&name, |id| Category {
                id,
                name: name.clone(),
            })
        });
        let price_type_id = usable_str(&row.price_type).map(|raw| {
            price_types.intern(raw, |id| PriceType {
                id,
                name: raw.to_string(),
            })
        });
        let content_rating_id = usable_str(&row.content_rating).map(|raw| {
            content_ratings.intern(raw, |id| ContentRating {
                id,
                rating: raw.to_string(),
            })
        });

        // Raw split semantics: elements are interned exactly as they
        // appear between `;` separators.
        let mut genre_ids = BTreeSet::new();
        if let Some(raw) = usable_str(&row.genres) {
            for token in raw.split(';') {
                genre_ids.insert(genres.intern(token, |id| Genre {
                    id,
                    name: token.to_string(),
                }));
            }
        }

        let id = apps.len() as i64;
        name_index.insert(name.to_string(), id);
        apps.push(Application {
            id,
            name: name.to_string(),
            category_id,
            price_type_id,
            content_rating_id,
            genre_ids,
        });
    }

    apps
}

/// Normalize review rows into entities.
///
/// Nothing is deduplicated; a row is dropped only when either required
/// field fails the validator. The auxiliary index records every review
/// id under its application name.
pub fn extract_reviews(rows: &[RawReviewRecord]) -> ReviewData {
    let mut reviews = Vec::new();
    let mut by_app = ReviewIndex::default();

    for row in rows {
        let (Some(app_name), Some(text)) =
            (usable_str(&row.app), usable_str(&row.translated_review))
        else {
            continue;
        };

        let id = reviews.len() as i64;
        by_app.entry(app_name.to_string()).or_default().push(id);
        reviews.push(Review {
            id,
            app_name: app_name.to_string(),
            app_id: None,
            text: text.to_string(),
        });
    }

    ReviewData { reviews, by_app }
}
