//! Linking reviews to applications and pruning orphans on both sides.
//!
//! Reviews are the defining join key for retention: an application with
//! zero reviews is dropped even if it has rich attributes, and a review
//! whose name matched no application is dropped with it.

use crate::models::{Application, Review, ReviewIndex};

/// Counts of entities removed by the linking pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkOutcome {
    pub apps_pruned: usize,
    pub reviews_pruned: usize,
}

/// Join reviews to applications by exact, case-sensitive name equality.
///
/// Every review id indexed under a surviving application's name receives
/// that application's id; applications whose name has no reviews are
/// removed; then reviews that never received an `app_id` are removed in
/// a separate scan.
///
/// Review ids must still be their positions in `reviews`: they are
/// assigned densely at extraction and nothing may be removed before this
/// pass runs.
pub fn link_reviews(
    apps: &mut Vec<Application>,
    reviews: &mut Vec<Review>,
    by_app: &ReviewIndex,
) -> LinkOutcome {
    let mut outcome = LinkOutcome::default();

    apps.retain(|app| match by_app.get(&app.name) {
        Some(review_ids) => {
            for &review_id in review_ids {
                if let Some(review) = reviews.get_mut(review_id as usize) {
                    review.app_id = Some(app.id);
                }
            }
            true
        }
        None => {
            outcome.apps_pruned += 1;
            false
        }
    });

    let before = reviews.len();
    reviews.retain(|review| review.app_id.is_some());
    outcome.reviews_pruned = before - reviews.len();

    outcome
}
