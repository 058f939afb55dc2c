//! Phrase matching over OCR word sequences.
//!
//! A phrase matches when a contiguous run of words in an image's reading
//! order equals the query tokens, ignoring case. Candidate images are first
//! narrowed with a substring prefilter on the first token.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::{Word, WordStore};
use crate::error::ServiceResult;

/// How many occurrences to report per image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Every matching window, overlapping ones included
    #[default]
    All,
    /// Only the earliest matching window of each image
    FirstPerImage,
}

/// One located phrase instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOccurrence {
    pub image_id: String,
    /// Matched words in reading order, one per query token
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseMatcher {
    policy: MatchPolicy,
}

impl PhraseMatcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Find every occurrence of `tokens` across the images in `store`.
    ///
    /// Results are ordered by the store's image order, then by position
    /// within each image. Empty tokens never touch the store.
    pub fn find(
        &self,
        tokens: &[String],
        store: &impl WordStore,
    ) -> ServiceResult<Vec<MatchOccurrence>> {
        let Some(seed) = tokens.first() else {
            return Ok(Vec::new());
        };

        let needle: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let mut occurrences = Vec::new();

        for image_id in store.images_containing(seed)? {
            let words = store.words_for_image(&image_id)?;
            let before = occurrences.len();
            collect_matches(&image_id, &words, &needle, self.policy, &mut occurrences);
            debug!(
                image_id = %image_id,
                word_count = words.len(),
                matches = occurrences.len() - before,
                "Scanned image"
            );
        }

        Ok(occurrences)
    }
}

/// Slide a window of `needle.len()` over `words`, pushing every match.
///
/// `needle` must already be lower-cased and non-empty.
fn collect_matches(
    image_id: &str,
    words: &[Word],
    needle: &[String],
    policy: MatchPolicy,
    out: &mut Vec<MatchOccurrence>,
) {
    for window in words.windows(needle.len()) {
        let matched = window
            .iter()
            .zip(needle)
            .all(|(word, token)| word.text.to_lowercase() == *token);

        if matched {
            out.push(MatchOccurrence {
                image_id: image_id.to_string(),
                words: window.to_vec(),
            });
            if policy == MatchPolicy::FirstPerImage {
                return;
            }
        }
    }
}
