//! Search orchestration.
//!
//! Ties the word store, the matcher and the annotator together: a search
//! normalizes the query, finds occurrences (retrying with punctuation split
//! out when nothing matched) and groups them per image; annotation then runs
//! per image with failures isolated to the image they concern.

use image::RgbaImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::annotate::{AnnotatedImage, Annotator, ImageDirectory};
use crate::config::ServiceConfig;
use crate::db::Database;
use crate::error::{ServiceError, ServiceResult, format_error_chain};
use crate::matching::{MatchOccurrence, PhraseMatcher};
use crate::query::{pad_and_tokenize, tokenize};

/// Result of one search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub query: String,
    /// Tokens that produced `occurrences`
    pub tokens: Vec<String>,
    /// Whether the punctuation-split retry produced the tokens
    pub used_fallback: bool,
    pub occurrences: Vec<MatchOccurrence>,
}

/// Occurrences on one image
#[derive(Debug, Clone)]
pub struct ImageMatches {
    pub image_id: String,
    pub occurrences: Vec<MatchOccurrence>,
}

impl SearchOutcome {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Group occurrences per image, images in order of first occurrence
    pub fn by_image(&self) -> Vec<ImageMatches> {
        let mut groups: Vec<ImageMatches> = Vec::new();
        for occurrence in &self.occurrences {
            match groups
                .iter_mut()
                .find(|group| group.image_id == occurrence.image_id)
            {
                Some(group) => group.occurrences.push(occurrence.clone()),
                None => groups.push(ImageMatches {
                    image_id: occurrence.image_id.clone(),
                    occurrences: vec![occurrence.clone()],
                }),
            }
        }
        groups
    }
}

/// An image that could not be annotated; the rest of the batch still was
#[derive(Debug, Clone)]
pub struct ImageWarning {
    pub image_id: String,
    pub message: String,
}

/// Annotated images for one search
#[derive(Debug, Default)]
pub struct AnnotationBatch {
    pub images: Vec<AnnotatedImage>,
    pub warnings: Vec<ImageWarning>,
}

/// Main service coordinator
pub struct MuralFinderService {
    pub config: Arc<ServiceConfig>,
    pub db: Database,
    pub images: ImageDirectory,
    matcher: PhraseMatcher,
    annotator: Annotator,
}

impl MuralFinderService {
    /// Create a new service instance
    pub fn new(config: Arc<ServiceConfig>) -> ServiceResult<Self> {
        let db = Database::open(&config.storage.database_path)?;
        let images = ImageDirectory::new(config.storage.image_dir.clone());
        let annotator = Annotator::from_config(&config.annotation);

        Ok(Self::with_parts(config, db, images, annotator))
    }

    pub fn with_parts(
        config: Arc<ServiceConfig>,
        db: Database,
        images: ImageDirectory,
        annotator: Annotator,
    ) -> Self {
        info!(
            database = %db.path().display(),
            image_dir = %images.root().display(),
            policy = ?config.matching.policy,
            "Mural finder initialized"
        );

        Self {
            matcher: PhraseMatcher::new(config.matching.policy),
            config,
            db,
            images,
            annotator,
        }
    }

    /// Locate every occurrence of `query`.
    ///
    /// Opens one read-only store session for the whole search; a store failure
    /// aborts the search without partial results. No match is an empty
    /// outcome, not an error.
    pub fn search(&self, query: &str) -> ServiceResult<SearchOutcome> {
        let started = Instant::now();
        let session = self.db.session()?;

        let mut tokens = tokenize(query);
        let mut occurrences = self.matcher.find(&tokens, &session)?;
        let mut used_fallback = false;

        if occurrences.is_empty() && self.config.matching.punctuation_fallback {
            let padded = pad_and_tokenize(query);
            if !padded.is_empty() && padded != tokens {
                occurrences = self.matcher.find(&padded, &session)?;
                tokens = padded;
                used_fallback = true;
                metrics::counter!("mural_search_fallbacks_total").increment(1);
            }
        }
        drop(session);

        metrics::counter!("mural_searches_total").increment(1);
        metrics::counter!("mural_matches_total").increment(occurrences.len() as u64);
        metrics::histogram!("mural_search_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        info!(
            query,
            tokens = tokens.len(),
            used_fallback,
            matches = occurrences.len(),
            "Search completed"
        );

        Ok(SearchOutcome {
            query: query.to_string(),
            tokens,
            used_fallback,
            occurrences,
        })
    }

    /// Annotate one image's occurrences, labelled with the original query
    pub fn annotate(&self, matches: &ImageMatches, label: &str) -> ServiceResult<AnnotatedImage> {
        let source: RgbaImage = self.images.load(&matches.image_id)?;
        self.annotator
            .annotate(&matches.image_id, &source, &matches.occurrences, label)
    }

    /// Annotate every matched image of a search.
    ///
    /// Missing or undecodable images become warnings; any other failure
    /// aborts the batch.
    pub fn annotate_all(&self, outcome: &SearchOutcome) -> ServiceResult<AnnotationBatch> {
        let mut batch = AnnotationBatch::default();

        for matches in outcome.by_image() {
            match self.annotate(&matches, &outcome.query) {
                Ok(image) => batch.images.push(image),
                Err(e) if e.is_per_image() => {
                    metrics::counter!("mural_annotation_failures_total").increment(1);
                    warn!(
                        image_id = %matches.image_id,
                        error = %format_error_chain(&e),
                        "Skipping image"
                    );
                    batch.warnings.push(ImageWarning {
                        image_id: matches.image_id.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(batch)
    }

    /// Search and annotate a single image, for display or download
    pub fn annotated_image(&self, query: &str, image_id: &str) -> ServiceResult<AnnotatedImage> {
        let outcome = self.search(query)?;
        let matches = outcome
            .by_image()
            .into_iter()
            .find(|group| group.image_id == image_id)
            .ok_or_else(|| ServiceError::NoMatchOnImage {
                image_id: image_id.to_string(),
            })?;

        self.annotate(&matches, query)
    }
}
