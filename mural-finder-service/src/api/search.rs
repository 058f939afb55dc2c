//! Search API endpoint.
//!
//! Runs a phrase search and reports where it was found, grouped per image.

use axum::{Json, extract::State};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::Word;
use crate::error::{ServiceError, ServiceResult};
use crate::geometry::{Rectangle, enclosing_box};
use crate::service::{ImageMatches, SearchOutcome};

use super::AppState;

/// Search request
#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Embed each annotated image as a base64 PNG in the response
    #[serde(default)]
    pub inline_images: bool,
}

/// Search response
#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub tokens: Vec<String>,
    pub used_fallback: bool,
    pub total_matches: usize,
    pub images: Vec<ImageResultDto>,
    pub warnings: Vec<WarningDto>,
}

/// Matches on one image
#[derive(Serialize)]
pub struct ImageResultDto {
    pub image_id: String,
    pub image_available: bool,
    pub occurrences: Vec<OccurrenceDto>,
    pub annotated_url: String,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

/// One located phrase
#[derive(Serialize)]
pub struct OccurrenceDto {
    pub words: Vec<Word>,
    pub bounds: Rectangle,
}

/// Per-image problem that did not fail the search
#[derive(Serialize)]
pub struct WarningDto {
    pub image_id: String,
    pub message: String,
}

impl ImageResultDto {
    fn new(query: &str, matches: ImageMatches, image_available: bool) -> ServiceResult<Self> {
        let occurrences = matches
            .occurrences
            .into_iter()
            .map(|occurrence| {
                Ok(OccurrenceDto {
                    bounds: enclosing_box(&occurrence.words)?,
                    words: occurrence.words,
                })
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        let base = format!(
            "/api/images/{}/annotated?query={}",
            urlencoding::encode(&matches.image_id),
            urlencoding::encode(query)
        );

        Ok(Self {
            image_id: matches.image_id,
            image_available,
            occurrences,
            download_url: format!("{}&download=true", base),
            annotated_url: base,
            image_data: None,
        })
    }
}

/// Find a phrase across all mural images
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ServiceError> {
    let outcome = state.service.search(&request.query)?;

    let response = if request.inline_images {
        inline_response(&state, outcome)?
    } else {
        listing_response(&state, outcome)?
    };

    Ok(Json(response))
}

/// Report matches and which images can be shown, without decoding any image
fn listing_response(state: &AppState, outcome: SearchOutcome) -> ServiceResult<SearchResponse> {
    let mut images = Vec::new();
    let mut warnings = Vec::new();

    for matches in outcome.by_image() {
        let available = state.service.images.contains(&matches.image_id);
        if !available {
            warnings.push(WarningDto {
                image_id: matches.image_id.clone(),
                message: ServiceError::MissingImageFile {
                    image_id: matches.image_id.clone(),
                }
                .to_string(),
            });
        }
        images.push(ImageResultDto::new(&outcome.query, matches, available)?);
    }

    Ok(SearchResponse {
        total_matches: outcome.occurrences.len(),
        query: outcome.query,
        tokens: outcome.tokens,
        used_fallback: outcome.used_fallback,
        images,
        warnings,
    })
}

/// Annotate every matched image and embed the PNGs
fn inline_response(state: &AppState, outcome: SearchOutcome) -> ServiceResult<SearchResponse> {
    let batch = state.service.annotate_all(&outcome)?;

    let mut encoded: HashMap<String, String> = HashMap::new();
    for annotated in &batch.images {
        let png = annotated.encode_png()?;
        encoded.insert(
            annotated.image_id.clone(),
            base64::engine::general_purpose::STANDARD.encode(png),
        );
    }

    let images = outcome
        .by_image()
        .into_iter()
        .map(|matches| {
            let data = encoded.remove(&matches.image_id);
            let mut dto = ImageResultDto::new(&outcome.query, matches, data.is_some())?;
            dto.image_data = data;
            Ok(dto)
        })
        .collect::<ServiceResult<Vec<_>>>()?;

    Ok(SearchResponse {
        total_matches: outcome.occurrences.len(),
        query: outcome.query,
        tokens: outcome.tokens,
        used_fallback: outcome.used_fallback,
        images,
        warnings: batch
            .warnings
            .into_iter()
            .map(|w| WarningDto {
                image_id: w.image_id,
                message: w.message,
            })
            .collect(),
    })
}
