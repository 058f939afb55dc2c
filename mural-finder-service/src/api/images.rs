//! Annotated image endpoint.
//!
//! Serves the highlighted mural for display, or as an attachment when a
//! download is requested. Encoding happens per request, only for the image
//! asked for.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ServiceError;

use super::AppState;

/// Annotated image query parameters
#[derive(Deserialize)]
pub struct AnnotatedImageParams {
    pub query: String,
    #[serde(default)]
    pub download: bool,
}

/// Render the query's matches on one image as PNG
pub async fn annotated_image_handler(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
    Query(params): Query<AnnotatedImageParams>,
) -> Result<Response, ServiceError> {
    let annotated = state.service.annotated_image(&params.query, &image_id)?;
    let png = annotated.encode_png()?;

    if params.download {
        let disposition = format!(
            "attachment; filename=\"{}\"",
            annotated.download_name().replace('"', "")
        );
        Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/png".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            png,
        )
            .into_response())
    } else {
        Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], png).into_response())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::api::tests::{body_bytes, test_router};

    async fn get(uri: &str) -> axum::response::Response {
        let (_dir, app) = test_router();
        app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_display_image() {
        let response = get("/api/images/wall1.png/annotated?query=Hello%20World").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());

        let bytes = body_bytes(response).await;
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (200, 100));
        assert_eq!(*decoded.get_pixel(10, 10), image::Rgba([0, 255, 0, 255]));
    }

    #[tokio::test]
    async fn test_download_image() {
        let response =
            get("/api/images/wall1.png/annotated?query=Hello%20World&download=true").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"wall1.png_match.png\""
        );
    }

    #[tokio::test]
    async fn test_image_without_match_is_not_found() {
        let response = get("/api/images/wall2.png/annotated?query=Zzqx").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["code"], "no_match_on_image");
    }

    #[tokio::test]
    async fn test_missing_image_file_is_not_found() {
        let response = get("/api/images/wall3.png/annotated?query=hello").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["code"], "missing_image_file");
    }
}
