//! Match highlighting on mural images.
//!
//! Each occurrence gets an outline around its enclosing box, stretched upward
//! to leave room for a `'{label}' Found!` caption. All occurrences of one image
//! are drawn onto a single copy of the source raster.

mod source;

pub use source::ImageDirectory;

use ab_glyph::{FontArc, PxScale};
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::config::AnnotationConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::geometry::{Rectangle, enclosing_box};
use crate::matching::MatchOccurrence;

/// DejaVu Sans, used for labels unless `annotation.font_path` overrides it
static BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Raster copy of a mural with highlights burned in
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    pub image_id: String,
    pub raster: RgbaImage,
    /// Enclosing box of each drawn occurrence, in drawing order
    pub boxes: Vec<Rectangle>,
}

impl AnnotatedImage {
    /// File name offered for downloads
    pub fn download_name(&self) -> String {
        format!("{}_match.png", self.image_id)
    }

    /// Encode the annotated raster as PNG.
    pub fn encode_png(&self) -> ServiceResult<Vec<u8>> {
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(
                self.raster.as_raw(),
                self.raster.width(),
                self.raster.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|source| ServiceError::Encode {
                image_id: self.image_id.clone(),
                source,
            })?;

        debug!(
            image_id = %self.image_id,
            bytes = buffer.len(),
            "Encoded annotated image"
        );
        Ok(buffer)
    }
}

/// Draws match highlights according to the annotation settings
pub struct Annotator {
    config: AnnotationConfig,
    font: Option<FontArc>,
}

impl Annotator {
    pub fn new(config: AnnotationConfig, font: Option<FontArc>) -> Self {
        Self { config, font }
    }

    /// Build an annotator, loading the label font if one is configured.
    ///
    /// An unreadable font is not fatal: labels fall back to the bundled font.
    pub fn from_config(config: &AnnotationConfig) -> Self {
        let configured = config.font_path.as_ref().and_then(|path| {
            let loaded = std::fs::read(path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| FontArc::try_from_vec(bytes).map_err(|e| e.to_string()));
            match loaded {
                Ok(font) => Some(font),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to load label font, using bundled font"
                    );
                    None
                }
            }
        });

        let font = configured.or_else(|| match FontArc::try_from_slice(BUNDLED_FONT) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!(error = %e, "Bundled label font is invalid, labels disabled");
                None
            }
        });

        Self::new(config.clone(), font)
    }

    /// Draw every occurrence onto a copy of `source`.
    ///
    /// All boxes are computed before drawing starts, so a malformed occurrence
    /// fails without producing a half-annotated image. An empty occurrence
    /// list yields an unchanged copy.
    pub fn annotate(
        &self,
        image_id: &str,
        source: &RgbaImage,
        occurrences: &[MatchOccurrence],
        label: &str,
    ) -> ServiceResult<AnnotatedImage> {
        let boxes = occurrences
            .iter()
            .map(|occurrence| {
                if occurrence.image_id != image_id {
                    return Err(ServiceError::invalid_input(format!(
                        "occurrence on {} cannot be drawn on {}",
                        occurrence.image_id, image_id
                    )));
                }
                enclosing_box(&occurrence.words)
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        let mut raster = source.clone();
        let caption = format!("'{}' Found!", label);
        for rect in &boxes {
            self.draw_highlight(&mut raster, rect, &caption);
        }

        debug!(image_id, highlights = boxes.len(), "Annotated image");
        Ok(AnnotatedImage {
            image_id: image_id.to_string(),
            raster,
            boxes,
        })
    }

    fn color(&self) -> Rgba<u8> {
        let [r, g, b] = self.config.color;
        Rgba([r, g, b, 255])
    }

    fn draw_highlight(&self, raster: &mut RgbaImage, rect: &Rectangle, caption: &str) {
        let color = self.color();
        let outline = self.outline(rect);
        let (raster_width, raster_height) = raster.dimensions();

        // Strokes are centered on the outline like a thick pen
        let stroke = i64::from(self.config.stroke_width.max(1));
        for step in 0..stroke {
            let grow = step - stroke / 2;
            let left = clip(i64::from(outline.left) - grow, raster_width);
            let top = clip(i64::from(outline.top) - grow, raster_height);
            let right = clip(i64::from(outline.right) + grow, raster_width);
            let bottom = clip(i64::from(outline.bottom) + grow, raster_height);
            if right <= left || bottom <= top {
                continue;
            }
            let ring = Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32);
            draw_hollow_rect_mut(raster, ring, color);
        }

        let Some(font) = &self.font else {
            return;
        };
        let y = i64::from(outline.top)
            - i64::from(self.config.label_gap)
            - self.config.font_scale.ceil() as i64;
        if outline.left >= raster_width || y >= i64::from(raster_height) {
            return;
        }
        // Glyphs above the top edge are clipped by imageproc
        let y = y.max(i64::from(i32::MIN / 2)) as i32;
        draw_text_mut(
            raster,
            color,
            clip(i64::from(outline.left), raster_width),
            y,
            PxScale::from(self.config.font_scale),
            font,
            caption,
        );
    }

    /// Enclosing box stretched upward by the label headroom, clamped at the top edge
    fn outline(&self, rect: &Rectangle) -> Rectangle {
        Rectangle {
            top: rect.top.saturating_sub(self.config.label_headroom),
            ..*rect
        }
    }
}

/// Clamp a drawing coordinate to one pixel beyond either raster edge.
///
/// Edges pushed past the raster stay invisible instead of wrapping around.
fn clip(value: i64, extent: u32) -> i32 {
    let limit = i64::from(extent).min(i64::from(i32::MAX / 2));
    value.clamp(-1, limit + 1) as i32
}
