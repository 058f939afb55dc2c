//! Resolution of image names to mural files on disk.

use image::RgbaImage;
use std::path::{Component, Path, PathBuf};

use crate::error::{ServiceError, ServiceResult};

/// Directory of mural images, keyed by file name
#[derive(Debug, Clone)]
pub struct ImageDirectory {
    root: PathBuf,
}

impl ImageDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the image file, if `image_id` names an existing file directly
    /// inside the directory.
    pub fn resolve(&self, image_id: &str) -> Option<PathBuf> {
        let mut components = Path::new(image_id).components();
        let is_plain_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !is_plain_name {
            return None;
        }

        let path = self.root.join(image_id);
        path.is_file().then_some(path)
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.resolve(image_id).is_some()
    }

    /// Decode the image into an RGBA raster
    pub fn load(&self, image_id: &str) -> ServiceResult<RgbaImage> {
        let path = self
            .resolve(image_id)
            .ok_or_else(|| ServiceError::MissingImageFile {
                image_id: image_id.to_string(),
            })?;

        let image = image::open(&path).map_err(|source| ServiceError::ImageDecode {
            image_id: image_id.to_string(),
            source,
        })?;

        Ok(image.to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_load_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]))
            .save(dir.path().join("wall1.png"))
            .unwrap();

        let images = ImageDirectory::new(dir.path());
        assert!(images.contains("wall1.png"));
        let raster = images.load("wall1.png").unwrap();
        assert_eq!(raster.dimensions(), (4, 3));
        assert_eq!(*raster.get_pixel(0, 0), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageDirectory::new(dir.path());
        assert!(!images.contains("wall9.png"));
        assert!(matches!(
            images.load("wall9.png"),
            Err(ServiceError::MissingImageFile { .. })
        ));
    }

    #[test]
    fn test_names_outside_directory_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("Images");
        std::fs::create_dir(&inner).unwrap();
        RgbaImage::new(2, 2).save(dir.path().join("secret.png")).unwrap();

        let images = ImageDirectory::new(&inner);
        for name in ["../secret.png", "/etc/passwd", "", ".", "sub/wall.png"] {
            assert!(images.resolve(name).is_none(), "{:?}", name);
        }
        assert!(matches!(
            images.load("../secret.png"),
            Err(ServiceError::MissingImageFile { .. })
        ));
    }

    #[test]
    fn test_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

        let images = ImageDirectory::new(dir.path());
        assert!(matches!(
            images.load("broken.png"),
            Err(ServiceError::ImageDecode { .. })
        ));
    }
}
