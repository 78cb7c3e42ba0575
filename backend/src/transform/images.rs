//! Image reference detection.
//!
//! A cell is an image reference when its text opens as a file whose bytes
//! decode as an image. There is no extension whitelist: anything that does
//! not decode is plain text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageReader;
use std::io::Cursor;
use std::path::Path;

use crate::models::{DisplayCell, ImageReference};

/// A decoded image file, ready to be inlined.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Read and decode `candidate` as an image file. Fails closed.
pub fn load_image(candidate: &str) -> Option<InlineImage> {
    if candidate.is_empty() {
        return None;
    }
    let path = Path::new(candidate);
    if !path.is_file() {
        return None;
    }

    let bytes = std::fs::read(path).ok()?;
    let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .ok()?;
    let format = reader.format()?;
    reader.decode().ok()?;

    Some(InlineImage {
        mime: format.to_mime_type(),
        bytes,
    })
}

/// Whether `candidate` names a readable, decodable image file.
pub fn is_image_file(candidate: &str) -> bool {
    load_image(candidate).is_some()
}

/// Classify a question or option value for display.
///
/// Images become inline thumbnails and are returned as references so they
/// can be packed into the bundle; everything else is shown verbatim.
pub fn classify_cell(value: &str) -> (DisplayCell, Option<ImageReference>) {
    match load_image(value) {
        Some(image) => (
            DisplayCell::Image {
                path: value.to_string(),
                mime: image.mime.to_string(),
                base64: image.to_base64(),
            },
            Some(ImageReference::new(value)),
        ),
        None => (DisplayCell::text(value), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        image::RgbImage::new(2, 2).save(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_png_is_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "q1.png");

        let (cell, reference) = classify_cell(&path);
        assert!(cell.is_image());
        assert!(cell.data_uri().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(reference.unwrap().archive_name(), "q1.png");
    }

    #[test]
    fn test_extension_is_irrelevant() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "picture.png");
        let renamed = dir.path().join("picture.dat");
        std::fs::rename(&path, &renamed).unwrap();

        assert!(is_image_file(&renamed.to_string_lossy()));
    }

    #[test]
    fn test_non_image_file_is_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"not an image at all").unwrap();

        let (cell, reference) = classify_cell(&path.to_string_lossy());
        assert_eq!(cell, DisplayCell::text(path.to_string_lossy()));
        assert!(reference.is_none());
    }

    #[test]
    fn test_plain_text_fails_closed() {
        assert!(!is_image_file(""));
        assert!(!is_image_file("What is 2 + 2?"));
        assert!(!is_image_file("/definitely/not/here.png"));
        let (cell, reference) = classify_cell("Paris");
        assert_eq!(cell, DisplayCell::text("Paris"));
        assert!(reference.is_none());
    }

    #[test]
    fn test_directory_is_not_image() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_image_file(&dir.path().to_string_lossy()));
    }
}
