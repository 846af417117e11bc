use image::ImageFormat;

/// Format facts for an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind {
    pub mime: &'static str,
    pub extension: &'static str,
}

const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
];

/// Identify an image from its leading bytes, ignoring formats the
/// description providers cannot read.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageKind> {
    let format = image::guess_format(bytes).ok()?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return None;
    }
    Some(ImageKind {
        mime: format.to_mime_type(),
        extension: format.extensions_str().first().copied().unwrap_or("img"),
    })
}

pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match sniff_image(bytes) {
        Some(kind) => kind.mime,
        None => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), sending as octet-stream",
                &bytes[..bytes.len().min(4)]
            );
            "application/octet-stream"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_png() {
        assert_eq!(
            detect_image_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            "image/png"
        );
    }

    #[test]
    fn test_detect_jpeg() {
        assert_eq!(detect_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
    }

    #[test]
    fn test_detect_webp() {
        assert_eq!(
            detect_image_mime(&[
                0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50
            ]),
            "image/webp"
        );
    }

    #[test]
    fn test_sniff_reports_extension() {
        let kind = sniff_image(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        assert_eq!(kind.extension, "jpg");
    }

    #[test]
    fn test_text_is_not_an_image() {
        assert_eq!(sniff_image(b"hello, this is not an image"), None);
        assert_eq!(
            detect_image_mime(b"hello, this is not an image"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_empty_is_not_an_image() {
        assert_eq!(sniff_image(&[]), None);
    }
}
