use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("payload is empty")]
    Empty,
    #[error("payload is not a recognised image format")]
    UnsupportedFormat,
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("image has zero-sized dimensions")]
    ZeroSized,
}

/// Detect the image format from the first bytes of a payload.
pub fn detect_image_kind(header: &[u8]) -> ImageKind {
    // JPEG: SOI marker followed by any marker
    if header.len() >= 3 && header[0..3] == [0xFF, 0xD8, 0xFF] {
        return ImageKind::Jpeg;
    }

    if header.len() >= 8 && header[0..8] == [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A] {
        return ImageKind::Png;
    }

    if header.len() >= 6 && (&header[0..6] == b"GIF87a" || &header[0..6] == b"GIF89a") {
        return ImageKind::Gif;
    }

    // WebP: RIFF container with "WEBP" form type at offset 8
    if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        return ImageKind::WebP;
    }

    if header.len() >= 2 && &header[0..2] == b"BM" {
        return ImageKind::Bmp;
    }

    ImageKind::Unknown
}

/// Check that a payload decodes to a displayable image.
pub fn validate_image(payload: &[u8]) -> Result<ImageInfo, ValidationError> {
    if payload.is_empty() {
        return Err(ValidationError::Empty);
    }

    let kind = detect_image_kind(payload);
    if kind == ImageKind::Unknown {
        return Err(ValidationError::UnsupportedFormat);
    }

    let img =
        image::load_from_memory(payload).map_err(|e| ValidationError::Decode(e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(ValidationError::ZeroSized);
    }

    Ok(ImageInfo {
        kind,
        width: img.width(),
        height: img.height(),
    })
}
