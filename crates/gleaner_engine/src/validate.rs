use std::io::Cursor;

use bytes::Bytes;
use gleaner_core::RejectReason;
use image::{ImageFormat, ImageReader};

/// Image formats the pipeline stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
            ImageKind::Bmp => "bmp",
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let lower = content_type.to_ascii_lowercase();
        if lower.contains("jpeg") || lower.contains("jpg") {
            Some(ImageKind::Jpeg)
        } else if lower.contains("png") {
            Some(ImageKind::Png)
        } else if lower.contains("gif") {
            Some(ImageKind::Gif)
        } else if lower.contains("webp") {
            Some(ImageKind::Webp)
        } else if lower.contains("bmp") {
            Some(ImageKind::Bmp)
        } else {
            None
        }
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::Gif => Some(ImageKind::Gif),
            ImageFormat::WebP => Some(ImageKind::Webp),
            ImageFormat::Bmp => Some(ImageKind::Bmp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationSettings {
    /// Substrings matched case-insensitively against the Content-Type header.
    pub accepted_types: Vec<String>,
    pub min_bytes: u64,
    /// 0 disables the dimension check (together with `min_height`).
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            accepted_types: ["image/jpeg", "image/png", "image/gif", "image/webp", "image/bmp"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_bytes: 4096,
            min_width: 0,
            min_height: 0,
        }
    }
}

impl ValidationSettings {
    fn dimension_check_enabled(&self) -> bool {
        self.min_width > 0 || self.min_height > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImage {
    pub body: Bytes,
    pub format: ImageKind,
    pub dimensions: Option<(u32, u32)>,
}

/// Accept or reject a fetched body on content properties alone.
///
/// Rejections are terminal for the URL; the retry policy never re-fetches
/// a response that failed here. The dimension check reads only the image
/// header, not the full pixel data.
pub fn validate(
    body: Bytes,
    content_type: Option<&str>,
    settings: &ValidationSettings,
) -> Result<ValidatedImage, RejectReason> {
    let content_type = content_type.unwrap_or("");
    let lower = content_type.to_ascii_lowercase();
    if !settings
        .accepted_types
        .iter()
        .any(|accepted| lower.contains(accepted.as_str()))
    {
        return Err(RejectReason::ContentType {
            content_type: if content_type.is_empty() {
                "(none)".to_string()
            } else {
                content_type.to_string()
            },
        });
    }

    if (body.len() as u64) < settings.min_bytes {
        return Err(RejectReason::TooSmall {
            bytes: body.len() as u64,
            min_bytes: settings.min_bytes,
        });
    }

    let sniffed = image::guess_format(&body).ok().and_then(ImageKind::from_format);

    let dimensions = if settings.dimension_check_enabled() {
        let reader = ImageReader::new(Cursor::new(body.as_ref()))
            .with_guessed_format()
            .map_err(|_| RejectReason::UndecodableImage)?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|_| RejectReason::UndecodableImage)?;
        if width < settings.min_width || height < settings.min_height {
            return Err(RejectReason::TooSmallDimensions { width, height });
        }
        Some((width, height))
    } else {
        None
    };

    let format = sniffed
        .or_else(|| ImageKind::from_content_type(content_type))
        .unwrap_or(ImageKind::Jpeg);

    Ok(ValidatedImage {
        body,
        format,
        dimensions,
    })
}
