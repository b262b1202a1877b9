//! Content detection from leading signature bytes.

const PDF_SIGNATURE: &[u8] = b"%PDF";
const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF87_SIGNATURE: &[u8] = b"GIF87a";
const GIF89_SIGNATURE: &[u8] = b"GIF89a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    Png,
    Jpeg,
    Gif,
    Unknown,
}

pub fn sniff_format(bytes: &[u8]) -> ContentKind {
    if bytes.starts_with(PDF_SIGNATURE) {
        ContentKind::Pdf
    } else if bytes.starts_with(PNG_SIGNATURE) {
        ContentKind::Png
    } else if bytes.starts_with(JPEG_SIGNATURE) {
        ContentKind::Jpeg
    } else if bytes.starts_with(GIF87_SIGNATURE) || bytes.starts_with(GIF89_SIGNATURE) {
        ContentKind::Gif
    } else {
        ContentKind::Unknown
    }
}

impl ContentKind {
    /// Raster inputs the stamp renderer can place on a page.
    pub fn is_stampable(self) -> bool {
        matches!(self, ContentKind::Png | ContentKind::Jpeg)
    }

    pub fn is_image(self) -> bool {
        matches!(self, ContentKind::Png | ContentKind::Jpeg | ContentKind::Gif)
    }

    /// Delivery treats unrecognised payloads as PDF.
    pub fn or_pdf(self) -> ContentKind {
        match self {
            ContentKind::Unknown => ContentKind::Pdf,
            other => other,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ContentKind::Pdf => "pdf",
            ContentKind::Png => "png",
            ContentKind::Jpeg => "jpg",
            ContentKind::Gif => "gif",
            ContentKind::Unknown => "bin",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ContentKind::Pdf => "application/pdf",
            ContentKind::Png => "image/png",
            ContentKind::Jpeg => "image/jpeg",
            ContentKind::Gif => "image/gif",
            ContentKind::Unknown => "application/octet-stream",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentKind::Pdf => "PDF document",
            ContentKind::Png => "PNG image",
            ContentKind::Jpeg => "JPEG image",
            ContentKind::Gif => "GIF image",
            ContentKind::Unknown => "file",
        }
    }
}
