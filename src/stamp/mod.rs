//! Composes a raster document and a certification stamp into a one-page A4
//! PDF.

pub mod layout;

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use thiserror::Error;
use tokio::task;
use tracing::{debug, warn};

use crate::error::{AppError, ErrorKind};
use crate::format::{sniff_format, ContentKind};
use layout::{
    points, BandKind, FontStyle, PageLayout, Rect, Rgb, TextLine, TextStamp, BAND_BORDER,
    BAND_BORDER_MM, BAND_FILL, PAGE_HEIGHT_MM, RULE_MM,
};

pub const CERTIFIED_AT_FORMAT: &str = "%b %d, %Y %H:%M";

#[derive(Debug, Error)]
pub enum StampError {
    #[error("unsupported {role} format: only PNG and JPEG can be stamped")]
    UnsupportedFormat { role: &'static str },
    #[error("failed to decode {role}: {message}")]
    Decode { role: &'static str, message: String },
    #[error("pdf library unavailable: {0}")]
    Library(String),
    #[error("failed to compose page: {0}")]
    Render(String),
    #[error("failed to serialize pdf: {0}")]
    Encoding(String),
    #[error("stamp worker failed: {0}")]
    Worker(String),
}

impl From<StampError> for AppError {
    fn from(value: StampError) -> Self {
        match value {
            StampError::UnsupportedFormat { .. } | StampError::Decode { .. } => {
                AppError::unsupported_format(value.to_string())
            }
            other => AppError::new(ErrorKind::Encoding, other.to_string()),
        }
    }
}

enum Band {
    Text(TextStamp),
    Image(DynamicImage),
}

/// Stamp generator settings shared through application state.
#[derive(Debug, Clone)]
pub struct StampRenderer {
    library_path: Option<String>,
    issuer: String,
}

impl StampRenderer {
    pub fn new(library_path: Option<String>, issuer: impl Into<String>) -> Self {
        Self {
            library_path,
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Places the image above a synthesized text stamp.
    pub async fn convert_image_to_pdf_with_stamp(
        &self,
        image: Vec<u8>,
        format: ContentKind,
        document_type: &str,
    ) -> Result<Vec<u8>, StampError> {
        let content = decode(&image, format, "document image")?;
        let page = PageLayout::a4(BandKind::Text);
        let certified_at = certified_timestamp(Utc::now());
        let stamp = TextStamp::new(page.band, document_type, &certified_at, &self.issuer);
        self.render(content, Band::Text(stamp), page).await
    }

    /// Places the image above a caller-supplied stamp image stretched over
    /// the band.
    pub async fn convert_image_to_pdf_with_image_stamp(
        &self,
        image: Vec<u8>,
        stamp_image: Vec<u8>,
        format: ContentKind,
        document_type: &str,
    ) -> Result<Vec<u8>, StampError> {
        let content = decode(&image, format, "document image")?;
        let stamp = decode(&stamp_image, sniff_format(&stamp_image), "stamp image")?;
        debug!(document_type, "rendering document with image stamp");
        self.render(content, Band::Image(stamp), PageLayout::a4(BandKind::Image))
            .await
    }

    async fn render(
        &self,
        content: DynamicImage,
        band: Band,
        page: PageLayout,
    ) -> Result<Vec<u8>, StampError> {
        let library_path = self.library_path.clone();
        task::spawn_blocking(move || render_page(library_path.as_deref(), &content, &band, &page))
            .await
            .map_err(|err| StampError::Worker(err.to_string()))?
    }
}

pub fn certified_timestamp(at: DateTime<Utc>) -> String {
    at.format(CERTIFIED_AT_FORMAT).to_string()
}

fn decode(
    bytes: &[u8],
    format: ContentKind,
    role: &'static str,
) -> Result<DynamicImage, StampError> {
    let image_format = match format {
        ContentKind::Png => ImageFormat::Png,
        ContentKind::Jpeg => ImageFormat::Jpeg,
        _ => return Err(StampError::UnsupportedFormat { role }),
    };
    image::load_from_memory_with_format(bytes, image_format).map_err(|err| StampError::Decode {
        role,
        message: err.to_string(),
    })
}

fn bind(library_path: Option<&str>) -> Result<Pdfium, StampError> {
    let bindings = match library_path {
        Some(path) => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|err| {
        warn!(path = ?library_path, error = ?err, "failed to bind pdfium");
        StampError::Library(format!("{err:?}"))
    })?;
    Ok(Pdfium::new(bindings))
}

fn render_error(err: PdfiumError) -> StampError {
    StampError::Render(format!("{err:?}"))
}

fn color(rgb: Rgb) -> PdfColor {
    PdfColor::new(rgb.0, rgb.1, rgb.2, 255)
}

/// PDF space has its origin at the bottom-left corner.
fn flip(y_mm: f32) -> PdfPoints {
    PdfPoints::new(points(PAGE_HEIGHT_MM - y_mm))
}

fn mm(value: f32) -> PdfPoints {
    PdfPoints::new(points(value))
}

fn render_page(
    library_path: Option<&str>,
    content: &DynamicImage,
    band: &Band,
    page_layout: &PageLayout,
) -> Result<Vec<u8>, StampError> {
    let pdfium = bind(library_path)?;
    let mut document = pdfium.create_new_pdf().map_err(render_error)?;
    let bold = document.fonts_mut().helvetica_bold();
    let regular = document.fonts_mut().helvetica();
    let italic = document.fonts_mut().helvetica_oblique();

    {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(render_error)?;
        let objects = page.objects_mut();

        place_image(objects, content, &page_layout.image_area)?;

        match band {
            Band::Image(stamp) => place_image(objects, stamp, &page_layout.band)?,
            Band::Text(stamp) => {
                let area = page_layout.band;
                objects
                    .create_path_object_rect(
                        PdfRect::new(
                            flip(area.bottom()),
                            mm(area.x),
                            flip(area.y),
                            mm(area.x + area.width),
                        ),
                        Some(color(BAND_BORDER)),
                        Some(mm(BAND_BORDER_MM)),
                        Some(color(BAND_FILL)),
                    )
                    .map_err(render_error)?;
                objects
                    .create_path_object_line(
                        mm(stamp.rule.x1),
                        flip(stamp.rule.y),
                        mm(stamp.rule.x2),
                        flip(stamp.rule.y),
                        color(BAND_BORDER),
                        mm(RULE_MM),
                    )
                    .map_err(render_error)?;

                let lines = std::iter::once(&stamp.header)
                    .chain(stamp.fields.iter())
                    .chain(stamp.sentence.iter());
                for line in lines {
                    let font = match line.style {
                        FontStyle::Bold => bold,
                        FontStyle::Regular => regular,
                        FontStyle::Italic => italic,
                    };
                    place_text(objects, line, font)?;
                }
            }
        }
    }

    document
        .save_to_bytes()
        .map_err(|err| StampError::Encoding(format!("{err:?}")))
}

fn place_image(
    objects: &mut PdfPageObjects,
    image: &DynamicImage,
    area: &Rect,
) -> Result<(), StampError> {
    objects
        .create_image_object(
            mm(area.x),
            flip(area.bottom()),
            image,
            Some(mm(area.width)),
            Some(mm(area.height)),
        )
        .map_err(render_error)?;
    Ok(())
}

fn place_text(
    objects: &mut PdfPageObjects,
    line: &TextLine,
    font: PdfFontToken,
) -> Result<(), StampError> {
    let mut object = objects
        .create_text_object(
            mm(line.x),
            flip(line.baseline),
            &line.text,
            font,
            PdfPoints::new(line.size_pt),
        )
        .map_err(render_error)?;
    object
        .set_fill_color(color(line.color))
        .map_err(render_error)?;
    Ok(())
}
