use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::CertificateError;
use crate::pdf::{raster_to_pdf, CERTIFICATE_DPI};
use crate::storage::{write_atomically, CertificateStorage};

/// Print-resolution canvas every template is stretched to.
pub const CANVAS_SIZE: (u32, u32) = (3508, 2480);
pub const SIGNATURE_SIZE: (u32, u32) = (800, 130);
/// Distance of the signature's far edges from the right and bottom borders.
pub const SIGNATURE_INSET: (u32, u32) = (500, 500);
pub const JPEG_QUALITY: u8 = 75;

/// The per-class base image, written as JPEG (re-read by the renderer) and PDF.
#[derive(Debug, Clone)]
pub struct CompositeBaseImage {
    pub jpeg_path: PathBuf,
    pub pdf_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub fn signature_offset(canvas: (u32, u32), signature: (u32, u32)) -> (u32, u32) {
    (
        canvas.0.saturating_sub(signature.0 + SIGNATURE_INSET.0),
        canvas.1.saturating_sub(signature.1 + SIGNATURE_INSET.1),
    )
}

/// Stretches the template to the canvas and pastes the signature through its
/// own alpha channel.
pub fn composite_images(background: &DynamicImage, signature: &DynamicImage) -> RgbImage {
    let mut canvas = background
        .resize_exact(CANVAS_SIZE.0, CANVAS_SIZE.1, FilterType::CatmullRom)
        .to_rgb8();
    let signature = signature
        .resize_exact(SIGNATURE_SIZE.0, SIGNATURE_SIZE.1, FilterType::CatmullRom)
        .to_rgba8();

    let (x, y) = signature_offset(canvas.dimensions(), signature.dimensions());
    paste_masked(&mut canvas, &signature, x, y);
    canvas
}

fn paste_masked(base: &mut RgbImage, top: &RgbaImage, x: u32, y: u32) {
    for (dx, dy, pixel) in top.enumerate_pixels() {
        let (tx, ty) = (x + dx, y + dy);
        if tx >= base.width() || ty >= base.height() {
            continue;
        }
        let alpha = pixel[3] as f32 / 255.0;
        if alpha == 0.0 {
            continue;
        }
        let dst = base.get_pixel_mut(tx, ty);
        let inv = 1.0 - alpha;
        for c in 0..3 {
            dst.0[c] = (pixel[c] as f32 * alpha + dst.0[c] as f32 * inv).round() as u8;
        }
    }
}

fn open_upload(path: &Path, field: &str) -> Result<DynamicImage, CertificateError> {
    image::ImageReader::open(path)
        .map_err(|e| CertificateError::filesystem(path, e))?
        .with_guessed_format()
        .map_err(|e| CertificateError::filesystem(path, e))?
        .decode()
        .map_err(|e| CertificateError::malformed(field, e))
}

pub fn write_jpeg(image: &RgbImage, path: &Path) -> Result<(), CertificateError> {
    let mut encoded = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY);
        encoder.set_pixel_density(PixelDensity::dpi(CERTIFICATE_DPI as u16));
        encoder.encode_image(image)?;
    }
    write_atomically(path, |w| std::io::Write::write_all(w, &encoded))
}

pub fn write_pdf(image: &RgbImage, path: &Path, title: &str) -> Result<(), CertificateError> {
    let bytes = raster_to_pdf(image, title, CERTIFICATE_DPI)?;
    write_atomically(path, |w| std::io::Write::write_all(w, &bytes))
}

/// Builds the class's base image from two uploaded files, overwriting any
/// previous artifacts.
pub fn composite(
    storage: &CertificateStorage,
    background_path: &Path,
    signature_path: &Path,
    class_id: i32,
    course_id: i32,
) -> Result<CompositeBaseImage, CertificateError> {
    let background = open_upload(background_path, "bg_template")?;
    let signature = open_upload(signature_path, "teacher_signature")?;

    let canvas = composite_images(&background, &signature);
    drop((background, signature));

    storage.ensure_class_folder(class_id)?;
    let jpeg_path = storage.base_jpeg(course_id, class_id);
    let pdf_path = storage.base_pdf(course_id, class_id);

    write_pdf(&canvas, &pdf_path, "Certificate")?;
    write_jpeg(&canvas, &jpeg_path)?;

    info!(
        "Composited certificate base for class {} at {}",
        class_id,
        jpeg_path.display()
    );

    Ok(CompositeBaseImage {
        jpeg_path,
        pdf_path,
        width: canvas.width(),
        height: canvas.height(),
    })
}
