use chrono::{Locale, NaiveDate};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

use super::font::Typeface;
use super::layout::layout;
use crate::db::ClassOverview;
use crate::error::CertificateError;
use crate::pdf::CERTIFICATE_DPI;

/// Where the text stack starts on the canvas.
pub const TEXT_INSET: (i32, i32) = (0, 700);
pub const PREVIEW_RECIPIENT: &str = "STUDENT NAME";
const INK: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone)]
pub struct CertificateDocument {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

fn long_date(date: NaiveDate, locale: Locale) -> String {
    date.format_localized("%B %d, %Y", locale).to_string()
}

/// The six lines printed on every institution certificate.
pub fn certificate_lines(recipient: &str, class: &ClassOverview, locale: Locale) -> Vec<String> {
    vec![
        "This is to certify that".to_string(),
        recipient.to_string(),
        "has satisfactorily completed the course".to_string(),
        class.title.clone(),
        format!(
            "from {} to {}",
            long_date(class.start_date, locale),
            long_date(class.end_date, locale)
        ),
        format!("in a total of {} hours.", class.total_hours),
    ]
}

pub fn stamp_lines<S: AsRef<str>>(canvas: &mut RgbImage, lines: &[S], face: &dyn Typeface) {
    let placements = layout(lines, face, canvas.width(), TEXT_INSET);
    for (line, placement) in lines.iter().zip(placements) {
        face.draw(canvas, placement.x, placement.y, line.as_ref(), INK);
    }
}

/// Draws `lines` onto a copy of the base image and writes the result as a PDF.
pub fn render<S: AsRef<str>>(
    base_image_path: &Path,
    lines: &[S],
    face: &dyn Typeface,
    output_path: &Path,
) -> Result<CertificateDocument, CertificateError> {
    if !base_image_path.exists() {
        return Err(CertificateError::MissingBaseImage(
            base_image_path.to_path_buf(),
        ));
    }

    let mut certificate = image::open(base_image_path)
        .map_err(|e| match e {
            image::ImageError::IoError(io) => CertificateError::filesystem(base_image_path, io),
            other => CertificateError::malformed("certificate base", other),
        })?
        .to_rgb8();

    stamp_lines(&mut certificate, lines, face);

    let bytes = crate::pdf::raster_to_pdf(&certificate, "Certificate", CERTIFICATE_DPI)?;
    crate::storage::write_atomically(output_path, |w| std::io::Write::write_all(w, &bytes))?;

    Ok(CertificateDocument {
        path: output_path.to_path_buf(),
        width: certificate.width(),
        height: certificate.height(),
    })
}
