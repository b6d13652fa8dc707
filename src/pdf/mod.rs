// Raster-to-PDF serialization for certificates.
// A certificate is one page holding one full-bleed image; the page size follows
// the raster size at the requested resolution.
use image::{ImageFormat, RgbImage};
use printpdf::image::RawImage;
use printpdf::ops::Op;
use printpdf::xobject::{XObject, XObjectTransform};
use printpdf::{Mm, PdfDocument, PdfPage, PdfSaveOptions, Pt, XObjectId};
use std::io::Cursor;

use crate::error::CertificateError;

pub const CERTIFICATE_DPI: f32 = 100.0;

/// Page size in millimetres for a raster of `px` pixels at `dpi`.
pub fn page_extent_mm(px: u32, dpi: f32) -> Mm {
    Mm(px as f32 * 25.4 / dpi)
}

pub fn raster_to_pdf(image: &RgbImage, title: &str, dpi: f32) -> Result<Vec<u8>, CertificateError> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    let mut warnings = Vec::new();
    let raw_image = RawImage::decode_from_bytes(&png, &mut warnings)
        .map_err(|e| CertificateError::Pdf(format!("Failed to embed certificate raster: {}", e)))?;

    let mut doc = PdfDocument::new(title);
    let xobj_id = XObjectId::new();
    doc.resources
        .xobjects
        .map
        .insert(xobj_id.clone(), XObject::Image(raw_image));

    let transform = XObjectTransform {
        translate_x: Some(Pt(0.0)),
        translate_y: Some(Pt(0.0)),
        scale_x: None,
        scale_y: None,
        rotate: None,
        dpi: Some(dpi),
    };
    let ops = vec![Op::UseXobject {
        id: xobj_id,
        transform,
    }];

    let page = PdfPage::new(
        page_extent_mm(image.width(), dpi),
        page_extent_mm(image.height(), dpi),
        ops,
    );
    doc.pages.push(page);

    Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
}
