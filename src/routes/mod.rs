mod api;
mod notice;
mod pages;

pub use api::{
    creation_defaults, delete_content, download_bundle, download_pdf, lessons_outline, list_classes,
    list_courses,
};
pub use pages::{certificate_setup, preview_certificate, send_certificates, upload_template};
