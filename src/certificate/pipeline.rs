use chrono::Locale;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::font::Typeface;
use super::renderer::{certificate_lines, render, CertificateDocument, PREVIEW_RECIPIENT};
use crate::db::{ClassOverview, EnrolledStudent, Roster};
use crate::error::CertificateError;
use crate::mail::{MailDispatcher, OutgoingMail};
use crate::storage::CertificateStorage;

/// Per-request inputs shared by the preview and delivery pipelines.
pub struct CertificateContext<'a> {
    pub storage: &'a CertificateStorage,
    pub face: Arc<dyn Typeface + Send + Sync>,
    pub locale: Locale,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
    pub student_id: i32,
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryReport {
    pub class_id: i32,
    pub sent: Vec<i32>,
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.sent.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loads the class and checks that its base image has been composited.
async fn checked_base<R: Roster>(
    ctx: &CertificateContext<'_>,
    roster: &R,
    class_id: i32,
) -> Result<(ClassOverview, PathBuf), CertificateError> {
    let class = roster.class_overview(class_id).await?;
    let base = ctx.storage.base_jpeg(class.course_id, class.class_id);
    if !base.exists() {
        return Err(CertificateError::MissingBaseImage(base));
    }
    Ok((class, base))
}

/// Runs `render` on the blocking pool.
async fn render_blocking(
    face: &Arc<dyn Typeface + Send + Sync>,
    base: PathBuf,
    lines: Vec<String>,
    output: PathBuf,
) -> Result<CertificateDocument, CertificateError> {
    let face = Arc::clone(face);
    tokio::task::spawn_blocking(move || render(&base, &lines, &*face, &output))
        .await
        .map_err(CertificateError::task)?
}

pub async fn preview<R: Roster>(
    ctx: &CertificateContext<'_>,
    roster: &R,
    class_id: i32,
) -> Result<CertificateDocument, CertificateError> {
    let (class, base) = checked_base(ctx, roster, class_id).await?;
    let lines = certificate_lines(PREVIEW_RECIPIENT, &class, ctx.locale);
    let document =
        render_blocking(&ctx.face, base, lines, ctx.storage.preview_pdf(class_id)).await?;

    info!(
        "Rendered certificate preview for class {} ({}x{})",
        class_id, document.width, document.height
    );
    Ok(document)
}

async fn deliver_one<M: MailDispatcher>(
    ctx: &CertificateContext<'_>,
    mailer: &M,
    class: &ClassOverview,
    base: &std::path::Path,
    student: &EnrolledStudent,
) -> Result<(), CertificateError> {
    let lines = certificate_lines(&student.full_name(), class, ctx.locale);
    let output = ctx.storage.student_pdf(class.class_id, student.student_id);
    let document = render_blocking(&ctx.face, base.to_path_buf(), lines, output).await?;

    mailer
        .send(&OutgoingMail::certificate(&student.email, class, &document.path))
        .await
}

/// Renders and mails one certificate per enrolled student, in enrollment
/// order. A failing student is recorded in the report and the batch goes on.
pub async fn deliver<R: Roster, M: MailDispatcher>(
    ctx: &CertificateContext<'_>,
    roster: &R,
    mailer: &M,
    class_id: i32,
) -> Result<DeliveryReport, CertificateError> {
    let (class, base) = checked_base(ctx, roster, class_id).await?;
    let students = roster.enrolled_students(class_id).await?;

    let mut report = DeliveryReport {
        class_id,
        ..Default::default()
    };

    for student in &students {
        match deliver_one(ctx, mailer, &class, &base, student).await {
            Ok(()) => {
                info!("Sent certificate to student {} ({})", student.student_id, student.email);
                report.sent.push(student.student_id);
            }
            Err(e) => {
                warn!("Certificate for student {} failed: {}", student.student_id, e);
                report.failures.push(DeliveryFailure {
                    student_id: student.student_id,
                    email: student.email.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Certificate delivery for class {}: {} sent, {} failed",
        class_id,
        report.sent.len(),
        report.failures.len()
    );
    Ok(report)
}
