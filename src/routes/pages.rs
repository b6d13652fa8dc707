use axum::{
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect},
};
use std::future::Future;
use std::sync::Arc;
use tera::Context;

use super::notice::{delivery_url, notice_for_error, setup_url, NoticeKind, NoticeQuery};
use crate::certificate::{self, CertificateContext};
use crate::db::{get_certificate_template, save_certificate_template, CertificateTemplate, Roster};
use crate::error::CertificateError;
use crate::state::AppState;
use crate::storage::CertificateStorage;

fn certificate_context(state: &AppState) -> CertificateContext<'_> {
    CertificateContext {
        storage: &state.storage,
        face: state.face.clone(),
        locale: state.locale,
    }
}

fn redirect_for_error(class_id: i32, err: &CertificateError) -> Redirect {
    if err.is_recoverable() {
        tracing::warn!("Certificate request for class {}: {}", class_id, err);
    } else {
        tracing::error!("Certificate request for class {} failed: {}", class_id, err);
    }
    Redirect::to(&setup_url(class_id, notice_for_error(err)))
}

pub async fn certificate_setup(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<i32>,
    Query(notice): Query<NoticeQuery>,
) -> impl IntoResponse {
    let class = match state.pool.class_overview(class_id).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load class {}: {}", class_id, e);
            return Redirect::to("/").into_response();
        }
    };

    let template = get_certificate_template(state.pool.as_ref(), class_id)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to load certificate template for class {}: {}", class_id, e);
            None
        });
    let has_base = state
        .storage
        .base_jpeg(class.course_id, class.class_id)
        .exists();

    let mut ctx = Context::new();
    ctx.insert("class", &class);
    ctx.insert("template", &template);
    ctx.insert("has_base", &has_base);
    ctx.insert("notice", &notice.message());
    ctx.insert(
        "base_pdf",
        &format!("/download/class{}/certificate-{}-{}", class_id, class.course_id, class_id),
    );

    render_template("certificate_setup.html", ctx).into_response()
}

struct Upload {
    filename: String,
    data: Vec<u8>,
}

fn check_image_upload(field: &str, upload: Option<Upload>) -> Result<Upload, CertificateError> {
    let upload = upload
        .filter(|u| !u.data.is_empty())
        .ok_or_else(|| CertificateError::malformed(field, "no file uploaded"))?;
    let is_image = mime_guess::from_path(&upload.filename)
        .first()
        .map_or(false, |m| m.type_() == mime_guess::mime::IMAGE);
    if !is_image {
        return Err(CertificateError::malformed(
            field,
            format!("{} is not an image", upload.filename),
        ));
    }
    Ok(upload)
}

async fn store_template(
    state: &AppState,
    class_id: i32,
    mut multipart: Multipart,
) -> Result<(), CertificateError> {
    let mut background = None;
    let mut signature = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().unwrap_or("").to_string();
        let Ok(data) = field.bytes().await else {
            continue;
        };
        let upload = Some(Upload {
            filename,
            data: data.to_vec(),
        });
        match name.as_str() {
            "bg_template" => background = upload,
            "teacher_signature" => signature = upload,
            _ => {}
        }
    }

    let background = check_image_upload("bg_template", background)?;
    let signature = check_image_upload("teacher_signature", signature)?;

    let class = state.pool.class_overview(class_id).await?;
    let previous = get_certificate_template(state.pool.as_ref(), class_id).await?;

    let bg_name = state
        .storage
        .save_upload("bg_template", &background.filename, &background.data)?;
    let sig_name = match state
        .storage
        .save_upload("teacher_signature", &signature.filename, &signature.data)
    {
        Ok(name) => name,
        Err(e) => {
            state.storage.remove_uploads(&[&bg_name]);
            return Err(e);
        }
    };

    let (course_id, class_id) = (class.course_id, class.class_id);
    let commit = async {
        let storage = state.storage.clone();
        let bg_path = storage.upload_path(&bg_name);
        let sig_path = storage.upload_path(&sig_name);
        let base = tokio::task::spawn_blocking(move || {
            certificate::composite(&storage, &bg_path, &sig_path, class_id, course_id)
        })
        .await
        .map_err(CertificateError::task)??;
        tracing::info!(
            "Certificate base for class {} is {}x{} ({}, {})",
            class_id,
            base.width,
            base.height,
            base.jpeg_path.display(),
            base.pdf_path.display()
        );

        save_certificate_template(state.pool.as_ref(), class_id, &bg_name, &sig_name).await?;
        Ok::<(), CertificateError>(())
    };

    settle_uploads(&state.storage, previous, [bg_name.clone(), sig_name.clone()], commit).await
}

/// Keeps exactly one pair of uploads on disk: the new pair once `commit`
/// succeeds, the previous pair otherwise.
async fn settle_uploads(
    storage: &CertificateStorage,
    previous: Option<CertificateTemplate>,
    stored: [String; 2],
    commit: impl Future<Output = Result<(), CertificateError>>,
) -> Result<(), CertificateError> {
    match commit.await {
        Ok(()) => {
            if let Some(old) = previous {
                storage.remove_uploads(&[old.bg_template, old.teacher_signature]);
            }
            Ok(())
        }
        Err(e) => {
            storage.remove_uploads(&stored);
            Err(e)
        }
    }
}

pub async fn upload_template(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<i32>,
    multipart: Multipart,
) -> impl IntoResponse {
    match store_template(&state, class_id, multipart).await {
        Ok(()) => Redirect::to(&setup_url(class_id, NoticeKind::TemplateSaved)),
        Err(e) => redirect_for_error(class_id, &e),
    }
}

pub async fn send_certificates(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<i32>,
) -> impl IntoResponse {
    let ctx = certificate_context(&state);
    match certificate::deliver(&ctx, state.pool.as_ref(), state.mailer.as_ref(), class_id).await {
        Ok(report) => Redirect::to(&delivery_url(&report)),
        Err(e) => redirect_for_error(class_id, &e),
    }
}

pub async fn preview_certificate(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<i32>,
) -> impl IntoResponse {
    let ctx = certificate_context(&state);
    match certificate::preview(&ctx, state.pool.as_ref(), class_id).await {
        Ok(_) => Redirect::to(&format!("/download/class{}/preview", class_id)),
        Err(e) => redirect_for_error(class_id, &e),
    }
}

fn render_template(name: &str, ctx: Context) -> Html<String> {
    let tera = crate::templates::get_tera();
    let rendered = tera.render(name, &ctx).unwrap_or_else(|e| {
        tracing::error!("Template {} failed to render: {}", name, e);
        format!("Template error: {}", name)
    });
    Html(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, data: &[u8]) -> Option<Upload> {
        Some(Upload {
            filename: name.to_string(),
            data: data.to_vec(),
        })
    }

    #[test]
    fn accepts_image_uploads() {
        let upload = check_image_upload("bg_template", upload("frame.PNG", b"\x89PNG")).unwrap();
        assert_eq!(upload.filename, "frame.PNG");
        assert!(check_image_upload("bg_template", upload_jpeg()).is_ok());
    }

    fn upload_jpeg() -> Option<Upload> {
        upload("signature.jpeg", b"\xff\xd8")
    }

    #[test]
    fn rejects_missing_empty_and_non_image_uploads() {
        for candidate in [None, upload("frame.png", b""), upload("notes.pdf", b"%PDF")] {
            match check_image_upload("teacher_signature", candidate) {
                Err(CertificateError::MalformedImageInput { field, .. }) => {
                    assert_eq!(field, "teacher_signature")
                }
                other => panic!("unexpected: {:?}", other.map(|u| u.filename)),
            }
        }
    }

    fn stored_pair(storage: &CertificateStorage) -> [String; 2] {
        [
            storage.save_upload("bg_template", "frame.png", b"bg").unwrap(),
            storage.save_upload("teacher_signature", "sig.png", b"sig").unwrap(),
        ]
    }

    fn template(pair: &[String; 2]) -> CertificateTemplate {
        CertificateTemplate {
            id: 1,
            class_id: 3,
            bg_template: pair[0].clone(),
            teacher_signature: pair[1].clone(),
        }
    }

    #[tokio::test]
    async fn saved_template_replaces_previous_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CertificateStorage::new(dir.path());
        let old = stored_pair(&storage);
        let new = stored_pair(&storage);

        settle_uploads(&storage, Some(template(&old)), new.clone(), std::future::ready(Ok(())))
            .await
            .unwrap();

        assert!(old.iter().all(|n| !storage.upload_path(n).exists()));
        assert!(new.iter().all(|n| storage.upload_path(n).exists()));
    }

    #[tokio::test]
    async fn failed_template_discards_new_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CertificateStorage::new(dir.path());
        let old = stored_pair(&storage);
        let new = stored_pair(&storage);

        let result = settle_uploads(
            &storage,
            Some(template(&old)),
            new.clone(),
            std::future::ready(Err(CertificateError::malformed("bg_template", "truncated"))),
        )
        .await;

        assert!(matches!(result, Err(CertificateError::MalformedImageInput { .. })));
        assert!(old.iter().all(|n| storage.upload_path(n).exists()));
        assert!(new.iter().all(|n| !storage.upload_path(n).exists()));
    }

    #[test]
    fn setup_page_renders_class_and_notice() {
        let mut ctx = Context::new();
        ctx.insert(
            "class",
            &crate::db::ClassOverview {
                class_id: 3,
                course_id: 1,
                title: "Intro to Biology".to_string(),
                total_hours: 40,
                start_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                end_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            },
        );
        ctx.insert("template", &Option::<crate::db::CertificateTemplate>::None);
        ctx.insert("has_base", &false);
        ctx.insert("notice", &Some("First, import a template and signature!"));
        ctx.insert("base_pdf", "/download/class3/certificate-1-3");

        let Html(page) = render_template("certificate_setup.html", ctx);
        assert!(page.contains("Intro to Biology"));
        assert!(page.contains("First, import a template and signature!"));
        assert!(page.contains("name=\"bg_template\""));
        assert!(!page.contains("/classes/3/certificate/send"));
    }
}
