use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use std::io::Write;
use std::sync::Arc;

use crate::content::ContentKind;
use crate::state::AppState;

fn pdf_response(disposition: String, content: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response()
}

/// Streams a generated certificate inline so the browser can display it.
pub async fn download_pdf(
    State(state): State<Arc<AppState>>,
    Path((folder, document)): Path<(String, String)>,
) -> impl IntoResponse {
    let Some(path) = state.storage.document_path(&folder, &document) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(content) => pdf_response(format!("inline; filename=\"{}.pdf\"", document), content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn zip_certificates(paths: &[std::path::PathBuf]) -> zip::result::ZipResult<Vec<u8>> {
    let mut zip_data = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut zip_data));
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);

        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let content = std::fs::read(path)?;
            zip.start_file(name, options)?;
            zip.write_all(&content)?;
        }

        zip.finish()?;
    }
    Ok(zip_data)
}

/// Every student certificate rendered for a class, as one zip archive.
pub async fn download_bundle(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<i32>,
) -> impl IntoResponse {
    let paths = match state.storage.student_pdfs(class_id) {
        Ok(p) if !p.is_empty() => p,
        Ok(_) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Failed to list certificates of class {}: {}", class_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match zip_certificates(&paths) {
        Ok(zip_data) => (
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"class{}_certificates.zip\"", class_id),
                ),
            ],
            zip_data,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to bundle certificates of class {}: {}", class_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn lessons_outline(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<i32>,
) -> impl IntoResponse {
    match crate::db::class_outline(state.pool.as_ref(), class_id).await {
        Ok(outline) => Json(serde_json::json!({
            "class_id": class_id,
            "modules": outline,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to load lessons of class {}: {}", class_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<i32>,
) -> impl IntoResponse {
    match crate::db::list_courses(state.pool.as_ref(), owner_id).await {
        Ok(courses) => Json(serde_json::json!({
            "owner_id": owner_id,
            "courses": courses,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to list courses of owner {}: {}", owner_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClassFilter {
    course: Option<i32>,
}

pub async fn list_classes(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<i32>,
    Query(filter): Query<ClassFilter>,
) -> impl IntoResponse {
    match crate::db::list_classes(state.pool.as_ref(), filter.course, owner_id).await {
        Ok(classes) => Json(serde_json::json!({
            "owner_id": owner_id,
            "course": filter.course,
            "classes": classes,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to list classes of owner {}: {}", owner_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn creation_defaults(
    State(state): State<Arc<AppState>>,
    Path((kind, parent_id)): Path<(String, i32)>,
) -> impl IntoResponse {
    let kind: ContentKind = match kind.parse() {
        Ok(k) => k,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    };

    match crate::db::creation_defaults(state.pool.as_ref(), kind, parent_id).await {
        Ok(defaults) => Json(defaults).into_response(),
        Err(e) => {
            tracing::error!("Failed to compute defaults for {:?}: {}", kind, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

/// Only same-site absolute paths are followed after a delete.
fn local_redirect(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") => n,
        _ => "/",
    }
}

pub async fn delete_content(
    State(state): State<Arc<AppState>>,
    Path((kind, record_id)): Path<(String, i32)>,
    Query(query): Query<NextQuery>,
) -> impl IntoResponse {
    let Ok(kind) = kind.parse::<ContentKind>() else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match crate::db::delete_record(state.pool.as_ref(), kind, record_id).await {
        Ok(deleted) => {
            tracing::info!("Deleted {} {} ({} rows)", kind.name(), record_id, deleted);
            Redirect::to(local_redirect(query.next.as_deref())).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to delete {} {}: {}", kind.name(), record_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn redirects_stay_on_site() {
        assert_eq!(local_redirect(Some("/classes/3/lessons")), "/classes/3/lessons");
        assert_eq!(local_redirect(Some("https://evil.example")), "/");
        assert_eq!(local_redirect(Some("//evil.example")), "/");
        assert_eq!(local_redirect(None), "/");
    }

    #[test]
    fn class_filter_is_optional() {
        let uri: axum::http::Uri = "/teachers/2/classes?course=4".parse().unwrap();
        let Query(filter) = Query::<ClassFilter>::try_from_uri(&uri).unwrap();
        assert_eq!(filter.course, Some(4));

        let uri: axum::http::Uri = "/teachers/2/classes".parse().unwrap();
        let Query(filter) = Query::<ClassFilter>::try_from_uri(&uri).unwrap();
        assert_eq!(filter.course, None);

        let uri: axum::http::Uri = "/teachers/2/classes?course=abc".parse().unwrap();
        assert!(Query::<ClassFilter>::try_from_uri(&uri).is_err());
    }

    #[test]
    fn bundle_contains_each_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("certificate-student-1.pdf");
        let b = dir.path().join("certificate-student-2.pdf");
        std::fs::write(&a, b"%PDF one").unwrap();
        std::fs::write(&b, b"%PDF two").unwrap();

        let data = zip_certificates(&[a, b]).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("certificate-student-2.pdf")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "%PDF two");
    }

    #[test]
    fn inline_pdf_headers() {
        let response = pdf_response("inline; filename=\"preview.pdf\"".to_string(), b"%PDF".to_vec());
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"preview.pdf\""
        );
    }
}
