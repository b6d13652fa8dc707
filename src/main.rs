mod certificate;
mod config;
mod content;
mod db;
mod error;
mod mail;
mod pdf;
mod routes;
mod state;
mod storage;
mod templates;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classroom_certificates=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;

    crate::storage::ensure_dirs(&config.upload_folder)?;

    let face = certificate::TrueTypeFace::load(&config.font_path, config.font_size)?;
    let mailer = mail::HttpMailer::new(
        config.mail_relay_url.clone(),
        config.mail_api_key.clone(),
        config.mail_sender.clone(),
    )?;

    let pool = db::create_pool(&config.database_url).await?;

    let state = Arc::new(state::AppState {
        pool,
        storage: storage::CertificateStorage::new(&config.upload_folder),
        face: Arc::new(face),
        mailer: Arc::new(mailer),
        locale: config.chrono_locale(),
    });

    let app = Router::new()
        .route(
            "/classes/:class_id/certificate",
            get(routes::certificate_setup).post(routes::upload_template),
        )
        .route("/classes/:class_id/certificate/send", post(routes::send_certificates))
        .route("/classes/:class_id/certificate/preview", get(routes::preview_certificate))
        .route("/classes/:class_id/certificate/bundle", get(routes::download_bundle))
        .route("/classes/:class_id/lessons", get(routes::lessons_outline))
        .route("/teachers/:owner_id/courses", get(routes::list_courses))
        .route("/teachers/:owner_id/classes", get(routes::list_classes))
        .route("/download/:folder/:document", get(routes::download_pdf))
        .route("/content/:kind/:parent_id/defaults", get(routes::creation_defaults))
        .route("/content/:kind/:record_id/delete", post(routes::delete_content))
        .nest_service("/static", tower_http::services::ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Certificate panel listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
