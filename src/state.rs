use crate::certificate::TrueTypeFace;
use crate::db::DbPool;
use crate::mail::HttpMailer;
use crate::storage::CertificateStorage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub storage: CertificateStorage,
    pub face: Arc<TrueTypeFace>,
    pub mailer: Arc<HttpMailer>,
    pub locale: chrono::Locale,
}
