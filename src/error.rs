use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between a template upload and a mailed certificate.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// No composited base image exists yet for the class. Callers redirect to
    /// the setup page instead of failing the request.
    #[error("certificate base image {} has not been composited yet", .0.display())]
    MissingBaseImage(PathBuf),

    #[error("class {0} does not exist")]
    ClassNotFound(i32),

    #[error("malformed {field} image: {reason}")]
    MalformedImageInput { field: String, reason: String },

    #[error("mail dispatch to {recipient} failed: {reason}")]
    MailDispatchFailure { recipient: String, reason: String },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("font error: {0}")]
    Font(String),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("pdf serialization failed: {0}")]
    Pdf(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A blocking imaging job panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl CertificateError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(field: &str, reason: impl ToString) -> Self {
        Self::MalformedImageInput {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn task(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }

    /// Precondition failures the handlers turn into a redirect with a notice.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingBaseImage(_) | Self::MalformedImageInput { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_base_image_is_recoverable() {
        let err = CertificateError::MissingBaseImage(PathBuf::from("uploads/class3/x.jpeg"));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("uploads/class3/x.jpeg"));
    }

    #[test]
    fn filesystem_errors_are_fatal() {
        let err = CertificateError::filesystem(
            "uploads",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_recoverable());
        assert!(err.to_string().starts_with("filesystem error at uploads"));
    }

    #[tokio::test]
    async fn panicked_blocking_job_is_a_task_error() {
        let join_err = tokio::task::spawn_blocking::<_, ()>(|| panic!("compositor exploded"))
            .await
            .unwrap_err();
        let err = CertificateError::task(join_err);
        assert!(matches!(err, CertificateError::Task(_)));
        assert!(err.to_string().starts_with("background task failed"));
        assert!(!err.is_recoverable());
    }
}
