use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::CertificateError;

static FOLDER_TOKEN: OnceLock<Regex> = OnceLock::new();
static DOCUMENT_TOKEN: OnceLock<Regex> = OnceLock::new();

/// Filesystem layout of everything the certificate pipeline reads and writes.
///
/// ```text
/// <upload_root>/
///   certificate.<field>.<uuid>.<ext>          raw uploads
///   class<class_id>/
///     certificate-<course_id>-<class_id>.jpeg base image
///     certificate-<course_id>-<class_id>.pdf
///     certificate-student-<student_id>.pdf
///     preview.pdf
/// ```
#[derive(Debug, Clone)]
pub struct CertificateStorage {
    upload_root: PathBuf,
}

impl CertificateStorage {
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
        }
    }

    pub fn class_folder(&self, class_id: i32) -> PathBuf {
        self.upload_root.join(format!("class{}", class_id))
    }

    pub fn ensure_class_folder(&self, class_id: i32) -> Result<PathBuf, CertificateError> {
        let folder = self.class_folder(class_id);
        std::fs::create_dir_all(&folder).map_err(|e| CertificateError::filesystem(&folder, e))?;
        Ok(folder)
    }

    pub fn base_jpeg(&self, course_id: i32, class_id: i32) -> PathBuf {
        self.class_folder(class_id)
            .join(format!("certificate-{}-{}.jpeg", course_id, class_id))
    }

    pub fn base_pdf(&self, course_id: i32, class_id: i32) -> PathBuf {
        self.class_folder(class_id)
            .join(format!("certificate-{}-{}.pdf", course_id, class_id))
    }

    pub fn student_pdf(&self, class_id: i32, student_id: i32) -> PathBuf {
        self.class_folder(class_id)
            .join(format!("certificate-student-{}.pdf", student_id))
    }

    pub fn preview_pdf(&self, class_id: i32) -> PathBuf {
        self.class_folder(class_id).join("preview.pdf")
    }

    /// Every rendered student certificate of a class, sorted by file name.
    pub fn student_pdfs(&self, class_id: i32) -> Result<Vec<PathBuf>, CertificateError> {
        let folder = self.class_folder(class_id);
        let entries = match std::fs::read_dir(&folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CertificateError::filesystem(&folder, e)),
        };

        let mut pdfs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("certificate-student-") && n.ends_with(".pdf"))
            })
            .collect();
        pdfs.sort();
        Ok(pdfs)
    }

    /// Resolves a `(folder, document)` token pair from the download route to a
    /// PDF path, rejecting anything that is not `class<digits>` / a plain name.
    pub fn document_path(&self, folder: &str, document: &str) -> Option<PathBuf> {
        let folder_re = FOLDER_TOKEN.get_or_init(|| Regex::new(r"^class\d+$").unwrap());
        let document_re =
            DOCUMENT_TOKEN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

        if !folder_re.is_match(folder) || !document_re.is_match(document) {
            return None;
        }
        Some(self.upload_root.join(folder).join(format!("{}.pdf", document)))
    }

    /// Stores a raw upload under a generated name and returns that name.
    pub fn save_upload(
        &self,
        field: &str,
        original_filename: &str,
        data: &[u8],
    ) -> Result<String, CertificateError> {
        let extension = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_lowercase();
        let stored_name = format!("certificate.{}.{}.{}", field, Uuid::new_v4().simple(), extension);
        let path = self.upload_root.join(&stored_name);
        write_atomically(&path, |w| w.write_all(data))?;
        Ok(stored_name)
    }

    pub fn upload_path(&self, stored_name: &str) -> PathBuf {
        self.upload_root.join(stored_name)
    }

    /// Deletes stored uploads by name and returns how many were removed.
    /// Names that are not plain `certificate.*` file names are skipped, and a
    /// file that is already gone is not an error.
    pub fn remove_uploads<S: AsRef<str>>(&self, stored_names: &[S]) -> usize {
        let mut removed = 0;
        for name in stored_names.iter().map(AsRef::as_ref) {
            let is_plain = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
            if !is_plain || !name.starts_with("certificate.") {
                tracing::warn!("Refusing to remove upload {:?}", name);
                continue;
            }
            let path = self.upload_path(name);
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        removed
    }
}

pub fn ensure_dirs(upload_folder: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(upload_folder)
}

/// Writes `path` through a temporary sibling file that is renamed into place
/// once `write` succeeds. Concurrent writers race, the last rename wins.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<(), CertificateError>
where
    F: FnOnce(&mut std::io::BufWriter<&std::fs::File>) -> std::io::Result<()>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CertificateError::filesystem(dir, e))?;

    {
        let mut writer = std::io::BufWriter::new(tmp.as_file());
        write(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| CertificateError::filesystem(path, e))?;
    }

    tmp.persist(path)
        .map_err(|e| CertificateError::filesystem(path, e.error))?;
    Ok(())
}
