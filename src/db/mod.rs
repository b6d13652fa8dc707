mod content;
mod models;

pub use content::*;
pub use models::*;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::CertificateError;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

/// Read access to the class, course and enrollment records certificates are
/// printed from.
pub trait Roster {
    async fn class_overview(&self, class_id: i32) -> Result<ClassOverview, CertificateError>;
    async fn enrolled_students(&self, class_id: i32)
        -> Result<Vec<EnrolledStudent>, CertificateError>;
}

impl Roster for PgPool {
    async fn class_overview(&self, class_id: i32) -> Result<ClassOverview, CertificateError> {
        get_class_overview(self, class_id)
            .await?
            .ok_or(CertificateError::ClassNotFound(class_id))
    }

    async fn enrolled_students(
        &self,
        class_id: i32,
    ) -> Result<Vec<EnrolledStudent>, CertificateError> {
        Ok(get_enrolled_students(self, class_id).await?)
    }
}

pub async fn get_class_overview(
    pool: &PgPool,
    class_id: i32,
) -> Result<Option<ClassOverview>, sqlx::Error> {
    sqlx::query_as::<_, ClassOverview>(
        r#"
        SELECT c.id AS class_id, co.id AS course_id, co.title, co.total_hours,
               c.start_date, c.end_date
        FROM "class" c
        JOIN course co ON co.id = c.course
        WHERE c.id = $1
        "#,
    )
    .bind(class_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_courses(
    pool: &PgPool,
    owner_id: i32,
) -> Result<Vec<CourseSummary>, sqlx::Error> {
    sqlx::query_as::<_, CourseSummary>(
        "SELECT id, title, total_hours FROM course WHERE course_owner = $1 ORDER BY id",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

/// Newest classes first within each course; `course_id` narrows the listing
/// to one of the owner's courses.
const OWNED_CLASSES_SQL: &str = r#"
    SELECT c.id AS class_id, co.id AS course_id, co.title, co.total_hours,
           c.start_date, c.end_date
    FROM "class" c
    JOIN course co ON co.id = c.course
    WHERE co.course_owner = $1
      AND ($2::int4 IS NULL OR c.course = $2)
    ORDER BY c.course, c.start_date DESC
    "#;

pub async fn list_classes(
    pool: &PgPool,
    course_id: Option<i32>,
    owner_id: i32,
) -> Result<Vec<ClassOverview>, sqlx::Error> {
    sqlx::query_as::<_, ClassOverview>(OWNED_CLASSES_SQL)
        .bind(owner_id)
        .bind(course_id)
        .fetch_all(pool)
        .await
}

pub async fn get_enrolled_students(
    pool: &PgPool,
    class_id: i32,
) -> Result<Vec<EnrolledStudent>, sqlx::Error> {
    sqlx::query_as::<_, EnrolledStudent>(
        r#"
        SELECT u.id AS student_id, u.first_name, u.last_name, u.email
        FROM student s
        JOIN auth_user u ON u.id = s.student
        WHERE s.class_id = $1
        ORDER BY u.id
        "#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await
}

pub async fn get_certificate_template(
    pool: &PgPool,
    class_id: i32,
) -> Result<Option<CertificateTemplate>, sqlx::Error> {
    sqlx::query_as::<_, CertificateTemplate>(
        "SELECT id, class_id, bg_template, teacher_signature FROM certificate WHERE class_id = $1",
    )
    .bind(class_id)
    .fetch_optional(pool)
    .await
}

/// Records the uploaded files for a class, replacing any earlier submission.
pub async fn save_certificate_template(
    pool: &PgPool,
    class_id: i32,
    bg_template: &str,
    teacher_signature: &str,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM certificate WHERE class_id = $1")
        .bind(class_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO certificate (class_id, bg_template, teacher_signature)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(class_id)
    .bind(bg_template)
    .bind(teacher_signature)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}
