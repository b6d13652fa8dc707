use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::content::ContentKind;

/// A class together with the course metadata printed on its certificates.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ClassOverview {
    pub class_id: i32,
    pub course_id: i32,
    pub title: String,
    pub total_hours: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A course as listed on its owner's dashboard.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: i32,
    pub title: String,
    pub total_hours: i32,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EnrolledStudent {
    pub student_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl EnrolledStudent {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CertificateTemplate {
    pub id: i32,
    pub class_id: i32,
    pub bg_template: String,
    pub teacher_signature: String,
}

#[derive(Debug, FromRow)]
pub struct OutlineRow {
    pub id: i32,
    pub title: String,
    pub place: i32,
}

#[derive(Debug, FromRow)]
pub struct ContentRow {
    pub kind: String,
    pub id: i32,
    pub title: String,
    pub place: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    pub kind: ContentKind,
    pub id: i32,
    pub title: String,
    pub place: i32,
}

#[derive(Debug, Serialize)]
pub struct LessonOutline {
    pub id: i32,
    pub title: String,
    pub place: i32,
    pub contents: Vec<ContentItem>,
}

#[derive(Debug, Serialize)]
pub struct ModuleOutline {
    pub id: i32,
    pub title: String,
    pub place: i32,
    pub lessons: Vec<LessonOutline>,
}
