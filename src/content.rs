// Course content tables managed from the teacher panel.
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Course,
    Class,
    Module,
    Lesson,
    Video,
    Text,
    Exercise,
    Announcement,
}

/// Kinds a teacher can add inside a lesson.
pub const LESSON_CONTENT: [ContentKind; 3] =
    [ContentKind::Video, ContentKind::Text, ContentKind::Exercise];

impl ContentKind {
    /// Legacy numeric form codes (0 = course ... 7 = announcement).
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Course,
            1 => Self::Class,
            2 => Self::Module,
            3 => Self::Lesson,
            4 => Self::Video,
            5 => Self::Text,
            6 => Self::Exercise,
            7 => Self::Announcement,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Class => "class",
            Self::Module => "module",
            Self::Lesson => "lesson",
            Self::Video => "video",
            Self::Text => "text",
            Self::Exercise => "exercise",
            Self::Announcement => "announcement",
        }
    }

    /// Quoted SQL identifier of the backing table.
    pub fn table(self) -> String {
        format!("\"{}\"", self.name())
    }

    /// Column linking a new record to its owner or parent.
    pub fn parent_column(self) -> &'static str {
        match self {
            Self::Course => "course_owner",
            Self::Class => "course",
            Self::Module | Self::Announcement => "class_id",
            Self::Lesson => "lesson_module",
            Self::Video | Self::Text | Self::Exercise => "lesson",
        }
    }

    pub fn is_lesson_content(self) -> bool {
        LESSON_CONTENT.contains(&self)
    }

    /// Whether new records get a `place` default from their siblings.
    pub fn is_ordered(self) -> bool {
        matches!(self, Self::Module | Self::Lesson) || self.is_lesson_content()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content kind: {0}")]
pub struct UnknownContentKind(pub String);

impl FromStr for ContentKind {
    type Err = UnknownContentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| UnknownContentKind(s.to_string()));
        }
        [
            Self::Course,
            Self::Class,
            Self::Module,
            Self::Lesson,
            Self::Video,
            Self::Text,
            Self::Exercise,
            Self::Announcement,
        ]
        .into_iter()
        .find(|k| k.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| UnknownContentKind(s.to_string()))
    }
}

/// Field values a new record starts with, computed per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreationDefaults {
    pub kind: ContentKind,
    pub parent_column: &'static str,
    pub parent_id: i32,
    pub place: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_codes_map_to_kinds() {
        assert_eq!(ContentKind::from_code(0), Some(ContentKind::Course));
        assert_eq!(ContentKind::from_code(4), Some(ContentKind::Video));
        assert_eq!(ContentKind::from_code(7), Some(ContentKind::Announcement));
        assert_eq!(ContentKind::from_code(8), None);
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("exercise".parse(), Ok(ContentKind::Exercise));
        assert_eq!("Lesson".parse(), Ok(ContentKind::Lesson));
        assert_eq!("5".parse(), Ok(ContentKind::Text));
        assert!("quiz".parse::<ContentKind>().is_err());
        assert!("12".parse::<ContentKind>().is_err());
    }

    #[test]
    fn unknown_kind_names_the_input() {
        let err = "quiz".parse::<ContentKind>().unwrap_err();
        assert_eq!(err, UnknownContentKind("quiz".to_string()));
        assert_eq!(err.to_string(), "unknown content kind: quiz");
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn only_modules_lessons_and_items_are_ordered() {
        assert!(ContentKind::Module.is_ordered());
        assert!(ContentKind::Video.is_ordered());
        assert!(!ContentKind::Course.is_ordered());
        assert!(!ContentKind::Announcement.is_ordered());
    }

    #[test]
    fn class_table_is_quoted() {
        assert_eq!(ContentKind::Class.table(), "\"class\"");
        assert_eq!(ContentKind::Lesson.parent_column(), "lesson_module");
    }
}
