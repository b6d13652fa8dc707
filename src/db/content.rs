use sqlx::PgPool;

use super::models::{ContentItem, ContentRow, LessonOutline, ModuleOutline, OutlineRow};
use crate::content::{ContentKind, CreationDefaults, LESSON_CONTENT};

/// SQL counting the siblings a new record of `kind` is placed after.
pub fn sibling_count_sql(kind: ContentKind) -> Option<String> {
    if kind.is_lesson_content() {
        let counts: Vec<String> = LESSON_CONTENT
            .iter()
            .map(|k| format!("(SELECT COUNT(*) FROM {} WHERE lesson = $1)", k.table()))
            .collect();
        return Some(format!("SELECT {}", counts.join(" + ")));
    }
    if kind.is_ordered() {
        return Some(format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            kind.table(),
            kind.parent_column()
        ));
    }
    None
}

pub async fn creation_defaults(
    pool: &PgPool,
    kind: ContentKind,
    parent_id: i32,
) -> Result<CreationDefaults, sqlx::Error> {
    let place = match sibling_count_sql(kind) {
        Some(sql) => Some(
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(parent_id)
                .fetch_one(pool)
                .await?,
        ),
        None => None,
    };

    Ok(CreationDefaults {
        kind,
        parent_column: kind.parent_column(),
        parent_id,
        place,
    })
}

pub async fn delete_record(
    pool: &PgPool,
    kind: ContentKind,
    record_id: i32,
) -> Result<u64, sqlx::Error> {
    let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
    let result = sqlx::query(&sql).bind(record_id).execute(pool).await?;
    Ok(result.rows_affected())
}

/// Merges a lesson's videos, texts and exercises into one list ordered by
/// `place`. Items sharing a place keep their fetch order.
pub fn sort_by_place(rows: Vec<ContentRow>) -> Vec<ContentItem> {
    let mut items: Vec<ContentItem> = rows
        .into_iter()
        .filter_map(|row| {
            let kind = row.kind.parse().ok()?;
            Some(ContentItem {
                kind,
                id: row.id,
                title: row.title,
                place: row.place,
            })
        })
        .collect();
    items.sort_by_key(|item| item.place);
    items
}

async fn lesson_contents(pool: &PgPool, lesson_id: i32) -> Result<Vec<ContentItem>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ContentRow>(
        r#"
        SELECT 'video' AS kind, id, title, place FROM video WHERE lesson = $1
        UNION ALL
        SELECT 'text' AS kind, id, title, place FROM text WHERE lesson = $1
        UNION ALL
        SELECT 'exercise' AS kind, id, title, place FROM exercise WHERE lesson = $1
        "#,
    )
    .bind(lesson_id)
    .fetch_all(pool)
    .await?;

    Ok(sort_by_place(rows))
}

/// Modules of a class with their lessons and ordered lesson contents.
pub async fn class_outline(pool: &PgPool, class_id: i32) -> Result<Vec<ModuleOutline>, sqlx::Error> {
    let modules = sqlx::query_as::<_, OutlineRow>(
        "SELECT id, title, place FROM module WHERE class_id = $1 ORDER BY place, id",
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    let mut outline = Vec::with_capacity(modules.len());
    for module in modules {
        let lessons = sqlx::query_as::<_, OutlineRow>(
            "SELECT id, title, place FROM lesson WHERE lesson_module = $1 ORDER BY place, id",
        )
        .bind(module.id)
        .fetch_all(pool)
        .await?;

        let mut lesson_outlines = Vec::with_capacity(lessons.len());
        for lesson in lessons {
            let contents = lesson_contents(pool, lesson.id).await?;
            lesson_outlines.push(LessonOutline {
                id: lesson.id,
                title: lesson.title,
                place: lesson.place,
                contents,
            });
        }

        outline.push(ModuleOutline {
            id: module.id,
            title: module.title,
            place: module.place,
            lessons: lesson_outlines,
        });
    }

    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, id: i32, place: i32) -> ContentRow {
        ContentRow {
            kind: kind.to_string(),
            id,
            title: format!("{kind} {id}"),
            place,
        }
    }

    #[test]
    fn lesson_contents_are_ordered_by_place_across_kinds() {
        let items = sort_by_place(vec![
            row("video", 1, 2),
            row("video", 2, 0),
            row("text", 3, 1),
            row("exercise", 4, 3),
        ]);
        let order: Vec<(ContentKind, i32)> = items.iter().map(|i| (i.kind, i.id)).collect();
        assert_eq!(
            order,
            vec![
                (ContentKind::Video, 2),
                (ContentKind::Text, 3),
                (ContentKind::Video, 1),
                (ContentKind::Exercise, 4),
            ]
        );
    }

    #[test]
    fn equal_places_keep_fetch_order() {
        let items = sort_by_place(vec![row("text", 8, 1), row("exercise", 2, 1)]);
        assert_eq!(items[0].id, 8);
        assert_eq!(items[1].id, 2);
    }

    #[test]
    fn lesson_content_place_counts_all_item_tables() {
        let sql = sibling_count_sql(ContentKind::Text).unwrap();
        assert!(sql.contains("FROM \"video\" WHERE lesson = $1"));
        assert!(sql.contains("FROM \"text\" WHERE lesson = $1"));
        assert!(sql.contains("FROM \"exercise\" WHERE lesson = $1"));
    }

    #[test]
    fn module_place_counts_modules_of_the_class() {
        assert_eq!(
            sibling_count_sql(ContentKind::Module).unwrap(),
            "SELECT COUNT(*) FROM \"module\" WHERE class_id = $1"
        );
        assert!(sibling_count_sql(ContentKind::Course).is_none());
        assert!(sibling_count_sql(ContentKind::Announcement).is_none());
    }
}
