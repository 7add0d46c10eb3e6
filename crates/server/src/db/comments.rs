use api_types::Comment;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const COMMENT_COLUMNS: &str = "id, user_id, project_id, pr_number, content, file_path, \
                               line_number, parent_id, deleted, edited, created_at, updated_at";

pub struct CommentRepository;

impl CommentRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        project_id: Uuid,
        pr_number: i64,
        content: &str,
        file_path: Option<&str>,
        line_number: Option<i64>,
        parent_id: Option<Uuid>,
    ) -> Result<Comment, CommentError> {
        let id = Uuid::new_v4();
        let record = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (id, user_id, project_id, pr_number, content, file_path,
                                  line_number, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(project_id)
        .bind(pr_number)
        .bind(content)
        .bind(file_path)
        .bind(line_number)
        .bind(parent_id)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Comment>, CommentError> {
        let record = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Live comments for a pull request; tombstoned rows are filtered here,
    /// at the read boundary.
    pub async fn list_for_pull_request(
        pool: &SqlitePool,
        project_id: Uuid,
        pr_number: i64,
    ) -> Result<Vec<Comment>, CommentError> {
        let records = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE project_id = $1 AND pr_number = $2 AND deleted = 0
            ORDER BY created_at
            "#
        ))
        .bind(project_id)
        .bind(pr_number)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    pub async fn update_content(
        pool: &SqlitePool,
        id: Uuid,
        content: &str,
    ) -> Result<Comment, CommentError> {
        let record = sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET content = $1,
                edited = 1,
                updated_at = datetime('now', 'subsec')
            WHERE id = $2
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(content)
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Tombstone delete: content is redacted and the row kept so reply
    /// references stay valid.
    pub async fn tombstone(pool: &SqlitePool, id: Uuid) -> Result<Comment, CommentError> {
        let record = sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET content = '',
                deleted = 1,
                updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{projects::ProjectRepository, users::UserRepository};

    async fn seed(pool: &SqlitePool) -> (Uuid, Uuid) {
        let project = ProjectRepository::create(pool, "p", "octo", "p").await.unwrap();
        let user = UserRepository::create(pool, "u1", "User One", None).await.unwrap();
        (user.id, project.id)
    }

    #[sqlx::test]
    async fn tombstone_keeps_the_row_for_replies(pool: SqlitePool) {
        let (user_id, project_id) = seed(&pool).await;

        let parent = CommentRepository::create(
            &pool, user_id, project_id, 7, "looks off", Some("src/lib.rs"), Some(10), None,
        )
        .await
        .unwrap();
        let reply = CommentRepository::create(
            &pool, user_id, project_id, 7, "agreed", None, None, Some(parent.id),
        )
        .await
        .unwrap();

        let gone = CommentRepository::tombstone(&pool, parent.id).await.unwrap();
        assert!(gone.deleted);
        assert!(gone.content.is_empty());

        // The row is still addressable and the reply's reference intact.
        let fetched = CommentRepository::find_by_id(&pool, parent.id)
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.deleted);
        assert_eq!(reply.parent_id, Some(parent.id));
    }

    #[sqlx::test]
    async fn listing_filters_tombstoned_comments(pool: SqlitePool) {
        let (user_id, project_id) = seed(&pool).await;

        let kept = CommentRepository::create(
            &pool, user_id, project_id, 7, "first", None, None, None,
        )
        .await
        .unwrap();
        let removed = CommentRepository::create(
            &pool, user_id, project_id, 7, "second", None, None, None,
        )
        .await
        .unwrap();
        CommentRepository::tombstone(&pool, removed.id).await.unwrap();

        let live = CommentRepository::list_for_pull_request(&pool, project_id, 7)
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, kept.id);
    }

    #[sqlx::test]
    async fn editing_marks_the_comment_edited(pool: SqlitePool) {
        let (user_id, project_id) = seed(&pool).await;

        let comment = CommentRepository::create(
            &pool, user_id, project_id, 7, "first pass", None, None, None,
        )
        .await
        .unwrap();
        assert!(!comment.edited);

        let updated = CommentRepository::update_content(&pool, comment.id, "second pass")
            .await
            .unwrap();
        assert!(updated.edited);
        assert_eq!(updated.content, "second pass");
        assert_eq!(updated.created_at, comment.created_at);
    }
}
