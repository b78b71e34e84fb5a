use super::schema::Database;
use super::types::{Comment, ContentType, DatabaseError, NewComment};

const COMMENT_COLUMNS: &str = "id, content_type_id, object_pk, site_id, user_name, user_email, \
     user_url, comment, submit_date, is_public, is_removed";

impl Database {
    // ========================================================================
    // Content Type Operations
    // ========================================================================

    /// Get the content type for `(app_label, model)`, registering it on first use.
    pub async fn content_type_for(
        &self,
        app_label: &str,
        model: &str,
    ) -> Result<ContentType, DatabaseError> {
        sqlx::query(
            "INSERT INTO content_types (app_label, model) VALUES (?, ?) \
             ON CONFLICT(app_label, model) DO NOTHING",
        )
        .bind(app_label)
        .bind(model)
        .execute(&self.pool)
        .await?;

        let content_type = sqlx::query_as::<_, ContentType>(
            "SELECT id, app_label, model FROM content_types WHERE app_label = ? AND model = ?",
        )
        .bind(app_label)
        .bind(model)
        .fetch_one(&self.pool)
        .await?;
        Ok(content_type)
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    /// Get the comment whose every field equals `new`, creating it when absent.
    ///
    /// Matching is exact: differences in whitespace or letter case make a
    /// distinct comment. Returns the comment and whether it was created.
    pub async fn get_or_create_comment(
        &self,
        new: &NewComment,
    ) -> Result<(Comment, bool), DatabaseError> {
        let select = format!(
            r#"
                SELECT {COMMENT_COLUMNS}
                FROM comments
                WHERE content_type_id = ?
                  AND object_pk = ?
                  AND comment = ?
                  AND submit_date = ?
                  AND site_id = ?
                  AND user_name = ?
                  AND user_email = ?
                  AND user_url = ?
                ORDER BY id
                LIMIT 1
            "#
        );
        let existing = sqlx::query_as::<_, Comment>(&select)
            .bind(new.content_type_id)
            .bind(&new.object_pk)
            .bind(&new.comment)
            .bind(new.submit_date)
            .bind(new.site_id)
            .bind(&new.user_name)
            .bind(&new.user_email)
            .bind(&new.user_url)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(comment) = existing {
            return Ok((comment, false));
        }

        let insert = format!(
            r#"
                INSERT INTO comments
                    (content_type_id, object_pk, site_id, user_name, user_email, user_url,
                     comment, submit_date, is_public, is_removed)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, 0)
                RETURNING {COMMENT_COLUMNS}
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&insert)
            .bind(new.content_type_id)
            .bind(&new.object_pk)
            .bind(new.site_id)
            .bind(&new.user_name)
            .bind(&new.user_email)
            .bind(&new.user_url)
            .bind(&new.comment)
            .bind(new.submit_date)
            .fetch_one(&self.pool)
            .await?;
        Ok((comment, true))
    }

    /// Number of comments attached to one object.
    pub async fn count_comments_for(
        &self,
        content_type_id: i64,
        object_pk: &str,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM comments WHERE content_type_id = ? AND object_pk = ?",
        )
        .bind(content_type_id)
        .bind(object_pk)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Comments attached to one object, oldest submission first.
    pub async fn get_comments_for(
        &self,
        content_type_id: i64,
        object_pk: &str,
    ) -> Result<Vec<Comment>, DatabaseError> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE content_type_id = ? AND object_pk = ? ORDER BY submit_date, id"
        );
        let comments = sqlx::query_as::<_, Comment>(&query)
            .bind(content_type_id)
            .bind(object_pk)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }
}
