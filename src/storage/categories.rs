use super::schema::Database;
use super::types::{Category, DatabaseError};
use crate::util::strip_control_chars;

impl Database {
    // ========================================================================
    // Category Operations
    // ========================================================================

    /// SEC-014: Sanitize and validate a category title.
    ///
    /// Strips control characters (ANSI escape injection prevention), trims
    /// whitespace, and rejects empty/whitespace-only titles.
    fn sanitize_category_title(title: &str) -> Result<String, DatabaseError> {
        let sanitized = strip_control_chars(title);
        let trimmed = sanitized.trim();
        if trimmed.is_empty() {
            return Err(DatabaseError::InvalidInput(
                "Category title cannot be empty or whitespace-only".to_string(),
            ));
        }
        Ok(trimmed.to_owned())
    }

    /// Get the category matching both `title` and `slug`, creating it when absent.
    ///
    /// Returns the category and whether it was created by this call. A
    /// different category already owning `slug` makes the insert fail on the
    /// slug uniqueness constraint.
    pub async fn get_or_create_category(
        &self,
        title: &str,
        slug: &str,
    ) -> Result<(Category, bool), DatabaseError> {
        let clean_title = Self::sanitize_category_title(title)?;

        let existing = sqlx::query_as::<_, Category>(
            "SELECT id, title, slug FROM categories WHERE title = ? AND slug = ?",
        )
        .bind(&clean_title)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(category) = existing {
            return Ok((category, false));
        }

        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (title, slug) VALUES (?, ?) RETURNING id, title, slug",
        )
        .bind(&clean_title)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(category_id = category.id, title = %category.title, "Created category");
        Ok((category, true))
    }

    /// Get all categories ordered by title.
    pub async fn get_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, title, slug FROM categories ORDER BY title")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }
}
