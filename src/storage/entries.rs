use super::schema::Database;
use super::types::{DatabaseError, Entry, EntryAssociations, EntryDbRow, EntryKey, NewEntry, Tag};

const ENTRY_COLUMNS: &str =
    "e.id, e.title, e.slug, e.content, e.status, e.creation_date, e.last_update, e.tags";

impl Database {
    // ========================================================================
    // Entry Operations
    // ========================================================================

    /// Find an entry matching every field of the deduplication key.
    ///
    /// The site, author and category must each be linked to the entry; the
    /// remaining fields are compared exactly. With several matches the oldest
    /// entry wins.
    pub async fn find_entry(&self, key: &EntryKey<'_>) -> Result<Option<Entry>, DatabaseError> {
        let query = format!(
            r#"
                SELECT {ENTRY_COLUMNS}
                FROM entries e
                JOIN entry_sites es ON es.entry_id = e.id AND es.site_id = ?
                JOIN entry_authors ea ON ea.entry_id = e.id AND ea.user_id = ?
                JOIN entry_categories ec ON ec.entry_id = e.id AND ec.category_id = ?
                WHERE e.status = ?
                  AND e.title = ?
                  AND e.content = ?
                  AND e.creation_date = ?
                  AND e.slug = ?
                ORDER BY e.id
                LIMIT 1
            "#
        );

        let row = sqlx::query_as::<_, EntryDbRow>(&query)
            .bind(key.site_id)
            .bind(key.author_id)
            .bind(key.category_id)
            .bind(key.status.as_i64())
            .bind(key.title)
            .bind(key.content)
            .bind(key.creation_date)
            .bind(key.slug)
            .fetch_optional(&self.pool)
            .await?;

        row.map(EntryDbRow::into_entry).transpose()
    }

    /// Create an entry with its site, category, author and tag links.
    ///
    /// Everything is written in one transaction, so a failure leaves no
    /// half-linked entry behind. Repeated tag slugs are linked once.
    pub async fn insert_entry(&self, new: &NewEntry) -> Result<Entry, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, EntryDbRow>(
            r#"
                INSERT INTO entries (title, slug, content, status, creation_date, last_update, tags)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING id, title, slug, content, status, creation_date, last_update, tags
            "#,
        )
        .bind(&new.title)
        .bind(&new.slug)
        .bind(&new.content)
        .bind(new.status.as_i64())
        .bind(new.creation_date)
        .bind(new.last_update)
        .bind(&new.tags)
        .fetch_one(&mut *tx)
        .await?;
        let entry_id = row.id;

        sqlx::query("INSERT INTO entry_sites (entry_id, site_id) VALUES (?, ?)")
            .bind(entry_id)
            .bind(new.site_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO entry_categories (entry_id, category_id) VALUES (?, ?)")
            .bind(entry_id)
            .bind(new.category_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO entry_authors (entry_id, user_id) VALUES (?, ?)")
            .bind(entry_id)
            .bind(new.author_id)
            .execute(&mut *tx)
            .await?;

        for name in new.tags.split(',').filter(|t| !t.is_empty()) {
            sqlx::query("INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
                .bind(name)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                r#"
                    INSERT OR IGNORE INTO entry_tags (entry_id, tag_id)
                    SELECT ?, id FROM tags WHERE name = ?
                "#,
            )
            .bind(entry_id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.into_entry()
    }

    /// All entries in creation order (by id).
    pub async fn get_entries(&self) -> Result<Vec<Entry>, DatabaseError> {
        let query = format!("SELECT {ENTRY_COLUMNS} FROM entries e ORDER BY e.id");
        let rows = sqlx::query_as::<_, EntryDbRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(EntryDbRow::into_entry).collect()
    }

    /// Tags linked to an entry, ordered by name.
    pub async fn get_entry_tags(&self, entry_id: i64) -> Result<Vec<Tag>, DatabaseError> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
                SELECT t.id, t.name
                FROM tags t
                JOIN entry_tags et ON et.tag_id = t.id
                WHERE et.entry_id = ?
                ORDER BY t.name
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    /// Site, category and author ids linked to an entry.
    pub async fn get_entry_associations(
        &self,
        entry_id: i64,
    ) -> Result<EntryAssociations, DatabaseError> {
        let site_ids: Vec<(i64,)> =
            sqlx::query_as("SELECT site_id FROM entry_sites WHERE entry_id = ? ORDER BY site_id")
                .bind(entry_id)
                .fetch_all(&self.pool)
                .await?;
        let category_ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT category_id FROM entry_categories WHERE entry_id = ? ORDER BY category_id",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;
        let author_ids: Vec<(i64,)> =
            sqlx::query_as("SELECT user_id FROM entry_authors WHERE entry_id = ? ORDER BY user_id")
                .bind(entry_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(EntryAssociations {
            site_ids: site_ids.into_iter().map(|(id,)| id).collect(),
            category_ids: category_ids.into_iter().map(|(id,)| id).collect(),
            author_ids: author_ids.into_iter().map(|(id,)| id).collect(),
        })
    }
}
