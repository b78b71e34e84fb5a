use super::schema::Database;
use super::types::{DatabaseError, Site, User};
use crate::util::strip_control_chars;

impl Database {
    // ========================================================================
    // Site Operations
    // ========================================================================

    /// Get the site registered under `domain`, creating it when absent.
    ///
    /// An existing site keeps its stored name; `name` is only used on creation.
    pub async fn get_or_create_site(&self, domain: &str, name: &str) -> Result<Site, DatabaseError> {
        sqlx::query("INSERT INTO sites (domain, name) VALUES (?, ?) ON CONFLICT(domain) DO NOTHING")
            .bind(domain)
            .bind(name)
            .execute(&self.pool)
            .await?;

        let site = sqlx::query_as::<_, Site>("SELECT id, domain, name FROM sites WHERE domain = ?")
            .bind(domain)
            .fetch_one(&self.pool)
            .await?;
        Ok(site)
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a local user. Fails if the username is taken or empty.
    ///
    /// SEC-014: control characters are stripped and whitespace trimmed first.
    pub async fn create_user(&self, username: &str, email: &str) -> Result<User, DatabaseError> {
        let clean = strip_control_chars(username);
        let clean = clean.trim();
        if clean.is_empty() {
            return Err(DatabaseError::InvalidInput(
                "username cannot be empty or whitespace-only".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email) VALUES (?, ?) RETURNING id, username, email",
        )
        .bind(clean)
        .bind(email.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// Look a user up by exact username.
    pub async fn find_user(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, username, email FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    /// The user with the lowest id, if any user exists.
    pub async fn first_user(&self) -> Result<Option<User>, DatabaseError> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, username, email FROM users ORDER BY id LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, DatabaseError};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_site_reuses_existing() {
        let db = test_db().await;

        let first = db.get_or_create_site("example.com", "Example").await.unwrap();
        let second = db.get_or_create_site("example.com", "Renamed").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.name, "Example");
    }

    #[tokio::test]
    async fn test_distinct_domains_are_distinct_sites() {
        let db = test_db().await;

        let a = db.get_or_create_site("a.example.com", "A").await.unwrap();
        let b = db.get_or_create_site("b.example.com", "B").await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = test_db().await;

        let created = db.create_user("alice", "alice@example.com").await.unwrap();
        let found = db.find_user("alice").await.unwrap().unwrap();
        assert_eq!(created, found);
        assert!(db.find_user("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_user_trims_and_strips() {
        let db = test_db().await;

        let user = db.create_user("  \x1b[31mcarol\x1b[0m ", "").await.unwrap();
        assert_eq!(user.username, "carol");
    }

    #[tokio::test]
    async fn test_create_user_rejects_empty() {
        let db = test_db().await;

        let result = db.create_user("   ", "").await;
        assert!(matches!(result, Err(DatabaseError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let db = test_db().await;

        db.create_user("alice", "").await.unwrap();
        assert!(db.create_user("alice", "other@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_first_user_is_lowest_id() {
        let db = test_db().await;

        assert!(db.first_user().await.unwrap().is_none());

        let first = db.create_user("zed", "").await.unwrap();
        db.create_user("amy", "").await.unwrap();

        assert_eq!(db.first_user().await.unwrap(), Some(first));
    }
}
