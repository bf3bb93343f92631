//! Player account rows.

use sqlx::FromRow;

use super::Db;

#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub hashed_password: String,
    pub email: String,
    pub is_admin: bool,
}

impl Db {
    pub async fn load_account(&self, username: &str) -> Result<Option<AccountRow>, sqlx::Error> {
        sqlx::query_as::<_, AccountRow>(
            "SELECT id, username, hashed_password, email, is_admin
             FROM players WHERE username = ? COLLATE NOCASE",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await
    }

    pub async fn create_account(
        &self,
        username: &str,
        hashed_password: &str,
        email: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO players (username, hashed_password, email) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(hashed_password)
        .bind(email)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_account_password(
        &self,
        player_id: i64,
        hashed_password: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE players SET hashed_password = ? WHERE id = ?")
            .bind(hashed_password)
            .bind(player_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn touch_last_login(&self, player_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE players SET last_login = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(player_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Db;

    #[tokio::test]
    async fn account_create_and_load() {
        let db = Db::connect_in_memory().await.unwrap();
        let id = db.create_account("gimli", "hash", "gimli@example.com").await.unwrap();
        assert!(id > 0);

        let row = db.load_account("gimli").await.unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.email, "gimli@example.com");
        assert!(!row.is_admin);

        // Lookup is case-insensitive, matching the login prompt.
        assert!(db.load_account("GIMLI").await.unwrap().is_some());
        assert!(db.load_account("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let db = Db::connect_in_memory().await.unwrap();
        db.create_account("dain", "h", "d@example.com").await.unwrap();
        assert!(db.create_account("dain", "h2", "d2@example.com").await.is_err());
    }
}
