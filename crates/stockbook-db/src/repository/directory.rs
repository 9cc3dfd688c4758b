//! # Directory Repository
//!
//! Parties, categories and users. Other parts of the portal own these
//! records; this crate reads them in batches for enrichment and inserts
//! them only for seeding and tests.

use std::collections::HashMap;

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::fetch_by_ids;
use stockbook_core::{Category, Party, User};

#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: SqlitePool,
}

impl DirectoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DirectoryRepository { pool }
    }

    pub async fn parties_by_ids(&self, ids: &[String]) -> DbResult<HashMap<String, Party>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<Party> = fetch_by_ids(
            &self.pool,
            "SELECT id, name, gstin, address, phone FROM parties",
            "id",
            ids,
        )
        .await?;
        debug!(requested = ids.len(), found = rows.len(), "Loaded parties");
        Ok(rows.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    pub async fn categories_by_ids(&self, ids: &[String]) -> DbResult<HashMap<String, Category>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<Category> =
            fetch_by_ids(&self.pool, "SELECT id, name FROM categories", "id", ids).await?;
        debug!(requested = ids.len(), found = rows.len(), "Loaded categories");
        Ok(rows.into_iter().map(|c| (c.id.clone(), c)).collect())
    }

    pub async fn users_by_ids(&self, ids: &[String]) -> DbResult<HashMap<String, User>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<User> =
            fetch_by_ids(&self.pool, "SELECT id, name, email, role FROM users", "id", ids).await?;
        debug!(requested = ids.len(), found = rows.len(), "Loaded users");
        Ok(rows.into_iter().map(|u| (u.id.clone(), u)).collect())
    }

    pub async fn insert_party(&self, party: &Party) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO parties (id, name, gstin, address, phone) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
            .bind(&party.id)
            .bind(&party.name)
            .bind(&party.gstin)
            .bind(&party.address)
            .bind(&party.phone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_category(&self, category: &Category) -> DbResult<()> {
        sqlx::query("INSERT INTO categories (id, name) VALUES (?1, ?2)")
            .bind(&category.id)
            .bind(&category.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_user(&self, user: &User) -> DbResult<()> {
        sqlx::query("INSERT INTO users (id, name, email, role) VALUES (?1, ?2, ?3, ?4)")
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.role)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Removes a category; products keep pointing at the old id.
    pub async fn delete_category(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_batch_lookups() {
        let repo = Database::new(DbConfig::in_memory()).await.unwrap().directory();
        repo.insert_party(&Party {
            id: "party-1".to_string(),
            name: "Sharma Traders".to_string(),
            gstin: Some("27AAAPL1234C1ZV".to_string()),
            address: None,
            phone: None,
        })
        .await
        .unwrap();
        repo.insert_user(&User {
            id: "u1".to_string(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            role: "manager".to_string(),
        })
        .await
        .unwrap();

        let parties = repo
            .parties_by_ids(&["party-1".to_string(), "party-9".to_string()])
            .await
            .unwrap();
        assert_eq!(parties.len(), 1);
        assert_eq!(parties["party-1"].gstin.as_deref(), Some("27AAAPL1234C1ZV"));

        let users = repo.users_by_ids(&["u1".to_string()]).await.unwrap();
        assert_eq!(users["u1"].role, "manager");

        assert!(repo.categories_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_user_email() {
        let repo = Database::new(DbConfig::in_memory()).await.unwrap().directory();
        let user = User {
            id: "u1".to_string(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            role: "manager".to_string(),
        };
        repo.insert_user(&user).await.unwrap();

        let again = User {
            id: "u2".to_string(),
            ..user
        };
        assert!(matches!(
            repo.insert_user(&again).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }
}
