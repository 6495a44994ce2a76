//! # Staff Repository
//!
//! Read access to the staff directory.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use salon_core::StaffMember;

#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    /// Creates a new StaffRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    /// IDs of every active staff member.
    pub async fn active_ids(&self) -> DbResult<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM staff WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await?;

        debug!(count = ids.len(), "Loaded active staff");

        Ok(ids.into_iter().collect())
    }

    /// Active staff ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<StaffMember>> {
        let staff = sqlx::query_as::<_, StaffMember>(
            "SELECT id, name, role, is_active FROM staff WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(staff)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StaffMember>> {
        let member = sqlx::query_as::<_, StaffMember>(
            "SELECT id, name, role, is_active FROM staff WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    pub async fn insert(&self, member: &StaffMember) -> DbResult<()> {
        debug!(id = %member.id, name = %member.name, "Inserting staff member");

        sqlx::query(
            "INSERT INTO staff (id, name, role, is_active, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&member.id)
        .bind(&member.name)
        .bind(&member.role)
        .bind(member.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn member(id: &str, name: &str, active: bool) -> StaffMember {
        StaffMember {
            id: id.to_string(),
            name: name.to_string(),
            role: "stylist".to_string(),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_active_ids_excludes_inactive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.staff().insert(&member("st-1", "Asha", true)).await.unwrap();
        db.staff().insert(&member("st-2", "Ravi", false)).await.unwrap();
        db.staff().insert(&member("st-3", "Meena", true)).await.unwrap();

        let ids = db.staff().active_ids().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("st-1"));
        assert!(!ids.contains("st-2"));

        let active = db.staff().list_active().await.unwrap();
        assert_eq!(active[0].name, "Asha");

        let ravi = db.staff().get_by_id("st-2").await.unwrap().unwrap();
        assert!(!ravi.is_active);
    }
}
