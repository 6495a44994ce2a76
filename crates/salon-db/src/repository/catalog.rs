//! # Catalog Repository
//!
//! Read access to services and products, plus the inserts the seed binary
//! and tests use. Catalog management itself lives elsewhere in the salon app.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use salon_core::{CatalogService, Product};

const PRODUCT_COLUMNS: &str =
    "id, sku, name, price_paise, current_stock, is_active, created_at, updated_at";

/// Repository for catalog reads.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Gets a service by ID, active or not.
    pub async fn get_service(&self, id: &str) -> DbResult<Option<CatalogService>> {
        let service = sqlx::query_as::<_, CatalogService>(
            r#"
            SELECT id, name, price_paise, duration_minutes, is_active
            FROM services
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(service)
    }

    /// Gets a product by ID, active or not.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Current stock for each of `product_ids`. Unknown ids are absent from
    /// the map.
    pub async fn stock_levels(&self, product_ids: &[String]) -> DbResult<HashMap<String, i64>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        debug!(count = product_ids.len(), "Reading stock levels");

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, current_stock FROM products WHERE id IN (");
        let mut ids = query.separated(", ");
        for id in product_ids {
            ids.push_bind(id);
        }
        ids.push_unseparated(")");

        let rows: Vec<(String, i64)> = query
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }

    /// Inserts a service.
    pub async fn insert_service(&self, service: &CatalogService) -> DbResult<()> {
        debug!(id = %service.id, name = %service.name, "Inserting service");

        sqlx::query(
            r#"
            INSERT INTO services (id, name, price_paise, duration_minutes, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&service.id)
        .bind(&service.name)
        .bind(service.price_paise)
        .bind(service.duration_minutes)
        .bind(service.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a product.
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price_paise, current_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_paise)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrites a product's stock level (stock take / restock).
    ///
    /// Returns false if the product does not exist.
    pub async fn set_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        debug!(id = %id, quantity, "Setting stock level");

        let result = sqlx::query(
            "UPDATE products SET current_stock = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
