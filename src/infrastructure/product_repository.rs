//! SQLite implementation of the target product store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::trace;

use crate::domain::product::{CanonicalProduct, FieldChange, StoredProduct};
use crate::domain::repositories::{StoreError, StoreResult, TargetStore};

const SELECT_COLUMNS: &str = r"
    SELECT identifier, name, description, price, image_url, category, extra, created_at, updated_at
    FROM products
";

#[derive(Clone)]
pub struct SqliteProductStore {
    pool: SqlitePool,
}

impl SqliteProductStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get product by identifier
    pub async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<StoredProduct>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE identifier = ?"))
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row).transpose()
    }

    /// Inserts a row verbatim, including legacy rows and target-only attributes
    pub async fn insert_stored(&self, product: &StoredProduct) -> StoreResult<()> {
        let extra = serde_json::to_string(&product.extra)?;
        sqlx::query(
            r"
            INSERT INTO products
            (identifier, name, description, price, image_url, category, extra, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&product.identifier)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(&product.category)
        .bind(extra)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, product.identifier.as_deref().unwrap_or_default()))?;
        Ok(())
    }

    pub async fn count_products(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl TargetStore for SqliteProductStore {
    async fn list_all(&self) -> StoreResult<Vec<StoredProduct>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY row_id ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row).collect()
    }

    async fn create(&self, product: &CanonicalProduct) -> StoreResult<()> {
        let now = Utc::now();
        sqlx::query(
            r"
            INSERT INTO products
            (identifier, name, description, price, image_url, category, extra, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, '{}', ?, ?)
            ",
        )
        .bind(&product.identifier)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(product.category.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &product.identifier))?;

        trace!(identifier = %product.identifier, "inserted product");
        Ok(())
    }

    async fn update_fields(&self, identifier: &str, changes: &[FieldChange]) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE products SET ");
        {
            let mut set = builder.separated(", ");
            for change in changes {
                match change {
                    FieldChange::Name(v) => {
                        set.push("name = ").push_bind_unseparated(v.clone());
                    }
                    FieldChange::Description(v) => {
                        set.push("description = ").push_bind_unseparated(v.clone());
                    }
                    FieldChange::Price(v) => {
                        set.push("price = ").push_bind_unseparated(*v);
                    }
                    FieldChange::ImageUrl(v) => {
                        set.push("image_url = ").push_bind_unseparated(v.clone());
                    }
                    FieldChange::Category(v) => {
                        set.push("category = ").push_bind_unseparated(v.as_str());
                    }
                }
            }
            set.push("updated_at = ").push_bind_unseparated(Utc::now());
        }
        builder.push(" WHERE identifier = ").push_bind(identifier);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                identifier: identifier.to_string(),
            });
        }

        trace!(identifier, fields = changes.len(), "updated product");
        Ok(())
    }
}

fn map_row(row: &SqliteRow) -> StoreResult<StoredProduct> {
    let extra: String = row.try_get("extra")?;
    let extra = if extra.trim().is_empty() {
        serde_json::Map::new()
    } else {
        serde_json::from_str(&extra)?
    };

    Ok(StoredProduct {
        identifier: row.try_get("identifier")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image_url: row.try_get("image_url")?,
        category: row.try_get("category")?,
        extra,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn map_insert_error(error: sqlx::Error, identifier: &str) -> StoreError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
            identifier: identifier.to_string(),
        },
        _ => StoreError::Database(error),
    }
}
