//! Collections repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        collection::{Collection, CollectionQuery, CollectionShort, CreateCollection, UpdateCollection},
        enums::Visibility,
    },
    services::access,
};

#[derive(Clone)]
pub struct CollectionsRepository {
    pool: Pool<Postgres>,
}

impl CollectionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get collection by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Collection> {
        sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection with id {} not found", id)))
    }

    /// List collections. Anonymous callers only get public ones.
    pub async fn list(&self, include_private: bool, query: &CollectionQuery) -> AppResult<Vec<CollectionShort>> {
        let pattern = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q));
        let order = query.sort.unwrap_or_default().order_clause();

        let select_q = format!(
            r#"
            SELECT c.id, c.title, c.visibility, c.creator_id, c.views, c.created_at,
                   (SELECT COUNT(*) FROM collection_loras cl WHERE cl.collection_id = c.id) AS lora_count,
                   (SELECT COUNT(*) FROM collection_likes lk WHERE lk.collection_id = c.id) AS like_count
            FROM collections c
            WHERE ($1 OR c.visibility = 'public')
              AND ($2::text IS NULL OR c.title ILIKE $2 OR c.description ILIKE $2)
            ORDER BY {}
            "#,
            order
        );

        let rows = sqlx::query_as::<_, CollectionShort>(&select_q)
            .bind(include_private)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create(&self, creator_id: i32, data: &CreateCollection, visibility: Visibility) -> AppResult<Collection> {
        let collection = sqlx::query_as::<_, Collection>(
            r#"
            INSERT INTO collections (title, description, visibility, creator_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(visibility)
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(collection)
    }

    /// Update fields. Switching to private is refused while any member LoRA
    /// also sits in another collection.
    pub async fn update(&self, id: i32, data: &UpdateCollection) -> AppResult<Collection> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection with id {} not found", id)))?;

        if data.visibility == Some(Visibility::Private) && !current.visibility.is_private() {
            // Same LoRA locks as add_lora, so a concurrent add cannot slip in
            sqlx::query(
                r#"
                SELECT l.id
                FROM loras l
                JOIN collection_loras cl ON cl.lora_id = l.id
                WHERE cl.collection_id = $1
                ORDER BY l.id
                FOR UPDATE OF l
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;

            let shared: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(DISTINCT cl.lora_id)
                FROM collection_loras cl
                JOIN collection_loras other ON other.lora_id = cl.lora_id AND other.collection_id <> cl.collection_id
                WHERE cl.collection_id = $1
                "#,
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            access::check_private_switch(shared)?;
        }

        let updated = sqlx::query_as::<_, Collection>(
            r#"
            UPDATE collections SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                visibility = COALESCE($4, visibility)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.visibility)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Collection with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn increment_views(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE collections SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Whether the user is in the collection's allowed users
    pub async fn is_allowed(&self, collection_id: i32, user_id: i32) -> AppResult<bool> {
        let allowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM collection_allowed_users WHERE collection_id = $1 AND user_id = $2)",
        )
        .bind(collection_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(allowed)
    }

    pub async fn allowed_user_ids(&self, collection_id: i32) -> AppResult<Vec<i32>> {
        let ids: Vec<i32> = sqlx::query_scalar(
            "SELECT user_id FROM collection_allowed_users WHERE collection_id = $1 ORDER BY user_id",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Replace the allowed users set
    pub async fn set_allowed_users(&self, collection_id: i32, user_ids: &[i32]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM collection_allowed_users WHERE collection_id = $1")
            .bind(collection_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO collection_allowed_users (collection_id, user_id)
            SELECT $1, u FROM UNNEST($2::int4[]) AS u
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(collection_id)
        .bind(user_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Add a LoRA, enforcing the private-collection exclusivity rule
    pub async fn add_lora(&self, collection_id: i32, lora_id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let target = sqlx::query_scalar::<_, Visibility>(
            "SELECT visibility FROM collections WHERE id = $1 FOR UPDATE",
        )
        .bind(collection_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Collection with id {} not found", collection_id)))?;

        // Serialize concurrent membership changes for this LoRA
        sqlx::query_scalar::<_, i32>("SELECT id FROM loras WHERE id = $1 FOR UPDATE")
            .bind(lora_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("LoRA with id {} not found", lora_id)))?;

        let others: Vec<Visibility> = sqlx::query_scalar(
            r#"
            SELECT c.visibility
            FROM collection_loras cl
            JOIN collections c ON c.id = cl.collection_id
            WHERE cl.lora_id = $1 AND cl.collection_id <> $2
            "#,
        )
        .bind(lora_id)
        .bind(collection_id)
        .fetch_all(&mut *tx)
        .await?;

        access::check_membership(target, &others)?;

        sqlx::query(
            "INSERT INTO collection_loras (collection_id, lora_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(collection_id)
        .bind(lora_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn remove_lora(&self, collection_id: i32, lora_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM collection_loras WHERE collection_id = $1 AND lora_id = $2")
            .bind(collection_id)
            .bind(lora_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "LoRA {} is not in collection {}",
                lora_id, collection_id
            )));
        }
        Ok(())
    }
}
