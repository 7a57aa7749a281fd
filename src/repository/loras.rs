//! LoRA repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::check_status_change,
        collection::Membership,
        enums::LoraStatus,
        lora::{CreateLora, Lora, LoraQuery, LoraShort, UpdateLora},
    },
};

const LORA_SHORT_COLUMNS: &str = r#"
    l.id, l.title, l.status, l.rating, l.created_at,
    (SELECT COUNT(*) FROM lora_likes ll WHERE ll.lora_id = l.id) AS like_count
"#;

#[derive(Clone)]
pub struct LorasRepository {
    pool: Pool<Postgres>,
}

impl LorasRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get LoRA by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Lora> {
        sqlx::query_as::<_, Lora>("SELECT * FROM loras WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("LoRA with id {} not found", id)))
    }

    /// Create a LoRA owned by `librarian_id`, checked in
    pub async fn create(&self, librarian_id: i32, data: &CreateLora) -> AppResult<Lora> {
        let lora = sqlx::query_as::<_, Lora>(
            r#"
            INSERT INTO loras (title, description, identifier, location, status, librarian_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.identifier)
        .bind(&data.location)
        .bind(LoraStatus::CheckedIn)
        .bind(librarian_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(lora)
    }

    /// Update descriptive fields
    pub async fn update(&self, id: i32, data: &UpdateLora) -> AppResult<Lora> {
        sqlx::query_as::<_, Lora>(
            r#"
            UPDATE loras SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                identifier = COALESCE($4, identifier),
                location = COALESCE($5, location)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.identifier)
        .bind(&data.location)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("LoRA with id {} not found", id)))
    }

    /// Set circulation status directly (owner edit). Refused while the LoRA
    /// has an outstanding borrowed record.
    pub async fn set_status(&self, id: i32, status: LoraStatus) -> AppResult<Lora> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM loras WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("LoRA with id {} not found", id)))?;

        let outstanding: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowed_items WHERE lora_id = $1 AND returned_at IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        check_status_change(outstanding)?;

        let lora = sqlx::query_as::<_, Lora>("UPDATE loras SET status = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(status)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(lora)
    }

    /// Delete a LoRA
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM loras WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("LoRA with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn increment_views(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE loras SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Search LoRAs visible to the viewer.
    ///
    /// Librarians see everything. Everybody else sees LoRAs outside any
    /// collection, in a public collection, or in a private collection they
    /// created or were allowed into.
    pub async fn search(
        &self,
        viewer_id: Option<i32>,
        is_librarian: bool,
        query: &LoraQuery,
    ) -> AppResult<(Vec<LoraShort>, i64)> {
        let per_page = query.per_page();
        let offset = query.offset();

        let pattern = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q));

        let where_clause = r#"
            WHERE (
                $1
                OR NOT EXISTS (SELECT 1 FROM collection_loras cl WHERE cl.lora_id = l.id)
                OR EXISTS (
                    SELECT 1
                    FROM collection_loras cl
                    JOIN collections c ON c.id = cl.collection_id
                    WHERE cl.lora_id = l.id
                      AND (
                          c.visibility = 'public'
                          OR c.creator_id = $2
                          OR EXISTS (
                              SELECT 1 FROM collection_allowed_users au
                              WHERE au.collection_id = c.id AND au.user_id = $2
                          )
                      )
                )
            )
            AND ($3::text IS NULL OR l.title ILIKE $3 OR l.description ILIKE $3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM loras l {}", where_clause))
            .bind(is_librarian)
            .bind(viewer_id)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "SELECT {} FROM loras l {} ORDER BY l.created_at DESC LIMIT {} OFFSET {}",
            LORA_SHORT_COLUMNS, where_clause, per_page, offset
        );
        let loras = sqlx::query_as::<_, LoraShort>(&select_q)
            .bind(is_librarian)
            .bind(viewer_id)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;

        Ok((loras, total))
    }

    /// LoRAs owned by a librarian
    pub async fn list_by_librarian(&self, librarian_id: i32) -> AppResult<Vec<LoraShort>> {
        let loras = sqlx::query_as::<_, LoraShort>(&format!(
            "SELECT {} FROM loras l WHERE l.librarian_id = $1 ORDER BY l.created_at DESC",
            LORA_SHORT_COLUMNS
        ))
        .bind(librarian_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loras)
    }

    /// LoRAs of a collection, optionally filtered by title/description
    pub async fn list_in_collection(&self, collection_id: i32, q: Option<&str>) -> AppResult<Vec<LoraShort>> {
        let pattern = q.map(str::trim).filter(|q| !q.is_empty()).map(|q| format!("%{}%", q));
        let loras = sqlx::query_as::<_, LoraShort>(&format!(
            r#"
            SELECT {}
            FROM loras l
            JOIN collection_loras cl ON cl.lora_id = l.id
            WHERE cl.collection_id = $1
              AND ($2::text IS NULL OR l.title ILIKE $2 OR l.description ILIKE $2)
            ORDER BY l.created_at DESC
            "#,
            LORA_SHORT_COLUMNS
        ))
        .bind(collection_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(loras)
    }

    /// LoRAs that may be added to a collection: not already in it and not
    /// locked into any private collection
    pub async fn list_candidates(&self, collection_id: i32, q: Option<&str>) -> AppResult<Vec<LoraShort>> {
        let pattern = q.map(str::trim).filter(|q| !q.is_empty()).map(|q| format!("%{}%", q));
        let loras = sqlx::query_as::<_, LoraShort>(&format!(
            r#"
            SELECT {}
            FROM loras l
            WHERE NOT EXISTS (
                    SELECT 1 FROM collection_loras cl
                    WHERE cl.lora_id = l.id AND cl.collection_id = $1
                )
              AND NOT EXISTS (
                    SELECT 1 FROM collection_loras cl
                    JOIN collections c ON c.id = cl.collection_id
                    WHERE cl.lora_id = l.id AND c.visibility = 'private'
                )
              AND ($2::text IS NULL OR l.title ILIKE $2 OR l.description ILIKE $2)
            ORDER BY l.created_at DESC
            LIMIT 100
            "#,
            LORA_SHORT_COLUMNS
        ))
        .bind(collection_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(loras)
    }

    /// Collections a LoRA belongs to, with the viewer's allowed flag
    pub async fn memberships(&self, lora_id: i32, viewer_id: Option<i32>) -> AppResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, Membership>(
            r#"
            SELECT c.id AS collection_id, c.visibility, c.creator_id,
                   EXISTS (
                       SELECT 1 FROM collection_allowed_users au
                       WHERE au.collection_id = c.id AND au.user_id = $2
                   ) AS allowed
            FROM collection_loras cl
            JOIN collections c ON c.id = cl.collection_id
            WHERE cl.lora_id = $1
            "#,
        )
        .bind(lora_id)
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Store or replace a user's rating, then refresh the LoRA average
    pub async fn rate(&self, lora_id: i32, user_id: i32, rating: i16) -> AppResult<Option<f64>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO lora_ratings (lora_id, user_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (lora_id, user_id)
            DO UPDATE SET rating = EXCLUDED.rating, created_at = NOW()
            "#,
        )
        .bind(lora_id)
        .bind(user_id)
        .bind(rating)
        .execute(&mut *tx)
        .await?;

        let average: Option<f64> = sqlx::query_scalar(
            r#"
            UPDATE loras
            SET rating = (SELECT AVG(rating)::float8 FROM lora_ratings WHERE lora_id = $1)
            WHERE id = $1
            RETURNING rating
            "#,
        )
        .bind(lora_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(average)
    }

    pub async fn user_rating(&self, lora_id: i32, user_id: i32) -> AppResult<Option<i16>> {
        let rating: Option<i16> = sqlx::query_scalar(
            "SELECT rating FROM lora_ratings WHERE lora_id = $1 AND user_id = $2",
        )
        .bind(lora_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }
}
