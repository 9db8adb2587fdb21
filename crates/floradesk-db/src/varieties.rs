//! Database operations for `varieties`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use floradesk_core::NewVariety;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `varieties` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VarietyRow {
    pub id: i64,
    pub name: String,
    pub sku: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert varieties keyed on `sku` in one statement.
///
/// Returns `(inserted, updated)`. When the input repeats a SKU the last entry
/// wins, since Postgres refuses to touch one row twice in a single
/// `ON CONFLICT DO UPDATE`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_varieties(
    pool: &PgPool,
    varieties: &[NewVariety],
) -> Result<(u64, u64), DbError> {
    let varieties = last_per_key(varieties, |v| v.sku.as_str());
    if varieties.is_empty() {
        return Ok((0, 0));
    }

    let mut names: Vec<&str> = Vec::with_capacity(varieties.len());
    let mut skus: Vec<&str> = Vec::with_capacity(varieties.len());
    let mut image_urls: Vec<Option<&str>> = Vec::with_capacity(varieties.len());
    let mut categories: Vec<&str> = Vec::with_capacity(varieties.len());

    for variety in &varieties {
        names.push(&variety.name);
        skus.push(&variety.sku);
        image_urls.push(variety.image_url.as_deref());
        categories.push(&variety.category);
    }

    let rows: Vec<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO varieties (name, sku, image_url, category) \
         SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[]) \
         ON CONFLICT (sku) DO UPDATE SET \
             name       = EXCLUDED.name, \
             image_url  = EXCLUDED.image_url, \
             category   = EXCLUDED.category, \
             updated_at = NOW() \
         RETURNING (xmax = 0) AS is_new",
    )
    .bind(&names)
    .bind(&skus)
    .bind(&image_urls)
    .bind(&categories)
    .fetch_all(pool)
    .await?;

    let inserted = rows.iter().filter(|&&is_new| is_new).count() as u64;
    Ok((inserted, rows.len() as u64 - inserted))
}

/// Every stored SKU mapped to its variety id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn variety_sku_index(pool: &PgPool) -> Result<HashMap<String, i64>, DbError> {
    let rows = sqlx::query_as::<_, (String, i64)>("SELECT sku, id FROM varieties")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Fetches one variety by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_variety(pool: &PgPool, id: i64) -> Result<VarietyRow, DbError> {
    sqlx::query_as::<_, VarietyRow>(
        "SELECT id, name, sku, image_url, category, created_at, updated_at \
         FROM varieties \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Distinct non-null categories, sorted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM varieties \
         WHERE category IS NOT NULL \
         ORDER BY category",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Keep the last entry for each key, in order of first appearance.
pub(crate) fn last_per_key<'a, T, K, F>(items: &'a [T], key: F) -> Vec<&'a T>
where
    K: Eq + std::hash::Hash,
    F: Fn(&'a T) -> K,
{
    let mut position: HashMap<K, usize> = HashMap::with_capacity(items.len());
    let mut kept: Vec<&T> = Vec::with_capacity(items.len());
    for item in items {
        match position.get(&key(item)) {
            Some(&idx) => kept[idx] = item,
            None => {
                position.insert(key(item), kept.len());
                kept.push(item);
            }
        }
    }
    kept
}
