use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::quota::RESOURCE_SHARDS;
use crate::database::models::revision::{Revision, STRATEGY_DELTA, STRATEGY_SNAPSHOT};
use crate::database::models::shard::Shard;
use crate::database::models::webhook as webhook_events;
use crate::database::page::{Page, PageResponse};
use crate::services::{audit_service, quota_service, webhook_service};

#[derive(Debug, thiserror::Error)]
pub enum ShardError {
    #[error("Shard not found")]
    NotFound,
    #[error("Shard is not trashed")]
    NotTrashed,
    #[error("Revision {0} not found")]
    RevisionNotFound(i32),
    #[error("Revision conflict: expected {expected}, shard is at {actual}")]
    RevisionConflict { expected: i32, actual: i32 },
    #[error(transparent)]
    Quota(#[from] quota_service::QuotaError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for ShardError {
    fn from(err: sqlx::Error) -> Self {
        ShardError::Database(DatabaseError::Sqlx(err))
    }
}

/// Shard payloads are JSON objects; dollar-prefixed top-level keys are
/// reserved for the delta encoding
pub fn validate_payload(data: &Value) -> Result<(), String> {
    let obj = match data {
        Value::Object(map) => map,
        _ => return Err("data must be a JSON object".to_string()),
    };
    for key in obj.keys() {
        if key.starts_with('$') {
            return Err(format!("Reserved field name: {}", key));
        }
    }
    Ok(())
}

/// Snapshot on revision 1 and every Nth revision after, delta otherwise
fn strategy_for(revision_number: i32, snapshot_interval: i32) -> &'static str {
    if revision_number == 1 || (snapshot_interval > 0 && revision_number % snapshot_interval == 0) {
        STRATEGY_SNAPSHOT
    } else {
        STRATEGY_DELTA
    }
}

/// Changed and added top-level fields, with removals under "$unset"
fn delta_between(old: &Value, new: &Value) -> Value {
    let empty = Map::new();
    let old_map = old.as_object().unwrap_or(&empty);
    let new_map = new.as_object().unwrap_or(&empty);

    let mut delta = Map::new();
    for (key, value) in new_map {
        if old_map.get(key) != Some(value) {
            delta.insert(key.clone(), value.clone());
        }
    }
    let removed: Vec<Value> = old_map
        .keys()
        .filter(|k| !new_map.contains_key(*k))
        .map(|k| Value::String(k.clone()))
        .collect();
    if !removed.is_empty() {
        delta.insert("$unset".to_string(), Value::Array(removed));
    }
    Value::Object(delta)
}

/// Apply one delta on top of a payload
fn apply_delta(base: &Value, delta: &Value) -> Value {
    let mut result = base.as_object().cloned().unwrap_or_default();
    let delta_map = match delta.as_object() {
        Some(map) => map,
        None => return base.clone(),
    };
    if let Some(Value::Array(unset)) = delta_map.get("$unset") {
        for key in unset.iter().filter_map(|v| v.as_str()) {
            result.remove(key);
        }
    }
    for (key, value) in delta_map {
        if key == "$unset" {
            continue;
        }
        result.insert(key.clone(), value.clone());
    }
    Value::Object(result)
}

/// Rebuild the payload at `target` from the nearest snapshot at or below
/// it plus the deltas in between. `revisions` must be ascending by
/// revision_number.
fn reconstruct(revisions: &[Revision], target: i32) -> Option<Value> {
    let snapshot = revisions
        .iter()
        .rev()
        .find(|r| r.revision_number <= target && r.is_snapshot())?;

    let mut payload = snapshot.data.clone();
    for revision in revisions
        .iter()
        .filter(|r| r.revision_number > snapshot.revision_number && r.revision_number <= target)
    {
        payload = apply_delta(&payload, &revision.data);
    }
    Some(payload)
}

#[derive(Debug, Default)]
pub struct ShardFilters {
    pub kind: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Default)]
pub struct ShardPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub data: Option<Value>,
    pub expected_revision: Option<i32>,
}

pub async fn list(
    tenant_id: Uuid,
    filters: &ShardFilters,
    page: &Page,
) -> Result<PageResponse<Shard>, ShardError> {
    let pool = DatabaseManager::pool().await?;

    let mut conditions =
        String::from("tenant_id = $1 AND trashed_at IS NULL AND deleted_at IS NULL");
    let mut next_param = 2;
    if filters.kind.is_some() {
        conditions.push_str(&format!(" AND kind = ${}", next_param));
        next_param += 1;
    }
    if filters.q.is_some() {
        conditions.push_str(&format!(" AND name ILIKE ${}", next_param));
        next_param += 1;
    }

    let count_sql = format!("SELECT COUNT(*) FROM shards WHERE {}", conditions);
    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql).bind(tenant_id);
    if let Some(kind) = &filters.kind {
        count_query = count_query.bind(kind);
    }
    if let Some(q) = &filters.q {
        count_query = count_query.bind(format!("%{}%", q));
    }
    let (total,) = count_query.fetch_one(&pool).await?;

    let list_sql = format!(
        "SELECT * FROM shards WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
        conditions,
        page.order_sql(),
        next_param,
        next_param + 1
    );
    let mut list_query = sqlx::query_as::<_, Shard>(&list_sql).bind(tenant_id);
    if let Some(kind) = &filters.kind {
        list_query = list_query.bind(kind);
    }
    if let Some(q) = &filters.q {
        list_query = list_query.bind(format!("%{}%", q));
    }
    let items = list_query
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&pool)
        .await?;

    Ok(PageResponse {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

pub async fn get(tenant_id: Uuid, id: Uuid) -> Result<Shard, ShardError> {
    let pool = DatabaseManager::pool().await?;
    sqlx::query_as::<_, Shard>(
        "SELECT * FROM shards
         WHERE id = $1 AND tenant_id = $2 AND trashed_at IS NULL AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(ShardError::NotFound)
}

/// Create a shard at revision 1 with a full snapshot
pub async fn create(
    tenant_id: Uuid,
    owner_id: Uuid,
    name: &str,
    kind: Option<String>,
    data: Value,
) -> Result<Shard, ShardError> {
    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    quota_service::consume(&mut *tx, tenant_id, RESOURCE_SHARDS).await?;

    let shard = sqlx::query_as::<_, Shard>(
        "INSERT INTO shards (tenant_id, owner_id, name, kind, data, revision_number)
         VALUES ($1, $2, $3, $4, $5, 1)
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(owner_id)
    .bind(name)
    .bind(&kind)
    .bind(&data)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO revisions (shard_id, tenant_id, revision_number, strategy, data, author_id)
         VALUES ($1, $2, 1, $3, $4, $5)",
    )
    .bind(shard.id)
    .bind(tenant_id)
    .bind(STRATEGY_SNAPSHOT)
    .bind(&shard.data)
    .bind(owner_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    audit_service::record(
        tenant_id,
        Some(owner_id),
        "shard.create",
        "shard",
        Some(shard.id),
        json!({ "name": shard.name }),
    );
    webhook_service::dispatch(
        tenant_id,
        webhook_events::EVENT_SHARD_CREATED,
        json!({ "shard_id": shard.id, "name": shard.name }),
    );

    Ok(shard)
}

/// Update fields and/or payload; bumps the revision and records exactly
/// one revision row carrying the new number
pub async fn update(
    tenant_id: Uuid,
    actor_id: Uuid,
    id: Uuid,
    patch: ShardPatch,
) -> Result<Shard, ShardError> {
    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Shard>(
        "SELECT * FROM shards
         WHERE id = $1 AND tenant_id = $2 AND trashed_at IS NULL AND deleted_at IS NULL
         FOR UPDATE",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ShardError::NotFound)?;

    if let Some(expected) = patch.expected_revision {
        if expected != current.revision_number {
            return Err(ShardError::RevisionConflict {
                expected,
                actual: current.revision_number,
            });
        }
    }

    let new_number = current.revision_number + 1;
    let new_data = patch.data.clone().unwrap_or_else(|| current.data.clone());

    let strategy = strategy_for(new_number, config::config().revision.snapshot_interval);
    let revision_data = if strategy == STRATEGY_SNAPSHOT {
        new_data.clone()
    } else {
        delta_between(&current.data, &new_data)
    };

    let shard = sqlx::query_as::<_, Shard>(
        "UPDATE shards
         SET name = COALESCE($3, name),
             kind = COALESCE($4, kind),
             data = $5,
             revision_number = $6,
             updated_at = now()
         WHERE id = $1 AND tenant_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(&patch.name)
    .bind(&patch.kind)
    .bind(&new_data)
    .bind(new_number)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO revisions (shard_id, tenant_id, revision_number, strategy, data, author_id)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(new_number)
    .bind(strategy)
    .bind(&revision_data)
    .bind(actor_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    audit_service::record(
        tenant_id,
        Some(actor_id),
        "shard.update",
        "shard",
        Some(id),
        json!({ "revision_number": new_number }),
    );
    webhook_service::dispatch(
        tenant_id,
        webhook_events::EVENT_SHARD_UPDATED,
        json!({ "shard_id": id, "revision_number": new_number }),
    );

    Ok(shard)
}

pub async fn trash(tenant_id: Uuid, actor_id: Uuid, id: Uuid) -> Result<Shard, ShardError> {
    let pool = DatabaseManager::pool().await?;
    let shard = sqlx::query_as::<_, Shard>(
        "UPDATE shards SET trashed_at = now(), updated_at = now()
         WHERE id = $1 AND tenant_id = $2 AND trashed_at IS NULL AND deleted_at IS NULL
         RETURNING *",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(ShardError::NotFound)?;

    audit_service::record(
        tenant_id,
        Some(actor_id),
        "shard.trash",
        "shard",
        Some(id),
        Value::Null,
    );
    webhook_service::dispatch(
        tenant_id,
        webhook_events::EVENT_SHARD_TRASHED,
        json!({ "shard_id": id }),
    );

    Ok(shard)
}

pub async fn restore(tenant_id: Uuid, actor_id: Uuid, id: Uuid) -> Result<Shard, ShardError> {
    let pool = DatabaseManager::pool().await?;

    let exists: Option<(Option<chrono::DateTime<chrono::Utc>>,)> = sqlx::query_as(
        "SELECT trashed_at FROM shards WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&pool)
    .await?;
    match exists {
        None => return Err(ShardError::NotFound),
        Some((None,)) => return Err(ShardError::NotTrashed),
        Some((Some(_),)) => {}
    }

    let shard = sqlx::query_as::<_, Shard>(
        "UPDATE shards SET trashed_at = NULL, updated_at = now()
         WHERE id = $1 AND tenant_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_one(&pool)
    .await?;

    audit_service::record(
        tenant_id,
        Some(actor_id),
        "shard.restore",
        "shard",
        Some(id),
        Value::Null,
    );

    Ok(shard)
}

/// Permanent tombstone; releases the shard quota unit
pub async fn delete_permanent(
    tenant_id: Uuid,
    actor_id: Uuid,
    id: Uuid,
) -> Result<(), ShardError> {
    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE shards SET deleted_at = now(), updated_at = now()
         WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(tenant_id)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ShardError::NotFound);
    }

    quota_service::release(&mut *tx, tenant_id, RESOURCE_SHARDS).await?;
    tx.commit().await?;

    audit_service::record(
        tenant_id,
        Some(actor_id),
        "shard.delete",
        "shard",
        Some(id),
        Value::Null,
    );
    Ok(())
}

pub async fn revisions(
    tenant_id: Uuid,
    shard_id: Uuid,
    page: &Page,
) -> Result<PageResponse<Revision>, ShardError> {
    // 404 before listing so a foreign-tenant shard id leaks nothing
    get(tenant_id, shard_id).await?;

    let pool = DatabaseManager::pool().await?;
    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM revisions WHERE shard_id = $1 AND tenant_id = $2")
            .bind(shard_id)
            .bind(tenant_id)
            .fetch_one(&pool)
            .await?;

    let items = sqlx::query_as::<_, Revision>(
        "SELECT * FROM revisions WHERE shard_id = $1 AND tenant_id = $2
         ORDER BY revision_number DESC LIMIT $3 OFFSET $4",
    )
    .bind(shard_id)
    .bind(tenant_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(&pool)
    .await?;

    Ok(PageResponse {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

pub async fn revision(
    tenant_id: Uuid,
    shard_id: Uuid,
    number: i32,
) -> Result<Revision, ShardError> {
    get(tenant_id, shard_id).await?;

    let pool = DatabaseManager::pool().await?;
    sqlx::query_as::<_, Revision>(
        "SELECT * FROM revisions
         WHERE shard_id = $1 AND tenant_id = $2 AND revision_number = $3",
    )
    .bind(shard_id)
    .bind(tenant_id)
    .bind(number)
    .fetch_optional(&pool)
    .await?
    .ok_or(ShardError::RevisionNotFound(number))
}

/// Restore the payload as of `target_revision`. The restored state is
/// written as a fresh snapshot revision, not a rollback of history.
pub async fn revert(
    tenant_id: Uuid,
    actor_id: Uuid,
    shard_id: Uuid,
    target_revision: i32,
    expected_revision: Option<i32>,
) -> Result<Shard, ShardError> {
    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Shard>(
        "SELECT * FROM shards
         WHERE id = $1 AND tenant_id = $2 AND trashed_at IS NULL AND deleted_at IS NULL
         FOR UPDATE",
    )
    .bind(shard_id)
    .bind(tenant_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ShardError::NotFound)?;

    if let Some(expected) = expected_revision {
        if expected != current.revision_number {
            return Err(ShardError::RevisionConflict {
                expected,
                actual: current.revision_number,
            });
        }
    }

    let history = sqlx::query_as::<_, Revision>(
        "SELECT * FROM revisions
         WHERE shard_id = $1 AND tenant_id = $2 AND revision_number <= $3
         ORDER BY revision_number ASC",
    )
    .bind(shard_id)
    .bind(tenant_id)
    .bind(target_revision)
    .fetch_all(&mut *tx)
    .await?;

    if !history.iter().any(|r| r.revision_number == target_revision) {
        return Err(ShardError::RevisionNotFound(target_revision));
    }
    let restored = reconstruct(&history, target_revision)
        .ok_or(ShardError::RevisionNotFound(target_revision))?;

    let new_number = current.revision_number + 1;
    let shard = sqlx::query_as::<_, Shard>(
        "UPDATE shards SET data = $3, revision_number = $4, updated_at = now()
         WHERE id = $1 AND tenant_id = $2
         RETURNING *",
    )
    .bind(shard_id)
    .bind(tenant_id)
    .bind(&restored)
    .bind(new_number)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO revisions (shard_id, tenant_id, revision_number, strategy, data, author_id)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(shard_id)
    .bind(tenant_id)
    .bind(new_number)
    .bind(STRATEGY_SNAPSHOT)
    .bind(&restored)
    .bind(actor_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    audit_service::record(
        tenant_id,
        Some(actor_id),
        "shard.revert",
        "shard",
        Some(shard_id),
        json!({ "target_revision": target_revision, "revision_number": new_number }),
    );
    webhook_service::dispatch(
        tenant_id,
        webhook_events::EVENT_SHARD_REVERTED,
        json!({ "shard_id": shard_id, "target_revision": target_revision }),
    );

    Ok(shard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn payload_must_be_object_without_reserved_keys() {
        assert!(validate_payload(&json!({"title": "q3"})).is_ok());
        assert!(validate_payload(&json!([1, 2])).is_err());
        assert!(validate_payload(&json!("text")).is_err());
        assert!(validate_payload(&json!({"$unset": ["x"]})).is_err());
    }

    #[test]
    fn snapshot_cadence() {
        assert_eq!(strategy_for(1, 10), STRATEGY_SNAPSHOT);
        assert_eq!(strategy_for(2, 10), STRATEGY_DELTA);
        assert_eq!(strategy_for(10, 10), STRATEGY_SNAPSHOT);
        assert_eq!(strategy_for(11, 10), STRATEGY_DELTA);
        assert_eq!(strategy_for(20, 10), STRATEGY_SNAPSHOT);
    }

    #[test]
    fn delta_tracks_changes_additions_and_removals() {
        let old = json!({"a": 1, "b": 2, "c": 3});
        let new = json!({"a": 1, "b": 5, "d": 4});
        let delta = delta_between(&old, &new);
        assert_eq!(delta["b"], 5);
        assert_eq!(delta["d"], 4);
        assert!(delta.get("a").is_none());
        assert_eq!(delta["$unset"], json!(["c"]));
    }

    #[test]
    fn delta_round_trips_through_apply() {
        let old = json!({"a": 1, "b": {"nested": true}, "c": 3});
        let new = json!({"a": 2, "b": {"nested": false}, "d": "x"});
        let delta = delta_between(&old, &new);
        assert_eq!(apply_delta(&old, &delta), new);
    }

    #[test]
    fn identical_payloads_produce_empty_delta() {
        let payload = json!({"a": 1});
        let delta = delta_between(&payload, &payload);
        assert_eq!(delta, json!({}));
        assert_eq!(apply_delta(&payload, &delta), payload);
    }

    fn rev(number: i32, strategy: &str, data: Value) -> Revision {
        Revision {
            id: Uuid::new_v4(),
            shard_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            revision_number: number,
            strategy: strategy.to_string(),
            data,
            author_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reconstruct_folds_deltas_onto_snapshot() {
        let history = vec![
            rev(1, STRATEGY_SNAPSHOT, json!({"a": 1, "b": 2})),
            rev(2, STRATEGY_DELTA, json!({"a": 10})),
            rev(3, STRATEGY_DELTA, json!({"c": 3, "$unset": ["b"]})),
        ];
        assert_eq!(
            reconstruct(&history, 3).unwrap(),
            json!({"a": 10, "c": 3})
        );
        assert_eq!(
            reconstruct(&history, 2).unwrap(),
            json!({"a": 10, "b": 2})
        );
        assert_eq!(reconstruct(&history, 1).unwrap(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn reconstruct_prefers_nearest_snapshot() {
        let history = vec![
            rev(1, STRATEGY_SNAPSHOT, json!({"a": 1})),
            rev(2, STRATEGY_DELTA, json!({"a": 2})),
            rev(3, STRATEGY_SNAPSHOT, json!({"a": 3, "b": 1})),
            rev(4, STRATEGY_DELTA, json!({"b": 2})),
        ];
        // Target 4 must start from the revision-3 snapshot, not fold from 1
        assert_eq!(reconstruct(&history, 4).unwrap(), json!({"a": 3, "b": 2}));
    }

    #[test]
    fn reconstruct_without_snapshot_is_none() {
        let history = vec![rev(2, STRATEGY_DELTA, json!({"a": 2}))];
        assert!(reconstruct(&history, 2).is_none());
    }
}
