// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sqlite-backed persistence for ledger rows, packed change payloads, and
//! provisioning secrets.

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};

use crate::error::LedgerError;
use crate::record::{ChangeLogQuery, ExecType, LedgerRecord};

/// Owns the connection pool and keeps the schema migrated.
#[derive(Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct ChangeLogRow {
    system_type: String,
    system_id: String,
    change_set_id: String,
    exectype: String,
    checksum: String,
    author: Option<String>,
    filename: String,
    comment: Option<String>,
}

impl TryFrom<ChangeLogRow> for LedgerRecord {
    type Error = LedgerError;

    fn try_from(row: ChangeLogRow) -> Result<Self, Self::Error> {
        let exectype: ExecType = row.exectype.parse().map_err(|_| LedgerError::ApplyFailed {
            change_set_id: row.change_set_id.clone(),
            detail: format!("corrupt exectype {:?} on file", row.exectype),
        })?;
        Ok(LedgerRecord {
            system_type: row.system_type,
            system_id: row.system_id,
            change_set_id: row.change_set_id,
            exectype,
            checksum: row.checksum,
            author: row.author,
            filename: row.filename,
            comment: row.comment,
        })
    }
}

impl LedgerStore {
    /// Connects to `database_uri` (an `sqlx` sqlite connection string,
    /// e.g. `sqlite://./cplane.db` or `sqlite::memory:`) and runs pending
    /// migrations.
    pub async fn connect(database_uri: &str) -> Result<Self, LedgerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_uri)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Wraps an already-open pool (used by tests and by callers sharing
    /// a pool across several stores).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn find_record(
        &self,
        system_type: &str,
        system_id: &str,
        change_set_id: &str,
    ) -> Result<Option<LedgerRecord>, LedgerError> {
        let row = sqlx::query_as::<_, ChangeLogRow>(
            r#"
            SELECT system_type, system_id, change_set_id, exectype, checksum,
                   author, filename, comment
            FROM change_log
            WHERE system_type = ? AND system_id = ? AND change_set_id = ?
            "#,
        )
        .bind(system_type)
        .bind(system_id)
        .bind(change_set_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LedgerRecord::try_from).transpose()
    }

    /// Upserts a ledger row. Called both before attempting a RUN
    /// (exectype INIT) and after it completes (EXECUTED/FAILED).
    pub async fn upsert_record(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO change_log
                (system_type, system_id, change_set_id, exectype, checksum, author, filename, comment, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (system_type, system_id, change_set_id) DO UPDATE SET
                exectype = excluded.exectype,
                checksum = excluded.checksum,
                author = excluded.author,
                filename = excluded.filename,
                comment = excluded.comment,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.system_type)
        .bind(&record.system_id)
        .bind(&record.change_set_id)
        .bind(record.exectype.to_string())
        .bind(&record.checksum)
        .bind(&record.author)
        .bind(&record.filename)
        .bind(&record.comment)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_payload(
        &self,
        system_type: &str,
        system_id: &str,
        change_set_id: &str,
        payload: &[u8],
    ) -> Result<(), LedgerError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO change_log_payload
                (system_type, system_id, change_set_id, payload, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (system_type, system_id, change_set_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(system_type)
        .bind(system_id)
        .bind(change_set_id)
        .bind(payload)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_payload(
        &self,
        system_type: &str,
        system_id: &str,
        change_set_id: &str,
    ) -> Result<Option<Vec<u8>>, LedgerError> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as(
            "SELECT payload FROM change_log_payload WHERE system_type = ? AND system_id = ? AND change_set_id = ?",
        )
        .bind(system_type)
        .bind(system_id)
        .bind(change_set_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(payload,)| payload))
    }

    pub async fn upsert_provision_secret(
        &self,
        system_type: &str,
        system_id: &str,
        username: &str,
        password_blob: &[u8],
        object_list: &str,
    ) -> Result<(), LedgerError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO provision_secret
                (system_type, system_id, username, password_blob, object_list, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (system_type, system_id, username) DO UPDATE SET
                password_blob = excluded.password_blob,
                object_list = excluded.object_list,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(system_type)
        .bind(system_id)
        .bind(username)
        .bind(password_blob)
        .bind(object_list)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_provision_secret(
        &self,
        system_type: &str,
        system_id: &str,
        username: &str,
    ) -> Result<Option<(Vec<u8>, String)>, LedgerError> {
        let row: Option<(Vec<u8>, String)> = sqlx::query_as(
            "SELECT password_blob, object_list FROM provision_secret WHERE system_type = ? AND system_id = ? AND username = ?",
        )
        .bind(system_type)
        .bind(system_id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Returns `(rows, total_matching)` for `(system_type, system_id)`,
    /// ordered by `updated_at` descending, paginated per `query.page`/
    /// `query.size` (1-indexed page). Used by `QUERY_CHANGE_LOG` for
    /// systems whose ledger is this store's own `change_log` table rather
    /// than an external migration tool's.
    pub async fn list_records(
        &self,
        system_type: &str,
        system_id: &str,
        query: &ChangeLogQuery,
    ) -> Result<(Vec<LedgerRecord>, i64), LedgerError> {
        let mut where_clauses = vec!["system_type = ?".to_string(), "system_id = ?".to_string()];
        if query.start_time.is_some() {
            where_clauses.push("updated_at >= ?".to_string());
        }
        if query.end_time.is_some() {
            where_clauses.push("updated_at <= ?".to_string());
        }
        if query.search.is_some() {
            where_clauses.push("(change_set_id LIKE ? OR author LIKE ? OR filename LIKE ?)".to_string());
        }
        let where_sql = where_clauses.join(" AND ");
        let like = query.search.as_ref().map(|term| format!("%{term}%"));

        let count_sql = format!("SELECT COUNT(*) FROM change_log WHERE {where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(system_type).bind(system_id);
        if let Some(start) = query.start_time {
            count_query = count_query.bind(start.to_rfc3339());
        }
        if let Some(end) = query.end_time {
            count_query = count_query.bind(end.to_rfc3339());
        }
        if let Some(like) = &like {
            count_query = count_query.bind(like.clone()).bind(like.clone()).bind(like.clone());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let page = query.page.max(1);
        let size = query.size.max(1);
        let offset = (page - 1) as i64 * size as i64;

        let select_sql = format!(
            "SELECT system_type, system_id, change_set_id, exectype, checksum, author, filename, comment \
             FROM change_log WHERE {where_sql} ORDER BY updated_at DESC LIMIT ? OFFSET ?"
        );
        let mut row_query = sqlx::query_as::<_, ChangeLogRow>(&select_sql).bind(system_type).bind(system_id);
        if let Some(start) = query.start_time {
            row_query = row_query.bind(start.to_rfc3339());
        }
        if let Some(end) = query.end_time {
            row_query = row_query.bind(end.to_rfc3339());
        }
        if let Some(like) = &like {
            row_query = row_query.bind(like.clone()).bind(like.clone()).bind(like.clone());
        }
        row_query = row_query.bind(size as i64).bind(offset);
        let rows = row_query.fetch_all(&self.pool).await?;

        let records = rows.into_iter().map(LedgerRecord::try_from).collect::<Result<Vec<_>, _>>()?;
        Ok((records, total))
    }

    /// Removes provisioning secrets for objects no longer managed, used by
    /// the controller's cascading group-permission delete.
    pub async fn delete_provision_secret(
        &self,
        system_type: &str,
        system_id: &str,
        username: &str,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "DELETE FROM provision_secret WHERE system_type = ? AND system_id = ? AND username = ?",
        )
        .bind(system_type)
        .bind(system_id)
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes the named ledger rows for `(system_type, system_id)`. Used
    /// by the `DELETE_CHANGE_LOG` handler for systems whose ledger is this
    /// store's own `change_log` table.
    pub async fn delete_records(
        &self,
        system_type: &str,
        system_id: &str,
        change_set_ids: &[String],
    ) -> Result<(), LedgerError> {
        if change_set_ids.is_empty() {
            return Ok(());
        }
        let placeholders = change_set_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "DELETE FROM change_log WHERE system_type = ? AND system_id = ? AND change_set_id IN ({placeholders})"
        );
        let mut q = sqlx::query(&sql).bind(system_type).bind(system_id);
        for id in change_set_ids {
            q = q.bind(id);
        }
        q.execute(&self.pool).await?;
        Ok(())
    }

    /// Returns `(username, object_list)` pairs for `(system_type,
    /// system_id)`, optionally filtered by a `username LIKE` search term,
    /// paginated per `query.page`/`query.size`. Used by `QUERY_SECRET`.
    pub async fn list_provision_secrets(
        &self,
        system_type: &str,
        system_id: &str,
        query: &ChangeLogQuery,
    ) -> Result<(Vec<(String, String)>, i64), LedgerError> {
        let mut where_clauses = vec!["system_type = ?".to_string(), "system_id = ?".to_string()];
        if query.search.is_some() {
            where_clauses.push("username LIKE ?".to_string());
        }
        let where_sql = where_clauses.join(" AND ");
        let like = query.search.as_ref().map(|term| format!("%{term}%"));

        let count_sql = format!("SELECT COUNT(*) FROM provision_secret WHERE {where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(system_type).bind(system_id);
        if let Some(like) = &like {
            count_query = count_query.bind(like.clone());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let page = query.page.max(1);
        let size = query.size.max(1);
        let offset = (page - 1) as i64 * size as i64;
        let select_sql = format!(
            "SELECT username, object_list FROM provision_secret WHERE {where_sql} \
             ORDER BY updated_at DESC LIMIT ? OFFSET ?"
        );
        let mut row_query = sqlx::query_as::<_, (String, String)>(&select_sql).bind(system_type).bind(system_id);
        if let Some(like) = &like {
            row_query = row_query.bind(like.clone());
        }
        row_query = row_query.bind(size as i64).bind(offset);
        let rows = row_query.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ExecType;

    async fn store() -> LedgerStore {
        LedgerStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let store = store().await;
        let found = store.find_record("registry", "sys-1", "cs-1").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn upsert_then_find_round_trips() {
        let store = store().await;
        let record = LedgerRecord {
            system_type: "registry".into(),
            system_id: "sys-1".into(),
            change_set_id: "cs-1".into(),
            exectype: ExecType::Init,
            checksum: "2:abc".into(),
            author: Some("alice".into()),
            filename: "a.yaml".into(),
            comment: None,
        };
        store.upsert_record(&record).await.unwrap();

        let found = store
            .find_record("registry", "sys-1", "cs-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.exectype, ExecType::Init);
        assert_eq!(found.checksum, "2:abc");

        let mut updated = record.clone();
        updated.exectype = ExecType::Executed;
        updated.checksum = "2:def".into();
        store.upsert_record(&updated).await.unwrap();

        let found = store
            .find_record("registry", "sys-1", "cs-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.exectype, ExecType::Executed);
        assert_eq!(found.checksum, "2:def");
    }

    #[tokio::test]
    async fn payload_round_trips() {
        let store = store().await;
        store
            .upsert_payload("registry", "sys-1", "cs-1", b"packed-bytes")
            .await
            .unwrap();
        let found = store
            .find_payload("registry", "sys-1", "cs-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, b"packed-bytes");
    }

    #[tokio::test]
    async fn provision_secret_round_trips_and_deletes() {
        let store = store().await;
        store
            .upsert_provision_secret("registry", "sys-1", "svc-user", b"cipher", "obj-a,obj-b")
            .await
            .unwrap();
        let (blob, objects) = store
            .find_provision_secret("registry", "sys-1", "svc-user")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(blob, b"cipher");
        assert_eq!(objects, "obj-a,obj-b");

        store
            .delete_provision_secret("registry", "sys-1", "svc-user")
            .await
            .unwrap();
        assert!(store
            .find_provision_secret("registry", "sys-1", "svc-user")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_records_paginates_and_filters_by_search() {
        let store = store().await;
        for i in 0..3 {
            store
                .upsert_record(&LedgerRecord {
                    system_type: "registry".into(),
                    system_id: "sys-1".into(),
                    change_set_id: format!("cs-{i}"),
                    exectype: ExecType::Executed,
                    checksum: "2:abc".into(),
                    author: Some("alice".into()),
                    filename: "a.yaml".into(),
                    comment: None,
                })
                .await
                .unwrap();
        }

        let (rows, total) = store
            .list_records(
                "registry",
                "sys-1",
                &ChangeLogQuery { page: 1, size: 2, ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 2);

        let (rows, total) = store
            .list_records(
                "registry",
                "sys-1",
                &ChangeLogQuery { search: Some("cs-1".into()), page: 1, size: 10, ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].change_set_id, "cs-1");

        store.delete_records("registry", "sys-1", &["cs-1".to_string()]).await.unwrap();
        assert!(store.find_record("registry", "sys-1", "cs-1").await.unwrap().is_none());
        assert!(store.find_record("registry", "sys-1", "cs-0").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_provision_secrets_paginates_and_filters() {
        let store = store().await;
        store.upsert_provision_secret("registry", "sys-1", "user-a", b"x", "obj-a").await.unwrap();
        store.upsert_provision_secret("registry", "sys-1", "user-b", b"y", "obj-b").await.unwrap();

        let (rows, total) = store
            .list_provision_secrets("registry", "sys-1", &ChangeLogQuery { page: 1, size: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);

        let (rows, total) = store
            .list_provision_secrets(
                "registry",
                "sys-1",
                &ChangeLogQuery { search: Some("user-a".into()), page: 1, size: 10, ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].0, "user-a");
    }
}
