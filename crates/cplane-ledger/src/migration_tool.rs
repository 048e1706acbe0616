// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only access to an external migration tool's own `DATABASECHANGELOG`
//! table.
//!
//! When a managed object is a relational database under that tool's
//! control, the tool — not this process — owns the ledger: it writes
//! `DATABASECHANGELOG` as part of applying a change set directly against
//! the database. This module only ever reads that table, for the
//! `QUERY_CHANGE_LOG` and `DELETE_CHANGE_LOG` message handlers in
//! `cplane-node`. The dialect is not fixed: any `sqlx`-supported server
//! the operator points it at works, via `AnyPool`.

use chrono::{DateTime, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::error::LedgerError;
use crate::record::ChangeLogQuery;

const TABLE: &str = "DATABASECHANGELOG";

/// One row of `DATABASECHANGELOG`, narrowed to the columns the core reads.
#[derive(Debug, Clone)]
pub struct MigrationChangeLogRow {
    pub change_set_id: String,
    pub author: Option<String>,
    pub filename: String,
    pub date_executed: Option<DateTime<Utc>>,
    pub exectype: String,
    pub checksum: String,
    pub comment: Option<String>,
}

pub struct MigrationToolReader {
    pool: AnyPool,
}

impl MigrationToolReader {
    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Returns `(rows, total_matching)` ordered by `DATEEXECUTED` descending,
    /// paginated per `query.page`/`query.size` (1-indexed page).
    pub async fn query(
        &self,
        query: &ChangeLogQuery,
    ) -> Result<(Vec<MigrationChangeLogRow>, i64), LedgerError> {
        let mut where_clauses = Vec::new();
        if query.start_time.is_some() {
            where_clauses.push("DATEEXECUTED >= ?".to_string());
        }
        if query.end_time.is_some() {
            where_clauses.push("DATEEXECUTED <= ?".to_string());
        }
        if query.search.is_some() {
            where_clauses.push(
                "(ID LIKE ? OR AUTHOR LIKE ? OR COMMENTS LIKE ? OR FILENAME LIKE ?)".to_string(),
            );
        }
        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let like = query.search.as_ref().map(|term| format!("%{term}%"));

        let count_sql = format!("SELECT COUNT(*) FROM {TABLE}{where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(start) = query.start_time {
            count_query = count_query.bind(start);
        }
        if let Some(end) = query.end_time {
            count_query = count_query.bind(end);
        }
        if let Some(like) = &like {
            count_query = count_query
                .bind(like.clone())
                .bind(like.clone())
                .bind(like.clone())
                .bind(like.clone());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let page = query.page.max(1);
        let size = query.size.max(1);
        let offset = (page - 1) as i64 * size as i64;

        let select_sql = format!(
            "SELECT ID, AUTHOR, FILENAME, DATEEXECUTED, EXECTYPE, MD5SUM, COMMENTS \
             FROM {TABLE}{where_sql} ORDER BY DATEEXECUTED DESC LIMIT ? OFFSET ?"
        );
        let mut row_query = sqlx::query_as::<_, RawRow>(&select_sql);
        if let Some(start) = query.start_time {
            row_query = row_query.bind(start);
        }
        if let Some(end) = query.end_time {
            row_query = row_query.bind(end);
        }
        if let Some(like) = &like {
            row_query = row_query
                .bind(like.clone())
                .bind(like.clone())
                .bind(like.clone())
                .bind(like.clone());
        }
        row_query = row_query.bind(size as i64).bind(offset);
        let rows = row_query.fetch_all(&self.pool).await?;

        Ok((rows.into_iter().map(MigrationChangeLogRow::from).collect(), total))
    }

    /// Deletes the named change-set ids. Used by `DELETE_CHANGE_LOG`; the
    /// operator is expected to understand this also erases the migration
    /// tool's own record of having run them.
    pub async fn delete(&self, change_set_ids: &[String]) -> Result<(), LedgerError> {
        if change_set_ids.is_empty() {
            return Ok(());
        }
        let placeholders = change_set_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("DELETE FROM {TABLE} WHERE ID IN ({placeholders})");
        let mut q = sqlx::query(&sql);
        for id in change_set_ids {
            q = q.bind(id);
        }
        q.execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct RawRow {
    #[sqlx(rename = "ID")]
    id: String,
    #[sqlx(rename = "AUTHOR")]
    author: Option<String>,
    #[sqlx(rename = "FILENAME")]
    filename: String,
    #[sqlx(rename = "DATEEXECUTED")]
    date_executed: Option<DateTime<Utc>>,
    #[sqlx(rename = "EXECTYPE")]
    exectype: String,
    #[sqlx(rename = "MD5SUM")]
    checksum: String,
    #[sqlx(rename = "COMMENTS")]
    comment: Option<String>,
}

impl From<RawRow> for MigrationChangeLogRow {
    fn from(r: RawRow) -> Self {
        MigrationChangeLogRow {
            change_set_id: r.id,
            author: r.author,
            filename: r.filename,
            date_executed: r.date_executed,
            exectype: r.exectype,
            checksum: r.checksum,
            comment: r.comment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_log_query_defaults_to_first_page() {
        let q = ChangeLogQuery::default();
        assert_eq!(q.page, 0);
        assert_eq!(q.size, 0);
    }
}
