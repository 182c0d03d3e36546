// ==========================================
// 通讯录导入管道 - 导入审计 Repository 实现
// ==========================================
// 职责: import_record / import_detail 读写（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据映射
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::{ImportCounters, ImportRecord, RowImportResult};
use crate::domain::types::{DuplicateResolution, ImportStep, ImportStrategy};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_audit_repo::ImportAuditRepository;
use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const RECORD_COLUMNS: &str = r#"
    import_id, file_name, status, strategy,
    total_rows, processed_rows, imported_rows, failed_rows, duplicate_rows, skipped_rows,
    field_mappings_json, user_id, cancelled, error_message, error_trace,
    started_at, completed_at
"#;

const DETAIL_COLUMNS: &str = r#"
    import_id, row_index, success, contact_id, error, is_duplicate, skipped, resolution, created_at
"#;

/// 枚举字段解析失败 → rusqlite 转换错误
fn enum_error(idx: usize, field: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("未知取值: {}", raw),
        }),
    )
}

fn get_count(row: &Row, idx: usize) -> rusqlite::Result<usize> {
    let raw: i64 = row.get(idx)?;
    usize::try_from(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn to_sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// ==========================================
// SqliteImportAuditRepository
// ==========================================
pub struct SqliteImportAuditRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteImportAuditRepository {
    /// 从共享连接创建仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件创建仓储
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_record(row: &Row) -> rusqlite::Result<ImportRecord> {
        let status_raw: String = row.get(2)?;
        let status =
            ImportStep::from_str(&status_raw).ok_or_else(|| enum_error(2, "status", &status_raw))?;

        let strategy_raw: String = row.get(3)?;
        let strategy = ImportStrategy::from_str(&strategy_raw)
            .ok_or_else(|| enum_error(3, "strategy", &strategy_raw))?;

        let mappings_json: String = row.get(10)?;
        let field_mappings = serde_json::from_str(&mappings_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

        Ok(ImportRecord {
            import_id: row.get(0)?,
            file_name: row.get(1)?,
            status,
            strategy,
            counters: ImportCounters {
                total: get_count(row, 4)?,
                processed: get_count(row, 5)?,
                imported: get_count(row, 6)?,
                failed: get_count(row, 7)?,
                duplicate: get_count(row, 8)?,
                skipped: get_count(row, 9)?,
            },
            field_mappings,
            user_id: row.get(11)?,
            cancelled: row.get(12)?,
            error_message: row.get(13)?,
            error_trace: row.get(14)?,
            started_at: row.get(15)?,
            completed_at: row.get(16)?,
        })
    }

    fn map_detail(row: &Row) -> rusqlite::Result<RowImportResult> {
        let resolution_raw: Option<String> = row.get(7)?;
        let resolution = match resolution_raw {
            Some(raw) => Some(
                DuplicateResolution::from_str(&raw)
                    .ok_or_else(|| enum_error(7, "resolution", &raw))?,
            ),
            None => None,
        };

        Ok(RowImportResult {
            import_id: row.get(0)?,
            row_index: get_count(row, 1)?,
            success: row.get(2)?,
            contact_id: row.get(3)?,
            error: row.get(4)?,
            is_duplicate: row.get(5)?,
            skipped: row.get(6)?,
            resolution,
            created_at: row.get(8)?,
        })
    }
}

#[async_trait]
impl ImportAuditRepository for SqliteImportAuditRepository {
    async fn save_import_record(&self, record: &ImportRecord) -> RepositoryResult<()> {
        let mappings_json = serde_json::to_string(&record.field_mappings)?;
        let c = &record.counters;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_record (
                import_id, file_name, status, strategy,
                total_rows, processed_rows, imported_rows, failed_rows, duplicate_rows, skipped_rows,
                field_mappings_json, user_id, cancelled, error_message, error_trace,
                started_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                record.import_id,
                record.file_name,
                record.status.as_str(),
                record.strategy.as_str(),
                to_sql_count(c.total),
                to_sql_count(c.processed),
                to_sql_count(c.imported),
                to_sql_count(c.failed),
                to_sql_count(c.duplicate),
                to_sql_count(c.skipped),
                mappings_json,
                record.user_id,
                record.cancelled,
                record.error_message,
                record.error_trace,
                record.started_at,
                record.completed_at,
            ],
        )?;
        Ok(())
    }

    async fn update_import_record(&self, record: &ImportRecord) -> RepositoryResult<()> {
        let mappings_json = serde_json::to_string(&record.field_mappings)?;
        let c = &record.counters;

        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE import_record SET
                status = ?2,
                total_rows = ?3, processed_rows = ?4, imported_rows = ?5,
                failed_rows = ?6, duplicate_rows = ?7, skipped_rows = ?8,
                field_mappings_json = ?9, cancelled = ?10,
                error_message = ?11, error_trace = ?12, completed_at = ?13
            WHERE import_id = ?1
            "#,
            params![
                record.import_id,
                record.status.as_str(),
                to_sql_count(c.total),
                to_sql_count(c.processed),
                to_sql_count(c.imported),
                to_sql_count(c.failed),
                to_sql_count(c.duplicate),
                to_sql_count(c.skipped),
                mappings_json,
                record.cancelled,
                record.error_message,
                record.error_trace,
                record.completed_at,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportRecord".to_string(),
                id: record.import_id.clone(),
            });
        }
        Ok(())
    }

    async fn get_import_record(&self, import_id: &str) -> RepositoryResult<Option<ImportRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM import_record WHERE import_id = ?1", RECORD_COLUMNS);

        let record = conn
            .query_row(&sql, params![import_id], Self::map_record)
            .optional()?;
        Ok(record)
    }

    async fn list_recent_imports(&self, limit: usize) -> RepositoryResult<Vec<ImportRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_record ORDER BY started_at DESC, rowid DESC LIMIT ?1",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(params![to_sql_count(limit)], Self::map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn save_import_detail(&self, detail: &RowImportResult) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_detail (
                import_id, row_index, success, contact_id, error,
                is_duplicate, skipped, resolution, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                detail.import_id,
                to_sql_count(detail.row_index),
                detail.success,
                detail.contact_id,
                detail.error,
                detail.is_duplicate,
                detail.skipped,
                detail.resolution.map(|r| r.as_str()),
                detail.created_at,
            ],
        )?;
        Ok(())
    }

    async fn list_import_details(&self, import_id: &str) -> RepositoryResult<Vec<RowImportResult>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_detail WHERE import_id = ?1 ORDER BY row_index ASC",
            DETAIL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let details = stmt
            .query_map(params![import_id], Self::map_detail)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(details)
    }

    async fn count_import_details(&self, import_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM import_detail WHERE import_id = ?1",
            params![import_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::import::{FieldMapping, ImportConfig, RowOutcome};
    use crate::domain::contact::ContactField;
    use chrono::Utc;

    fn setup_repo() -> SqliteImportAuditRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        SqliteImportAuditRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn make_record(import_id: &str) -> ImportRecord {
        let config = ImportConfig::for_file("/tmp/contacts.csv", ImportStrategy::SkipDuplicates);
        ImportRecord::new(import_id.to_string(), &config)
    }

    #[tokio::test]
    async fn test_record_save_update_get() {
        let repo = setup_repo();
        let mut record = make_record("imp-1");
        repo.save_import_record(&record).await.unwrap();

        record.status = ImportStep::Completed;
        record.counters = ImportCounters {
            total: 3,
            processed: 3,
            imported: 1,
            failed: 1,
            duplicate: 1,
            skipped: 0,
        };
        record.field_mappings = vec![FieldMapping::new("姓名", ContactField::Name, 0.95)];
        record.completed_at = Some(Utc::now());
        repo.update_import_record(&record).await.unwrap();

        let loaded = repo.get_import_record("imp-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, ImportStep::Completed);
        assert_eq!(loaded.strategy, ImportStrategy::SkipDuplicates);
        assert_eq!(loaded.counters, record.counters);
        assert_eq!(loaded.field_mappings, record.field_mappings);
        assert_eq!(loaded.file_name, "contacts.csv");
        assert!(!loaded.cancelled);
        assert!(loaded.completed_at.is_some());

        assert!(repo.get_import_record("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let repo = setup_repo();
        let record = make_record("ghost");
        assert!(matches!(
            repo.update_import_record(&record).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_details_are_write_once_and_ordered() {
        let repo = setup_repo();
        repo.save_import_record(&make_record("imp-2")).await.unwrap();

        let d1 = RowImportResult::from_outcome(
            "imp-2",
            1,
            RowOutcome::Duplicate {
                resolution: DuplicateResolution::Skip,
                contact_id: Some("c1".to_string()),
                pending_manual: false,
            },
        );
        let d0 = RowImportResult::from_outcome(
            "imp-2",
            0,
            RowOutcome::Imported {
                contact_id: "c1".to_string(),
            },
        );
        repo.save_import_detail(&d1).await.unwrap();
        repo.save_import_detail(&d0).await.unwrap();

        assert!(matches!(
            repo.save_import_detail(&d0).await,
            Err(RepositoryError::UniqueConstraintViolation(_))
        ));

        let details = repo.list_import_details("imp-2").await.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].row_index, 0);
        assert_eq!(details[1].resolution, Some(DuplicateResolution::Skip));
        assert!(details[1].is_duplicate);
        assert_eq!(repo.count_import_details("imp-2").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_detail_requires_record() {
        let repo = setup_repo();
        let orphan = RowImportResult::from_outcome(
            "no-record",
            0,
            RowOutcome::Failed {
                error: "x".to_string(),
            },
        );
        assert!(matches!(
            repo.save_import_detail(&orphan).await,
            Err(RepositoryError::ForeignKeyViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_recent_imports() {
        let repo = setup_repo();
        for id in ["a", "b", "c"] {
            repo.save_import_record(&make_record(id)).await.unwrap();
        }

        let recent = repo.list_recent_imports(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].import_id, "c");
    }
}
