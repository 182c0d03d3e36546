// ==========================================
// 通讯录导入 API
// ==========================================
// 职责: 打开数据库、装配导入引擎，对外暴露启动 / 取消 / 查询
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportSettings};
use crate::db::{configure_sqlite_connection, init_schema, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::domain::contact::Contact;
use crate::domain::import::{ImportConfig, ImportRecord, ImportReport, RowImportResult};
use crate::engine::{build_report, ImportEngine, ImportHandle};
use crate::i18n::t_with_args;
use crate::importer::UniversalSheetIngestor;
use crate::repository::{
    ContactRepository, ImportAuditRepository, SqliteContactRepository,
    SqliteImportAuditRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 导入API
pub struct ImportApi {
    contacts: Arc<SqliteContactRepository>,
    audit: Arc<SqliteImportAuditRepository>,
    config: ConfigManager,
    engine: ImportEngine,
}

impl ImportApi {
    /// 打开（或创建）数据库并装配导入引擎
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub async fn open(db_path: &str) -> ApiResult<Self> {
        let conn = Connection::open(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn))).await
    }

    /// 从已有连接装配（所有仓储共享同一连接）
    pub async fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ApiError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;
            configure_sqlite_connection(&guard)
                .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
            init_schema(&guard).map_err(|e| ApiError::DatabaseError(e.to_string()))?;

            match read_schema_version(&guard) {
                Ok(Some(v)) if v != CURRENT_SCHEMA_VERSION => {
                    tracing::warn!(
                        found = v,
                        expected = CURRENT_SCHEMA_VERSION,
                        "数据库 schema_version 与当前版本不一致"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "读取 schema_version 失败"),
            }
        }

        let contacts = Arc::new(SqliteContactRepository::new(Arc::clone(&conn)));
        let audit = Arc::new(SqliteImportAuditRepository::new(Arc::clone(&conn)));
        let config = ConfigManager::from_connection(Arc::clone(&conn))?;
        let settings = ImportSettings::load(&config).await?;

        let engine = ImportEngine::new(
            contacts.clone(),
            audit.clone(),
            Arc::new(UniversalSheetIngestor),
            settings,
        );

        Ok(Self {
            contacts,
            audit,
            config,
            engine,
        })
    }

    pub fn engine(&self) -> &ImportEngine {
        &self.engine
    }

    /// 启动导入（立即返回句柄）
    ///
    /// # 错误
    /// - 文件不存在 → InvalidInput
    pub fn start_import(&self, config: ImportConfig) -> ApiResult<ImportHandle> {
        if !config.file_path.exists() {
            let path = config.file_path.display().to_string();
            return Err(ApiError::InvalidInput(t_with_args(
                "import.file_not_found",
                &[("path", &path)],
            )));
        }
        Ok(self.engine.start_import(config)?)
    }

    /// 启动导入并等待报告
    pub async fn import_file(&self, config: ImportConfig) -> ApiResult<ImportReport> {
        let handle = self.start_import(config)?;
        Ok(handle.wait().await?)
    }

    /// 请求取消当前导入
    pub fn cancel_current_import(&self) -> bool {
        self.engine.cancel_current_import()
    }

    /// 查询导入批次记录
    pub async fn get_import_record(&self, import_id: &str) -> ApiResult<ImportRecord> {
        self.audit
            .get_import_record(import_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ImportRecord(id={})不存在", import_id)))
    }

    /// 由审计数据重建导入报告（不含质量报告）
    pub async fn get_import_report(&self, import_id: &str) -> ApiResult<ImportReport> {
        let record = self.get_import_record(import_id).await?;
        let details = self.audit.list_import_details(import_id).await?;

        let duration = record
            .completed_at
            .and_then(|end| (end - record.started_at).to_std().ok())
            .unwrap_or(Duration::ZERO);

        Ok(build_report(&record, &details, None, duration))
    }

    pub async fn list_import_details(&self, import_id: &str) -> ApiResult<Vec<RowImportResult>> {
        Ok(self.audit.list_import_details(import_id).await?)
    }

    pub async fn list_recent_imports(&self, limit: usize) -> ApiResult<Vec<ImportRecord>> {
        Ok(self.audit.list_recent_imports(limit).await?)
    }

    /// 按电话或邮箱查找联系人
    pub async fn find_contacts(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> ApiResult<Vec<Contact>> {
        Ok(self.contacts.find_by_phone_or_email(phone, email).await?)
    }

    pub async fn list_contacts(&self) -> ApiResult<Vec<Contact>> {
        Ok(self.contacts.get_all().await?)
    }

    /// 写入配置（对下一次装配的引擎生效）
    pub fn set_config(&self, key: &str, value: &str) -> ApiResult<()> {
        Ok(self.config.set_config_value(key, value)?)
    }
}
