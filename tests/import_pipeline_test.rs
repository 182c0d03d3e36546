// ==========================================
// 导入编排集成测试
// ==========================================
// 测试目标: 端到端验证 解析 → 识别 → 校验 → 查重 → 分批导入
//           以及取消 / 失败 / 进度 / 审计明细
// ==========================================


use async_trait::async_trait;
use contact_import::config::ImportSettings;
use contact_import::domain::contact::{Contact, ContactField};
use contact_import::domain::import::{FieldMapping, ImportConfig, ImportRecord, RowImportResult};
use contact_import::domain::types::{
    DuplicateResolution, ImportStep, ImportStrategy, MergeStrategy,
};
use contact_import::engine::ImportEngine;
use contact_import::importer::UniversalSheetIngestor;
use contact_import::repository::{
    ContactRepository, ImportAuditRepository, RepositoryError, RepositoryResult,
    SqliteContactRepository, SqliteImportAuditRepository,
};
use std::sync::Arc;
use test_helpers::{
    create_test_context, create_test_db, generate_contacts_csv, open_shared_connection,
    write_temp_csv, MockConfigReader,
};

const BASIC_CSV: &str = "姓名,电话\n张三,13800138000\n张三,13800138000\n,123\n";

// ==========================================
// 基础场景
// ==========================================

#[tokio::test]
async fn test_skip_duplicates_in_same_file() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    let csv = write_temp_csv(BASIC_CSV).expect("Failed to write csv");

    let handle = ctx
        .engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import");
    let report = handle.wait().await.expect("Import task failed");

    assert_eq!(report.status, ImportStep::Completed);
    assert!(!report.cancelled);
    assert_eq!(report.total, 3);
    assert_eq!(report.imported, 1);
    assert_eq!(report.duplicate, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 0);
    assert!((report.success_rate - 1.0 / 3.0).abs() < 1e-9);

    // 自动识别出姓名 / 电话
    let fields: Vec<&ContactField> = report.field_mappings.iter().map(|m| &m.system_field).collect();
    assert!(fields.contains(&&ContactField::Name));
    assert!(fields.contains(&&ContactField::Phone));

    let details = ctx
        .audit
        .list_import_details(&report.import_id)
        .await
        .expect("Failed to list details");
    assert_eq!(details.len(), 3);

    let first_id = details[0].contact_id.clone().expect("row 0 should be imported");
    assert!(details[0].success);

    assert!(details[1].is_duplicate);
    assert!(details[1].skipped);
    assert_eq!(details[1].resolution, Some(DuplicateResolution::Skip));
    assert_eq!(details[1].contact_id.as_deref(), Some(first_id.as_str()));

    assert!(!details[2].success);
    assert!(details[2].error.is_some());

    let stored = ctx.contacts.get_all().await.expect("Failed to list contacts");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "张三");
}

#[tokio::test]
async fn test_smart_merge_in_same_file() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    let csv = write_temp_csv(BASIC_CSV).expect("Failed to write csv");

    let report = ctx
        .engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SmartMerge))
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");

    assert_eq!(report.status, ImportStep::Completed);
    assert_eq!(report.imported, 1);
    assert_eq!(report.duplicate, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(
        report.resolution_histogram.get(&DuplicateResolution::Merge),
        Some(&1)
    );

    let details = ctx
        .audit
        .list_import_details(&report.import_id)
        .await
        .expect("Failed to list details");
    assert_eq!(details[1].resolution, Some(DuplicateResolution::Merge));
    assert_eq!(details[1].contact_id, details[0].contact_id);
    assert!(details[1].success);
    assert!(!details[1].skipped);

    let stored = ctx.contacts.get_all().await.expect("Failed to list contacts");
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_keep_both_creates_second_contact() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    let existing_id = ctx
        .contacts
        .insert(&Contact::new("李四").with_phone("13900001111"))
        .await
        .expect("Failed to seed contact");

    let csv = write_temp_csv("姓名,电话\n李四,13900001111\n").expect("Failed to write csv");
    let report = ctx
        .engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::KeepBoth))
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");

    assert_eq!(report.duplicate, 1);
    assert_eq!(report.imported, 0);

    let details = ctx
        .audit
        .list_import_details(&report.import_id)
        .await
        .expect("Failed to list details");
    assert_eq!(details[0].resolution, Some(DuplicateResolution::KeepBoth));
    let new_id = details[0].contact_id.clone().expect("keep-both should insert");
    assert_ne!(new_id, existing_id);

    let stored = ctx.contacts.get_all().await.expect("Failed to list contacts");
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_resolution_override_per_existing_contact() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    let existing_id = ctx
        .contacts
        .insert(&Contact::new("王五").with_phone("13700002222"))
        .await
        .expect("Failed to seed contact");

    let csv = write_temp_csv("姓名,电话,邮箱\n王五,13700002222,wangwu@example.com\n")
        .expect("Failed to write csv");

    let mut config = ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates);
    config
        .resolution_overrides
        .insert(existing_id.clone(), DuplicateResolution::Merge);

    let report = ctx
        .engine
        .start_import(config)
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");
    assert_eq!(report.duplicate, 1);

    let merged = ctx
        .contacts
        .get_by_id(&existing_id)
        .await
        .expect("Failed to load contact")
        .expect("contact should exist");
    assert_eq!(merged.email.as_deref(), Some("wangwu@example.com"));
}

#[tokio::test]
async fn test_manual_merge_leaves_target_untouched() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    let existing_id = ctx
        .contacts
        .insert(&Contact::new("赵六").with_phone("13600003333"))
        .await
        .expect("Failed to seed contact");

    let csv = write_temp_csv("姓名,电话,邮箱\n赵六,13600003333,zhaoliu@example.com\n")
        .expect("Failed to write csv");
    let mut config = ImportConfig::for_file(csv.path(), ImportStrategy::SmartMerge);
    config.merge_strategy = Some(MergeStrategy::Manual);

    let report = ctx
        .engine
        .start_import(config)
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");
    assert_eq!(report.duplicate, 1);

    let details = ctx
        .audit
        .list_import_details(&report.import_id)
        .await
        .expect("Failed to list details");
    assert!(!details[0].success);
    assert!(details[0].skipped);
    assert_eq!(details[0].contact_id.as_deref(), Some(existing_id.as_str()));

    let target = ctx
        .contacts
        .get_by_id(&existing_id)
        .await
        .expect("Failed to load contact")
        .expect("contact should exist");
    assert_eq!(target.email, None);
}

#[tokio::test]
async fn test_explicit_field_mappings() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    let csv = write_temp_csv("A,B\n孙七,13500004444\n").expect("Failed to write csv");

    let mut config = ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates);
    config.field_mappings = Some(vec![
        FieldMapping::new("A", ContactField::Name, 1.0),
        FieldMapping::new("B", ContactField::Phone, 1.0),
    ]);

    let report = ctx
        .engine
        .start_import(config)
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");
    assert_eq!(report.imported, 1);
    assert_eq!(report.field_mappings.len(), 2);

    let found = ctx
        .contacts
        .find_by_phone_or_email(Some("13500004444"), None)
        .await
        .expect("Failed to query contacts");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "孙七");
}

#[tokio::test]
async fn test_row_with_all_mapped_fields_empty_is_skipped() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    // 第二行只有未映射的 C 列有值
    let csv = write_temp_csv("A,B,C\n孙七,13500004444,x\n,,备注\n").expect("Failed to write csv");

    let mut config = ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates);
    config.field_mappings = Some(vec![
        FieldMapping::new("A", ContactField::Name, 1.0),
        FieldMapping::new("B", ContactField::Phone, 1.0),
    ]);

    let report = ctx
        .engine
        .start_import(config)
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");
    assert_eq!(report.status, ImportStep::Completed);
    assert_eq!(report.total, 2);
    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert!(report.top_errors.is_empty());

    let details = ctx
        .audit
        .list_import_details(&report.import_id)
        .await
        .expect("Failed to list details");
    assert_eq!(details.len(), 2);
    assert!(details[1].skipped && details[1].success);
    assert!(details[1].error.is_none());
    assert!(details[1].contact_id.is_none());

    let record = ctx
        .audit
        .get_import_record(&report.import_id)
        .await
        .expect("Failed to load record")
        .expect("record should exist");
    assert_eq!(record.counters.skipped, 1);
}

// ==========================================
// 失败路径
// ==========================================

#[tokio::test]
async fn test_invalid_explicit_mapping_fails_import() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    let csv = write_temp_csv("A,B\n孙七,13500004444\n").expect("Failed to write csv");

    let mut config = ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates);
    config.field_mappings = Some(vec![FieldMapping::new("X", ContactField::Name, 1.0)]);

    let report = ctx
        .engine
        .start_import(config)
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");

    assert_eq!(report.status, ImportStep::Failed);
    assert!(report.error_message.is_some());
    assert_eq!(report.imported, 0);
}

#[tokio::test]
async fn test_missing_file_fails_and_is_persisted() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");

    let config = ImportConfig::for_file("/nonexistent/联系人.csv", ImportStrategy::SkipDuplicates);
    let report = ctx
        .engine
        .start_import(config)
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");

    assert_eq!(report.status, ImportStep::Failed);
    assert_eq!(report.total, 0);

    let record = ctx
        .audit
        .get_import_record(&report.import_id)
        .await
        .expect("Failed to load record")
        .expect("record should exist");
    assert_eq!(record.status, ImportStep::Failed);
    assert!(record.error_message.is_some());
    assert!(record
        .error_trace
        .as_deref()
        .is_some_and(|t| t.contains("PARSING_FILE")));
    assert!(record.completed_at.is_some());
}

#[tokio::test]
async fn test_header_only_file_fails() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    let csv = write_temp_csv("姓名,电话\n").expect("Failed to write csv");

    let report = ctx
        .engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");

    assert_eq!(report.status, ImportStep::Failed);
}

/// get_all 直接 panic 的联系人仓储
struct PanickingContactRepository;

#[async_trait]
impl ContactRepository for PanickingContactRepository {
    async fn get_all(&self) -> RepositoryResult<Vec<Contact>> {
        panic!("store unavailable");
    }

    async fn get_by_id(&self, _contact_id: &str) -> RepositoryResult<Option<Contact>> {
        Ok(None)
    }

    async fn insert(&self, _contact: &Contact) -> RepositoryResult<String> {
        Ok("never".to_string())
    }

    async fn update(&self, _contact: &Contact) -> RepositoryResult<()> {
        Ok(())
    }

    async fn find_by_phone_or_email(
        &self,
        _phone: Option<&str>,
        _email: Option<&str>,
    ) -> RepositoryResult<Vec<Contact>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_panic_in_collaborator_becomes_failed() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let audit = Arc::new(SqliteImportAuditRepository::new(conn));

    let engine = ImportEngine::new(
        Arc::new(PanickingContactRepository),
        audit.clone(),
        Arc::new(UniversalSheetIngestor),
        ImportSettings::default(),
    );

    let csv = write_temp_csv(BASIC_CSV).expect("Failed to write csv");
    let report = engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");

    assert_eq!(report.status, ImportStep::Failed);
    assert!(report
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("store unavailable")));

    let record = audit
        .get_import_record(&report.import_id)
        .await
        .expect("Failed to load record")
        .expect("record should exist");
    assert_eq!(record.status, ImportStep::Failed);
    assert!(record
        .error_trace
        .as_deref()
        .is_some_and(|t| t.contains("panic=")));
}

/// 指定姓名的联系人插入失败，其余委托给 SQLite 仓储
struct FailingInsertContactRepository {
    inner: SqliteContactRepository,
    failing_name: String,
}

#[async_trait]
impl ContactRepository for FailingInsertContactRepository {
    async fn get_all(&self) -> RepositoryResult<Vec<Contact>> {
        self.inner.get_all().await
    }

    async fn get_by_id(&self, contact_id: &str) -> RepositoryResult<Option<Contact>> {
        self.inner.get_by_id(contact_id).await
    }

    async fn insert(&self, contact: &Contact) -> RepositoryResult<String> {
        if contact.name == self.failing_name {
            return Err(RepositoryError::DatabaseQueryError(
                "disk I/O error".to_string(),
            ));
        }
        self.inner.insert(contact).await
    }

    async fn update(&self, contact: &Contact) -> RepositoryResult<()> {
        self.inner.update(contact).await
    }

    async fn find_by_phone_or_email(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> RepositoryResult<Vec<Contact>> {
        self.inner.find_by_phone_or_email(phone, email).await
    }
}

#[tokio::test]
async fn test_insert_error_only_fails_its_row() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let inner = SqliteContactRepository::new(Arc::clone(&conn));
    let audit = Arc::new(SqliteImportAuditRepository::new(conn));

    let engine = ImportEngine::new(
        Arc::new(FailingInsertContactRepository {
            inner,
            failing_name: "测试2".to_string(),
        }),
        audit.clone(),
        Arc::new(UniversalSheetIngestor),
        ImportSettings {
            batch_size: 2,
            ..ImportSettings::default()
        },
    );

    let csv = write_temp_csv(&generate_contacts_csv(5)).expect("Failed to write csv");
    let report = engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");

    assert_eq!(report.status, ImportStep::Completed);
    assert!(report.error_message.is_none());
    assert_eq!(report.total, 5);
    assert_eq!(report.imported, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.top_errors.len(), 1);
    assert!(report.top_errors[0].0.contains("disk I/O error"));

    let details = audit
        .list_import_details(&report.import_id)
        .await
        .expect("Failed to list details");
    assert_eq!(details.len(), 5);
    let failed = &details[2];
    assert!(!failed.success);
    assert!(failed.contact_id.is_none());
    assert!(failed
        .error
        .as_deref()
        .is_some_and(|e| e.contains("disk I/O error")));
    // 失败行之后的行照常导入
    for detail in &details[3..] {
        assert!(detail.success);
        assert!(detail.contact_id.is_some());
    }

    let record = audit
        .get_import_record(&report.import_id)
        .await
        .expect("Failed to load record")
        .expect("record should exist");
    assert_eq!(record.status, ImportStep::Completed);
    assert_eq!(record.counters.failed, 1);
    assert_eq!(record.counters.imported, 4);
}

/// 写入 COMPLETED 状态时失败的审计仓储，其余委托给 SQLite 仓储
struct FailingCompletionAuditRepository {
    inner: SqliteImportAuditRepository,
}

#[async_trait]
impl ImportAuditRepository for FailingCompletionAuditRepository {
    async fn save_import_record(&self, record: &ImportRecord) -> RepositoryResult<()> {
        self.inner.save_import_record(record).await
    }

    async fn update_import_record(&self, record: &ImportRecord) -> RepositoryResult<()> {
        if record.status == ImportStep::Completed {
            return Err(RepositoryError::DatabaseQueryError(
                "database is locked".to_string(),
            ));
        }
        self.inner.update_import_record(record).await
    }

    async fn get_import_record(&self, import_id: &str) -> RepositoryResult<Option<ImportRecord>> {
        self.inner.get_import_record(import_id).await
    }

    async fn list_recent_imports(&self, limit: usize) -> RepositoryResult<Vec<ImportRecord>> {
        self.inner.list_recent_imports(limit).await
    }

    async fn save_import_detail(&self, detail: &RowImportResult) -> RepositoryResult<()> {
        self.inner.save_import_detail(detail).await
    }

    async fn list_import_details(&self, import_id: &str) -> RepositoryResult<Vec<RowImportResult>> {
        self.inner.list_import_details(import_id).await
    }

    async fn count_import_details(&self, import_id: &str) -> RepositoryResult<usize> {
        self.inner.count_import_details(import_id).await
    }
}

#[tokio::test]
async fn test_completion_write_failure_publishes_failed() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let contacts = Arc::new(SqliteContactRepository::new(Arc::clone(&conn)));
    let audit = Arc::new(FailingCompletionAuditRepository {
        inner: SqliteImportAuditRepository::new(conn),
    });

    let engine = ImportEngine::new(
        contacts,
        audit.clone(),
        Arc::new(UniversalSheetIngestor),
        ImportSettings::default(),
    );

    let csv = write_temp_csv(&generate_contacts_csv(3)).expect("Failed to write csv");
    let handle = engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import");
    let progress = handle.subscribe();
    let report = handle.wait().await.expect("Import task failed");

    assert_eq!(report.status, ImportStep::Failed);
    assert!(report
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("database is locked")));

    // 进度快照与持久化状态一致
    assert_eq!(progress.borrow().step, ImportStep::Failed);
    let record = audit
        .get_import_record(&report.import_id)
        .await
        .expect("Failed to load record")
        .expect("record should exist");
    assert_eq!(record.status, ImportStep::Failed);
}

// ==========================================
// 取消与进度
// ==========================================

#[tokio::test]
async fn test_cancel_before_first_batch() {
    let ctx = create_test_context(MockConfigReader::default())
        .await
        .expect("Failed to create test context");
    let csv = write_temp_csv(&generate_contacts_csv(10)).expect("Failed to write csv");

    let handle = ctx
        .engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import");
    handle.cancel();
    let report = handle.wait().await.expect("Import task failed");

    assert_eq!(report.status, ImportStep::Completed);
    assert!(report.cancelled);
    assert_eq!(report.total, 10);
    assert_eq!(report.imported + report.failed + report.duplicate + report.skipped, 0);

    let count = ctx
        .audit
        .count_import_details(&report.import_id)
        .await
        .expect("Failed to count details");
    assert_eq!(count, 0);
    assert!(ctx.contacts.get_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_cancel_between_batches() {
    let ctx = create_test_context(MockConfigReader::slow(1, 30))
        .await
        .expect("Failed to create test context");
    let csv = write_temp_csv(&generate_contacts_csv(20)).expect("Failed to write csv");

    let handle = ctx
        .engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import");

    let mut rx = handle.subscribe();
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.counters.processed >= 2 || snapshot.step.is_terminal() {
            break;
        }
    }
    assert!(ctx.engine.cancel_current_import());

    let report = handle.wait().await.expect("Import task failed");
    assert_eq!(report.status, ImportStep::Completed);
    assert!(report.cancelled);

    let record = ctx
        .audit
        .get_import_record(&report.import_id)
        .await
        .expect("Failed to load record")
        .expect("record should exist");
    let c = record.counters;
    assert!(c.processed >= 2);
    assert!(c.processed < c.total);
    assert_eq!(c.imported + c.failed + c.duplicate + c.skipped, c.processed);

    let count = ctx
        .audit
        .count_import_details(&report.import_id)
        .await
        .expect("Failed to count details");
    assert_eq!(count, c.processed);
    assert_eq!(ctx.contacts.get_all().await.expect("list").len(), c.imported);
}

#[tokio::test]
async fn test_new_import_cancels_previous() {
    let ctx = create_test_context(MockConfigReader::slow(1, 30))
        .await
        .expect("Failed to create test context");
    let first_csv = write_temp_csv(&generate_contacts_csv(20)).expect("Failed to write csv");
    let second_csv = write_temp_csv("姓名,电话\n周八,13300005555\n").expect("Failed to write csv");

    let first = ctx
        .engine
        .start_import(ImportConfig::for_file(first_csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start first import");
    let second = ctx
        .engine
        .start_import(ImportConfig::for_file(second_csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start second import");

    let first_report = first.wait().await.expect("First import task failed");
    let second_report = second.wait().await.expect("Second import task failed");

    assert!(first_report.cancelled);
    assert_eq!(first_report.status, ImportStep::Completed);
    assert!(!second_report.cancelled);
    assert_eq!(second_report.status, ImportStep::Completed);
    assert_eq!(second_report.imported, 1);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_reaches_one() {
    let ctx = create_test_context(MockConfigReader::slow(2, 0))
        .await
        .expect("Failed to create test context");
    let csv = write_temp_csv(&generate_contacts_csv(9)).expect("Failed to write csv");

    let handle = ctx
        .engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import");

    let mut rx = handle.subscribe();
    let collector = tokio::spawn(async move {
        let mut seen = vec![rx.borrow_and_update().clone()];
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            let done = snapshot.step.is_terminal();
            seen.push(snapshot);
            if done {
                break;
            }
        }
        seen
    });

    let report = handle.wait().await.expect("Import task failed");
    let seen = collector.await.expect("collector panicked");

    assert_eq!(report.imported, 9);
    for pair in seen.windows(2) {
        assert!(pair[1].progress >= pair[0].progress);
    }
    let last = seen.last().expect("at least one snapshot");
    assert_eq!(last.step, ImportStep::Completed);
    assert!((last.progress - 1.0).abs() < f64::EPSILON);
    assert_eq!(last.counters.processed, 9);
}

#[tokio::test]
async fn test_details_are_one_per_processed_row() {
    let ctx = create_test_context(MockConfigReader::slow(4, 0))
        .await
        .expect("Failed to create test context");
    let csv = write_temp_csv(&generate_contacts_csv(10)).expect("Failed to write csv");

    let report = ctx
        .engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");
    assert_eq!(report.imported, 10);

    let details = ctx
        .audit
        .list_import_details(&report.import_id)
        .await
        .expect("Failed to list details");
    let indices: Vec<usize> = details.iter().map(|d| d.row_index).collect();
    assert_eq!(indices, (0..10).collect::<Vec<_>>());

    // 再次导入同一文件: 全部命中重复
    let report = ctx
        .engine
        .start_import(ImportConfig::for_file(csv.path(), ImportStrategy::SkipDuplicates))
        .expect("Failed to start import")
        .wait()
        .await
        .expect("Import task failed");
    assert_eq!(report.imported, 0);
    assert_eq!(report.duplicate, 10);
    assert_eq!(ctx.contacts.get_all().await.expect("list").len(), 10);
}
