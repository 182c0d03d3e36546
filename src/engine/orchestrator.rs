// ==========================================
// 通讯录导入管道 - 导入编排器
// ==========================================
// 职责: 驱动导入状态机，分批导入，持久化行级明细，上报进度，支持协作式取消
// 流程: INITIALIZING → PARSING_FILE → ANALYZING_DATA → RECOGNIZING_FIELDS
//       → VALIDATING_DATA → DETECTING_DUPLICATES → IMPORTING_DATA
//       → COMPLETED | FAILED
// 红线: 不拼 SQL，所有持久化通过 Repository；无跨行事务，已提交的行不回滚
// ==========================================

use crate::config::{ImportConfigReader, ImportSettings};
use crate::domain::contact::{Contact, MappedRecord};
use crate::domain::import::{
    FieldMapping, ImportConfig, ImportProgress, ImportRecord, ImportReport, RowImportResult,
    RowOutcome,
};
use crate::domain::sheet::SheetData;
use crate::domain::types::{DuplicateResolution, ImportStep, MergeStrategy};
use crate::domain::validation::{QualityReport, ValidationResult};
use crate::engine::progress::ProgressReporter;
use crate::engine::report::{build_report, ROW_ERROR_SEPARATOR};
use crate::i18n::{t, t_with_args};
use crate::importer::{
    merge_contacts, DataCleaner, DataCleanerImpl, DataValidator, DuplicateDetector,
    FieldRecognizer, ImportError, ImportResult, SheetIngestor,
};
use crate::repository::{ContactRepository, ImportAuditRepository};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 同文件内候选行的临时 ID 前缀（提交后解析为真实 ID）
const PENDING_ID_PREFIX: &str = "pending:";

fn pending_id(row_index: usize) -> String {
    format!("{}{}", PENDING_ID_PREFIX, row_index)
}

// ==========================================
// ImportEngine - 导入引擎
// ==========================================
/// 导入引擎
///
/// # 职责
/// 1. 每次 `start_import` 派生一个独立的异步任务
/// 2. 同一引擎只有一个“当前导入”，新导入会取消进行中的导入
/// 3. 进度与取消通过返回的 `ImportHandle` 暴露
pub struct ImportEngine {
    contacts: Arc<dyn ContactRepository>,
    audit: Arc<dyn ImportAuditRepository>,
    ingestor: Arc<dyn SheetIngestor>,
    cleaner: Arc<dyn DataCleaner>,
    settings: ImportSettings,
    current: Mutex<Option<CancellationToken>>,
}

impl ImportEngine {
    /// 创建导入引擎
    ///
    /// # 参数
    /// - contacts: 联系人仓储
    /// - audit: 导入审计仓储
    /// - ingestor: 表格读取器
    /// - settings: 引擎配置快照
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        audit: Arc<dyn ImportAuditRepository>,
        ingestor: Arc<dyn SheetIngestor>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            contacts,
            audit,
            ingestor,
            cleaner: Arc::new(DataCleanerImpl),
            settings,
            current: Mutex::new(None),
        }
    }

    /// 从配置读取器加载配置后创建引擎
    pub async fn from_config_reader(
        contacts: Arc<dyn ContactRepository>,
        audit: Arc<dyn ImportAuditRepository>,
        ingestor: Arc<dyn SheetIngestor>,
        reader: &dyn ImportConfigReader,
    ) -> ImportResult<Self> {
        let settings = ImportSettings::load(reader).await?;
        Ok(Self::new(contacts, audit, ingestor, settings))
    }

    /// 替换数据清洗器
    pub fn with_cleaner(mut self, cleaner: Arc<dyn DataCleaner>) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// 启动导入（立即返回，导入在后台任务中执行）
    ///
    /// 须在 tokio 运行时内调用
    ///
    /// # 返回
    /// - ImportHandle: 导入 ID / 进度订阅 / 取消 / 等待报告
    pub fn start_import(&self, config: ImportConfig) -> ImportResult<ImportHandle> {
        let import_id = Uuid::new_v4().to_string();
        let cancel_token = CancellationToken::new();

        {
            let mut current = self
                .current
                .lock()
                .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
            if let Some(previous) = current.replace(cancel_token.clone()) {
                if !previous.is_cancelled() {
                    info!(import_id = %import_id, "新导入启动，取消进行中的导入");
                    previous.cancel();
                }
            }
        }

        let reporter = ProgressReporter::new(&import_id);
        let progress = reporter.subscribe();

        info!(
            import_id = %import_id,
            file = %config.file_name(),
            strategy = config.strategy.as_str(),
            "{}",
            t_with_args("import.started", &[("file", &config.file_name())])
        );

        let run = ImportRun {
            import_id: import_id.clone(),
            record: ImportRecord::new(import_id.clone(), &config),
            config,
            settings: self.settings.clone(),
            contacts: Arc::clone(&self.contacts),
            audit: Arc::clone(&self.audit),
            ingestor: Arc::clone(&self.ingestor),
            cleaner: Arc::clone(&self.cleaner),
            reporter,
            cancel: cancel_token.clone(),
            details: Vec::new(),
            started: Instant::now(),
        };
        let task = tokio::spawn(run.execute_guarded());

        Ok(ImportHandle {
            import_id,
            progress,
            cancel_token,
            task,
        })
    }

    /// 请求取消当前导入（协作式：进行中的批次会处理完）
    ///
    /// # 返回
    /// - true: 存在进行中的导入并已发出取消
    pub fn cancel_current_import(&self) -> bool {
        let current = match self.current.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!(error = %e, "锁获取失败，无法取消导入");
                return false;
            }
        };

        match current.as_ref() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                info!("已请求取消当前导入");
                true
            }
            _ => false,
        }
    }
}

// ==========================================
// ImportHandle - 单次导入句柄
// ==========================================
pub struct ImportHandle {
    import_id: String,
    progress: watch::Receiver<ImportProgress>,
    cancel_token: CancellationToken,
    task: JoinHandle<ImportReport>,
}

impl ImportHandle {
    pub fn import_id(&self) -> &str {
        &self.import_id
    }

    /// 最新进度快照
    pub fn progress(&self) -> ImportProgress {
        self.progress.borrow().clone()
    }

    /// 订阅进度变化（只保留最新值）
    pub fn subscribe(&self) -> watch::Receiver<ImportProgress> {
        self.progress.clone()
    }

    /// 取消本次导入
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 等待导入结束并取得报告（FAILED 同样返回报告）
    pub async fn wait(self) -> ImportResult<ImportReport> {
        Ok(self.task.await?)
    }
}

// ==========================================
// 行级计划（DETECTING_DUPLICATES 阶段产出）
// ==========================================
enum RowPlan {
    /// 映射后所有字段为空（如显式映射只选了部分列）
    Empty,
    /// 校验失败
    Invalid { error: String },
    /// 作为新联系人插入
    New { contact: Contact },
    /// 命中重复（target_id 可能是同文件候选的临时 ID）
    Duplicate { contact: Contact, target_id: String },
}

struct PlannedRow {
    row_index: usize,
    plan: RowPlan,
}

// ==========================================
// ImportRun - 单次导入的执行体
// ==========================================
struct ImportRun {
    import_id: String,
    config: ImportConfig,
    settings: ImportSettings,
    contacts: Arc<dyn ContactRepository>,
    audit: Arc<dyn ImportAuditRepository>,
    ingestor: Arc<dyn SheetIngestor>,
    cleaner: Arc<dyn DataCleaner>,
    reporter: ProgressReporter,
    cancel: CancellationToken,
    record: ImportRecord,
    details: Vec<RowImportResult>,
    started: Instant,
}

impl ImportRun {
    /// 执行并兜底：错误与 panic 都收敛为 FAILED
    async fn execute_guarded(mut self) -> ImportReport {
        let outcome = AssertUnwindSafe(self.execute()).catch_unwind().await;

        match outcome {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                let trace = format!("step={} error={:?}", self.reporter.step(), err);
                self.fail(err.to_string(), trace).await
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                let trace = format!("step={} panic={}", self.reporter.step(), message);
                let err = ImportError::TaskAborted(message);
                self.fail(err.to_string(), trace).await
            }
        }
    }

    #[instrument(skip_all, fields(import_id = %self.import_id))]
    async fn execute(&mut self) -> ImportResult<ImportReport> {
        // === INITIALIZING ===
        self.audit.save_import_record(&self.record).await?;

        // === PARSING_FILE ===
        let file_name = self.config.file_name();
        self.transition(
            ImportStep::ParsingFile,
            t_with_args("import.step.parsing_file", &[("file", &file_name)]),
        )
        .await?;
        let sheet = self.ingest().await?;

        // === ANALYZING_DATA ===
        self.record.counters.total = sheet.rows.len();
        self.transition(
            ImportStep::AnalyzingData,
            t_with_args(
                "import.step.analyzing_data",
                &[
                    ("rows", &sheet.rows.len().to_string()),
                    ("columns", &sheet.headers.len().to_string()),
                ],
            ),
        )
        .await?;

        // === RECOGNIZING_FIELDS ===
        self.transition(ImportStep::RecognizingFields, t("import.step.recognizing_fields"))
            .await?;
        let mappings = self.resolve_mappings(&sheet)?;
        self.record.field_mappings = mappings.clone();

        // === VALIDATING_DATA ===
        self.transition(
            ImportStep::ValidatingData,
            t_with_args(
                "import.step.validating_data",
                &[("rows", &sheet.rows.len().to_string())],
            ),
        )
        .await?;
        let records: Vec<MappedRecord> = sheet
            .rows
            .iter()
            .map(|row| self.cleaner.clean_record(MappedRecord::from_row(row, &mappings)))
            .collect();
        let validator = DataValidator::new(self.config.validation_rules.clone())?;
        let results = validator.validate_batch(&records);
        let quality = validator.quality_report(&records, &results);
        info!(
            valid_rows = quality.valid_rows,
            total_rows = quality.total_rows,
            average_score = quality.average_score,
            "数据校验完成"
        );

        // === DETECTING_DUPLICATES ===
        let existing = self.contacts.get_all().await?;
        self.transition(
            ImportStep::DetectingDuplicates,
            t_with_args(
                "import.step.detecting_duplicates",
                &[("existing", &existing.len().to_string())],
            ),
        )
        .await?;
        let plans = self.plan_rows(existing, &records, &results);

        // === IMPORTING_DATA ===
        self.transition(ImportStep::ImportingData, self.importing_message())
            .await?;
        self.import_rows(&plans).await?;

        // === COMPLETED ===
        self.complete(quality).await
    }

    /// 状态切换: 先持久化状态，成功后再发布进度快照
    ///
    /// 持久化失败时快照停留在上一步，随后由 `fail` 发布 FAILED
    async fn transition(&mut self, step: ImportStep, message: String) -> ImportResult<()> {
        self.reporter.check_transition(step)?;
        self.record.status = step;
        self.audit.update_import_record(&self.record).await?;
        self.reporter.enter(step, self.record.counters, message)
    }

    /// 在阻塞线程池中读取表格
    async fn ingest(&self) -> ImportResult<SheetData> {
        let ingestor = Arc::clone(&self.ingestor);
        let config = self.config.clone();
        let sample_size = self.settings.recognition_sample_size;

        let sheet = tokio::task::spawn_blocking(move || ingestor.ingest(&config, sample_size))
            .await??;

        info!(
            rows = sheet.rows.len(),
            columns = sheet.headers.len(),
            "文件解析完成"
        );
        Ok(sheet)
    }

    /// 显式映射优先；否则自动识别
    fn resolve_mappings(&self, sheet: &SheetData) -> ImportResult<Vec<FieldMapping>> {
        if let Some(explicit) = &self.config.field_mappings {
            let headers: HashSet<&str> = sheet.headers.iter().map(String::as_str).collect();
            let mut seen = HashSet::new();
            for mapping in explicit {
                if !headers.contains(mapping.excel_column.as_str()) {
                    return Err(ImportError::InvalidFieldMapping(format!(
                        "列不存在: {}",
                        mapping.excel_column
                    )));
                }
                if !seen.insert(mapping.excel_column.as_str()) {
                    return Err(ImportError::InvalidFieldMapping(format!(
                        "列被重复映射: {}",
                        mapping.excel_column
                    )));
                }
            }
            info!(mappings = explicit.len(), "使用显式字段映射");
            return Ok(explicit.clone());
        }

        let recognizer = FieldRecognizer::new(self.settings.pattern_sample_size);
        let sample_end = sheet.rows.len().min(self.settings.recognition_sample_size);
        let result = recognizer.recognize(
            &sheet.headers,
            &sheet.column_stats,
            &sheet.rows[..sample_end],
        );

        for suggestion in &result.suggestions {
            info!(suggestion = %suggestion, "字段识别建议");
        }
        info!(
            overall_confidence = result.overall_confidence,
            unrecognized = result.unrecognized_columns.len(),
            "字段识别完成"
        );
        Ok(result.field_mappings)
    }

    /// 为每行确定处理计划
    ///
    /// 快照 = 本阶段开始时的 Store 全量；无重复的有效行按文件顺序追加为候选，
    /// 以重复方式写入的行（如 KEEP_BOTH）不追加
    fn plan_rows(
        &self,
        existing: Vec<Contact>,
        records: &[MappedRecord],
        results: &[ValidationResult],
    ) -> Vec<PlannedRow> {
        let resolution = self.config.strategy.default_resolution();
        let mut detector = DuplicateDetector::new(existing);
        let mut plans = Vec::with_capacity(records.len());

        for (record, result) in records.iter().zip(results) {
            let row_index = record.row_index;
            let plan = if record.is_blank() {
                RowPlan::Empty
            } else if !result.is_valid {
                RowPlan::Invalid {
                    error: result.errors.join(ROW_ERROR_SEPARATOR),
                }
            } else {
                let contact = record.to_contact();
                let check = detector.detect(&contact, resolution);
                match check.best_match {
                    Some(best) => RowPlan::Duplicate {
                        contact,
                        target_id: best.existing_id,
                    },
                    None => {
                        detector.add_candidate(pending_id(row_index), contact.clone());
                        RowPlan::New { contact }
                    }
                }
            };
            plans.push(PlannedRow { row_index, plan });
        }

        debug!(
            rows = plans.len(),
            candidates = detector.snapshot_len(),
            "重复检测完成"
        );
        plans
    }

    /// 分批导入；每批前检查取消标志
    async fn import_rows(&mut self, plans: &[PlannedRow]) -> ImportResult<()> {
        let batch_size = self.settings.batch_size.max(1);
        let mut committed: HashMap<usize, String> = HashMap::new();

        for (batch_no, batch) in plans.chunks(batch_size).enumerate() {
            if self.cancel.is_cancelled() {
                self.record.cancelled = true;
                info!(
                    batch_no,
                    processed = self.record.counters.processed,
                    total = self.record.counters.total,
                    "导入已取消，停止后续批次"
                );
                break;
            }

            for row in batch {
                let outcome = self.apply_plan(row, &mut committed).await;
                let detail = RowImportResult::from_outcome(&self.import_id, row.row_index, outcome);

                // 明细写入失败视为编排错误，整体 FAILED
                self.audit.save_import_detail(&detail).await?;
                self.record.counters.record(&detail);
                self.details.push(detail);
            }

            self.reporter
                .batch_progress(self.record.counters, self.importing_message());
            self.audit.update_import_record(&self.record).await?;
            debug!(batch_no, counters = ?self.record.counters, "批次完成");

            if self.settings.batch_pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.settings.batch_pause_ms)).await;
            } else {
                tokio::task::yield_now().await;
            }
        }

        Ok(())
    }

    /// 执行单行计划；仓储错误只影响本行
    async fn apply_plan(
        &self,
        row: &PlannedRow,
        committed: &mut HashMap<usize, String>,
    ) -> RowOutcome {
        match &row.plan {
            RowPlan::Empty => RowOutcome::Skipped {
                reason: t("import.row.empty_record"),
            },
            RowPlan::Invalid { error } => RowOutcome::Failed {
                error: error.clone(),
            },
            RowPlan::New { contact } => self.insert_new(row.row_index, contact, committed).await,
            RowPlan::Duplicate { contact, target_id } => {
                let Some(target_id) = resolve_target(target_id, committed) else {
                    // 同文件中的目标行未能提交，本行按新联系人处理
                    debug!(row_index = row.row_index, target = %target_id, "候选目标未提交");
                    return self.insert_new(row.row_index, contact, committed).await;
                };

                let resolution = self
                    .config
                    .resolution_overrides
                    .get(&target_id)
                    .copied()
                    .unwrap_or_else(|| self.config.strategy.default_resolution());

                self.resolve_duplicate(row.row_index, contact, target_id, resolution)
                    .await
            }
        }
    }

    async fn insert_new(
        &self,
        row_index: usize,
        contact: &Contact,
        committed: &mut HashMap<usize, String>,
    ) -> RowOutcome {
        match self.contacts.insert(contact).await {
            Ok(contact_id) => {
                committed.insert(row_index, contact_id.clone());
                RowOutcome::Imported { contact_id }
            }
            Err(e) => {
                warn!(row_index, error = %e, "联系人插入失败");
                RowOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn resolve_duplicate(
        &self,
        row_index: usize,
        contact: &Contact,
        target_id: String,
        resolution: DuplicateResolution,
    ) -> RowOutcome {
        debug!(row_index, target = %target_id, resolution = resolution.as_str(), "处理重复行");

        let merge_strategy = match resolution {
            DuplicateResolution::Skip => {
                return RowOutcome::Duplicate {
                    resolution,
                    contact_id: Some(target_id),
                    pending_manual: false,
                }
            }
            DuplicateResolution::KeepBoth => {
                return match self.contacts.insert(contact).await {
                    Ok(contact_id) => RowOutcome::Duplicate {
                        resolution,
                        contact_id: Some(contact_id),
                        pending_manual: false,
                    },
                    Err(e) => {
                        warn!(row_index, error = %e, "联系人插入失败");
                        RowOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
            }
            DuplicateResolution::Replace => MergeStrategy::PreserveSource,
            DuplicateResolution::Merge => self
                .config
                .merge_strategy
                .unwrap_or(self.settings.default_merge_strategy),
        };

        // 合并目标从 Store 重新读取，包含同一次导入中已合并的结果
        let target = match self.contacts.get_by_id(&target_id).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                return RowOutcome::Failed {
                    error: t_with_args("import.row.merge_target_missing", &[("id", &target_id)]),
                }
            }
            Err(e) => {
                return RowOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let merged = merge_contacts(&target, contact, merge_strategy);
        if merged.requires_manual {
            debug!(row_index, target = %target_id, "{}", t("import.row.pending_manual"));
            return RowOutcome::Duplicate {
                resolution,
                contact_id: Some(target_id),
                pending_manual: true,
            };
        }

        match self.contacts.update(&merged.contact).await {
            Ok(()) => RowOutcome::Duplicate {
                resolution,
                contact_id: Some(target_id),
                pending_manual: false,
            },
            Err(e) => {
                warn!(row_index, error = %e, "联系人更新失败");
                RowOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// COMPLETED（含取消）
    async fn complete(&mut self, quality: QualityReport) -> ImportResult<ImportReport> {
        let c = self.record.counters;
        let message = if self.record.cancelled {
            t_with_args(
                "import.step.cancelled",
                &[
                    ("processed", &c.processed.to_string()),
                    ("total", &c.total.to_string()),
                ],
            )
        } else {
            t_with_args(
                "import.step.completed",
                &[
                    ("imported", &c.imported.to_string()),
                    ("failed", &c.failed.to_string()),
                    ("duplicate", &c.duplicate.to_string()),
                    ("skipped", &c.skipped.to_string()),
                ],
            )
        };

        self.record.completed_at = Some(Utc::now());
        self.transition(ImportStep::Completed, message).await?;

        info!(
            import_id = %self.import_id,
            imported = c.imported,
            failed = c.failed,
            duplicate = c.duplicate,
            skipped = c.skipped,
            cancelled = self.record.cancelled,
            "导入结束"
        );

        Ok(build_report(
            &self.record,
            &self.details,
            Some(quality),
            self.started.elapsed(),
        ))
    }

    /// FAILED: 记录错误并尽力持久化
    async fn fail(&mut self, message: String, trace: String) -> ImportReport {
        error!(import_id = %self.import_id, error = %message, "导入失败");

        self.record.status = ImportStep::Failed;
        self.record.error_message = Some(message.clone());
        self.record.error_trace = Some(trace);
        self.record.completed_at = Some(Utc::now());

        self.reporter.fail(
            self.record.counters,
            t_with_args("import.step.failed", &[("error", &message)]),
        );

        if let Err(e) = self.audit.update_import_record(&self.record).await {
            error!(import_id = %self.import_id, error = %e, "导入失败状态持久化失败");
        }

        build_report(&self.record, &self.details, None, self.started.elapsed())
    }

    fn importing_message(&self) -> String {
        let c = self.record.counters;
        t_with_args(
            "import.step.importing_data",
            &[
                ("processed", &c.processed.to_string()),
                ("total", &c.total.to_string()),
            ],
        )
    }
}

/// 临时 ID → 已提交的联系人 ID；非临时 ID 原样返回
fn resolve_target(target_id: &str, committed: &HashMap<usize, String>) -> Option<String> {
    match target_id.strip_prefix(PENDING_ID_PREFIX) {
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .and_then(|row_index| committed.get(&row_index).cloned()),
        None => Some(target_id.to_string()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        let mut committed = HashMap::new();
        committed.insert(3usize, "c-3".to_string());

        assert_eq!(resolve_target("c-9", &committed).as_deref(), Some("c-9"));
        assert_eq!(resolve_target(&pending_id(3), &committed).as_deref(), Some("c-3"));
        assert_eq!(resolve_target(&pending_id(4), &committed), None);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(payload.as_ref()), "kaboom");
    }
}
