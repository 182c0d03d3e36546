// ==========================================
// 通讯录导入管道 - 命令行入口
// ==========================================
// 用法: contact-import <文件路径> [策略] [数据库路径]
// 策略: SKIP_DUPLICATES | SMART_MERGE | REPLACE_EXISTING | KEEP_BOTH
// ==========================================

use anyhow::{bail, Context};
use contact_import::db::default_db_path;
use contact_import::{logging, ImportApi, ImportConfig, ImportStrategy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", contact_import::APP_NAME, contact_import::VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let Some(file_path) = args.next() else {
        bail!("用法: contact-import <文件路径> [策略] [数据库路径]");
    };

    let strategy = match args.next() {
        Some(raw) => ImportStrategy::from_str(&raw.to_uppercase())
            .with_context(|| format!("未知的导入策略: {}", raw))?,
        None => ImportStrategy::SkipDuplicates,
    };

    let db_path = match args.next() {
        Some(path) => path.into(),
        None => default_db_path(),
    };
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("无法创建数据目录: {}", parent.display()))?;
    }
    tracing::info!("使用数据库: {}", db_path.display());

    let api = ImportApi::open(&db_path.to_string_lossy()).await?;
    let report = api
        .import_file(ImportConfig::for_file(file_path, strategy))
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
