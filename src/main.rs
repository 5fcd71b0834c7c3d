// 命令行入口 - 启动核心、填充演示数据、题库导入导出

use anyhow::Result;
use clap::{Parser, Subcommand};
use quizdesk::storage::seed;
use quizdesk::{init_app_state, logger, start_background_tasks};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "quizdesk", version, about = "桌面答题应用")]
struct Cli {
    /// 数据目录（数据库与配置文件所在位置）
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 启动应用核心并保持运行（默认）
    Launch,
    /// 填充演示账号与题库
    Seed,
    /// 从 CSV 或 JSON 文件导入题库
    Import {
        /// 题库文件路径
        path: PathBuf,
    },
    /// 导出题库到 CSV 或 JSON 文件
    Export {
        /// 输出文件路径
        path: PathBuf,
        /// 只导出指定分类
        #[arg(long)]
        category: Option<i64>,
    },
}

/// 平台默认数据目录
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join("Library/Application Support/quizdesk")
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("quizdesk")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".local/share/quizdesk")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init()?;

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let db_path = data_dir.join("quizdesk.db");
    let settings_path = data_dir.join("settings.json");

    let db_path = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("数据目录路径包含非法字符"))?
        .to_string();
    let state = init_app_state(&db_path, settings_path).await?;

    match cli.command.unwrap_or(Command::Launch) {
        Command::Launch => {
            start_background_tasks(&state).await;
            info!("应用核心已启动，按 Ctrl+C 退出");
            tokio::signal::ctrl_c().await?;
            info!("收到退出信号，正在关闭");
        }
        Command::Seed => {
            seed::seed_demo_data(state.storage_domain.get_db()).await?;
            println!("演示数据填充完成");
        }
        Command::Import { path } => {
            let report = state
                .storage_domain
                .get_transfer()
                .import_file(&path)
                .await?;
            println!(
                "导入完成: 新增 {} 道，跳过重复 {} 道，失败 {} 行",
                report.imported,
                report.skipped_duplicates,
                report.errors.len()
            );
            for error in &report.errors {
                println!("  第 {} 行: {}", error.row, error.message);
            }
        }
        Command::Export { path, category } => {
            let count = state
                .storage_domain
                .get_transfer()
                .export_file(&path, category)
                .await?;
            println!("导出完成: {} 道题目到 {}", count, path.display());
        }
    }

    Ok(())
}
