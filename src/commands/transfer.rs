//! 题库导入导出命令

use super::{require_admin, validate_id};
use crate::transfer::ImportReport;
use crate::AppState;
use std::path::PathBuf;

/// 从 CSV 或 JSON 文件导入题库，返回逐行报告
pub async fn import_questions(
    state: &AppState,
    session_id: String,
    path: String,
) -> Result<ImportReport, String> {
    require_admin(state, &session_id).await?;
    state
        .storage_domain
        .get_transfer()
        .import_file(&PathBuf::from(path))
        .await
        .map_err(|e| e.to_string())
}

/// 导出题库到 CSV 或 JSON 文件，category_id 为空时导出全部
pub async fn export_questions(
    state: &AppState,
    session_id: String,
    path: String,
    category_id: Option<i64>,
) -> Result<usize, String> {
    require_admin(state, &session_id).await?;
    if let Some(category_id) = category_id {
        validate_id(category_id, "分类")?;
    }
    state
        .storage_domain
        .get_transfer()
        .export_file(&PathBuf::from(path), category_id)
        .await
        .map_err(|e| e.to_string())
}
