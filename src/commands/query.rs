//! 数据查询命令
//!
//! 提供各类数据查询接口，包括：
//! - 排行榜查询
//! - 个人答题历史与概况
//! - 答题记录详情
//! - 存储状态查询

use super::{require_session, validate_id};
use crate::storage::maintenance::StorageStats;
use crate::storage::models::{AttemptDetail, LeaderboardEntry, QuizAttempt, UserSummary};
use crate::AppState;

/// 获取全局排行榜
pub async fn get_leaderboard(
    state: &AppState,
    session_id: String,
) -> Result<Vec<LeaderboardEntry>, String> {
    require_session(state, &session_id).await?;
    state
        .quiz_domain
        .get_analytics()
        .leaderboard()
        .await
        .map_err(|e| e.to_string())
}

/// 获取某分类的排行榜
pub async fn get_category_leaderboard(
    state: &AppState,
    session_id: String,
    category_id: i64,
) -> Result<Vec<LeaderboardEntry>, String> {
    require_session(state, &session_id).await?;
    validate_id(category_id, "分类")?;
    state
        .quiz_domain
        .get_analytics()
        .category_leaderboard(category_id)
        .await
        .map_err(|e| e.to_string())
}

/// 获取当前用户的答题概况
pub async fn get_my_summary(state: &AppState, session_id: String) -> Result<UserSummary, String> {
    let session = require_session(state, &session_id).await?;
    state
        .quiz_domain
        .get_analytics()
        .user_summary(session.user_id)
        .await
        .map_err(|e| e.to_string())
}

/// 获取当前用户的答题历史
pub async fn get_my_history(
    state: &AppState,
    session_id: String,
) -> Result<Vec<QuizAttempt>, String> {
    let session = require_session(state, &session_id).await?;
    state
        .quiz_domain
        .get_analytics()
        .user_history(session.user_id)
        .await
        .map_err(|e| e.to_string())
}

/// 获取答题记录详情，只能查看自己的记录
pub async fn get_attempt_detail(
    state: &AppState,
    session_id: String,
    attempt_id: i64,
) -> Result<AttemptDetail, String> {
    let session = require_session(state, &session_id).await?;
    validate_id(attempt_id, "答题记录")?;

    let detail = state
        .storage_domain
        .get_db()
        .get_attempt_detail(attempt_id)
        .await
        .map_err(|e| e.to_string())?;

    if detail.attempt.user_id != session.user_id && session.role != "admin" {
        return Err("只能查看自己的答题记录".to_string());
    }
    Ok(detail)
}

/// 获取存储统计信息
pub async fn get_storage_stats(
    state: &AppState,
    session_id: String,
) -> Result<StorageStats, String> {
    require_session(state, &session_id).await?;
    state
        .storage_domain
        .get_maintenance()
        .get_storage_stats()
        .await
        .map_err(|e| e.to_string())
}
