//! 命令模块
//!
//! 提供桌面外壳调用的所有命令接口，按功能分组：
//! - auth: 账号与会话命令
//! - quiz: 答题流程命令
//! - query: 数据查询命令
//! - admin: 管理端命令
//! - config: 配置管理命令
//! - transfer: 题库导入导出命令

pub mod admin;
pub mod auth;
pub mod config;
pub mod query;
pub mod quiz;
pub mod transfer;

// 重新导出所有命令
pub use admin::*;
pub use auth::*;
pub use config::*;
pub use query::*;
pub use quiz::*;
pub use transfer::*;

use crate::auth::SessionInfo;
use crate::AppState;

// ==================== 公共辅助函数 ====================

/// 校验会话并刷新活跃时间，所有需要登录的命令先过这里
pub(crate) async fn require_session(
    state: &AppState,
    session_id: &str,
) -> Result<SessionInfo, String> {
    state
        .access_domain
        .get_sessions()
        .touch(session_id)
        .await
        .map_err(|e| e.to_string())
}

/// 校验管理员会话
pub(crate) async fn require_admin(
    state: &AppState,
    session_id: &str,
) -> Result<SessionInfo, String> {
    let session = require_session(state, session_id).await?;
    if session.role != "admin" {
        return Err("该操作需要管理员权限".to_string());
    }
    Ok(session)
}

/// 验证数据库 ID 是否有效（防止无效输入）
pub(crate) fn validate_id(id: i64, what: &str) -> Result<(), String> {
    if id < 1 {
        return Err(format!("无效的{} ID: {}", what, id));
    }
    Ok(())
}
