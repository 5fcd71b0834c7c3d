//! 配置管理命令
//!
//! 读取与部分更新应用配置，更新后同步到各运行中组件

use super::require_admin;
use crate::event_bus::AppEvent;
use crate::models::{PersistedQuizConfig, QuizConfig};
use crate::AppState;
use tracing::info;

/// 获取当前配置
pub async fn get_config(
    state: &AppState,
    session_id: String,
) -> Result<PersistedQuizConfig, String> {
    require_admin(state, &session_id).await?;
    Ok(state.storage_domain.get_settings().get().await)
}

/// 部分更新配置，只有给出的字段会被修改；越界值在落盘前被整体拒绝
pub async fn update_config(
    state: &AppState,
    session_id: String,
    update: QuizConfig,
) -> Result<PersistedQuizConfig, String> {
    require_admin(state, &session_id).await?;

    let config = state
        .storage_domain
        .get_settings()
        .update(update)
        .await
        .map_err(|e| e.to_string())?;

    // 同步到运行中的组件
    state
        .access_domain
        .get_sessions()
        .set_timeout_minutes(config.session_timeout_minutes)
        .await
        .map_err(|e| e.to_string())?;
    state
        .access_domain
        .get_auth()
        .set_token_days(config.remember_token_days)
        .await
        .map_err(|e| e.to_string())?;
    state
        .access_domain
        .get_auth()
        .set_refresh_minutes(config.token_refresh_minutes)
        .await
        .map_err(|e| e.to_string())?;
    state
        .quiz_domain
        .get_analytics()
        .set_leaderboard_size(config.leaderboard_size)
        .await
        .map_err(|e| e.to_string())?;
    state
        .storage_domain
        .get_maintenance()
        .set_token_retention_days(config.remember_token_days)
        .await
        .map_err(|e| e.to_string())?;

    info!("配置已更新并同步到运行组件");
    state.event_bus.publish(AppEvent::ConfigUpdated {
        config_type: "quiz".to_string(),
    });

    Ok(config)
}
