//! 账号与会话命令
//!
//! 提供注册、登录、登出和口令管理接口

use super::require_session;
use crate::auth::{LoginOutcome, SessionInfo};
use crate::storage::models::User;
use crate::AppState;

/// 注册新账号
///
/// # 参数
/// - `username`: 用户名（3-32个字符，字母数字下划线）
/// - `password`: 口令（至少6个字符）
///
/// # 返回
/// - `Ok(User)`: 新建的账号
/// - `Err(String)`: 错误信息
pub async fn register(state: &AppState, username: String, password: String) -> Result<User, String> {
    state
        .access_domain
        .get_auth()
        .register(&username, &password)
        .await
        .map_err(|e| e.to_string())
}

/// 用户名口令登录
///
/// # 参数
/// - `remember`: 为 true 时签发记住我令牌
pub async fn login(
    state: &AppState,
    username: String,
    password: String,
    remember: bool,
) -> Result<LoginOutcome, String> {
    state
        .access_domain
        .get_auth()
        .login(&username, &password, remember)
        .await
        .map_err(|e| e.to_string())
}

/// 记住我令牌登录，令牌兑换后轮换
pub async fn login_with_token(state: &AppState, token: String) -> Result<LoginOutcome, String> {
    state
        .access_domain
        .get_auth()
        .login_with_token(&token)
        .await
        .map_err(|e| e.to_string())
}

/// 登出当前会话
pub async fn logout(state: &AppState, session_id: String) -> Result<(), String> {
    state
        .access_domain
        .get_auth()
        .logout(&session_id)
        .await
        .map_err(|e| e.to_string())
}

/// 查询当前会话（刷新活跃时间）
pub async fn get_session(state: &AppState, session_id: String) -> Result<SessionInfo, String> {
    require_session(state, &session_id).await
}

/// 修改口令，需提供旧口令
pub async fn change_password(
    state: &AppState,
    session_id: String,
    old_password: String,
    new_password: String,
) -> Result<(), String> {
    let session = require_session(state, &session_id).await?;
    state
        .access_domain
        .get_auth()
        .change_password(session.user_id, &old_password, &new_password)
        .await
        .map_err(|e| e.to_string())
}
