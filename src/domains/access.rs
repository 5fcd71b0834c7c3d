// 账号领域管理器
//
// 负责账号与会话相关的功能
// 包含 AuthService 和 SessionManager 两个核心组件

use crate::auth::{AuthService, SessionManager};
use std::sync::Arc;

/// 账号领域管理器 - 负责注册登录与会话
#[derive(Clone)]
pub struct AccessDomain {
    auth: Arc<AuthService>,
    sessions: Arc<SessionManager>,
}

impl AccessDomain {
    /// 创建新的账号领域管理器
    pub fn new(auth: Arc<AuthService>, sessions: Arc<SessionManager>) -> Self {
        Self { auth, sessions }
    }

    /// 获取账号服务
    pub fn get_auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    /// 获取会话管理器
    pub fn get_sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }
}
