// 会话管理 - 内存会话表与超时看守

use crate::event_bus::{AppEvent, EventBus};
use crate::storage::models::{local_now, User};
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::info;
use uuid::Uuid;

/// 活跃会话信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// 会话表条目
struct SessionEntry {
    info: SessionInfo,
    /// 登录时绑定的记住我令牌，续期任务据此延长有效期
    remember_token: Option<String>,
}

/// 会话管理器
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    /// 空闲超时（分钟），使用RwLock实现内部可变性
    timeout_minutes: RwLock<i64>,
    event_bus: Arc<EventBus>,
}

impl SessionManager {
    pub fn new(event_bus: Arc<EventBus>, timeout_minutes: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout_minutes: RwLock::new(timeout_minutes),
            event_bus,
        }
    }

    /// 设置空闲超时
    pub async fn set_timeout_minutes(&self, minutes: i64) -> Result<()> {
        if minutes < 1 {
            return Err(anyhow::anyhow!("会话超时必须至少为1分钟"));
        }
        let mut timeout = self.timeout_minutes.write().await;
        *timeout = minutes;
        info!("会话超时已更新为: {}分钟", minutes);
        Ok(())
    }

    pub async fn get_timeout_minutes(&self) -> i64 {
        *self.timeout_minutes.read().await
    }

    /// 创建新会话
    pub async fn create_session(
        &self,
        user: &User,
        remember_token: Option<String>,
    ) -> Result<SessionInfo> {
        let user_id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("用户记录缺少 ID"))?;

        let now = local_now();
        let info = SessionInfo {
            session_id: Uuid::new_v4().to_string(),
            user_id,
            username: user.username.clone(),
            role: user.role.clone(),
            created_at: now,
            last_active: now,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(
            info.session_id.clone(),
            SessionEntry {
                info: info.clone(),
                remember_token,
            },
        );

        info!("创建会话: {} (用户 {})", info.session_id, info.username);
        Ok(info)
    }

    /// 校验会话并刷新活跃时间，过期的会话会被移除
    pub async fn touch(&self, session_id: &str) -> Result<SessionInfo> {
        let timeout = *self.timeout_minutes.read().await;
        let now = local_now();

        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| anyhow::anyhow!("会话不存在或已登出"))?;

        if now - entry.info.last_active > ChronoDuration::minutes(timeout) {
            let expired = sessions.remove(session_id);
            if let Some(expired) = expired {
                self.event_bus.publish(AppEvent::SessionExpired {
                    user_id: expired.info.user_id,
                    session_id: session_id.to_string(),
                });
            }
            return Err(anyhow::anyhow!("会话已超时，请重新登录"));
        }

        entry.info.last_active = now;
        Ok(entry.info.clone())
    }

    /// 查询会话（不刷新活跃时间）
    pub async fn get_session(&self, session_id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|e| e.info.clone())
    }

    /// 移除会话，返回其信息
    pub async fn remove_session(&self, session_id: &str) -> Option<(SessionInfo, Option<String>)> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(session_id)
            .map(|e| (e.info, e.remember_token))
    }

    /// 移除某用户的全部会话（删除账号时使用）
    pub async fn remove_sessions_of_user(&self, user_id: i64) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| e.info.user_id != user_id);
        before - sessions.len()
    }

    /// 当前活跃会话列表
    pub async fn active_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.values().map(|e| e.info.clone()).collect()
    }

    /// 活跃会话绑定的记住我令牌
    pub async fn remembered_tokens(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter_map(|e| e.remember_token.clone())
            .collect()
    }

    /// 清理超时会话，返回清理数量
    pub async fn sweep_expired(&self) -> usize {
        let timeout = *self.timeout_minutes.read().await;
        let now = local_now();

        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, e)| now - e.info.last_active > ChronoDuration::minutes(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for session_id in &expired {
            if let Some(entry) = sessions.remove(session_id) {
                info!("会话超时: {} (用户 {})", session_id, entry.info.username);
                self.event_bus.publish(AppEvent::SessionExpired {
                    user_id: entry.info.user_id,
                    session_id: session_id.clone(),
                });
            }
        }

        expired.len()
    }

    /// 启动会话看守任务，每分钟清理一次超时会话
    pub async fn start_watchdog(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(60));
            info!("会话看守任务已启动，每分钟检查一次");

            loop {
                interval.tick().await;
                let swept = self.sweep_expired().await;
                if swept > 0 {
                    info!("看守任务清理了 {} 个超时会话", swept);
                }
            }
        });
    }
}

/// 绕开公共接口直接改写活跃时间，仅用于超时路径的测试
#[cfg(test)]
impl SessionManager {
    pub async fn backdate_session(&self, session_id: &str, minutes: i64) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.info.last_active = entry.info.last_active - ChronoDuration::minutes(minutes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user(id: i64, name: &str) -> User {
        User {
            id: Some(id),
            username: name.to_string(),
            password_hash: "hash".to_string(),
            role: "user".to_string(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_touch_refreshes_session() {
        let bus = Arc::new(EventBus::new(100));
        let manager = SessionManager::new(bus, 30);

        let session = manager
            .create_session(&make_user(1, "alice"), None)
            .await
            .unwrap();

        let touched = manager.touch(&session.session_id).await.unwrap();
        assert_eq!(touched.user_id, 1);
        assert!(touched.last_active >= session.last_active);
    }

    #[tokio::test]
    async fn test_expired_session_is_removed_on_touch() {
        let bus = Arc::new(EventBus::new(100));
        let mut rx = bus.subscribe();
        let manager = SessionManager::new(bus, 30);

        let session = manager
            .create_session(&make_user(2, "bob"), None)
            .await
            .unwrap();
        manager.backdate_session(&session.session_id, 31).await;

        assert!(manager.touch(&session.session_id).await.is_err());
        assert!(manager.get_session(&session.session_id).await.is_none());

        match rx.recv().await.unwrap() {
            AppEvent::SessionExpired { user_id, .. } => assert_eq!(user_id, 2),
            other => panic!("收到意外事件: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sweep_expired_only_removes_stale() {
        let bus = Arc::new(EventBus::new(100));
        let manager = SessionManager::new(bus, 30);

        let stale = manager
            .create_session(&make_user(3, "carol"), None)
            .await
            .unwrap();
        let fresh = manager
            .create_session(&make_user(4, "dave"), None)
            .await
            .unwrap();
        manager.backdate_session(&stale.session_id, 60).await;

        assert_eq!(manager.sweep_expired().await, 1);
        assert!(manager.get_session(&stale.session_id).await.is_none());
        assert!(manager.get_session(&fresh.session_id).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_sessions_of_user() {
        let bus = Arc::new(EventBus::new(100));
        let manager = SessionManager::new(bus, 30);

        manager
            .create_session(&make_user(5, "erin"), None)
            .await
            .unwrap();
        manager
            .create_session(&make_user(5, "erin"), None)
            .await
            .unwrap();
        manager
            .create_session(&make_user(6, "frank"), None)
            .await
            .unwrap();

        assert_eq!(manager.remove_sessions_of_user(5).await, 2);
        assert_eq!(manager.active_sessions().await.len(), 1);
    }
}
