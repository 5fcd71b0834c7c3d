// 账号模块 - 注册、登录、口令散列与记住我令牌

pub mod session;

pub use session::{SessionInfo, SessionManager};

use crate::event_bus::{AppEvent, EventBus};
use crate::storage::models::{local_now, RememberToken, User, UserRole};
use crate::storage::Database;
use anyhow::Result;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

/// 生成口令散列
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("口令散列失败: {}", e))?;
    Ok(hash.to_string())
}

/// 校验口令
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("口令散列格式错误: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// 登录结果
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoginOutcome {
    pub session: SessionInfo,
    /// 勾选"记住我"时返回新令牌，客户端持久化保存
    pub remember_token: Option<String>,
}

/// 账号服务
pub struct AuthService {
    db: Arc<Database>,
    sessions: Arc<SessionManager>,
    event_bus: Arc<EventBus>,
    /// 记住我令牌有效期（天）
    token_days: RwLock<i64>,
    /// 令牌续期检查间隔（分钟）
    refresh_minutes: RwLock<u64>,
}

impl AuthService {
    pub fn new(db: Arc<Database>, sessions: Arc<SessionManager>, event_bus: Arc<EventBus>) -> Self {
        Self {
            db,
            sessions,
            event_bus,
            token_days: RwLock::new(30),
            refresh_minutes: RwLock::new(60),
        }
    }

    pub async fn set_token_days(&self, days: i64) -> Result<()> {
        if days < 1 {
            return Err(anyhow::anyhow!("令牌有效期必须至少为1天"));
        }
        let mut token_days = self.token_days.write().await;
        *token_days = days;
        Ok(())
    }

    pub async fn set_refresh_minutes(&self, minutes: u64) -> Result<()> {
        if minutes < 1 {
            return Err(anyhow::anyhow!("续期间隔必须至少为1分钟"));
        }
        let mut refresh_minutes = self.refresh_minutes.write().await;
        *refresh_minutes = minutes;
        Ok(())
    }

    pub async fn get_refresh_minutes(&self) -> u64 {
        *self.refresh_minutes.read().await
    }

    /// 注册新账号，首个账号自动成为管理员
    pub async fn register(&self, username: &str, password: &str) -> Result<User> {
        validate_username(username)?;
        validate_password(password)?;

        if self.db.get_user_by_username(username).await?.is_some() {
            return Err(anyhow::anyhow!("用户名已被占用: {}", username));
        }

        let is_first_user = self.db.get_all_users().await?.is_empty();
        let role = if is_first_user {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let mut user = User {
            id: None,
            username: username.to_string(),
            password_hash: hash_password(password)?,
            role: role.as_str().to_string(),
            created_at: None,
        };
        let user_id = self.db.insert_user(&user).await?;
        user.id = Some(user_id);

        info!("注册新用户: {} (角色 {})", username, user.role);
        self.event_bus.publish(AppEvent::UserRegistered {
            user_id,
            username: username.to_string(),
        });

        Ok(user)
    }

    /// 用户名口令登录
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember: bool,
    ) -> Result<LoginOutcome> {
        let user = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("用户名或口令错误"))?;

        if !verify_password(password, &user.password_hash)? {
            warn!("登录失败（口令错误）: {}", username);
            return Err(anyhow::anyhow!("用户名或口令错误"));
        }

        let remember_token = if remember {
            Some(self.issue_remember_token(&user).await?)
        } else {
            None
        };

        let session = self
            .sessions
            .create_session(&user, remember_token.clone())
            .await?;

        info!("用户登录: {}", username);
        self.event_bus.publish(AppEvent::UserLoggedIn {
            user_id: session.user_id,
            session_id: session.session_id.clone(),
        });

        Ok(LoginOutcome {
            session,
            remember_token,
        })
    }

    /// 记住我令牌登录，令牌单次使用，兑换后轮换
    pub async fn login_with_token(&self, token: &str) -> Result<LoginOutcome> {
        let record = self
            .db
            .get_remember_token(token)
            .await?
            .ok_or_else(|| anyhow::anyhow!("令牌无效，请重新登录"))?;

        if record.expires_at < local_now() {
            self.db.delete_remember_token(token).await?;
            return Err(anyhow::anyhow!("令牌已过期，请重新登录"));
        }

        let user = self.db.get_user(record.user_id).await?;

        // 旧令牌作废，签发新令牌
        self.db.delete_remember_token(token).await?;
        let new_token = self.issue_remember_token(&user).await?;

        let session = self
            .sessions
            .create_session(&user, Some(new_token.clone()))
            .await?;

        info!("令牌登录: {}", user.username);
        self.event_bus.publish(AppEvent::UserLoggedIn {
            user_id: session.user_id,
            session_id: session.session_id.clone(),
        });

        Ok(LoginOutcome {
            session,
            remember_token: Some(new_token),
        })
    }

    /// 登出，同时作废会话绑定的记住我令牌
    pub async fn logout(&self, session_id: &str) -> Result<()> {
        if let Some((info, remember_token)) = self.sessions.remove_session(session_id).await {
            if let Some(token) = remember_token {
                self.db.delete_remember_token(&token).await?;
            }
            info!("用户登出: {}", info.username);
            self.event_bus.publish(AppEvent::UserLoggedOut {
                user_id: info.user_id,
            });
        }
        Ok(())
    }

    /// 修改口令，需提供旧口令
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        validate_password(new_password)?;

        let user = self.db.get_user(user_id).await?;
        if !verify_password(old_password, &user.password_hash)? {
            return Err(anyhow::anyhow!("旧口令错误"));
        }

        let new_hash = hash_password(new_password)?;
        self.db.update_user_password(user_id, &new_hash).await?;
        info!("用户 {} 修改了口令", user.username);
        Ok(())
    }

    /// 签发记住我令牌并落库
    async fn issue_remember_token(&self, user: &User) -> Result<String> {
        let user_id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("用户记录缺少 ID"))?;
        let days = *self.token_days.read().await;
        let now = local_now();

        let token = Uuid::new_v4().to_string();
        self.db
            .insert_remember_token(&RememberToken {
                id: None,
                user_id,
                token: token.clone(),
                expires_at: now + ChronoDuration::days(days),
                created_at: now,
            })
            .await?;

        Ok(token)
    }

    // ========== 管理员操作 ==========

    /// 所有账号列表
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.db.get_all_users().await
    }

    /// 调整账号角色
    pub async fn set_user_role(&self, user_id: i64, role: UserRole) -> Result<()> {
        self.db.update_user_role(user_id, role.as_str()).await?;
        info!("用户 {} 角色调整为 {}", user_id, role.as_str());
        Ok(())
    }

    /// 删除账号，同时踢掉其所有活跃会话
    pub async fn remove_user(&self, user_id: i64) -> Result<()> {
        self.db.delete_user(user_id).await?;
        let kicked = self.sessions.remove_sessions_of_user(user_id).await;
        if kicked > 0 {
            info!("删除用户 {} 时移除了 {} 个活跃会话", user_id, kicked);
        }
        Ok(())
    }

    /// 启动令牌续期任务：周期性延长活跃会话绑定的记住我令牌
    ///
    /// 每轮都重新读取续期间隔，配置更新后下一轮即生效
    pub async fn start_token_refresh_task(self: Arc<Self>) {
        tokio::spawn(async move {
            info!("令牌续期任务已启动");

            loop {
                let minutes = *self.refresh_minutes.read().await;
                sleep(Duration::from_secs(minutes * 60)).await;

                let tokens = self.sessions.remembered_tokens().await;
                if tokens.is_empty() {
                    continue;
                }

                let days = *self.token_days.read().await;
                let new_expiry = local_now() + ChronoDuration::days(days);
                for token in tokens {
                    if let Err(e) = self.db.update_token_expiry(&token, new_expiry).await {
                        error!("令牌续期失败: {}", e);
                    }
                }
            }
        });
    }
}

/// 用户名校验：3-32个字符，只允许字母数字下划线
fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(anyhow::anyhow!("用户名长度必须在3到32个字符之间"));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(anyhow::anyhow!("用户名只能包含字母、数字和下划线"));
    }
    Ok(())
}

/// 口令校验：至少6个字符
fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < 6 {
        return Err(anyhow::anyhow!("口令长度至少为6个字符"));
    }
    Ok(())
}
