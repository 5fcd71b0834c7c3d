// 存储维护模块 - 定时清理过期令牌和孤立数据

use super::Database;
use crate::event_bus::{AppEvent, EventBus};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::{error, info};

/// 存储维护器
pub struct StorageMaintenance {
    /// 数据库实例
    db: Arc<Database>,
    /// 事件总线
    event_bus: Arc<EventBus>,
    /// 记住我令牌保留天数（使用RwLock实现内部可变性）
    token_retention_days: Arc<RwLock<i64>>,
    /// 最大保留天数
    max_retention_days: i64,
}

impl StorageMaintenance {
    /// 创建新的维护器
    pub fn new(db: Arc<Database>, event_bus: Arc<EventBus>) -> Self {
        Self {
            db,
            event_bus,
            token_retention_days: Arc::new(RwLock::new(30)), // 默认保留30天
            max_retention_days: 365,
        }
    }

    /// 设置令牌保留天数
    pub async fn set_token_retention_days(&self, days: i64) -> Result<()> {
        if days < 1 {
            return Err(anyhow::anyhow!("保留天数必须至少为1天"));
        }
        if days > self.max_retention_days {
            return Err(anyhow::anyhow!(
                "保留天数不能超过{}天",
                self.max_retention_days
            ));
        }

        let mut retention_days = self.token_retention_days.write().await;
        *retention_days = days;
        info!("令牌保留天数已更新为: {}天", days);
        Ok(())
    }

    /// 获取当前令牌保留天数
    pub async fn get_token_retention_days(&self) -> i64 {
        *self.token_retention_days.read().await
    }

    /// 启动自动维护任务
    pub async fn start_maintenance_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(3600)); // 每小时检查一次
            info!("存储维护任务已启动，每小时检查一次");

            loop {
                interval.tick().await;

                if let Err(e) = self.perform_maintenance().await {
                    error!("维护任务执行失败: {}", e);
                }
            }
        });
    }

    /// 执行一轮维护
    pub async fn perform_maintenance(&self) -> Result<()> {
        let now = crate::storage::local_now();

        // 1. 删除已过期的记住我令牌
        let tokens_deleted = self.db.delete_expired_tokens(now).await?;

        // 2. 清理孤立的待审核答案
        let answers_deleted = self.db.delete_orphaned_pending_answers().await?;

        if tokens_deleted > 0 || answers_deleted > 0 {
            info!(
                "维护完成，删除了 {} 个过期令牌、{} 条孤立答案",
                tokens_deleted, answers_deleted
            );
        }

        self.event_bus.publish(AppEvent::MaintenanceCompleted {
            tokens_deleted,
            orphans_deleted: answers_deleted,
        });

        Ok(())
    }

    /// 手动触发维护
    pub async fn trigger_maintenance(&self) -> Result<()> {
        info!("手动触发存储维护");
        self.perform_maintenance().await
    }

    /// 获取存储统计信息
    pub async fn get_storage_stats(&self) -> Result<StorageStats> {
        let (user_count, question_count, attempt_count, db_size) = self.db.get_stats().await?;
        let retention_days = *self.token_retention_days.read().await;

        Ok(StorageStats {
            user_count,
            question_count,
            attempt_count,
            database_size: db_size,
            token_retention_days: retention_days,
        })
    }
}

/// 存储统计信息
#[derive(Debug, serde::Serialize)]
pub struct StorageStats {
    pub user_count: i64,
    pub question_count: i64,
    pub attempt_count: i64,
    pub database_size: i64,
    pub token_retention_days: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{local_now, RememberToken, User};

    #[tokio::test]
    async fn test_maintenance_prunes_expired_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("maintenance_test.db");
        let db = Arc::new(
            Database::new_sqlite(db_path.to_str().unwrap())
                .await
                .unwrap(),
        );
        let event_bus = Arc::new(EventBus::new(100));

        let user_id = db
            .insert_user(&User {
                id: None,
                username: "erin".to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
                created_at: None,
            })
            .await
            .unwrap();

        let now = local_now();
        db.insert_remember_token(&RememberToken {
            id: None,
            user_id,
            token: "stale".to_string(),
            expires_at: now - chrono::Duration::hours(1),
            created_at: now - chrono::Duration::days(31),
        })
        .await
        .unwrap();

        let maintenance = StorageMaintenance::new(db.clone(), event_bus.clone());
        let mut rx = event_bus.subscribe();

        maintenance.perform_maintenance().await.unwrap();

        assert!(db.get_remember_token("stale").await.unwrap().is_none());
        match rx.recv().await.unwrap() {
            AppEvent::MaintenanceCompleted { tokens_deleted, .. } => {
                assert_eq!(tokens_deleted, 1);
            }
            other => panic!("收到意外事件: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retention_days_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("retention_test.db");
        let db = Arc::new(
            Database::new_sqlite(db_path.to_str().unwrap())
                .await
                .unwrap(),
        );
        let maintenance = StorageMaintenance::new(db, Arc::new(EventBus::new(100)));

        assert!(maintenance.set_token_retention_days(0).await.is_err());
        assert!(maintenance.set_token_retention_days(9999).await.is_err());
        maintenance.set_token_retention_days(60).await.unwrap();
        assert_eq!(maintenance.get_token_retention_days().await, 60);
    }
}
