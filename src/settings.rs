use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::warn;

use crate::models::{PersistedQuizConfig, QuizConfig};

pub struct SettingsManager {
    path: PathBuf,
    data: RwLock<PersistedQuizConfig>,
}

impl SettingsManager {
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                // 解析失败或字段越界时回退到默认配置，保证应用总能启动
                match serde_json::from_slice::<PersistedQuizConfig>(&bytes) {
                    Ok(config) if config.validate().is_ok() => config,
                    _ => {
                        warn!("配置文件无效，已回退到默认配置");
                        PersistedQuizConfig::default()
                    }
                }
            }
            _ => {
                let default = PersistedQuizConfig::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                default
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(initial),
        })
    }

    pub async fn get(&self) -> PersistedQuizConfig {
        self.data.read().await.clone()
    }

    pub async fn update(&self, update: QuizConfig) -> Result<PersistedQuizConfig> {
        let mut config = self.data.write().await;

        // 先在副本上合并并校验，校验不过则不落盘也不改内存
        let mut merged = config.clone();
        if let Some(value) = update.questions_per_quiz {
            merged.questions_per_quiz = value;
        }
        if let Some(value) = update.session_timeout_minutes {
            merged.session_timeout_minutes = value;
        }
        if let Some(value) = update.remember_token_days {
            merged.remember_token_days = value;
        }
        if let Some(value) = update.token_refresh_minutes {
            merged.token_refresh_minutes = value;
        }
        if let Some(value) = update.leaderboard_size {
            merged.leaderboard_size = value;
        }
        if let Some(ui) = update.ui_settings {
            merged.ui_settings = Some(ui);
        }
        merged.validate()?;

        self.save(&merged).await?;
        *config = merged;
        Ok(config.clone())
    }

    async fn save(&self, config: &PersistedQuizConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_partial_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let manager = SettingsManager::new(path.clone()).await.unwrap();
        let updated = manager
            .update(QuizConfig {
                questions_per_quiz: Some(5),
                session_timeout_minutes: None,
                remember_token_days: None,
                token_refresh_minutes: None,
                leaderboard_size: None,
                ui_settings: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.questions_per_quiz, 5);
        // 未指定的字段保持默认
        assert_eq!(updated.session_timeout_minutes, 30);

        // 重新加载后仍生效
        let reloaded = SettingsManager::new(path).await.unwrap();
        assert_eq!(reloaded.get().await.questions_per_quiz, 5);
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected_before_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let manager = SettingsManager::new(path.clone()).await.unwrap();
        let result = manager
            .update(QuizConfig {
                questions_per_quiz: None,
                session_timeout_minutes: None,
                remember_token_days: Some(0),
                token_refresh_minutes: None,
                leaderboard_size: None,
                ui_settings: None,
            })
            .await;
        assert!(result.is_err());

        // 内存和磁盘都保持原值
        assert_eq!(manager.get().await.remember_token_days, 30);
        let reloaded = SettingsManager::new(path).await.unwrap();
        assert_eq!(reloaded.get().await.remember_token_days, 30);
    }

    #[tokio::test]
    async fn test_out_of_range_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut bad = PersistedQuizConfig::default();
        bad.remember_token_days = 0;
        tokio::fs::write(&path, serde_json::to_string_pretty(&bad).unwrap())
            .await
            .unwrap();

        // 手改出的越界配置不会阻止启动
        let manager = SettingsManager::new(path).await.unwrap();
        assert_eq!(manager.get().await.remember_token_days, 30);
    }
}
