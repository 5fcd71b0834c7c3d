// 数据模型模块 - 定义所有的数据结构

use anyhow::Result;
use serde::{Deserialize, Serialize};

// 重新导出其他模块的类型
pub use crate::storage::{
    AttemptDetail, Category, CategoryStats, DashboardStats, LeaderboardEntry, Question,
    QuestionAccuracy, QuestionDetail, QuizAttempt, User, UserSummary,
};

/// 应用配置（部分更新，所有字段可选）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// 每次答题的题目数
    pub questions_per_quiz: Option<usize>,
    /// 会话空闲超时（分钟）
    pub session_timeout_minutes: Option<i64>,
    /// 记住我令牌有效期（天）
    pub remember_token_days: Option<i64>,
    /// 令牌续期检查间隔（分钟）
    pub token_refresh_minutes: Option<u64>,
    /// 排行榜条目数
    pub leaderboard_size: Option<i64>,
    /// UI设置
    pub ui_settings: Option<UISettings>,
}

/// 持久化的应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedQuizConfig {
    /// 每次答题的题目数
    pub questions_per_quiz: usize,
    /// 会话空闲超时（分钟）
    pub session_timeout_minutes: i64,
    /// 记住我令牌有效期（天）
    pub remember_token_days: i64,
    /// 令牌续期检查间隔（分钟）
    pub token_refresh_minutes: u64,
    /// 排行榜条目数
    pub leaderboard_size: i64,
    /// UI设置
    pub ui_settings: Option<UISettings>,
}

impl Default for PersistedQuizConfig {
    fn default() -> Self {
        Self {
            questions_per_quiz: 10,
            session_timeout_minutes: 30,
            remember_token_days: 30,
            token_refresh_minutes: 60,
            leaderboard_size: 10,
            ui_settings: Some(UISettings::default()),
        }
    }
}

impl PersistedQuizConfig {
    /// 校验各字段是否在运行组件可接受的范围内，落盘前必须先通过
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.questions_per_quiz) {
            return Err(anyhow::anyhow!("每次答题的题目数必须在1到100之间"));
        }
        if !(1..=1440).contains(&self.session_timeout_minutes) {
            return Err(anyhow::anyhow!("会话超时必须在1到1440分钟之间"));
        }
        if !(1..=365).contains(&self.remember_token_days) {
            return Err(anyhow::anyhow!("令牌有效期必须在1到365天之间"));
        }
        if self.token_refresh_minutes < 1 {
            return Err(anyhow::anyhow!("令牌续期间隔必须至少为1分钟"));
        }
        if !(1..=100).contains(&self.leaderboard_size) {
            return Err(anyhow::anyhow!("排行榜条目数必须在1到100之间"));
        }
        Ok(())
    }
}

/// UI设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UISettings {
    /// 主题（light/dark）
    pub theme: String,
    /// 语言
    pub language: String,
    /// 答题时是否显示倒计时
    pub show_timer: bool,
}

impl Default for UISettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            language: "zh-CN".to_string(),
            show_timer: true,
        }
    }
}
