// 数据模型定义 - 数据库实体结构

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// 获取当前本地时间（以 DateTime<Utc> 类型表示，但值为本地时间）
/// 用于将本地时间存储到数据库中
pub fn local_now() -> DateTime<Utc> {
    Local::now().naive_local().and_utc()
}

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// 从数据库字符串解析角色，未知值按普通用户处理
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

/// 用户数据结构
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String, // user / admin
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> UserRole {
        UserRole::parse(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == UserRole::Admin
    }
}

/// 题目分类，可选地挂在父分类下
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
    pub parent_id: Option<i64>, // 默认不是子分类
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Category {
    /// 创建顶级分类
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            parent_id: None,
            description: description.into(),
            created_at: None,
        }
    }

    pub fn is_subcategory(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// 题目数据结构
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: Option<i64>,
    pub category_id: i64,
    pub prompt: String,
    pub difficulty: i64, // 1-3
    pub created_at: Option<DateTime<Utc>>,
}

impl Question {
    /// 难度整数到标签的映射
    pub fn difficulty_label(&self) -> &'static str {
        match self.difficulty {
            1 => "简单",
            2 => "中等",
            3 => "困难",
            _ => "未知",
        }
    }
}

/// 候选答案，每道题恰好一个正确项
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Answer {
    pub id: Option<i64>,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// 带候选答案的完整题目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub question: Question,
    pub answers: Vec<Answer>,
}

/// 一次已完成答题的记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizAttempt {
    pub id: Option<i64>,
    pub user_id: i64,
    pub category_id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub duration_seconds: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// 单题作答记录（用于统计分析）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuestionResponse {
    pub id: Option<i64>,
    pub attempt_id: i64,
    pub question_id: i64,
    pub answer_id: Option<i64>, // 未作答时为空
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// 答题记录详情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDetail {
    pub attempt: QuizAttempt,
    pub responses: Vec<QuestionResponse>,
}

/// 待审核题目状态
pub mod pending_status {
    pub const PENDING: &str = "pending";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
}

/// 用户提交的待审核题目
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingQuestion {
    pub id: Option<i64>,
    pub category_id: i64,
    pub prompt: String,
    pub difficulty: i64,
    pub submitted_by: i64,
    pub status: String, // pending / approved / rejected
    pub submitted_at: DateTime<Utc>,
}

/// 待审核题目的候选答案
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingAnswer {
    pub id: Option<i64>,
    pub pending_question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// 带候选答案的待审核题目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingQuestionDetail {
    pub question: PendingQuestion,
    pub answers: Vec<PendingAnswer>,
}

/// 记住我令牌，持久化并带过期时间
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RememberToken {
    pub id: Option<i64>,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ========== 聚合查询结果（不落库） ==========

/// 排行榜条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub username: String,
    pub best_score: i64,
    pub attempt_count: i64,
    pub avg_score: f64,
}

/// 分类统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category_id: i64,
    pub category_name: String,
    pub question_count: i64,
    pub attempt_count: i64,
    pub avg_score: f64,
}

/// 单题正确率
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAccuracy {
    pub question_id: i64,
    pub prompt: String,
    pub response_count: i64,
    pub correct_count: i64,
    pub accuracy: f64,
}

/// 用户答题概况
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: i64,
    pub attempt_count: i64,
    pub total_score: i64,
    pub total_questions: i64,
    pub avg_score: f64,
}

/// 管理端仪表盘计数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub user_count: i64,
    pub category_count: i64,
    pub question_count: i64,
    pub attempt_count: i64,
    pub pending_count: i64,
    pub avg_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_label() {
        let mut q = Question {
            id: None,
            category_id: 1,
            prompt: "测试题".to_string(),
            difficulty: 1,
            created_at: None,
        };
        assert_eq!(q.difficulty_label(), "简单");
        q.difficulty = 2;
        assert_eq!(q.difficulty_label(), "中等");
        q.difficulty = 3;
        assert_eq!(q.difficulty_label(), "困难");
        q.difficulty = 9;
        assert_eq!(q.difficulty_label(), "未知");
    }

    #[test]
    fn test_category_defaults_to_top_level() {
        let cat = Category::new("历史", "历史类题目");
        assert!(!cat.is_subcategory());
        assert!(cat.parent_id.is_none());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(UserRole::parse("admin"), UserRole::Admin);
        assert_eq!(UserRole::parse("user"), UserRole::User);
        assert_eq!(UserRole::parse("something"), UserRole::User);
    }
}
