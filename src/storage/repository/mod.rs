// Repository 抽象层 - 定义数据库操作接口

pub mod sqlite;

use super::models::*;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 数据库操作接口 - 所有数据库实现必须实现此 trait
#[async_trait]
pub trait QuizRepository: Send + Sync {
    // ========== 用户操作 ==========

    /// 插入新用户
    async fn insert_user(&self, user: &User) -> Result<i64>;

    /// 按 ID 获取用户
    async fn get_user(&self, user_id: i64) -> Result<User>;

    /// 按用户名获取用户
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// 获取所有用户
    async fn get_all_users(&self) -> Result<Vec<User>>;

    /// 更新用户角色
    async fn update_user_role(&self, user_id: i64, role: &str) -> Result<()>;

    /// 更新用户口令散列
    async fn update_user_password(&self, user_id: i64, password_hash: &str) -> Result<()>;

    /// 删除用户
    async fn delete_user(&self, user_id: i64) -> Result<()>;

    // ========== 分类操作 ==========

    /// 插入新分类
    async fn insert_category(&self, category: &Category) -> Result<i64>;

    /// 获取分类详情
    async fn get_category(&self, category_id: i64) -> Result<Category>;

    /// 按名称获取分类
    async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// 获取所有分类
    async fn get_all_categories(&self) -> Result<Vec<Category>>;

    /// 获取某分类的子分类
    async fn get_subcategories(&self, parent_id: i64) -> Result<Vec<Category>>;

    /// 更新分类信息
    async fn update_category(
        &self,
        category_id: i64,
        name: &str,
        parent_id: Option<i64>,
        description: &str,
    ) -> Result<()>;

    /// 删除分类（级联删除其题目）
    async fn delete_category(&self, category_id: i64) -> Result<()>;

    // ========== 题目操作 ==========

    /// 插入题目及其候选答案（单事务）
    async fn insert_question(&self, question: &Question, answers: &[Answer]) -> Result<i64>;

    /// 获取题目
    async fn get_question(&self, question_id: i64) -> Result<Question>;

    /// 获取题目详情（含候选答案）
    async fn get_question_detail(&self, question_id: i64) -> Result<QuestionDetail>;

    /// 获取某分类的所有题目详情
    async fn get_questions_by_category(&self, category_id: i64) -> Result<Vec<QuestionDetail>>;

    /// 更新题目并替换候选答案（单事务）
    async fn update_question(&self, question: &Question, answers: &[Answer]) -> Result<()>;

    /// 删除题目
    async fn delete_question(&self, question_id: i64) -> Result<()>;

    /// 统计某分类的题目数
    async fn count_questions_by_category(&self, category_id: i64) -> Result<i64>;

    // ========== 答题记录 ==========

    /// 插入答题记录及单题作答（单事务）
    async fn insert_attempt(
        &self,
        attempt: &QuizAttempt,
        responses: &[QuestionResponse],
    ) -> Result<i64>;

    /// 获取答题记录
    async fn get_attempt(&self, attempt_id: i64) -> Result<QuizAttempt>;

    /// 获取答题记录详情（含单题作答）
    async fn get_attempt_detail(&self, attempt_id: i64) -> Result<AttemptDetail>;

    /// 获取某用户的答题历史
    async fn get_attempts_by_user(&self, user_id: i64) -> Result<Vec<QuizAttempt>>;

    // ========== 待审核题目 ==========

    /// 插入待审核题目及其候选答案（单事务）
    async fn insert_pending_question(
        &self,
        question: &PendingQuestion,
        answers: &[PendingAnswer],
    ) -> Result<i64>;

    /// 获取待审核题目详情
    async fn get_pending_detail(&self, pending_id: i64) -> Result<PendingQuestionDetail>;

    /// 按状态获取待审核题目
    async fn get_pending_by_status(&self, status: &str) -> Result<Vec<PendingQuestion>>;

    /// 更新待审核题目状态
    async fn set_pending_status(&self, pending_id: i64, status: &str) -> Result<()>;

    /// 审批通过：标记投稿并插入正式题目（单事务，投稿必须处于待审核状态）
    async fn promote_pending_question(
        &self,
        pending_id: i64,
        question: &Question,
        answers: &[Answer],
    ) -> Result<i64>;

    /// 删除孤立的待审核答案（题目已被删除）
    async fn delete_orphaned_pending_answers(&self) -> Result<u64>;

    // ========== 记住我令牌 ==========

    /// 插入记住我令牌
    async fn insert_remember_token(&self, token: &RememberToken) -> Result<i64>;

    /// 按令牌值查询
    async fn get_remember_token(&self, token: &str) -> Result<Option<RememberToken>>;

    /// 延长令牌有效期
    async fn update_token_expiry(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// 删除指定令牌
    async fn delete_remember_token(&self, token: &str) -> Result<()>;

    /// 删除已过期的令牌
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64>;

    // ========== 统计分析 ==========

    /// 全局排行榜（按用户最高分）
    async fn get_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>>;

    /// 某分类的排行榜
    async fn get_category_leaderboard(
        &self,
        category_id: i64,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>>;

    /// 各分类的题目数、答题数与平均分
    async fn get_category_stats(&self) -> Result<Vec<CategoryStats>>;

    /// 单题正确率（正确率最低的在前）
    async fn get_question_accuracy(
        &self,
        category_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<QuestionAccuracy>>;

    /// 某用户的答题概况
    async fn get_user_summary(&self, user_id: i64) -> Result<UserSummary>;

    /// 管理端仪表盘计数
    async fn get_dashboard_stats(&self) -> Result<DashboardStats>;

    // ========== 数据库初始化和元数据 ==========

    /// 初始化数据库表结构
    async fn initialize_tables(&self) -> Result<()>;

    /// 获取数据库统计信息 (用户数, 题目数, 答题数, 数据库大小)
    async fn get_stats(&self) -> Result<(i64, i64, i64, i64)>;

    /// 获取数据库类型标识
    fn db_type(&self) -> &str;
}
