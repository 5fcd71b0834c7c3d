// 数据库门面 - 统一的存储入口

use super::models::*;
use super::repository::{sqlite::SqliteRepository, QuizRepository};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// 数据库管理器，持有具体实现并转发调用
pub struct Database {
    repository: Arc<dyn QuizRepository>,
}

impl Database {
    /// 使用 SQLite 后端创建数据库
    pub async fn new_sqlite(db_path: &str) -> Result<Self> {
        let repository = SqliteRepository::new(db_path).await?;
        info!("数据库就绪 (sqlite): {}", db_path);

        Ok(Self {
            repository: Arc::new(repository),
        })
    }

    /// 使用任意实现创建数据库（测试或备用后端）
    pub fn with_repository(repository: Arc<dyn QuizRepository>) -> Self {
        Self { repository }
    }

    /// 数据库类型标识
    pub fn db_type(&self) -> &str {
        self.repository.db_type()
    }

    // ========== 用户 ==========

    pub async fn insert_user(&self, user: &User) -> Result<i64> {
        self.repository.insert_user(user).await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        self.repository.get_user(user_id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.repository.get_user_by_username(username).await
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>> {
        self.repository.get_all_users().await
    }

    pub async fn update_user_role(&self, user_id: i64, role: &str) -> Result<()> {
        self.repository.update_user_role(user_id, role).await
    }

    pub async fn update_user_password(&self, user_id: i64, password_hash: &str) -> Result<()> {
        self.repository
            .update_user_password(user_id, password_hash)
            .await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<()> {
        self.repository.delete_user(user_id).await
    }

    // ========== 分类 ==========

    pub async fn insert_category(&self, category: &Category) -> Result<i64> {
        self.repository.insert_category(category).await
    }

    pub async fn get_category(&self, category_id: i64) -> Result<Category> {
        self.repository.get_category(category_id).await
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        self.repository.get_category_by_name(name).await
    }

    pub async fn get_all_categories(&self) -> Result<Vec<Category>> {
        self.repository.get_all_categories().await
    }

    pub async fn get_subcategories(&self, parent_id: i64) -> Result<Vec<Category>> {
        self.repository.get_subcategories(parent_id).await
    }

    pub async fn update_category(
        &self,
        category_id: i64,
        name: &str,
        parent_id: Option<i64>,
        description: &str,
    ) -> Result<()> {
        self.repository
            .update_category(category_id, name, parent_id, description)
            .await
    }

    pub async fn delete_category(&self, category_id: i64) -> Result<()> {
        self.repository.delete_category(category_id).await
    }

    // ========== 题目 ==========

    pub async fn insert_question(&self, question: &Question, answers: &[Answer]) -> Result<i64> {
        self.repository.insert_question(question, answers).await
    }

    pub async fn get_question(&self, question_id: i64) -> Result<Question> {
        self.repository.get_question(question_id).await
    }

    pub async fn get_question_detail(&self, question_id: i64) -> Result<QuestionDetail> {
        self.repository.get_question_detail(question_id).await
    }

    pub async fn get_questions_by_category(&self, category_id: i64) -> Result<Vec<QuestionDetail>> {
        self.repository.get_questions_by_category(category_id).await
    }

    pub async fn update_question(&self, question: &Question, answers: &[Answer]) -> Result<()> {
        self.repository.update_question(question, answers).await
    }

    pub async fn delete_question(&self, question_id: i64) -> Result<()> {
        self.repository.delete_question(question_id).await
    }

    pub async fn count_questions_by_category(&self, category_id: i64) -> Result<i64> {
        self.repository
            .count_questions_by_category(category_id)
            .await
    }

    // ========== 答题记录 ==========

    pub async fn insert_attempt(
        &self,
        attempt: &QuizAttempt,
        responses: &[QuestionResponse],
    ) -> Result<i64> {
        self.repository.insert_attempt(attempt, responses).await
    }

    pub async fn get_attempt(&self, attempt_id: i64) -> Result<QuizAttempt> {
        self.repository.get_attempt(attempt_id).await
    }

    pub async fn get_attempt_detail(&self, attempt_id: i64) -> Result<AttemptDetail> {
        self.repository.get_attempt_detail(attempt_id).await
    }

    pub async fn get_attempts_by_user(&self, user_id: i64) -> Result<Vec<QuizAttempt>> {
        self.repository.get_attempts_by_user(user_id).await
    }

    // ========== 待审核题目 ==========

    pub async fn insert_pending_question(
        &self,
        question: &PendingQuestion,
        answers: &[PendingAnswer],
    ) -> Result<i64> {
        self.repository
            .insert_pending_question(question, answers)
            .await
    }

    pub async fn get_pending_detail(&self, pending_id: i64) -> Result<PendingQuestionDetail> {
        self.repository.get_pending_detail(pending_id).await
    }

    pub async fn get_pending_by_status(&self, status: &str) -> Result<Vec<PendingQuestion>> {
        self.repository.get_pending_by_status(status).await
    }

    pub async fn set_pending_status(&self, pending_id: i64, status: &str) -> Result<()> {
        self.repository.set_pending_status(pending_id, status).await
    }

    pub async fn promote_pending_question(
        &self,
        pending_id: i64,
        question: &Question,
        answers: &[Answer],
    ) -> Result<i64> {
        self.repository
            .promote_pending_question(pending_id, question, answers)
            .await
    }

    pub async fn delete_orphaned_pending_answers(&self) -> Result<u64> {
        self.repository.delete_orphaned_pending_answers().await
    }

    // ========== 记住我令牌 ==========

    pub async fn insert_remember_token(&self, token: &RememberToken) -> Result<i64> {
        self.repository.insert_remember_token(token).await
    }

    pub async fn get_remember_token(&self, token: &str) -> Result<Option<RememberToken>> {
        self.repository.get_remember_token(token).await
    }

    pub async fn update_token_expiry(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.repository.update_token_expiry(token, expires_at).await
    }

    pub async fn delete_remember_token(&self, token: &str) -> Result<()> {
        self.repository.delete_remember_token(token).await
    }

    pub async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        self.repository.delete_expired_tokens(now).await
    }

    // ========== 统计分析 ==========

    pub async fn get_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        self.repository.get_leaderboard(limit).await
    }

    pub async fn get_category_leaderboard(
        &self,
        category_id: i64,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>> {
        self.repository
            .get_category_leaderboard(category_id, limit)
            .await
    }

    pub async fn get_category_stats(&self) -> Result<Vec<CategoryStats>> {
        self.repository.get_category_stats().await
    }

    pub async fn get_question_accuracy(
        &self,
        category_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<QuestionAccuracy>> {
        self.repository
            .get_question_accuracy(category_id, limit)
            .await
    }

    pub async fn get_user_summary(&self, user_id: i64) -> Result<UserSummary> {
        self.repository.get_user_summary(user_id).await
    }

    pub async fn get_dashboard_stats(&self) -> Result<DashboardStats> {
        self.repository.get_dashboard_stats().await
    }

    /// 获取数据库统计信息 (用户数, 题目数, 答题数, 数据库大小)
    pub async fn get_stats(&self) -> Result<(i64, i64, i64, i64)> {
        self.repository.get_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::local_now;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("quizdesk_test.db");
        let db = Database::new_sqlite(db_path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }

    fn make_question(category_id: i64, prompt: &str) -> (Question, Vec<Answer>) {
        let question = Question {
            id: None,
            category_id,
            prompt: prompt.to_string(),
            difficulty: 1,
            created_at: None,
        };
        let answers = vec![
            Answer {
                id: None,
                question_id: 0,
                text: "正确答案".to_string(),
                is_correct: true,
            },
            Answer {
                id: None,
                question_id: 0,
                text: "错误答案甲".to_string(),
                is_correct: false,
            },
            Answer {
                id: None,
                question_id: 0,
                text: "错误答案乙".to_string(),
                is_correct: false,
            },
        ];
        (question, answers)
    }

    #[tokio::test]
    async fn test_user_crud() {
        let (_dir, db) = test_db().await;

        let user = User {
            id: None,
            username: "alice".to_string(),
            password_hash: "hash".to_string(),
            role: "user".to_string(),
            created_at: None,
        };
        let user_id = db.insert_user(&user).await.unwrap();
        assert!(user_id > 0);

        let fetched = db.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(fetched.username, "alice");
        assert!(!fetched.is_admin());

        // 用户名唯一
        assert!(db.insert_user(&user).await.is_err());

        db.update_user_role(user_id, "admin").await.unwrap();
        let promoted = db.get_user(user_id).await.unwrap();
        assert!(promoted.is_admin());

        db.delete_user(user_id).await.unwrap();
        assert!(db.get_user_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_question_insert_and_detail() {
        let (_dir, db) = test_db().await;

        let cat_id = db
            .insert_category(&Category::new("地理", "地理常识"))
            .await
            .unwrap();

        let (question, answers) = make_question(cat_id, "中国的首都是哪座城市？");
        let question_id = db.insert_question(&question, &answers).await.unwrap();

        let detail = db.get_question_detail(question_id).await.unwrap();
        assert_eq!(detail.question.prompt, "中国的首都是哪座城市？");
        assert_eq!(detail.answers.len(), 3);
        assert_eq!(
            detail.answers.iter().filter(|a| a.is_correct).count(),
            1
        );

        assert_eq!(db.count_questions_by_category(cat_id).await.unwrap(), 1);

        // 更新时整组替换候选答案
        let mut updated = detail.question.clone();
        updated.difficulty = 3;
        let new_answers = vec![
            Answer {
                id: None,
                question_id,
                text: "北京".to_string(),
                is_correct: true,
            },
            Answer {
                id: None,
                question_id,
                text: "上海".to_string(),
                is_correct: false,
            },
        ];
        db.update_question(&updated, &new_answers).await.unwrap();

        let detail = db.get_question_detail(question_id).await.unwrap();
        assert_eq!(detail.question.difficulty, 3);
        assert_eq!(detail.answers.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_category_removes_questions() {
        let (_dir, db) = test_db().await;

        let cat_id = db
            .insert_category(&Category::new("历史", ""))
            .await
            .unwrap();
        let (question, answers) = make_question(cat_id, "历史题");
        let question_id = db.insert_question(&question, &answers).await.unwrap();

        db.delete_category(cat_id).await.unwrap();

        assert!(db.get_question(question_id).await.is_err());
        assert_eq!(db.get_all_categories().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_attempt_roundtrip_and_leaderboard() {
        let (_dir, db) = test_db().await;

        let user_id = db
            .insert_user(&User {
                id: None,
                username: "bob".to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
                created_at: None,
            })
            .await
            .unwrap();
        let cat_id = db
            .insert_category(&Category::new("科学", ""))
            .await
            .unwrap();
        let (question, answers) = make_question(cat_id, "科学题");
        let question_id = db.insert_question(&question, &answers).await.unwrap();

        let now = local_now();
        let attempt = QuizAttempt {
            id: None,
            user_id,
            category_id: cat_id,
            score: 1,
            total_questions: 1,
            duration_seconds: 30,
            started_at: now,
            finished_at: now,
        };
        let responses = vec![QuestionResponse {
            id: None,
            attempt_id: 0,
            question_id,
            answer_id: None,
            is_correct: true,
            answered_at: now,
        }];
        let attempt_id = db.insert_attempt(&attempt, &responses).await.unwrap();

        let detail = db.get_attempt_detail(attempt_id).await.unwrap();
        assert_eq!(detail.attempt.score, 1);
        assert_eq!(detail.responses.len(), 1);

        let board = db.get_leaderboard(10).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].username, "bob");
        assert_eq!(board[0].best_score, 1);

        let summary = db.get_user_summary(user_id).await.unwrap();
        assert_eq!(summary.attempt_count, 1);
        assert_eq!(summary.total_score, 1);
    }

    #[tokio::test]
    async fn test_remember_token_lifecycle() {
        let (_dir, db) = test_db().await;

        let user_id = db
            .insert_user(&User {
                id: None,
                username: "carol".to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
                created_at: None,
            })
            .await
            .unwrap();

        let now = local_now();
        let expired = RememberToken {
            id: None,
            user_id,
            token: "expired-token".to_string(),
            expires_at: now - chrono::Duration::days(1),
            created_at: now - chrono::Duration::days(31),
        };
        let valid = RememberToken {
            id: None,
            user_id,
            token: "valid-token".to_string(),
            expires_at: now + chrono::Duration::days(30),
            created_at: now,
        };
        db.insert_remember_token(&expired).await.unwrap();
        db.insert_remember_token(&valid).await.unwrap();

        let deleted = db.delete_expired_tokens(now).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_remember_token("expired-token").await.unwrap().is_none());
        assert!(db.get_remember_token("valid-token").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pending_question_flow() {
        let (_dir, db) = test_db().await;

        let user_id = db
            .insert_user(&User {
                id: None,
                username: "dave".to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
                created_at: None,
            })
            .await
            .unwrap();
        let cat_id = db
            .insert_category(&Category::new("体育", ""))
            .await
            .unwrap();

        let pending = PendingQuestion {
            id: None,
            category_id: cat_id,
            prompt: "世界杯几年一届？".to_string(),
            difficulty: 1,
            submitted_by: user_id,
            status: pending_status::PENDING.to_string(),
            submitted_at: local_now(),
        };
        let answers = vec![
            PendingAnswer {
                id: None,
                pending_question_id: 0,
                text: "四年".to_string(),
                is_correct: true,
            },
            PendingAnswer {
                id: None,
                pending_question_id: 0,
                text: "两年".to_string(),
                is_correct: false,
            },
        ];
        let pending_id = db.insert_pending_question(&pending, &answers).await.unwrap();

        let queue = db
            .get_pending_by_status(pending_status::PENDING)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);

        db.set_pending_status(pending_id, pending_status::APPROVED)
            .await
            .unwrap();
        let queue = db
            .get_pending_by_status(pending_status::PENDING)
            .await
            .unwrap();
        assert!(queue.is_empty());

        let detail = db.get_pending_detail(pending_id).await.unwrap();
        assert_eq!(detail.question.status, pending_status::APPROVED);
        assert_eq!(detail.answers.len(), 2);
    }
}
