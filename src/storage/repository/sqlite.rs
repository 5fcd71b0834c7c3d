// SQLite 数据库实现

use super::QuizRepository;
use crate::storage::models::*;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

/// SQLite 数据库实现
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// 创建新的 SQLite 数据库连接
    pub async fn new(db_path: &str) -> Result<Self> {
        info!("初始化 SQLite 数据库: {}", db_path);

        // 确保数据库文件的目录存在
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        // 创建连接池
        let pool = SqlitePoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .idle_timeout(std::time::Duration::from_secs(180))
            .max_lifetime(std::time::Duration::from_secs(1800))
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await?;

        let repo = Self { pool };

        // 初始化表结构
        repo.initialize_tables().await?;

        Ok(repo)
    }

    /// 获取连接池引用
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl QuizRepository for SqliteRepository {
    // ========== 用户操作 ==========

    async fn insert_user(&self, user: &User) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, role)
            VALUES (?1, ?2, ?3)
        "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.role)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_user(&self, user_id: i64) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_all_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn update_user_role(&self, user_id: i64, role: &str) -> Result<()> {
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_user_password(&self, user_id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<()> {
        // 显式级联删除，不依赖连接级外键开关
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM question_responses WHERE attempt_id IN \
             (SELECT id FROM quiz_attempts WHERE user_id = ?)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM quiz_attempts WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM remember_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("删除用户: {}", user_id);
        Ok(())
    }

    // ========== 分类操作 ==========

    async fn insert_category(&self, category: &Category) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO categories (name, parent_id, description)
            VALUES (?1, ?2, ?3)
        "#,
        )
        .bind(&category.name)
        .bind(category.parent_id)
        .bind(&category.description)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_category(&self, category_id: i64) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, parent_id, description, created_at
            FROM categories
            WHERE id = ?
            "#,
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, parent_id, description, created_at
            FROM categories
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, parent_id, description, created_at
            FROM categories
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn get_subcategories(&self, parent_id: i64) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, parent_id, description, created_at
            FROM categories
            WHERE parent_id = ?
            ORDER BY name
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn update_category(
        &self,
        category_id: i64,
        name: &str,
        parent_id: Option<i64>,
        description: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE categories SET name = ?, parent_id = ?, description = ? WHERE id = ?")
            .bind(name)
            .bind(parent_id)
            .bind(description)
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_category(&self, category_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM answers WHERE question_id IN \
             (SELECT id FROM questions WHERE category_id = ?)",
        )
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM questions WHERE category_id = ?")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("删除分类: {}", category_id);
        Ok(())
    }

    // ========== 题目操作 ==========

    async fn insert_question(&self, question: &Question, answers: &[Answer]) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO questions (category_id, prompt, difficulty)
            VALUES (?1, ?2, ?3)
        "#,
        )
        .bind(question.category_id)
        .bind(&question.prompt)
        .bind(question.difficulty)
        .execute(&mut *tx)
        .await?;

        let question_id = result.last_insert_rowid();

        for answer in answers {
            sqlx::query(
                r#"
                INSERT INTO answers (question_id, text, is_correct)
                VALUES (?1, ?2, ?3)
            "#,
            )
            .bind(question_id)
            .bind(&answer.text)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(question_id)
    }

    async fn get_question(&self, question_id: i64) -> Result<Question> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, category_id, prompt, difficulty, created_at
            FROM questions
            WHERE id = ?
            "#,
        )
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    async fn get_question_detail(&self, question_id: i64) -> Result<QuestionDetail> {
        let question = self.get_question(question_id).await?;

        let answers = sqlx::query_as::<_, Answer>(
            r#"
            SELECT id, question_id, text, is_correct
            FROM answers
            WHERE question_id = ?
            ORDER BY id
            "#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(QuestionDetail { question, answers })
    }

    async fn get_questions_by_category(&self, category_id: i64) -> Result<Vec<QuestionDetail>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, category_id, prompt, difficulty, created_at
            FROM questions
            WHERE category_id = ?
            ORDER BY id
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(questions.len());
        for question in questions {
            let answers = sqlx::query_as::<_, Answer>(
                r#"
                SELECT id, question_id, text, is_correct
                FROM answers
                WHERE question_id = ?
                ORDER BY id
                "#,
            )
            .bind(question.id)
            .fetch_all(&self.pool)
            .await?;

            details.push(QuestionDetail { question, answers });
        }

        Ok(details)
    }

    async fn update_question(&self, question: &Question, answers: &[Answer]) -> Result<()> {
        let question_id = question
            .id
            .ok_or_else(|| anyhow::anyhow!("更新题目缺少 ID"))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE questions SET category_id = ?, prompt = ?, difficulty = ? WHERE id = ?")
            .bind(question.category_id)
            .bind(&question.prompt)
            .bind(question.difficulty)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        // 候选答案整组替换
        sqlx::query("DELETE FROM answers WHERE question_id = ?")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        for answer in answers {
            sqlx::query(
                r#"
                INSERT INTO answers (question_id, text, is_correct)
                VALUES (?1, ?2, ?3)
            "#,
            )
            .bind(question_id)
            .bind(&answer.text)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_question(&self, question_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM answers WHERE question_id = ?")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("删除题目: {}", question_id);
        Ok(())
    }

    async fn count_questions_by_category(&self, category_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE category_id = ?")
                .bind(category_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    // ========== 答题记录 ==========

    async fn insert_attempt(
        &self,
        attempt: &QuizAttempt,
        responses: &[QuestionResponse],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO quiz_attempts (
                user_id, category_id, score, total_questions,
                duration_seconds, started_at, finished_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        )
        .bind(attempt.user_id)
        .bind(attempt.category_id)
        .bind(attempt.score)
        .bind(attempt.total_questions)
        .bind(attempt.duration_seconds)
        .bind(attempt.started_at)
        .bind(attempt.finished_at)
        .execute(&mut *tx)
        .await?;

        let attempt_id = result.last_insert_rowid();

        for response in responses {
            sqlx::query(
                r#"
                INSERT INTO question_responses (
                    attempt_id, question_id, answer_id, is_correct, answered_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            )
            .bind(attempt_id)
            .bind(response.question_id)
            .bind(response.answer_id)
            .bind(response.is_correct)
            .bind(response.answered_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(attempt_id)
    }

    async fn get_attempt(&self, attempt_id: i64) -> Result<QuizAttempt> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT id, user_id, category_id, score, total_questions,
                   duration_seconds, started_at, finished_at
            FROM quiz_attempts
            WHERE id = ?
            "#,
        )
        .bind(attempt_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn get_attempt_detail(&self, attempt_id: i64) -> Result<AttemptDetail> {
        let attempt = self.get_attempt(attempt_id).await?;

        let responses = sqlx::query_as::<_, QuestionResponse>(
            r#"
            SELECT id, attempt_id, question_id, answer_id, is_correct, answered_at
            FROM question_responses
            WHERE attempt_id = ?
            ORDER BY answered_at
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(AttemptDetail { attempt, responses })
    }

    async fn get_attempts_by_user(&self, user_id: i64) -> Result<Vec<QuizAttempt>> {
        let attempts = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT id, user_id, category_id, score, total_questions,
                   duration_seconds, started_at, finished_at
            FROM quiz_attempts
            WHERE user_id = ?
            ORDER BY finished_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }

    // ========== 待审核题目 ==========

    async fn insert_pending_question(
        &self,
        question: &PendingQuestion,
        answers: &[PendingAnswer],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO pending_questions (
                category_id, prompt, difficulty, submitted_by, status, submitted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        )
        .bind(question.category_id)
        .bind(&question.prompt)
        .bind(question.difficulty)
        .bind(question.submitted_by)
        .bind(&question.status)
        .bind(question.submitted_at)
        .execute(&mut *tx)
        .await?;

        let pending_id = result.last_insert_rowid();

        for answer in answers {
            sqlx::query(
                r#"
                INSERT INTO pending_answers (pending_question_id, text, is_correct)
                VALUES (?1, ?2, ?3)
            "#,
            )
            .bind(pending_id)
            .bind(&answer.text)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(pending_id)
    }

    async fn get_pending_detail(&self, pending_id: i64) -> Result<PendingQuestionDetail> {
        let question = sqlx::query_as::<_, PendingQuestion>(
            r#"
            SELECT id, category_id, prompt, difficulty, submitted_by, status, submitted_at
            FROM pending_questions
            WHERE id = ?
            "#,
        )
        .bind(pending_id)
        .fetch_one(&self.pool)
        .await?;

        let answers = sqlx::query_as::<_, PendingAnswer>(
            r#"
            SELECT id, pending_question_id, text, is_correct
            FROM pending_answers
            WHERE pending_question_id = ?
            ORDER BY id
            "#,
        )
        .bind(pending_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PendingQuestionDetail { question, answers })
    }

    async fn get_pending_by_status(&self, status: &str) -> Result<Vec<PendingQuestion>> {
        let questions = sqlx::query_as::<_, PendingQuestion>(
            r#"
            SELECT id, category_id, prompt, difficulty, submitted_by, status, submitted_at
            FROM pending_questions
            WHERE status = ?
            ORDER BY submitted_at
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn set_pending_status(&self, pending_id: i64, status: &str) -> Result<()> {
        sqlx::query("UPDATE pending_questions SET status = ? WHERE id = ?")
            .bind(status)
            .bind(pending_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn promote_pending_question(
        &self,
        pending_id: i64,
        question: &Question,
        answers: &[Answer],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        // 状态更新与题目插入在同一事务内，并发审批只有一个能成功
        let updated = sqlx::query(
            "UPDATE pending_questions SET status = ? WHERE id = ? AND status = ?",
        )
        .bind(pending_status::APPROVED)
        .bind(pending_id)
        .bind(pending_status::PENDING)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(anyhow::anyhow!("该投稿已处理过"));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO questions (category_id, prompt, difficulty)
            VALUES (?1, ?2, ?3)
        "#,
        )
        .bind(question.category_id)
        .bind(&question.prompt)
        .bind(question.difficulty)
        .execute(&mut *tx)
        .await?;

        let question_id = result.last_insert_rowid();

        for answer in answers {
            sqlx::query(
                r#"
                INSERT INTO answers (question_id, text, is_correct)
                VALUES (?1, ?2, ?3)
            "#,
            )
            .bind(question_id)
            .bind(&answer.text)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(question_id)
    }

    async fn delete_orphaned_pending_answers(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM pending_answers WHERE pending_question_id NOT IN \
             (SELECT id FROM pending_questions)",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // ========== 记住我令牌 ==========

    async fn insert_remember_token(&self, token: &RememberToken) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO remember_tokens (user_id, token, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4)
        "#,
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_remember_token(&self, token: &str) -> Result<Option<RememberToken>> {
        let record = sqlx::query_as::<_, RememberToken>(
            r#"
            SELECT id, user_id, token, expires_at, created_at
            FROM remember_tokens
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn update_token_expiry(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE remember_tokens SET expires_at = ? WHERE token = ?")
            .bind(expires_at)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_remember_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM remember_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM remember_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        let deleted_count = result.rows_affected();
        if deleted_count > 0 {
            info!("删除了 {} 个过期令牌", deleted_count);
        }

        Ok(deleted_count)
    }

    // ========== 统计分析 ==========

    async fn get_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT
                u.id as user_id,
                u.username,
                MAX(a.score) as best_score,
                COUNT(a.id) as attempt_count,
                AVG(a.score) as avg_score
            FROM quiz_attempts a
            JOIN users u ON u.id = a.user_id
            GROUP BY u.id, u.username
            ORDER BY best_score DESC, avg_score DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(LeaderboardEntry {
                user_id: row.try_get("user_id")?,
                username: row.try_get("username")?,
                best_score: row.try_get("best_score")?,
                attempt_count: row.try_get("attempt_count")?,
                avg_score: row.try_get::<Option<f64>, _>("avg_score")?.unwrap_or(0.0),
            });
        }

        Ok(entries)
    }

    async fn get_category_leaderboard(
        &self,
        category_id: i64,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT
                u.id as user_id,
                u.username,
                MAX(a.score) as best_score,
                COUNT(a.id) as attempt_count,
                AVG(a.score) as avg_score
            FROM quiz_attempts a
            JOIN users u ON u.id = a.user_id
            WHERE a.category_id = ?
            GROUP BY u.id, u.username
            ORDER BY best_score DESC, avg_score DESC
            LIMIT ?
            "#,
        )
        .bind(category_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(LeaderboardEntry {
                user_id: row.try_get("user_id")?,
                username: row.try_get("username")?,
                best_score: row.try_get("best_score")?,
                attempt_count: row.try_get("attempt_count")?,
                avg_score: row.try_get::<Option<f64>, _>("avg_score")?.unwrap_or(0.0),
            });
        }

        Ok(entries)
    }

    async fn get_category_stats(&self) -> Result<Vec<CategoryStats>> {
        let rows = sqlx::query(
            r#"
            SELECT
                c.id as category_id,
                c.name as category_name,
                (SELECT COUNT(*) FROM questions q WHERE q.category_id = c.id) as question_count,
                COUNT(a.id) as attempt_count,
                AVG(a.score) as avg_score
            FROM categories c
            LEFT JOIN quiz_attempts a ON a.category_id = c.id
            GROUP BY c.id, c.name
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = Vec::new();
        for row in rows {
            stats.push(CategoryStats {
                category_id: row.try_get("category_id")?,
                category_name: row.try_get("category_name")?,
                question_count: row.try_get("question_count")?,
                attempt_count: row.try_get("attempt_count")?,
                avg_score: row.try_get::<Option<f64>, _>("avg_score")?.unwrap_or(0.0),
            });
        }

        Ok(stats)
    }

    async fn get_question_accuracy(
        &self,
        category_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<QuestionAccuracy>> {
        // 正确率最低的题目排在前面，便于管理员定位难题
        let base = r#"
            SELECT
                q.id as question_id,
                q.prompt,
                COUNT(r.id) as response_count,
                SUM(CASE WHEN r.is_correct THEN 1 ELSE 0 END) as correct_count
            FROM questions q
            JOIN question_responses r ON r.question_id = q.id
        "#;

        let rows = if let Some(category_id) = category_id {
            sqlx::query(&format!(
                "{} WHERE q.category_id = ? GROUP BY q.id, q.prompt \
                 ORDER BY CAST(SUM(CASE WHEN r.is_correct THEN 1 ELSE 0 END) AS REAL) / COUNT(r.id) ASC \
                 LIMIT ?",
                base
            ))
            .bind(category_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "{} GROUP BY q.id, q.prompt \
                 ORDER BY CAST(SUM(CASE WHEN r.is_correct THEN 1 ELSE 0 END) AS REAL) / COUNT(r.id) ASC \
                 LIMIT ?",
                base
            ))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        let mut accuracies = Vec::new();
        for row in rows {
            let response_count: i64 = row.try_get("response_count")?;
            let correct_count: i64 = row.try_get("correct_count")?;
            let accuracy = if response_count > 0 {
                correct_count as f64 / response_count as f64
            } else {
                0.0
            };

            accuracies.push(QuestionAccuracy {
                question_id: row.try_get("question_id")?,
                prompt: row.try_get("prompt")?,
                response_count,
                correct_count,
                accuracy,
            });
        }

        Ok(accuracies)
    }

    async fn get_user_summary(&self, user_id: i64) -> Result<UserSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as attempt_count,
                SUM(score) as total_score,
                SUM(total_questions) as total_questions,
                AVG(score) as avg_score
            FROM quiz_attempts
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserSummary {
            user_id,
            attempt_count: row.try_get("attempt_count")?,
            total_score: row.try_get::<Option<i64>, _>("total_score")?.unwrap_or(0),
            total_questions: row
                .try_get::<Option<i64>, _>("total_questions")?
                .unwrap_or(0),
            avg_score: row.try_get::<Option<f64>, _>("avg_score")?.unwrap_or(0.0),
        })
    }

    async fn get_dashboard_stats(&self) -> Result<DashboardStats> {
        let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let category_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        let question_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        let attempt_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts")
            .fetch_one(&self.pool)
            .await?;
        let pending_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pending_questions WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;
        let avg_score: Option<f64> = sqlx::query_scalar("SELECT AVG(score) FROM quiz_attempts")
            .fetch_one(&self.pool)
            .await?;

        Ok(DashboardStats {
            user_count,
            category_count,
            question_count,
            attempt_count,
            pending_count,
            avg_score: avg_score.unwrap_or(0.0),
        })
    }

    // ========== 数据库初始化 ==========

    async fn initialize_tables(&self) -> Result<()> {
        // 创建用户表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 创建分类表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                parent_id INTEGER,
                description TEXT NOT NULL DEFAULT '',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (parent_id) REFERENCES categories(id) ON DELETE SET NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 创建题目表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL,
                prompt TEXT NOT NULL,
                difficulty INTEGER NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 创建候选答案表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                is_correct BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 创建答题记录表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                score INTEGER NOT NULL,
                total_questions INTEGER NOT NULL,
                duration_seconds INTEGER NOT NULL DEFAULT 0,
                started_at DATETIME NOT NULL,
                finished_at DATETIME NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 创建单题作答表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS question_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attempt_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                answer_id INTEGER,
                is_correct BOOLEAN NOT NULL DEFAULT 0,
                answered_at DATETIME NOT NULL,
                FOREIGN KEY (attempt_id) REFERENCES quiz_attempts(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 创建待审核题目表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL,
                prompt TEXT NOT NULL,
                difficulty INTEGER NOT NULL DEFAULT 1,
                submitted_by INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                submitted_at DATETIME NOT NULL,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE,
                FOREIGN KEY (submitted_by) REFERENCES users(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 创建待审核答案表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pending_question_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                is_correct BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (pending_question_id) REFERENCES pending_questions(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 创建记住我令牌表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS remember_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                token TEXT NOT NULL UNIQUE,
                expires_at DATETIME NOT NULL,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // 创建索引
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_category_id ON questions(category_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_answers_question_id ON answers(question_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_attempts_user_id ON quiz_attempts(user_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_attempts_category_id ON quiz_attempts(category_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_responses_attempt_id ON question_responses(attempt_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_responses_question_id ON question_responses(question_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pending_status ON pending_questions(status)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tokens_expires_at ON remember_tokens(expires_at)")
            .execute(&self.pool)
            .await?;

        info!("SQLite 数据库表初始化完成");
        Ok(())
    }

    async fn get_stats(&self) -> Result<(i64, i64, i64, i64)> {
        let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let question_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;

        let attempt_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts")
            .fetch_one(&self.pool)
            .await?;

        let total_size: i64 = sqlx::query_scalar(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((user_count, question_count, attempt_count, total_size))
    }

    fn db_type(&self) -> &str {
        "sqlite"
    }
}
