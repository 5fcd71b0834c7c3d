// 统计分析模块 - 排行榜与答题数据汇总

use crate::storage::models::{
    CategoryStats, DashboardStats, LeaderboardEntry, QuestionAccuracy, QuizAttempt, UserSummary,
};
use crate::storage::Database;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 统计分析服务
pub struct AnalyticsService {
    db: Arc<Database>,
    /// 排行榜条目数，使用RwLock实现内部可变性
    leaderboard_size: RwLock<i64>,
}

impl AnalyticsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            leaderboard_size: RwLock::new(10),
        }
    }

    pub async fn set_leaderboard_size(&self, size: i64) -> Result<()> {
        if !(1..=100).contains(&size) {
            return Err(anyhow::anyhow!("排行榜条目数必须在1到100之间"));
        }
        let mut leaderboard_size = self.leaderboard_size.write().await;
        *leaderboard_size = size;
        Ok(())
    }

    /// 全局排行榜
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let limit = *self.leaderboard_size.read().await;
        self.db.get_leaderboard(limit).await
    }

    /// 分类排行榜
    pub async fn category_leaderboard(&self, category_id: i64) -> Result<Vec<LeaderboardEntry>> {
        let limit = *self.leaderboard_size.read().await;
        self.db.get_category_leaderboard(category_id, limit).await
    }

    /// 各分类的题目数、答题数与平均分
    pub async fn category_stats(&self) -> Result<Vec<CategoryStats>> {
        self.db.get_category_stats().await
    }

    /// 正确率最低的题目，供管理员定位难题
    pub async fn hardest_questions(
        &self,
        category_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<QuestionAccuracy>> {
        self.db.get_question_accuracy(category_id, limit).await
    }

    /// 某用户的答题概况
    pub async fn user_summary(&self, user_id: i64) -> Result<UserSummary> {
        self.db.get_user_summary(user_id).await
    }

    /// 某用户的答题历史
    pub async fn user_history(&self, user_id: i64) -> Result<Vec<QuizAttempt>> {
        self.db.get_attempts_by_user(user_id).await
    }

    /// 管理端仪表盘
    pub async fn dashboard(&self) -> Result<DashboardStats> {
        self.db.get_dashboard_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{local_now, Answer, Category, Question, QuestionResponse, QuizAttempt, User};

    async fn setup() -> (tempfile::TempDir, Arc<Database>, AnalyticsService) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("analytics_test.db");
        let db = Arc::new(
            Database::new_sqlite(db_path.to_str().unwrap())
                .await
                .unwrap(),
        );
        let service = AnalyticsService::new(db.clone());
        (dir, db, service)
    }

    async fn insert_user(db: &Database, name: &str) -> i64 {
        db.insert_user(&User {
            id: None,
            username: name.to_string(),
            password_hash: "hash".to_string(),
            role: "user".to_string(),
            created_at: None,
        })
        .await
        .unwrap()
    }

    async fn insert_attempt(db: &Database, user_id: i64, category_id: i64, score: i64) {
        let now = local_now();
        db.insert_attempt(
            &QuizAttempt {
                id: None,
                user_id,
                category_id,
                score,
                total_questions: 10,
                duration_seconds: 60,
                started_at: now,
                finished_at: now,
            },
            &[],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_best_score() {
        let (_dir, db, service) = setup().await;

        let cat = db.insert_category(&Category::new("综合", "")).await.unwrap();
        let strong = insert_user(&db, "strong").await;
        let weak = insert_user(&db, "weak").await;

        insert_attempt(&db, strong, cat, 9).await;
        insert_attempt(&db, strong, cat, 5).await;
        insert_attempt(&db, weak, cat, 3).await;

        let board = service.leaderboard().await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].username, "strong");
        assert_eq!(board[0].best_score, 9);
        assert_eq!(board[0].attempt_count, 2);
        assert_eq!(board[1].username, "weak");
    }

    #[tokio::test]
    async fn test_leaderboard_size_is_respected() {
        let (_dir, db, service) = setup().await;

        let cat = db.insert_category(&Category::new("综合", "")).await.unwrap();
        for i in 0..5 {
            let user_id = insert_user(&db, &format!("user{}", i)).await;
            insert_attempt(&db, user_id, cat, i).await;
        }

        service.set_leaderboard_size(3).await.unwrap();
        assert_eq!(service.leaderboard().await.unwrap().len(), 3);
        assert!(service.set_leaderboard_size(0).await.is_err());
    }

    #[tokio::test]
    async fn test_hardest_questions_ranked_by_accuracy() {
        let (_dir, db, service) = setup().await;

        let cat = db.insert_category(&Category::new("难度", "")).await.unwrap();
        let user_id = insert_user(&db, "solver").await;

        let make_answers = || {
            vec![
                Answer {
                    id: None,
                    question_id: 0,
                    text: "对".to_string(),
                    is_correct: true,
                },
                Answer {
                    id: None,
                    question_id: 0,
                    text: "错".to_string(),
                    is_correct: false,
                },
            ]
        };
        let easy = db
            .insert_question(
                &Question {
                    id: None,
                    category_id: cat,
                    prompt: "简单题".to_string(),
                    difficulty: 1,
                    created_at: None,
                },
                &make_answers(),
            )
            .await
            .unwrap();
        let hard = db
            .insert_question(
                &Question {
                    id: None,
                    category_id: cat,
                    prompt: "困难题".to_string(),
                    difficulty: 3,
                    created_at: None,
                },
                &make_answers(),
            )
            .await
            .unwrap();

        // 简单题答对，困难题答错
        let now = local_now();
        let responses = vec![
            QuestionResponse {
                id: None,
                attempt_id: 0,
                question_id: easy,
                answer_id: None,
                is_correct: true,
                answered_at: now,
            },
            QuestionResponse {
                id: None,
                attempt_id: 0,
                question_id: hard,
                answer_id: None,
                is_correct: false,
                answered_at: now,
            },
        ];
        db.insert_attempt(
            &QuizAttempt {
                id: None,
                user_id,
                category_id: cat,
                score: 1,
                total_questions: 2,
                duration_seconds: 10,
                started_at: now,
                finished_at: now,
            },
            &responses,
        )
        .await
        .unwrap();

        let ranked = service.hardest_questions(Some(cat), 10).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].prompt, "困难题");
        assert_eq!(ranked[0].accuracy, 0.0);
        assert_eq!(ranked[1].accuracy, 1.0);
    }

    #[tokio::test]
    async fn test_category_stats_aggregates_per_category() {
        let (_dir, db, service) = setup().await;

        let active = db.insert_category(&Category::new("热门", "")).await.unwrap();
        let idle = db.insert_category(&Category::new("冷门", "")).await.unwrap();
        let user_id = insert_user(&db, "walker").await;

        db.insert_question(
            &Question {
                id: None,
                category_id: active,
                prompt: "热门题".to_string(),
                difficulty: 1,
                created_at: None,
            },
            &[],
        )
        .await
        .unwrap();
        insert_attempt(&db, user_id, active, 8).await;
        insert_attempt(&db, user_id, active, 6).await;

        let stats = service.category_stats().await.unwrap();
        assert_eq!(stats.len(), 2);

        let hot = stats.iter().find(|s| s.category_id == active).unwrap();
        assert_eq!(hot.question_count, 1);
        assert_eq!(hot.attempt_count, 2);
        assert_eq!(hot.avg_score, 7.0);

        // 没有答题记录的分类平均分为0
        let cold = stats.iter().find(|s| s.category_id == idle).unwrap();
        assert_eq!(cold.attempt_count, 0);
        assert_eq!(cold.avg_score, 0.0);
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let (_dir, db, service) = setup().await;

        let cat = db.insert_category(&Category::new("综合", "")).await.unwrap();
        let user_id = insert_user(&db, "solo").await;
        insert_attempt(&db, user_id, cat, 7).await;

        let dashboard = service.dashboard().await.unwrap();
        assert_eq!(dashboard.user_count, 1);
        assert_eq!(dashboard.category_count, 1);
        assert_eq!(dashboard.attempt_count, 1);
        assert_eq!(dashboard.avg_score, 7.0);
    }
}
