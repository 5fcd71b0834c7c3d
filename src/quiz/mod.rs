// 答题引擎 - 抽题、乱序、计分与落库

use crate::event_bus::{AppEvent, EventBus};
use crate::storage::models::{local_now, QuestionDetail, QuestionResponse, QuizAttempt};
use crate::storage::Database;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// 展示给答题者的候选答案（不含正确标记）
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnswerOption {
    pub answer_id: i64,
    pub text: String,
}

/// 展示给答题者的题目
#[derive(Debug, Clone, serde::Serialize)]
pub struct QuizQuestionView {
    pub question_id: i64,
    pub prompt: String,
    pub difficulty_label: String,
    pub options: Vec<AnswerOption>,
    /// 当前是第几题（从1开始）
    pub position: usize,
    pub total: usize,
}

/// 开始答题的结果
#[derive(Debug, Clone, serde::Serialize)]
pub struct QuizStarted {
    pub quiz_id: String,
    pub total_questions: usize,
    pub first_question: QuizQuestionView,
}

/// 单题提交的结果
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmitOutcome {
    pub correct: bool,
    pub correct_answer_id: i64,
    /// 还有下一题时返回
    pub next_question: Option<QuizQuestionView>,
    /// 最后一题提交后返回总结，此时答题记录已落库
    pub summary: Option<QuizSummary>,
}

/// 答题总结
#[derive(Debug, Clone, serde::Serialize)]
pub struct QuizSummary {
    pub attempt_id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub duration_seconds: i64,
}

/// 进行中的答题状态（仅存内存，完成前不落库）
struct ActiveQuiz {
    user_id: i64,
    category_id: i64,
    questions: Vec<QuestionDetail>,
    current: usize,
    responses: Vec<QuestionResponse>,
    started_at: DateTime<Utc>,
}

impl ActiveQuiz {
    fn view(&self) -> QuizQuestionView {
        // 落库失败重试期间所有题目都已作答，此时展示最后一题
        let index = self.current.min(self.questions.len().saturating_sub(1));
        let detail = &self.questions[index];
        QuizQuestionView {
            question_id: detail.question.id.unwrap_or_default(),
            prompt: detail.question.prompt.clone(),
            difficulty_label: detail.question.difficulty_label().to_string(),
            options: detail
                .answers
                .iter()
                .map(|a| AnswerOption {
                    answer_id: a.id.unwrap_or_default(),
                    text: a.text.clone(),
                })
                .collect(),
            position: self.current + 1,
            total: self.questions.len(),
        }
    }
}

/// 答题引擎
pub struct QuizEngine {
    db: Arc<Database>,
    event_bus: Arc<EventBus>,
    active: RwLock<HashMap<String, ActiveQuiz>>,
}

impl QuizEngine {
    pub fn new(db: Arc<Database>, event_bus: Arc<EventBus>) -> Self {
        Self {
            db,
            event_bus,
            active: RwLock::new(HashMap::new()),
        }
    }

    /// 开始一次答题：抽取题目、打乱顺序、截取数量
    pub async fn start_quiz(
        &self,
        user_id: i64,
        category_id: i64,
        count: usize,
    ) -> Result<QuizStarted> {
        if count == 0 {
            return Err(anyhow::anyhow!("题目数必须大于0"));
        }

        let mut questions = self.db.get_questions_by_category(category_id).await?;
        if questions.is_empty() {
            return Err(anyhow::anyhow!("该分类下还没有题目"));
        }

        // 题目与候选答案都打乱顺序
        {
            let mut rng = rand::thread_rng();
            questions.shuffle(&mut rng);
            questions.truncate(count);
            for detail in &mut questions {
                detail.answers.shuffle(&mut rng);
            }
        }

        let quiz = ActiveQuiz {
            user_id,
            category_id,
            questions,
            current: 0,
            responses: Vec::new(),
            started_at: local_now(),
        };
        let first_question = quiz.view();
        let total_questions = quiz.questions.len();

        let quiz_id = Uuid::new_v4().to_string();
        let mut active = self.active.write().await;
        active.insert(quiz_id.clone(), quiz);

        info!(
            "开始答题: {} (用户 {}, 分类 {}, {} 题)",
            quiz_id, user_id, category_id, total_questions
        );

        Ok(QuizStarted {
            quiz_id,
            total_questions,
            first_question,
        })
    }

    /// 当前题目
    pub async fn current_question(&self, quiz_id: &str) -> Result<QuizQuestionView> {
        let active = self.active.read().await;
        let quiz = active
            .get(quiz_id)
            .ok_or_else(|| anyhow::anyhow!("答题不存在或已结束"))?;
        Ok(quiz.view())
    }

    /// 提交当前题目的作答，最后一题提交后自动结算并落库
    ///
    /// `answer_id` 为空表示放弃本题（计为答错）。结算落库失败时状态
    /// 留在内存中，再次提交会重试结算而不会重复记录作答
    pub async fn submit_answer(
        &self,
        quiz_id: &str,
        answer_id: Option<i64>,
    ) -> Result<SubmitOutcome> {
        let mut active = self.active.write().await;
        let quiz = active
            .get_mut(quiz_id)
            .ok_or_else(|| anyhow::anyhow!("答题不存在或已结束"))?;

        let answered_all = quiz.current >= quiz.questions.len();
        let index = quiz.current.min(quiz.questions.len().saturating_sub(1));
        let detail = &quiz.questions[index];
        let question_id = detail
            .question
            .id
            .ok_or_else(|| anyhow::anyhow!("题目记录缺少 ID"))?;
        let correct_answer_id = detail
            .answers
            .iter()
            .find(|a| a.is_correct)
            .and_then(|a| a.id)
            .ok_or_else(|| anyhow::anyhow!("题目缺少正确答案"))?;

        let correct = if answered_all {
            // 上次落库失败后的重试，沿用已记录的最后一次作答
            quiz.responses.last().map(|r| r.is_correct).unwrap_or(false)
        } else {
            // 提交的答案必须属于当前题目
            if let Some(answer_id) = answer_id {
                if !detail.answers.iter().any(|a| a.id == Some(answer_id)) {
                    return Err(anyhow::anyhow!("答案不属于当前题目"));
                }
            }

            let correct = answer_id == Some(correct_answer_id);
            quiz.responses.push(QuestionResponse {
                id: None,
                attempt_id: 0,
                question_id,
                answer_id,
                is_correct: correct,
                answered_at: local_now(),
            });
            quiz.current += 1;
            correct
        };

        if quiz.current < quiz.questions.len() {
            return Ok(SubmitOutcome {
                correct,
                correct_answer_id,
                next_question: Some(quiz.view()),
                summary: None,
            });
        }

        // 最后一题提交完毕，结算并落库
        let quiz = active
            .remove(quiz_id)
            .ok_or_else(|| anyhow::anyhow!("答题不存在或已结束"))?;
        drop(active);

        match self.finish(quiz_id, &quiz).await {
            Ok(summary) => Ok(SubmitOutcome {
                correct,
                correct_answer_id,
                next_question: None,
                summary: Some(summary),
            }),
            Err(e) => {
                // 落库失败时把状态放回内存，调用方可再次提交重试
                warn!("答题结算落库失败，保留内存状态待重试: {}", e);
                let mut active = self.active.write().await;
                active.insert(quiz_id.to_string(), quiz);
                Err(e)
            }
        }
    }

    /// 放弃进行中的答题，不产生任何记录
    pub async fn abandon_quiz(&self, quiz_id: &str) -> Result<()> {
        let mut active = self.active.write().await;
        if active.remove(quiz_id).is_some() {
            info!("放弃答题: {}", quiz_id);
        }
        Ok(())
    }

    /// 进行中的答题数
    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    /// 结算：计分并把答题记录和单题作答写入数据库（单事务）
    async fn finish(&self, quiz_id: &str, quiz: &ActiveQuiz) -> Result<QuizSummary> {
        let now = local_now();
        let score = quiz.responses.iter().filter(|r| r.is_correct).count() as i64;
        let total_questions = quiz.questions.len() as i64;
        let duration_seconds = (now - quiz.started_at).num_seconds().max(0);

        let attempt = QuizAttempt {
            id: None,
            user_id: quiz.user_id,
            category_id: quiz.category_id,
            score,
            total_questions,
            duration_seconds,
            started_at: quiz.started_at,
            finished_at: now,
        };
        let attempt_id = self.db.insert_attempt(&attempt, &quiz.responses).await?;

        info!(
            "答题完成: {} (得分 {}/{}, 用时 {}秒)",
            quiz_id, score, total_questions, duration_seconds
        );
        self.event_bus.publish(AppEvent::QuizCompleted {
            user_id: quiz.user_id,
            category_id: quiz.category_id,
            attempt_id,
            score,
            total_questions,
        });

        Ok(QuizSummary {
            attempt_id,
            score,
            total_questions,
            duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{Answer, Category, Question, User};

    async fn setup(question_count: usize) -> (tempfile::TempDir, Arc<Database>, QuizEngine, i64, i64) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("quiz_test.db");
        let db = Arc::new(
            Database::new_sqlite(db_path.to_str().unwrap())
                .await
                .unwrap(),
        );
        let bus = Arc::new(EventBus::new(100));

        let user_id = db
            .insert_user(&User {
                id: None,
                username: "player".to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
                created_at: None,
            })
            .await
            .unwrap();
        let category_id = db
            .insert_category(&Category::new("测试", ""))
            .await
            .unwrap();

        for i in 0..question_count {
            let question = Question {
                id: None,
                category_id,
                prompt: format!("第{}题", i + 1),
                difficulty: 1,
                created_at: None,
            };
            let answers = vec![
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
            ];
            db.insert_question(&question, &answers).await.unwrap();
        }

        let engine = QuizEngine::new(db.clone(), bus);
        (dir, db, engine, user_id, category_id)
    }

    /// 从数据库查出某题的正确答案 ID
    async fn correct_answer_id(db: &Database, question_id: i64) -> i64 {
        let detail = db.get_question_detail(question_id).await.unwrap();
        detail
            .answers
            .iter()
            .find(|a| a.is_correct)
            .and_then(|a| a.id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_quiz_respects_question_count() {
        let (_dir, _db, engine, user_id, category_id) = setup(5).await;

        let started = engine.start_quiz(user_id, category_id, 3).await.unwrap();
        assert_eq!(started.total_questions, 3);
        assert_eq!(started.first_question.total, 3);

        // 题库不足时全量出题
        let started = engine.start_quiz(user_id, category_id, 99).await.unwrap();
        assert_eq!(started.total_questions, 5);
    }

    #[tokio::test]
    async fn test_shuffle_preserves_question_set() {
        let (_dir, db, engine, user_id, category_id) = setup(4).await;

        let bank: Vec<i64> = db
            .get_questions_by_category(category_id)
            .await
            .unwrap()
            .iter()
            .filter_map(|d| d.question.id)
            .collect();

        // 全量出题时，乱序后的题目集合与题库一致
        let started = engine.start_quiz(user_id, category_id, 4).await.unwrap();
        let mut seen = Vec::new();
        loop {
            let view = engine.current_question(&started.quiz_id).await.unwrap();
            seen.push(view.question_id);
            let outcome = engine
                .submit_answer(&started.quiz_id, None)
                .await
                .unwrap();
            if outcome.next_question.is_none() {
                break;
            }
        }

        let mut expected = bank.clone();
        expected.sort();
        seen.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_empty_category_rejected() {
        let (_dir, db, engine, user_id, _) = setup(1).await;
        let empty_id = db
            .insert_category(&Category::new("空分类", ""))
            .await
            .unwrap();

        assert!(engine.start_quiz(user_id, empty_id, 5).await.is_err());
        assert!(engine.start_quiz(user_id, empty_id, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_full_quiz_scores_and_persists() {
        let (_dir, db, engine, user_id, category_id) = setup(3).await;

        let started = engine.start_quiz(user_id, category_id, 3).await.unwrap();
        let mut view = started.first_question;
        let mut last_summary = None;

        // 全部答对
        loop {
            let right = correct_answer_id(&db, view.question_id).await;
            let outcome = engine
                .submit_answer(&started.quiz_id, Some(right))
                .await
                .unwrap();
            assert!(outcome.correct);
            match outcome.next_question {
                Some(next) => view = next,
                None => {
                    last_summary = outcome.summary;
                    break;
                }
            }
        }

        let summary = last_summary.unwrap();
        assert_eq!(summary.score, 3);
        assert_eq!(summary.total_questions, 3);

        let detail = db.get_attempt_detail(summary.attempt_id).await.unwrap();
        assert_eq!(detail.attempt.score, 3);
        assert_eq!(detail.responses.len(), 3);
        assert!(detail.responses.iter().all(|r| r.is_correct));

        // 结算后状态清空
        assert_eq!(engine.active_count().await, 0);
        assert!(engine.current_question(&started.quiz_id).await.is_err());
    }

    #[tokio::test]
    async fn test_skipped_question_counts_as_wrong() {
        let (_dir, db, engine, user_id, category_id) = setup(1).await;

        let started = engine.start_quiz(user_id, category_id, 1).await.unwrap();
        let outcome = engine
            .submit_answer(&started.quiz_id, None)
            .await
            .unwrap();

        assert!(!outcome.correct);
        let summary = outcome.summary.unwrap();
        assert_eq!(summary.score, 0);

        let detail = db.get_attempt_detail(summary.attempt_id).await.unwrap();
        assert_eq!(detail.responses[0].answer_id, None);
        assert!(!detail.responses[0].is_correct);
    }

    #[tokio::test]
    async fn test_foreign_answer_rejected() {
        let (_dir, _db, engine, user_id, category_id) = setup(2).await;

        let started = engine.start_quiz(user_id, category_id, 1).await.unwrap();
        assert!(engine
            .submit_answer(&started.quiz_id, Some(999_999))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_quiz_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("quiz_retry_test.db");
        let repo = crate::storage::SqliteRepository::new(db_path.to_str().unwrap())
            .await
            .unwrap();
        let pool = repo.get_pool().clone();
        let db = Arc::new(Database::with_repository(Arc::new(repo)));
        let bus = Arc::new(EventBus::new(100));

        let user_id = db
            .insert_user(&User {
                id: None,
                username: "retry".to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
                created_at: None,
            })
            .await
            .unwrap();
        let category_id = db
            .insert_category(&Category::new("重试", ""))
            .await
            .unwrap();
        let question = Question {
            id: None,
            category_id,
            prompt: "唯一题".to_string(),
            difficulty: 1,
            created_at: None,
        };
        let answers = vec![
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
        ];
        db.insert_question(&question, &answers).await.unwrap();

        let engine = QuizEngine::new(db.clone(), bus);
        let started = engine.start_quiz(user_id, category_id, 1).await.unwrap();

        // 临时改名答题记录表，让结算落库失败
        sqlx::query("ALTER TABLE quiz_attempts RENAME TO quiz_attempts_hold")
            .execute(&pool)
            .await
            .unwrap();
        assert!(engine.submit_answer(&started.quiz_id, None).await.is_err());

        // 失败后状态留在内存中，题目可继续查看
        assert_eq!(engine.active_count().await, 1);
        assert!(engine.current_question(&started.quiz_id).await.is_ok());

        // 恢复后重试结算成功，作答不会重复记录
        sqlx::query("ALTER TABLE quiz_attempts_hold RENAME TO quiz_attempts")
            .execute(&pool)
            .await
            .unwrap();
        let outcome = engine
            .submit_answer(&started.quiz_id, None)
            .await
            .unwrap();
        let summary = outcome.summary.unwrap();
        assert_eq!(summary.total_questions, 1);
        assert_eq!(engine.active_count().await, 0);

        let detail = db.get_attempt_detail(summary.attempt_id).await.unwrap();
        assert_eq!(detail.responses.len(), 1);
    }

    #[tokio::test]
    async fn test_abandon_leaves_no_record() {
        let (_dir, db, engine, user_id, category_id) = setup(2).await;

        let started = engine.start_quiz(user_id, category_id, 2).await.unwrap();
        engine
            .submit_answer(&started.quiz_id, None)
            .await
            .unwrap();
        engine.abandon_quiz(&started.quiz_id).await.unwrap();

        assert_eq!(engine.active_count().await, 0);
        assert!(db.get_attempts_by_user(user_id).await.unwrap().is_empty());
    }
}
