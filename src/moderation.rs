// 审核模块 - 用户投稿题目的提交与审批

use crate::event_bus::{AppEvent, EventBus};
use crate::storage::models::{
    local_now, pending_status, Answer, PendingAnswer, PendingQuestion, PendingQuestionDetail,
    Question,
};
use crate::storage::Database;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// 投稿的候选答案
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AnswerDraft {
    pub text: String,
    pub is_correct: bool,
}

/// 校验题目内容：题干非空、难度1-3、至少两个候选答案且恰好一个正确
pub fn validate_question_payload(
    prompt: &str,
    difficulty: i64,
    answers: &[AnswerDraft],
) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(anyhow::anyhow!("题干不能为空"));
    }
    if !(1..=3).contains(&difficulty) {
        return Err(anyhow::anyhow!("难度必须在1到3之间"));
    }
    if answers.len() < 2 {
        return Err(anyhow::anyhow!("至少需要两个候选答案"));
    }
    if answers.iter().any(|a| a.text.trim().is_empty()) {
        return Err(anyhow::anyhow!("候选答案不能为空"));
    }
    let correct_count = answers.iter().filter(|a| a.is_correct).count();
    if correct_count != 1 {
        return Err(anyhow::anyhow!(
            "必须恰好有一个正确答案，当前为 {} 个",
            correct_count
        ));
    }
    Ok(())
}

/// 审核服务
pub struct ModerationService {
    db: Arc<Database>,
    event_bus: Arc<EventBus>,
}

impl ModerationService {
    pub fn new(db: Arc<Database>, event_bus: Arc<EventBus>) -> Self {
        Self { db, event_bus }
    }

    /// 用户投稿题目，进入待审核队列
    pub async fn submit_question(
        &self,
        submitted_by: i64,
        category_id: i64,
        prompt: &str,
        difficulty: i64,
        answers: &[AnswerDraft],
    ) -> Result<i64> {
        validate_question_payload(prompt, difficulty, answers)?;

        // 分类必须存在
        self.db.get_category(category_id).await?;

        let pending = PendingQuestion {
            id: None,
            category_id,
            prompt: prompt.trim().to_string(),
            difficulty,
            submitted_by,
            status: pending_status::PENDING.to_string(),
            submitted_at: local_now(),
        };
        let pending_answers: Vec<PendingAnswer> = answers
            .iter()
            .map(|a| PendingAnswer {
                id: None,
                pending_question_id: 0,
                text: a.text.trim().to_string(),
                is_correct: a.is_correct,
            })
            .collect();

        let pending_id = self
            .db
            .insert_pending_question(&pending, &pending_answers)
            .await?;

        info!("收到投稿题目: {} (用户 {})", pending_id, submitted_by);
        self.event_bus.publish(AppEvent::QuestionSubmitted {
            pending_id,
            submitted_by,
        });

        Ok(pending_id)
    }

    /// 待审核队列
    pub async fn pending_queue(&self) -> Result<Vec<PendingQuestionDetail>> {
        let pending = self
            .db
            .get_pending_by_status(pending_status::PENDING)
            .await?;

        let mut details = Vec::with_capacity(pending.len());
        for question in pending {
            if let Some(id) = question.id {
                details.push(self.db.get_pending_detail(id).await?);
            }
        }
        Ok(details)
    }

    /// 审批通过：把投稿提升为正式题目
    pub async fn approve(&self, pending_id: i64) -> Result<i64> {
        let detail = self.db.get_pending_detail(pending_id).await?;
        if detail.question.status != pending_status::PENDING {
            return Err(anyhow::anyhow!("该投稿已处理过"));
        }

        let question = Question {
            id: None,
            category_id: detail.question.category_id,
            prompt: detail.question.prompt.clone(),
            difficulty: detail.question.difficulty,
            created_at: None,
        };
        let answers: Vec<Answer> = detail
            .answers
            .iter()
            .map(|a| Answer {
                id: None,
                question_id: 0,
                text: a.text.clone(),
                is_correct: a.is_correct,
            })
            .collect();

        // 状态标记与题目插入在同一事务内完成
        let question_id = self
            .db
            .promote_pending_question(pending_id, &question, &answers)
            .await?;

        info!("投稿 {} 审批通过，题目 {}", pending_id, question_id);
        self.event_bus.publish(AppEvent::QuestionApproved {
            pending_id,
            question_id,
        });

        Ok(question_id)
    }

    /// 驳回投稿
    pub async fn reject(&self, pending_id: i64) -> Result<()> {
        let detail = self.db.get_pending_detail(pending_id).await?;
        if detail.question.status != pending_status::PENDING {
            return Err(anyhow::anyhow!("该投稿已处理过"));
        }

        self.db
            .set_pending_status(pending_id, pending_status::REJECTED)
            .await?;

        info!("投稿 {} 已驳回", pending_id);
        self.event_bus
            .publish(AppEvent::QuestionRejected { pending_id });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{Category, User};

    async fn setup() -> (tempfile::TempDir, Arc<Database>, ModerationService, i64, i64) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("moderation_test.db");
        let db = Arc::new(
            Database::new_sqlite(db_path.to_str().unwrap())
                .await
                .unwrap(),
        );
        let bus = Arc::new(EventBus::new(100));

        let user_id = db
            .insert_user(&User {
                id: None,
                username: "contributor".to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
                created_at: None,
            })
            .await
            .unwrap();
        let category_id = db
            .insert_category(&Category::new("投稿", ""))
            .await
            .unwrap();

        let service = ModerationService::new(db.clone(), bus);
        (dir, db, service, user_id, category_id)
    }

    fn drafts(correct_count: usize) -> Vec<AnswerDraft> {
        vec![
            AnswerDraft {
                text: "甲".to_string(),
                is_correct: correct_count >= 1,
            },
            AnswerDraft {
                text: "乙".to_string(),
                is_correct: correct_count >= 2,
            },
            AnswerDraft {
                text: "丙".to_string(),
                is_correct: false,
            },
        ]
    }

    #[test]
    fn test_validation_requires_exactly_one_correct() {
        assert!(validate_question_payload("题干", 1, &drafts(1)).is_ok());
        assert!(validate_question_payload("题干", 1, &drafts(0)).is_err());
        assert!(validate_question_payload("题干", 1, &drafts(2)).is_err());
        assert!(validate_question_payload("", 1, &drafts(1)).is_err());
        assert!(validate_question_payload("题干", 4, &drafts(1)).is_err());
    }

    #[tokio::test]
    async fn test_approve_promotes_to_question_bank() {
        let (_dir, db, service, user_id, category_id) = setup().await;

        let pending_id = service
            .submit_question(user_id, category_id, "投稿题", 2, &drafts(1))
            .await
            .unwrap();
        assert_eq!(service.pending_queue().await.unwrap().len(), 1);

        let question_id = service.approve(pending_id).await.unwrap();
        let detail = db.get_question_detail(question_id).await.unwrap();
        assert_eq!(detail.question.prompt, "投稿题");
        assert_eq!(detail.answers.len(), 3);

        // 已处理的投稿不可重复审批
        assert!(service.pending_queue().await.unwrap().is_empty());
        assert!(service.approve(pending_id).await.is_err());
    }

    #[tokio::test]
    async fn test_reject_keeps_question_out_of_bank() {
        let (_dir, db, service, user_id, category_id) = setup().await;

        let pending_id = service
            .submit_question(user_id, category_id, "劣质投稿", 1, &drafts(1))
            .await
            .unwrap();
        service.reject(pending_id).await.unwrap();

        assert_eq!(db.count_questions_by_category(category_id).await.unwrap(), 0);
        assert!(service.reject(pending_id).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_promote_inserts_single_question() {
        let (_dir, db, service, user_id, category_id) = setup().await;

        let pending_id = service
            .submit_question(user_id, category_id, "抢审题", 1, &drafts(1))
            .await
            .unwrap();

        let question = Question {
            id: None,
            category_id,
            prompt: "抢审题".to_string(),
            difficulty: 1,
            created_at: None,
        };
        let answers: Vec<Answer> = drafts(1)
            .iter()
            .map(|a| Answer {
                id: None,
                question_id: 0,
                text: a.text.clone(),
                is_correct: a.is_correct,
            })
            .collect();

        // 绕过服务层的状态预检直接提升两次，状态守卫保证只有一次成功
        assert!(db
            .promote_pending_question(pending_id, &question, &answers)
            .await
            .is_ok());
        assert!(db
            .promote_pending_question(pending_id, &question, &answers)
            .await
            .is_err());
        assert_eq!(db.count_questions_by_category(category_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_submit_to_missing_category_fails() {
        let (_dir, _db, service, user_id, _) = setup().await;
        assert!(service
            .submit_question(user_id, 999, "题干", 1, &drafts(1))
            .await
            .is_err());
    }
}
