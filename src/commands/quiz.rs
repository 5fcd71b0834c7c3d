//! 答题流程命令
//!
//! 提供分类浏览、开始答题、逐题作答和投稿接口

use super::{require_session, validate_id};
use crate::moderation::AnswerDraft;
use crate::quiz::{QuizQuestionView, QuizStarted, SubmitOutcome};
use crate::storage::models::Category;
use crate::AppState;

/// 获取所有分类
pub async fn list_categories(state: &AppState, session_id: String) -> Result<Vec<Category>, String> {
    require_session(state, &session_id).await?;
    state
        .storage_domain
        .get_db()
        .get_all_categories()
        .await
        .map_err(|e| e.to_string())
}

/// 获取某分类的子分类
pub async fn list_subcategories(
    state: &AppState,
    session_id: String,
    parent_id: i64,
) -> Result<Vec<Category>, String> {
    require_session(state, &session_id).await?;
    validate_id(parent_id, "分类")?;
    state
        .storage_domain
        .get_db()
        .get_subcategories(parent_id)
        .await
        .map_err(|e| e.to_string())
}

/// 开始一次答题
///
/// # 参数
/// - `count`: 题目数，缺省时使用配置中的 questions_per_quiz
pub async fn start_quiz(
    state: &AppState,
    session_id: String,
    category_id: i64,
    count: Option<usize>,
) -> Result<QuizStarted, String> {
    let session = require_session(state, &session_id).await?;
    validate_id(category_id, "分类")?;

    let count = match count {
        Some(count) => count,
        None => {
            state
                .storage_domain
                .get_settings()
                .get()
                .await
                .questions_per_quiz
        }
    };

    state
        .quiz_domain
        .get_engine()
        .start_quiz(session.user_id, category_id, count)
        .await
        .map_err(|e| e.to_string())
}

/// 获取进行中答题的当前题目
pub async fn get_current_question(
    state: &AppState,
    session_id: String,
    quiz_id: String,
) -> Result<QuizQuestionView, String> {
    require_session(state, &session_id).await?;
    state
        .quiz_domain
        .get_engine()
        .current_question(&quiz_id)
        .await
        .map_err(|e| e.to_string())
}

/// 提交当前题目的作答
///
/// `answer_id` 为空表示放弃本题
pub async fn submit_answer(
    state: &AppState,
    session_id: String,
    quiz_id: String,
    answer_id: Option<i64>,
) -> Result<SubmitOutcome, String> {
    require_session(state, &session_id).await?;
    state
        .quiz_domain
        .get_engine()
        .submit_answer(&quiz_id, answer_id)
        .await
        .map_err(|e| e.to_string())
}

/// 放弃进行中的答题
pub async fn abandon_quiz(
    state: &AppState,
    session_id: String,
    quiz_id: String,
) -> Result<(), String> {
    require_session(state, &session_id).await?;
    state
        .quiz_domain
        .get_engine()
        .abandon_quiz(&quiz_id)
        .await
        .map_err(|e| e.to_string())
}

/// 投稿题目，进入待审核队列
pub async fn submit_question(
    state: &AppState,
    session_id: String,
    category_id: i64,
    prompt: String,
    difficulty: i64,
    answers: Vec<AnswerDraft>,
) -> Result<i64, String> {
    let session = require_session(state, &session_id).await?;
    validate_id(category_id, "分类")?;
    state
        .quiz_domain
        .get_moderation()
        .submit_question(session.user_id, category_id, &prompt, difficulty, &answers)
        .await
        .map_err(|e| e.to_string())
}
