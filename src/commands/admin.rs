//! 管理端命令
//!
//! 分类与题目维护、投稿审核、账号管理和仪表盘，全部要求管理员会话

use super::{require_admin, validate_id};
use crate::moderation::{validate_question_payload, AnswerDraft};
use crate::storage::models::{
    Answer, Category, CategoryStats, DashboardStats, PendingQuestionDetail, Question,
    QuestionAccuracy, QuestionDetail, User, UserRole,
};
use crate::AppState;

// ==================== 分类维护 ====================

/// 新建分类
pub async fn create_category(
    state: &AppState,
    session_id: String,
    name: String,
    parent_id: Option<i64>,
    description: String,
) -> Result<i64, String> {
    require_admin(state, &session_id).await?;
    if name.trim().is_empty() {
        return Err("分类名不能为空".to_string());
    }
    if let Some(parent_id) = parent_id {
        validate_id(parent_id, "父分类")?;
    }

    let category = Category {
        id: None,
        name: name.trim().to_string(),
        parent_id,
        description,
        created_at: None,
    };
    state
        .storage_domain
        .get_db()
        .insert_category(&category)
        .await
        .map_err(|e| e.to_string())
}

/// 更新分类
pub async fn update_category(
    state: &AppState,
    session_id: String,
    category_id: i64,
    name: String,
    parent_id: Option<i64>,
    description: String,
) -> Result<(), String> {
    require_admin(state, &session_id).await?;
    validate_id(category_id, "分类")?;
    if name.trim().is_empty() {
        return Err("分类名不能为空".to_string());
    }
    // 分类不能是自己的父分类
    if parent_id == Some(category_id) {
        return Err("分类不能挂在自己下面".to_string());
    }

    state
        .storage_domain
        .get_db()
        .update_category(category_id, name.trim(), parent_id, &description)
        .await
        .map_err(|e| e.to_string())
}

/// 删除分类及其全部题目
pub async fn delete_category(
    state: &AppState,
    session_id: String,
    category_id: i64,
) -> Result<(), String> {
    require_admin(state, &session_id).await?;
    validate_id(category_id, "分类")?;
    state
        .storage_domain
        .get_db()
        .delete_category(category_id)
        .await
        .map_err(|e| e.to_string())
}

// ==================== 题目维护 ====================

/// 获取某分类的全部题目（含正确答案，管理端使用）
pub async fn list_questions(
    state: &AppState,
    session_id: String,
    category_id: i64,
) -> Result<Vec<QuestionDetail>, String> {
    require_admin(state, &session_id).await?;
    validate_id(category_id, "分类")?;
    state
        .storage_domain
        .get_db()
        .get_questions_by_category(category_id)
        .await
        .map_err(|e| e.to_string())
}

/// 新建题目
pub async fn create_question(
    state: &AppState,
    session_id: String,
    category_id: i64,
    prompt: String,
    difficulty: i64,
    answers: Vec<AnswerDraft>,
) -> Result<i64, String> {
    require_admin(state, &session_id).await?;
    validate_id(category_id, "分类")?;
    validate_question_payload(&prompt, difficulty, &answers).map_err(|e| e.to_string())?;

    let question = Question {
        id: None,
        category_id,
        prompt: prompt.trim().to_string(),
        difficulty,
        created_at: None,
    };
    let answers: Vec<Answer> = answers
        .iter()
        .map(|a| Answer {
            id: None,
            question_id: 0,
            text: a.text.trim().to_string(),
            is_correct: a.is_correct,
        })
        .collect();

    state
        .storage_domain
        .get_db()
        .insert_question(&question, &answers)
        .await
        .map_err(|e| e.to_string())
}

/// 更新题目并整组替换候选答案
pub async fn update_question(
    state: &AppState,
    session_id: String,
    question_id: i64,
    category_id: i64,
    prompt: String,
    difficulty: i64,
    answers: Vec<AnswerDraft>,
) -> Result<(), String> {
    require_admin(state, &session_id).await?;
    validate_id(question_id, "题目")?;
    validate_id(category_id, "分类")?;
    validate_question_payload(&prompt, difficulty, &answers).map_err(|e| e.to_string())?;

    let question = Question {
        id: Some(question_id),
        category_id,
        prompt: prompt.trim().to_string(),
        difficulty,
        created_at: None,
    };
    let answers: Vec<Answer> = answers
        .iter()
        .map(|a| Answer {
            id: None,
            question_id,
            text: a.text.trim().to_string(),
            is_correct: a.is_correct,
        })
        .collect();

    state
        .storage_domain
        .get_db()
        .update_question(&question, &answers)
        .await
        .map_err(|e| e.to_string())
}

/// 删除题目
pub async fn delete_question(
    state: &AppState,
    session_id: String,
    question_id: i64,
) -> Result<(), String> {
    require_admin(state, &session_id).await?;
    validate_id(question_id, "题目")?;
    state
        .storage_domain
        .get_db()
        .delete_question(question_id)
        .await
        .map_err(|e| e.to_string())
}

// ==================== 投稿审核 ====================

/// 待审核队列
pub async fn get_pending_queue(
    state: &AppState,
    session_id: String,
) -> Result<Vec<PendingQuestionDetail>, String> {
    require_admin(state, &session_id).await?;
    state
        .quiz_domain
        .get_moderation()
        .pending_queue()
        .await
        .map_err(|e| e.to_string())
}

/// 审批通过投稿，返回新题目 ID
pub async fn approve_question(
    state: &AppState,
    session_id: String,
    pending_id: i64,
) -> Result<i64, String> {
    require_admin(state, &session_id).await?;
    validate_id(pending_id, "投稿")?;
    state
        .quiz_domain
        .get_moderation()
        .approve(pending_id)
        .await
        .map_err(|e| e.to_string())
}

/// 驳回投稿
pub async fn reject_question(
    state: &AppState,
    session_id: String,
    pending_id: i64,
) -> Result<(), String> {
    require_admin(state, &session_id).await?;
    validate_id(pending_id, "投稿")?;
    state
        .quiz_domain
        .get_moderation()
        .reject(pending_id)
        .await
        .map_err(|e| e.to_string())
}

// ==================== 账号管理 ====================

/// 所有账号列表
pub async fn list_users(state: &AppState, session_id: String) -> Result<Vec<User>, String> {
    require_admin(state, &session_id).await?;
    state
        .access_domain
        .get_auth()
        .list_users()
        .await
        .map_err(|e| e.to_string())
}

/// 调整账号角色
pub async fn set_user_role(
    state: &AppState,
    session_id: String,
    user_id: i64,
    role: String,
) -> Result<(), String> {
    let session = require_admin(state, &session_id).await?;
    validate_id(user_id, "用户")?;
    // 不允许撤销自己的管理员权限
    if user_id == session.user_id && role != "admin" {
        return Err("不能撤销自己的管理员权限".to_string());
    }

    let role = match role.as_str() {
        "admin" => UserRole::Admin,
        "user" => UserRole::User,
        other => return Err(format!("未知角色: {}", other)),
    };
    state
        .access_domain
        .get_auth()
        .set_user_role(user_id, role)
        .await
        .map_err(|e| e.to_string())
}

/// 删除账号及其全部数据
pub async fn delete_user(
    state: &AppState,
    session_id: String,
    user_id: i64,
) -> Result<(), String> {
    let session = require_admin(state, &session_id).await?;
    validate_id(user_id, "用户")?;
    if user_id == session.user_id {
        return Err("不能删除自己的账号".to_string());
    }
    state
        .access_domain
        .get_auth()
        .remove_user(user_id)
        .await
        .map_err(|e| e.to_string())
}

// ==================== 仪表盘与维护 ====================

/// 管理端仪表盘计数
pub async fn get_dashboard(state: &AppState, session_id: String) -> Result<DashboardStats, String> {
    require_admin(state, &session_id).await?;
    state
        .quiz_domain
        .get_analytics()
        .dashboard()
        .await
        .map_err(|e| e.to_string())
}

/// 各分类的题目数、答题数与平均分
pub async fn get_category_stats(
    state: &AppState,
    session_id: String,
) -> Result<Vec<CategoryStats>, String> {
    require_admin(state, &session_id).await?;
    state
        .quiz_domain
        .get_analytics()
        .category_stats()
        .await
        .map_err(|e| e.to_string())
}

/// 正确率最低的题目
pub async fn get_hardest_questions(
    state: &AppState,
    session_id: String,
    category_id: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<QuestionAccuracy>, String> {
    require_admin(state, &session_id).await?;
    if let Some(category_id) = category_id {
        validate_id(category_id, "分类")?;
    }
    state
        .quiz_domain
        .get_analytics()
        .hardest_questions(category_id, limit.unwrap_or(20))
        .await
        .map_err(|e| e.to_string())
}

/// 手动触发存储维护
pub async fn trigger_maintenance(state: &AppState, session_id: String) -> Result<(), String> {
    require_admin(state, &session_id).await?;
    state
        .storage_domain
        .get_maintenance()
        .trigger_maintenance()
        .await
        .map_err(|e| e.to_string())
}
