// 桌面答题应用核心库
//
// 模块结构:
// - storage: 数据库抽象层与维护
// - auth: 账号、口令散列与会话
// - quiz: 答题引擎
// - moderation: 投稿审核
// - analytics: 统计分析
// - transfer: 题库导入导出
// - domains: 领域管理器
// - commands: 外壳调用的命令层

pub mod analytics;
pub mod auth;
pub mod commands;
pub mod domains;
pub mod event_bus;
pub mod logger;
pub mod models;
pub mod moderation;
pub mod quiz;
pub mod settings;
pub mod storage;
pub mod transfer;

use analytics::AnalyticsService;
use anyhow::Result;
use auth::{AuthService, SessionManager};
use domains::{AccessDomain, QuizDomain, StorageDomain};
use event_bus::EventBus;
use moderation::ModerationService;
use quiz::QuizEngine;
use settings::SettingsManager;
use std::path::PathBuf;
use std::sync::Arc;
use storage::{Database, StorageMaintenance};
use tracing::info;
use transfer::TransferService;

/// 应用状态 - 按领域分组的全局组件
#[derive(Clone)]
pub struct AppState {
    pub access_domain: AccessDomain,
    pub quiz_domain: QuizDomain,
    pub storage_domain: StorageDomain,
    pub event_bus: Arc<EventBus>,
}

/// 初始化全部组件并按配置装配
pub async fn init_app_state(db_path: &str, settings_path: PathBuf) -> Result<AppState> {
    let event_bus = Arc::new(EventBus::new(256));

    let db = Arc::new(Database::new_sqlite(db_path).await?);
    let settings = Arc::new(SettingsManager::new(settings_path).await?);
    let config = settings.get().await;

    // 账号领域
    let sessions = Arc::new(SessionManager::new(
        event_bus.clone(),
        config.session_timeout_minutes,
    ));
    let auth = Arc::new(AuthService::new(
        db.clone(),
        sessions.clone(),
        event_bus.clone(),
    ));
    auth.set_token_days(config.remember_token_days).await?;
    auth.set_refresh_minutes(config.token_refresh_minutes)
        .await?;

    // 答题领域
    let engine = Arc::new(QuizEngine::new(db.clone(), event_bus.clone()));
    let analytics = Arc::new(AnalyticsService::new(db.clone()));
    analytics
        .set_leaderboard_size(config.leaderboard_size)
        .await?;
    let moderation = Arc::new(ModerationService::new(db.clone(), event_bus.clone()));

    // 存储领域
    let maintenance = Arc::new(StorageMaintenance::new(db.clone(), event_bus.clone()));
    maintenance
        .set_token_retention_days(config.remember_token_days)
        .await?;
    let transfer = Arc::new(TransferService::new(db.clone()));

    info!("应用状态初始化完成");

    Ok(AppState {
        access_domain: AccessDomain::new(auth, sessions),
        quiz_domain: QuizDomain::new(engine, analytics, moderation),
        storage_domain: StorageDomain::new(db, maintenance, settings, transfer),
        event_bus,
    })
}

/// 启动后台任务：会话看守、存储维护和令牌续期
pub async fn start_background_tasks(state: &AppState) {
    state
        .access_domain
        .get_sessions()
        .clone()
        .start_watchdog()
        .await;
    state
        .storage_domain
        .get_maintenance()
        .clone()
        .start_maintenance_task()
        .await;
    state
        .access_domain
        .get_auth()
        .clone()
        .start_token_refresh_task()
        .await;
}
