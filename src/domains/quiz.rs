// 答题领域管理器
//
// 负责答题、统计和审核相关的功能
// 包含 QuizEngine、AnalyticsService 和 ModerationService 三个核心组件

use crate::analytics::AnalyticsService;
use crate::moderation::ModerationService;
use crate::quiz::QuizEngine;
use std::sync::Arc;

/// 答题领域管理器 - 负责答题流程、统计与审核
#[derive(Clone)]
pub struct QuizDomain {
    engine: Arc<QuizEngine>,
    analytics: Arc<AnalyticsService>,
    moderation: Arc<ModerationService>,
}

impl QuizDomain {
    /// 创建新的答题领域管理器
    pub fn new(
        engine: Arc<QuizEngine>,
        analytics: Arc<AnalyticsService>,
        moderation: Arc<ModerationService>,
    ) -> Self {
        Self {
            engine,
            analytics,
            moderation,
        }
    }

    /// 获取答题引擎
    pub fn get_engine(&self) -> &Arc<QuizEngine> {
        &self.engine
    }

    /// 获取统计服务
    pub fn get_analytics(&self) -> &Arc<AnalyticsService> {
        &self.analytics
    }

    /// 获取审核服务
    pub fn get_moderation(&self) -> &Arc<ModerationService> {
        &self.moderation
    }
}
