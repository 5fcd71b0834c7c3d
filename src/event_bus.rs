// 事件总线 - 用于模块间解耦通信
//
// 实现发布/订阅模式,消除模块间的直接依赖关系
// 使用 tokio::sync::broadcast 实现高效的事件分发

use tokio::sync::broadcast;

/// 应用事件枚举 - 定义所有可能的系统事件
#[derive(Debug, Clone)]
pub enum AppEvent {
    // --- 账号事件 ---

    /// 用户注册完成事件
    UserRegistered {
        user_id: i64,
        username: String,
    },

    /// 用户登录事件
    UserLoggedIn {
        user_id: i64,
        session_id: String,
    },

    /// 用户登出事件
    UserLoggedOut {
        user_id: i64,
    },

    /// 会话超时事件
    SessionExpired {
        user_id: i64,
        session_id: String,
    },

    // --- 答题事件 ---

    /// 答题完成事件
    QuizCompleted {
        user_id: i64,
        category_id: i64,
        attempt_id: i64,
        score: i64,
        total_questions: i64,
    },

    // --- 审核事件 ---

    /// 题目提交待审核事件
    QuestionSubmitted {
        pending_id: i64,
        submitted_by: i64,
    },

    /// 题目审核通过事件
    QuestionApproved {
        pending_id: i64,
        question_id: i64,
    },

    /// 题目审核驳回事件
    QuestionRejected {
        pending_id: i64,
    },

    // --- 系统事件 ---

    /// 配置更新事件
    ConfigUpdated {
        config_type: String,
    },

    /// 存储维护完成事件
    MaintenanceCompleted {
        tokens_deleted: u64,
        orphans_deleted: u64,
    },
}

/// 事件总线 - 用于模块间解耦通信
///
/// 使用 broadcast channel 实现发布/订阅模式
/// 支持多个订阅者同时接收事件
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小,建议 100-1000
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件
    ///
    /// 如果没有订阅者,事件会被丢弃(这是正常的)
    pub fn publish(&self, event: AppEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                tracing::trace!("事件已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                // 没有订阅者,忽略错误
                tracing::trace!("事件已发布但无订阅者");
            }
        }
    }

    /// 订阅事件
    ///
    /// 返回一个接收器,可以用 `.recv().await` 接收事件
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// 获取当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
