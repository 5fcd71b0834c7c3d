// 存储模块 - 统一的数据库抽象层

// 子模块
pub mod database;
pub mod maintenance;
pub mod models;
pub mod repository;
pub mod seed;

// 重新导出主要类型
pub use database::Database;
pub use maintenance::{StorageMaintenance, StorageStats};
pub use models::*;
pub use repository::QuizRepository;

// 重新导出具体实现（可选，用于高级用法）
pub use repository::sqlite::SqliteRepository;
