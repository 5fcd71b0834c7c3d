// 领域模块 - 用于组织应用的业务逻辑
//
// 将 AppState 按业务领域分组,实现单一职责原则
// 包含3个领域:账号、答题、存储

pub mod access;
pub mod quiz;
pub mod storage;

pub use access::AccessDomain;
pub use quiz::QuizDomain;
pub use storage::StorageDomain;
