// 存储领域管理器
//
// 负责数据库、存储维护、设置和题库导入导出相关的功能
// 包含 Database、StorageMaintenance、SettingsManager 和 TransferService 四个核心组件

use crate::settings::SettingsManager;
use crate::storage::database::Database;
use crate::storage::maintenance::StorageMaintenance;
use crate::transfer::TransferService;
use std::sync::Arc;

/// 存储领域管理器 - 负责数据库、维护、设置和导入导出
#[derive(Clone)]
pub struct StorageDomain {
    db: Arc<Database>,
    maintenance: Arc<StorageMaintenance>,
    settings: Arc<SettingsManager>,
    transfer: Arc<TransferService>,
}

impl StorageDomain {
    /// 创建新的存储领域管理器
    pub fn new(
        db: Arc<Database>,
        maintenance: Arc<StorageMaintenance>,
        settings: Arc<SettingsManager>,
        transfer: Arc<TransferService>,
    ) -> Self {
        Self {
            db,
            maintenance,
            settings,
            transfer,
        }
    }

    /// 获取数据库
    pub fn get_db(&self) -> &Arc<Database> {
        &self.db
    }

    /// 获取存储维护器
    pub fn get_maintenance(&self) -> &Arc<StorageMaintenance> {
        &self.maintenance
    }

    /// 获取设置管理器
    pub fn get_settings(&self) -> &Arc<SettingsManager> {
        &self.settings
    }

    /// 获取导入导出服务
    pub fn get_transfer(&self) -> &Arc<TransferService> {
        &self.transfer
    }
}
