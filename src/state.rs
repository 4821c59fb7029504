use std::sync::Arc;

use crate::config::RemovalConfig;
use crate::features::remove_bg::RemovalClient;

/// 聚合的应用共享状态（启动后只读）
#[derive(Clone)]
pub struct AppState {
    /// 抠图配置（API Key、体积上限、响应编码）
    pub removal: Arc<RemovalConfig>,
    /// 复用连接池的上游客户端
    pub client: Arc<RemovalClient>,
}

impl AppState {
    pub fn new(removal: RemovalConfig) -> Result<Self, reqwest::Error> {
        let client = RemovalClient::new(&removal)?;
        Ok(Self {
            removal: Arc::new(removal),
            client: Arc::new(client),
        })
    }
}
