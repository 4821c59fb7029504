use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 上游抠图服务默认端点
pub const DEFAULT_REMOVAL_ENDPOINT: &str = "https://clipdrop-api.co/remove-background/v1";

/// 解码后图片体积默认上限（4 MiB）
pub const DEFAULT_MAX_BYTES: usize = 4 * 1024 * 1024;

/// 解码后图片体积可配置的硬上限（6 MiB）
pub const HARD_MAX_BYTES: usize = 6 * 1024 * 1024;

/// JSON 包装等非图片内容预留的请求体余量
const BODY_SLACK_BYTES: usize = 64 * 1024;

/// 入站请求体的传输层上限：硬上限按 base64 膨胀后的两倍，再加 JSON 余量。
///
/// 与 `removal.max_bytes` 无关，保证上限以内的请求都能走完归一化与校验，
/// 由校验器给出准确的类型/体积错误。
pub const MAX_REQUEST_BODY_BYTES: usize =
    HARD_MAX_BYTES.div_ceil(3) * 4 * 2 + BODY_SLACK_BYTES;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        3000
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    #[serde(default = "ApiConfig::default_prefix")]
    pub prefix: String,
}

impl ApiConfig {
    fn default_prefix() -> String {
        "/api".to_string()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        false
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Vec::new(),
            allowed_methods: Vec::new(),
            allowed_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: None,
        }
    }
}

/// 成功响应的编码方式（按部署选择，进程内只会有一种）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// `200 image/png`，直接返回图片字节
    #[default]
    Binary,
    /// `200 application/json`，`{ transparentPngBase64: "data:image/png;base64,..." }`
    Envelope,
}

/// 抠图上游配置
#[derive(Clone, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// 上游端点
    #[serde(default = "RemovalConfig::default_endpoint")]
    pub endpoint: String,
    /// 上游 API Key（缺省时回退读取 CLIPDROP_API_KEY）
    #[serde(default = "RemovalConfig::default_api_key", skip_serializing)]
    pub api_key: Option<String>,
    /// 上游请求总超时（秒）
    #[serde(default = "RemovalConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 上游建连超时（秒）
    #[serde(default = "RemovalConfig::default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 解码后图片体积上限（字节），超过 6 MiB 时按 6 MiB 处理
    #[serde(default = "RemovalConfig::default_max_bytes")]
    pub max_bytes: usize,
    /// 成功响应编码方式
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl RemovalConfig {
    fn default_endpoint() -> String {
        DEFAULT_REMOVAL_ENDPOINT.to_string()
    }
    fn default_api_key() -> Option<String> {
        std::env::var("CLIPDROP_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
    fn default_timeout() -> u64 {
        30
    }
    fn default_connect_timeout() -> u64 {
        10
    }
    fn default_max_bytes() -> usize {
        DEFAULT_MAX_BYTES
    }

    /// 生效的 API Key：空白字符串视为未配置。
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 生效的体积上限（不超过 6 MiB）
    pub fn effective_max_bytes(&self) -> usize {
        self.max_bytes.min(HARD_MAX_BYTES)
    }

    /// 获取上游请求总超时
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// 获取上游建连超时
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

// API Key 不得出现在日志中
impl std::fmt::Debug for RemovalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemovalConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_bytes", &self.max_bytes)
            .field("response_format", &self.response_format)
            .finish()
    }
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            api_key: Self::default_api_key(),
            timeout_secs: Self::default_timeout(),
            connect_timeout_secs: Self::default_connect_timeout(),
            max_bytes: Self::default_max_bytes(),
            response_format: ResponseFormat::default(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 抠图上游配置
    #[serde(default)]
    pub removal: RemovalConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置（文件可缺省），支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(File::with_name(config_path).required(false))
            // 支持环境变量覆盖，例如：APP__REMOVAL__MAX_BYTES
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;

        if config.removal.max_bytes > HARD_MAX_BYTES {
            tracing::warn!(
                configured = config.removal.max_bytes,
                effective = HARD_MAX_BYTES,
                "removal.max_bytes 超出硬上限，已按硬上限处理"
            );
        }
        if config.removal.api_key().is_none() {
            // 不在启动期失败：不同部署槽位可能稍后才注入密钥，请求期返回 MISSING_API_KEY。
            tracing::warn!("未配置上游 API Key（removal.api_key / CLIPDROP_API_KEY）");
        }

        Ok(config)
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> &'static str {
        "config.toml"
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
