/// 健康检查
pub mod health;

/// 背景去除（上游代理）
pub mod remove_bg;
