pub mod client;
pub mod handler;
pub mod models;
pub mod normalizer;
pub mod shaper;
pub mod validator;

// 对外导出路由构建函数，便于 main.rs 引用
pub use client::RemovalClient;
pub use handler::{create_remove_bg_router, remove_background};
pub use models::{ImagePayload, RemoveBgRequest, TransparentPngEnvelope, UpstreamOutcome};
