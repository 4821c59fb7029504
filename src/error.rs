use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// 应用统一错误类型（每个请求至多产生一个）
#[derive(Error, Debug)]
pub enum AppError {
    /// 非 POST 请求
    #[error("仅支持 POST 请求")]
    MethodNotAllowed,

    /// 请求体中没有可识别的图片字段
    #[error("请求体中缺少图片数据（data 或 imageBase64）")]
    NoImageData {
        /// 可选：请求体解析失败的原因
        detail: Option<String>,
    },

    /// base64 解码失败或解码结果为空
    #[error("base64 解码失败")]
    InvalidBase64 {
        /// 解码器给出的原因
        detail: String,
    },

    /// 不支持的图片类型
    #[error("不支持的图片类型: {mime}")]
    UnsupportedType { mime: String },

    /// 图片超出体积上限
    #[error("图片体积超出上限（{max} 字节）")]
    FileTooLarge {
        /// 实际大小（请求体被提前截断时未知）
        size: Option<usize>,
        max: usize,
    },

    /// 未配置上游 API Key
    #[error("未配置上游 API Key")]
    MissingApiKey,

    /// 上游返回非 2xx
    #[error("上游抠图服务返回错误状态 {status}")]
    Upstream {
        status: u16,
        /// 截断后的上游响应文本
        body: String,
    },

    /// 上游请求超时（包含 connect/read 等阶段）
    #[error("上游请求超时")]
    UpstreamTimeout(String),

    /// 其余未预期的错误（含网络层失败）
    #[error("服务器内部错误")]
    Server(String),
}

/// 统一错误响应体
///
/// 字段命名保持与历史前端一致：`error` 为稳定错误码，可据此程序化处理；
/// `message`/`detail` 仅用于诊断，不保证稳定。
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// 稳定的错误码
    #[schema(example = "UNSUPPORTED_TYPE")]
    pub error: String,

    /// 人类可读的简述
    pub message: String,

    /// 可选：诊断细节（解码器信息、上游响应文本等）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 可选：与错误相关的结构化字段（如 size/max/mime/status）
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub extra: Option<Map<String, Value>>,

    /// 可选：请求追踪 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NoImageData { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidBase64 { .. } => StatusCode::BAD_REQUEST,
            AppError::UnsupportedType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn stable_code(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            AppError::NoImageData { .. } => "NO_IMAGE_DATA",
            AppError::InvalidBase64 { .. } => "INVALID_BASE64",
            AppError::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            AppError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AppError::MissingApiKey => "MISSING_API_KEY",
            AppError::Upstream { .. } => "UPSTREAM_ERROR",
            AppError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            AppError::Server(_) => "SERVER_ERROR",
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            AppError::NoImageData { detail } => detail.clone(),
            AppError::InvalidBase64 { detail } => Some(detail.clone()),
            AppError::Upstream { body, .. } => Some(body.clone()),
            AppError::UpstreamTimeout(msg) | AppError::Server(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    fn extra(&self) -> Option<Map<String, Value>> {
        let value = match self {
            AppError::UnsupportedType { mime } => json!({ "mime": mime }),
            AppError::FileTooLarge {
                size: Some(size),
                max,
            } => json!({ "size": size, "max": max }),
            AppError::FileTooLarge { size: None, max } => json!({ "max": max }),
            AppError::Upstream { status, .. } => json!({ "status": status }),
            _ => return None,
        };
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// 客户端错误（4xx）只需 warn，服务端/上游错误记 error。
    fn log(&self) {
        let code = self.stable_code();
        if self.status_code().is_client_error() {
            tracing::warn!(code, "请求被拒绝: {}", self);
        } else {
            tracing::error!(code, detail = ?self.detail(), "请求失败: {}", self);
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = ErrorBody {
            error: self.stable_code().to_string(),
            message: self.to_string(),
            detail: self.detail(),
            extra: self.extra(),
            request_id: crate::request_id::current_request_id(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::UpstreamTimeout(err.to_string())
        } else {
            AppError::Server(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::{http::StatusCode, response::IntoResponse};
    use std::time::Duration;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("parse json"))
    }

    #[tokio::test]
    async fn file_too_large_carries_size_and_max() {
        let (status, v) = body_json(AppError::FileTooLarge {
            size: Some(10),
            max: 5,
        })
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(v["error"], "FILE_TOO_LARGE");
        assert_eq!(v["extra"]["size"], 10);
        assert_eq!(v["extra"]["max"], 5);
        assert!(v.get("detail").is_none());
    }

    #[tokio::test]
    async fn upstream_error_carries_status_and_body() {
        let (status, v) = body_json(AppError::Upstream {
            status: 503,
            body: "quota exceeded".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(v["error"], "UPSTREAM_ERROR");
        assert_eq!(v["extra"]["status"], 503);
        assert_eq!(v["detail"], "quota exceeded");
    }

    #[tokio::test]
    async fn method_not_allowed_has_no_extra() {
        let (status, v) = body_json(AppError::MethodNotAllowed).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(v["error"], "METHOD_NOT_ALLOWED");
        assert!(v.get("extra").is_none());
        assert!(v.get("requestId").is_none());
    }

    async fn start_hanging_http_server() -> std::net::SocketAddr {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind tcp listener");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(v) => v,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    // 不返回任何 HTTP 响应，触发客户端 read timeout。
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    drop(socket);
                });
            }
        });

        addr
    }

    #[tokio::test]
    async fn app_error_from_reqwest_timeout_is_upstream_timeout() {
        let addr = start_hanging_http_server().await;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("build reqwest client");

        let err = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .expect_err("expected timeout");
        assert!(err.is_timeout(), "expected reqwest timeout, got: {err}");

        let app_err: AppError = err.into();
        assert!(
            matches!(app_err, AppError::UpstreamTimeout(_)),
            "expected AppError::UpstreamTimeout, got: {app_err:?}"
        );
    }
}
