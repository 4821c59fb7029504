use reqwest::{
    Client,
    multipart::{Form, Part},
};
use std::time::Instant;

use crate::config::RemovalConfig;
use crate::error::AppError;

use super::models::{ImagePayload, UpstreamOutcome};

/// 上游 multipart 字段名
pub const IMAGE_FIELD: &str = "image_file";

/// 上游错误文本透传给调用方时的最大字符数
pub const MAX_ERROR_BODY_CHARS: usize = 1000;

const API_KEY_HEADER: &str = "x-api-key";

/// 抠图上游客户端
///
/// 进程内复用同一个 `reqwest::Client`（连接池/Keep-Alive），每个请求只发起一次调用，不做重试。
#[derive(Debug, Clone)]
pub struct RemovalClient {
    http: Client,
    endpoint: String,
}

impl RemovalClient {
    pub fn new(config: &RemovalConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.timeout_duration())
            .connect_timeout(config.connect_timeout_duration())
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 上传图片并取回抠图结果。
    ///
    /// 未配置 API Key 时直接返回 `MISSING_API_KEY`，不会发起任何网络请求。
    /// 非 2xx 响应不视为 `Err`，而是 `UpstreamOutcome::Failure`，由响应整形层统一映射。
    pub async fn remove_background(
        &self,
        api_key: Option<&str>,
        payload: ImagePayload,
    ) -> Result<UpstreamOutcome, AppError> {
        let api_key = api_key.ok_or(AppError::MissingApiKey)?;

        let size = payload.bytes.len();
        let part = Part::bytes(payload.bytes.to_vec())
            .file_name(payload.filename)
            .mime_str(&payload.mime_type)?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let started = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        // 成功时为图片二进制，失败时为文本；先整体读出再区分
        let body = response.bytes().await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if status.is_success() {
            tracing::info!(
                status = status.as_u16(),
                upload_bytes = size,
                result_bytes = body.len(),
                elapsed_ms,
                "上游抠图成功"
            );
            return Ok(UpstreamOutcome::Success { bytes: body });
        }

        let body_text = truncate_chars(&String::from_utf8_lossy(&body), MAX_ERROR_BODY_CHARS);
        tracing::warn!(
            status = status.as_u16(),
            elapsed_ms,
            body = %body_text,
            "上游抠图返回错误"
        );
        Ok(UpstreamOutcome::Failure {
            http_status: status.as_u16(),
            body_text,
        })
    }
}

/// 按字符（而非字节）截断，避免切断多字节字符。
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
