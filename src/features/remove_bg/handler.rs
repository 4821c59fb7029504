//! 抠图 API 处理模块（features/remove_bg）
//!
//! 单一路径：归一化 → 校验 → 调用上游 → 整形响应；任一步失败即以错误响应结束，不重试。
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{Method, StatusCode},
    response::Response,
    routing::any,
};

use crate::config::MAX_REQUEST_BODY_BYTES;
use crate::error::AppError;
use crate::state::AppState;

use super::{models::RemoveBgRequest, normalizer, shaper, validator};

#[utoipa::path(
    post,
    path = "/remove-bg",
    summary = "去除图片背景",
    description = "接收 base64 图片（新格式 `data`/`filename`/`mime`，或旧格式 `imageBase64`，后者可为 data URL），转发至上游抠图服务并返回透明 PNG。成功响应默认为 `image/png` 二进制；部署配置 `removal.response_format = \"envelope\"` 时改为 JSON 包装。",
    request_body = RemoveBgRequest,
    responses(
        (status = 200, description = "抠图成功：binary 模式为 image/png，envelope 模式为 JSON", content(
            (Vec<u8> = "image/png"),
            (crate::features::remove_bg::models::TransparentPngEnvelope = "application/json")
        )),
        (status = 400, description = "NO_IMAGE_DATA / INVALID_BASE64", body = crate::error::ErrorBody),
        (status = 405, description = "METHOD_NOT_ALLOWED", body = crate::error::ErrorBody),
        (status = 413, description = "FILE_TOO_LARGE", body = crate::error::ErrorBody),
        (status = 415, description = "UNSUPPORTED_TYPE", body = crate::error::ErrorBody),
        (status = 500, description = "MISSING_API_KEY / SERVER_ERROR", body = crate::error::ErrorBody),
        (status = 502, description = "UPSTREAM_ERROR", body = crate::error::ErrorBody),
        (status = 504, description = "UPSTREAM_TIMEOUT", body = crate::error::ErrorBody)
    ),
    tag = "RemoveBg"
)]
pub async fn remove_background(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    if method != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let max_bytes = state.removal.effective_max_bytes();
    let body = body.map_err(|rejection| reject_body(rejection, max_bytes))?;
    let request = parse_request(&body)?;

    let payload = normalizer::normalize(&request)?;
    validator::validate(&payload, max_bytes)?;
    tracing::info!(
        mime = %payload.mime_type,
        filename = %payload.filename,
        size = payload.bytes.len(),
        "图片校验通过，转发至上游"
    );

    let outcome = state
        .client
        .remove_background(state.removal.api_key(), payload)
        .await?;
    shaper::shape(outcome, state.removal.response_format)
}

/// 空请求体按 `{}` 处理；无法解析为对象时同样视为缺少图片数据。
fn parse_request(body: &[u8]) -> Result<RemoveBgRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RemoveBgRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::NoImageData {
        detail: Some(format!("请求体不是有效的 JSON 对象: {e}")),
    })
}

fn reject_body(rejection: BytesRejection, max_bytes: usize) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge {
            size: None,
            max: max_bytes,
        }
    } else {
        AppError::Server(rejection.body_text())
    }
}

/// 请求体上限固定为传输层上限，体积是否超出配置由校验器判定。
pub fn create_remove_bg_router() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/remove-bg", any(remove_background))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_body_is_empty_request() {
        let req = parse_request(b"  \n").expect("parse");
        assert!(req.data.is_none() && req.image_base64.is_none());
    }

    #[test]
    fn non_object_body_is_no_image_data() {
        let bodies: [&[u8]; 4] = [b"[1,2]", b"null", b"{\"data\":", b"{\"data\":123}"];
        for body in bodies {
            let err = parse_request(body).expect_err("should fail");
            match err {
                AppError::NoImageData { detail } => assert!(detail.is_some()),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
