use axum::{
    Json,
    body::Bytes,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};

use crate::config::ResponseFormat;
use crate::error::AppError;

use super::models::{TransparentPngEnvelope, UpstreamOutcome};

/// 抠图结果固定以 PNG 返回
pub const RESULT_MIME: &str = "image/png";

/// 把上游结果映射为对外响应。
///
/// 成功按部署配置的编码方式输出；上游失败一律为 `502 UPSTREAM_ERROR`。
pub fn shape(outcome: UpstreamOutcome, format: ResponseFormat) -> Result<Response, AppError> {
    match outcome {
        UpstreamOutcome::Success { bytes } => Ok(match format {
            ResponseFormat::Binary => binary_response(bytes),
            ResponseFormat::Envelope => envelope_response(&bytes),
        }),
        UpstreamOutcome::Failure {
            http_status,
            body_text,
        } => Err(AppError::Upstream {
            status: http_status,
            body: body_text,
        }),
    }
}

fn binary_response(bytes: Bytes) -> Response {
    let mut res = (StatusCode::OK, bytes).into_response();
    res.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(RESULT_MIME));
    res
}

fn envelope_response(bytes: &[u8]) -> Response {
    let body = TransparentPngEnvelope {
        transparent_png_base64: to_data_url(RESULT_MIME, bytes),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        general_purpose::STANDARD.encode(bytes)
    )
}
