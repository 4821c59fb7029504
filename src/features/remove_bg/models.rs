use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// 抠图请求体（同时兼容新旧两代字段）
///
/// - 新格式：`{ data, filename?, mime? }`
/// - 旧格式：`{ imageBase64 }`，值可以是 data URL 或裸 base64
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBgRequest {
    /// base64 图片数据（新格式，优先）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// 原始文件名（新格式）
    #[schema(example = "dog.png")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// 图片 MIME 类型（新格式，默认 image/jpeg）
    #[schema(example = "image/png")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    /// data URL 或裸 base64（旧格式）
    #[schema(example = "data:image/png;base64,iVBORw0KGgo=")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

/// 归一化后的图片：单次请求内有效，只被上游调用消费一次。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Bytes,
    /// 已小写化的 MIME
    pub mime_type: String,
    pub filename: String,
}

/// 上游调用结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamOutcome {
    /// 2xx：响应体按二进制图片处理，不看 Content-Type
    Success { bytes: Bytes },
    /// 非 2xx：状态码与（截断后的）响应文本
    Failure { http_status: u16, body_text: String },
}

/// 旧版前端使用的 JSON 包装响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransparentPngEnvelope {
    /// `data:image/png;base64,<...>`
    #[schema(example = "data:image/png;base64,iVBORw0KGgo=")]
    pub transparent_png_base64: String,
}

#[cfg(test)]
mod tests {
    use super::RemoveBgRequest;

    #[test]
    fn request_accepts_legacy_camel_case_field() {
        let req: RemoveBgRequest =
            serde_json::from_str(r#"{"imageBase64":"abc"}"#).expect("parse");
        assert_eq!(req.image_base64.as_deref(), Some("abc"));
        assert!(req.data.is_none());
    }

    #[test]
    fn request_ignores_unknown_fields() {
        let req: RemoveBgRequest =
            serde_json::from_str(r#"{"data":"abc","extra":1}"#).expect("parse");
        assert_eq!(req.data.as_deref(), Some("abc"));
    }
}
