//! 请求归一化：把新旧两代请求体统一为 `ImagePayload`。
//!
//! 形状按固定优先级依次尝试，每个匹配器要么给出结果，要么表示“不是我”；
//! 全部落空则为 `NO_IMAGE_DATA`。base64 解码在形状确定之后进行。
use axum::body::Bytes;
use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use std::borrow::Cow;

use crate::error::AppError;

use super::models::{ImagePayload, RemoveBgRequest};

/// 未声明 MIME 时的默认类型
pub const DEFAULT_MIME: &str = "image/jpeg";

const NEW_SHAPE_STEM: &str = "image";
const LEGACY_SHAPE_STEM: &str = "upload";

/// 与常见浏览器/Node 实现一致：填充可有可无，尾部多余 bit 不报错。
const LENIENT_CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_CONFIG);
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_CONFIG);

/// 形状匹配后、解码前的中间结果
#[derive(Debug, PartialEq, Eq)]
struct EncodedImage<'a> {
    encoded: &'a str,
    mime_type: String,
    filename: String,
}

type ShapeMatcher = fn(&RemoveBgRequest) -> Option<Result<EncodedImage<'_>, AppError>>;

/// 匹配优先级：新格式 `data` 先于旧格式 `imageBase64`。
const SHAPES: [ShapeMatcher; 2] = [match_data_shape, match_legacy_shape];

/// 将请求体归一化为待上传的图片
pub fn normalize(req: &RemoveBgRequest) -> Result<ImagePayload, AppError> {
    let encoded = SHAPES
        .iter()
        .find_map(|matcher| matcher(req))
        .unwrap_or(Err(AppError::NoImageData { detail: None }))?;

    let bytes = decode_base64(encoded.encoded)?;

    Ok(ImagePayload {
        bytes: Bytes::from(bytes),
        mime_type: encoded.mime_type,
        filename: encoded.filename,
    })
}

/// 新格式：`{ data, filename?, mime? }`，`data` 也允许是 data URL。
fn match_data_shape(req: &RemoveBgRequest) -> Option<Result<EncodedImage<'_>, AppError>> {
    let data = non_empty(req.data.as_deref())?;

    Some(split_data_url(data).map(|(url_mime, encoded)| {
        let mime_type = non_empty(req.mime.as_deref())
            .or(url_mime)
            .map(normalize_mime)
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        let filename = non_empty(req.filename.as_deref())
            .and_then(sanitize_filename)
            .unwrap_or_else(|| default_filename(NEW_SHAPE_STEM, &mime_type));
        EncodedImage {
            encoded,
            mime_type,
            filename,
        }
    }))
}

/// 旧格式：`{ imageBase64 }`，文件名总是按 MIME 推导。
fn match_legacy_shape(req: &RemoveBgRequest) -> Option<Result<EncodedImage<'_>, AppError>> {
    let value = non_empty(req.image_base64.as_deref())?;

    Some(split_data_url(value).map(|(url_mime, encoded)| {
        let mime_type = url_mime
            .map(normalize_mime)
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        let filename = default_filename(LEGACY_SHAPE_STEM, &mime_type);
        EncodedImage {
            encoded,
            mime_type,
            filename,
        }
    }))
}

/// 拆分 `data:<mime>;base64,<payload>`；非 data URL 原样视为裸 base64。
///
/// 返回 `(mime, payload)`，mime 缺省时为 `None`。
fn split_data_url(value: &str) -> Result<(Option<&str>, &str), AppError> {
    let trimmed = value.trim_start();
    let Some(rest) = strip_prefix_ignore_case(trimmed, "data:") else {
        return Ok((None, value));
    };

    let malformed = || AppError::InvalidBase64 {
        detail: "data URL 缺少 ;base64, 标记".to_string(),
    };
    let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
    let header = header.trim();
    if !header.to_ascii_lowercase().ends_with(";base64") {
        return Err(malformed());
    }

    // 形如 image/png;charset=utf-8;base64，只取第一个分号之前的部分
    let mime = header.split(';').next().map(str::trim).filter(|m| !m.is_empty());
    Ok((mime, payload))
}

/// 解码 base64；解码失败或结果为空都视为 `INVALID_BASE64`。
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, AppError> {
    let compact: Cow<'_, str> = if encoded.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(
            encoded
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect(),
        )
    } else {
        Cow::Borrowed(encoded)
    };

    let decoded = match LENIENT_STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => bytes,
        Err(err) if compact.contains(['-', '_']) => LENIENT_URL_SAFE
            .decode(compact.as_bytes())
            .map_err(|_| AppError::InvalidBase64 {
                detail: err.to_string(),
            })?,
        Err(err) => {
            return Err(AppError::InvalidBase64 {
                detail: err.to_string(),
            });
        }
    };

    if decoded.is_empty() {
        return Err(AppError::InvalidBase64 {
            detail: "解码结果为空".to_string(),
        });
    }
    Ok(decoded)
}

/// MIME 统一去空白并小写，之后的比较都基于该形式。
pub fn normalize_mime(mime: &str) -> String {
    mime.trim().to_ascii_lowercase()
}

/// 按 MIME 推导扩展名；无法推导时返回 `None`。
pub fn extension_for(mime: &str) -> Option<&'static str> {
    match normalize_mime(mime).as_str() {
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/webp" => Some(".webp"),
        _ => None,
    }
}

fn default_filename(stem: &str, mime: &str) -> String {
    format!("{stem}{}", extension_for(mime).unwrap_or_default())
}

/// 只保留路径的最后一段，避免客户端把目录结构带给上游。
fn sanitize_filename(name: &str) -> Option<String> {
    name.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}
