use crate::error::AppError;

use super::models::ImagePayload;

/// 上游接受的图片类型（已小写化）
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];

/// 校验图片类型与体积。
///
/// 顺序固定：先类型后体积，两者同时违规时返回 `UNSUPPORTED_TYPE`。
pub fn validate(payload: &ImagePayload, max_bytes: usize) -> Result<(), AppError> {
    if !is_allowed_mime(&payload.mime_type) {
        return Err(AppError::UnsupportedType {
            mime: payload.mime_type.clone(),
        });
    }

    let size = payload.bytes.len();
    if size > max_bytes {
        return Err(AppError::FileTooLarge {
            size: Some(size),
            max: max_bytes,
        });
    }

    Ok(())
}

pub fn is_allowed_mime(mime: &str) -> bool {
    let mime = mime.trim();
    ALLOWED_MIME_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(mime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn payload(mime: &str, len: usize) -> ImagePayload {
        ImagePayload {
            bytes: Bytes::from(vec![0u8; len]),
            mime_type: mime.to_string(),
            filename: "image.png".to_string(),
        }
    }

    #[test]
    fn accepts_allowed_types_case_insensitively() {
        for mime in ["image/png", "IMAGE/JPEG", "image/Jpg", "image/webp"] {
            assert!(validate(&payload(mime, 10), 10).is_ok(), "mime = {mime}");
        }
    }

    #[test]
    fn rejects_other_types() {
        for mime in ["image/gif", "image/svg+xml", "application/pdf", "image/pngx", ""] {
            let err = validate(&payload(mime, 1), 10).expect_err("should fail");
            match err {
                AppError::UnsupportedType { mime: got } => assert_eq!(got, mime),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_oversized_payload_with_size_and_max() {
        let err = validate(&payload("image/png", 11), 10).expect_err("should fail");
        match err {
            AppError::FileTooLarge { size, max } => {
                assert_eq!(size, Some(11));
                assert_eq!(max, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn type_check_precedes_size_check() {
        let err = validate(&payload("image/gif", 100), 10).expect_err("should fail");
        assert!(matches!(err, AppError::UnsupportedType { .. }));
    }
}
