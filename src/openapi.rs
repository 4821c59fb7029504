use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::{Modify, OpenApi};

/// 为 Swagger UI 提供正确的“业务接口前缀”Servers 配置。
///
/// - 业务接口默认前缀为 `/api`（对应 `config.api.prefix` / `APP__API__PREFIX`）。
/// - `/health` 不带前缀，因此额外提供 `/` 作为备用 server。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api")
                    .description(Some(
                        "业务接口前缀：对应 config.api.prefix（可通过 APP__API__PREFIX 覆盖）",
                    )),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（用于 /health 等不带前缀接口）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::remove_bg::handler::remove_background,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::features::health::handler::HealthResponse,
            crate::features::remove_bg::models::RemoveBgRequest,
            crate::features::remove_bg::models::TransparentPngEnvelope,
        )
    ),
    modifiers(&ApiServers),
    tags(
        (name = "RemoveBg", description = "背景去除"),
        (name = "Health", description = "健康检查"),
    ),
    info(
        title = "Background Removal Proxy API",
        version = "0.1.0",
        description = "接收 base64 图片并代理至上游抠图服务（Axum）"
    )
)]
pub struct ApiDoc;
