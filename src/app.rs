use axum::{Router, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::cors::build_cors_layer;
use crate::features::{health::health_check, remove_bg::create_remove_bg_router};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 装配完整路由：业务接口挂在 `api.prefix` 下，`/health` 与文档在根路径。
pub fn build_router(config: &AppConfig, state: AppState) -> Router {
    let api_router = create_remove_bg_router();

    let prefix = config.api.prefix.trim_end_matches('/');
    let mut router = Router::<AppState>::new().route("/health", get(health_check));
    // axum 不允许在根路径 nest，前缀为空时直接合并
    router = if prefix.is_empty() {
        router.merge(api_router)
    } else {
        router.nest(prefix, api_router)
    };

    let mut app = router
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state);

    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }

    // 最外层：保证 CORS 预检等所有响应都带 request_id
    app.layer(axum::middleware::from_fn(request_id_middleware))
}
