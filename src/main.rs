use bgremove_backend::{AppConfig, AppState, ShutdownManager, build_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bgremove_backend=info,tower_http=info".into()),
        )
        .init();

    // Load config
    if let Err(e) = AppConfig::init_global() {
        tracing::error!("Config init failed: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    // 创建优雅退出管理器并启动信号处理器
    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    let state = match AppState::new(config.removal.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("上游 HTTP Client 初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_router(config, state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Remove BG API: http://{}{}/remove-bg", addr, config.api.prefix);
    tracing::info!(
        endpoint = %config.removal.endpoint,
        max_bytes = config.removal.effective_max_bytes(),
        response_format = ?config.removal.response_format,
        timeout_secs = config.removal.timeout_secs,
        "上游配置"
    );

    let shutdown_timeout = config.shutdown.timeout_duration();
    let drain_started = shutdown_manager.clone();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = drain_started.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    // 在途请求排空受超时约束，超时后直接退出
    let server = tokio::spawn(async move { graceful.await });
    let force_quit = async {
        shutdown_manager.wait_for_shutdown().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        res = server => match res {
            Ok(Ok(())) => tracing::info!("服务器已优雅关闭"),
            Ok(Err(e)) => {
                tracing::error!("服务器运行错误: {}", e);
                std::process::exit(1);
            }
            Err(e) => {
                tracing::error!("服务器任务异常退出: {}", e);
                std::process::exit(1);
            }
        },
        _ = force_quit => {
            tracing::warn!("优雅退出超时（{}秒），强制退出", config.shutdown.timeout_secs);
        }
    }
}
