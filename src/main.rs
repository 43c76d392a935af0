use empowernet_core::analyzer::AnalyzerSet;
use empowernet_core::api::{self, AppState};
use empowernet_core::config::Config;
use empowernet_core::fixture::FixtureOverride;
use empowernet_core::ledger::LedgerClient;
use empowernet_core::orchestrator::ScanOrchestrator;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    // ----------------------------------------------------------------
    // 0. 加载配置
    // ----------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        host = %config.host,
        port = config.port,
        inference = %config.inference.base_url,
        "config loaded"
    );

    // ----------------------------------------------------------------
    // 1. 账本连接 & 分析器
    // ----------------------------------------------------------------
    // 凭证缺失或 RPC 不可达时账本进入停用状态，其余接口照常服务
    let ledger = LedgerClient::initialize(&config.ledger).await;
    let analyzers = AnalyzerSet::over_http(&config.inference)?;
    let fixture = FixtureOverride::from_flag(config.fixture_override_enabled);

    let shared_state = Arc::new(AppState {
        orchestrator: ScanOrchestrator::new(analyzers, ledger, fixture),
    });

    // ----------------------------------------------------------------
    // 2. 启动 HTTP 服务
    // ----------------------------------------------------------------
    let app = api::app(shared_state, &config.cors_allowed_origins);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "EmpowerNet API listening (POST /api/scan, POST /api/verify)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
