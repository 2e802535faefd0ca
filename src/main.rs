// src/main.rs

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::post, serve, Router};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use adx_bidder::api::handlers::handle_openrtb_request;
use adx_bidder::bidder::exchange::ExchangeBidder;
use adx_bidder::bidding::exchange_client::ExchangeClient;
use adx_bidder::config::adapters::FileConfigAdapter;
use adx_bidder::config::config_manager::ConfigManager;
use adx_bidder::currency::RateTableCurrencyService;
use adx_bidder::json::JsonMapper;
use adx_bidder::{logging, mock_exchange, AppState};

#[derive(Parser, Debug)]
#[command(author = "whiteCcinn", version = "1.0", about = "An OpenRTB exchange bidder adapter")]
struct CliArgs {
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    #[arg(long, default_value = "static/bidder_config.json")]
    config: String,
    /// 覆盖配置文件中的交易所 endpoint
    #[arg(long)]
    endpoint: Option<String>,
    /// Mock 交易所端口，0 表示不启动
    #[arg(long, default_value_t = 9001)]
    mock_exchange_port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化全局 tracing 日志，guard 持有到进程退出
    let _guard = logging::logger::init(&args.log_dir)?;
    info!("Bidder server starting on port {}", args.port);

    let config = ConfigManager::from_adapter(&FileConfigAdapter::new(&args.config))
        .with_context(|| format!("loading {}", args.config))?
        .with_endpoint(args.endpoint.clone());
    let config = Arc::new(config);

    // 适配器的三个只读依赖：endpoint、JSON 编解码器、汇率服务
    let mapper = Arc::new(JsonMapper::new());
    let currency = Arc::new(RateTableCurrencyService::new(config.currency().rates.clone()));
    let bidder = ExchangeBidder::new(&config.bidder().endpoint, mapper, currency)?;
    info!(
        "Bidder {} routes to {}/<partner>/bid",
        config.bidder().name,
        bidder.endpoint_url()
    );

    if args.mock_exchange_port != 0 {
        let port = args.mock_exchange_port;
        tokio::spawn(async move {
            if let Err(e) = mock_exchange::start_mock_exchange_server(port).await {
                error!("Mock exchange stopped: {}", e);
            }
        });
    }

    let state = Arc::new(AppState {
        bidder: Arc::new(bidder),
        client: ExchangeClient::new(config.bidder().timeout_ms),
        config: config.clone(),
    });

    let app = Router::new()
        .route("/openrtb2/auction", post(handle_openrtb_request))
        .with_state(state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Bidder server running at http://{}", addr);

    serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Shutting down gracefully...");
        })
        .await?;

    info!("Bidder server shut down.");
    Ok(())
}
