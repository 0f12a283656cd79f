//! Command-line auction runner.
//!
//! Loads a client configuration, submits a single auction and prints its
//! outcome as JSON (or `cancelled` when `--cancel-after-ms` wins).
//!
//! ```text
//! auction-client --config client.toml --config-id imp-1 --size 320x50 --keyword sports
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use auction_client::config::loader::{load_config, ConfigError};
use auction_client::config::validation::validate_config;
use auction_client::observability::{init_logging, init_metrics};
use auction_client::request::{NativeAssetKind, NativeAssetParams, NativeRequestVersion};
use auction_client::{AdSize, AuctionRegistry, ChannelListener, ClientConfig, RequestParams};

#[derive(Parser)]
#[command(name = "auction-client")]
#[command(about = "Run a single header-bidding auction", long_about = None)]
struct Cli {
    /// TOML client configuration; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stored impression id on the auction server
    #[arg(long)]
    config_id: String,

    #[arg(long, value_enum, default_value_t = AdTypeArg::Banner)]
    ad_type: AdTypeArg,

    /// Banner size as WxH; repeatable
    #[arg(long = "size")]
    sizes: Vec<AdSize>,

    /// User keyword; repeatable
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    #[arg(long)]
    auction_id: Option<String>,

    /// Override the configured auction server URL
    #[arg(long)]
    host: Option<String>,

    /// Override the configured account id
    #[arg(long)]
    account_id: Option<String>,

    /// Cancel the auction if no outcome arrived after this many milliseconds
    #[arg(long)]
    cancel_after_ms: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AdTypeArg {
    Banner,
    Interstitial,
    Native,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.server.host_url = host.clone();
    }
    if let Some(account_id) = &cli.account_id {
        config.server.account_id = account_id.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability.log_level);
    tracing::info!(
        host = %config.server.host_url,
        timeout_ms = config.timeouts.default_ms,
        "auction-client v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let params = build_params(&cli)?;
    let auction_id = cli
        .auction_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let registry = AuctionRegistry::builder(config).build()?;
    let (listener, mut outcomes) = ChannelListener::new();
    registry.submit(params, Arc::new(listener), auction_id.clone());

    let cancel_after = async {
        match cli.cancel_after_ms {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending::<()>().await,
        }
    };

    let notice = tokio::select! {
        notice = outcomes.recv() => notice,
        _ = cancel_after => {
            // Nothing stopped means the outcome is already on its way.
            if registry.cancel(&auction_id) > 0 {
                None
            } else {
                outcomes.recv().await
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Interrupted, cancelling auctions");
            registry.cancel_all();
            None
        }
    };

    match notice {
        Some(notice) => println!("{}", serde_json::to_string_pretty(&notice.outcome)?),
        None => println!("cancelled"),
    }
    Ok(())
}

fn build_params(cli: &Cli) -> Result<RequestParams, Box<dyn std::error::Error>> {
    let params = match cli.ad_type {
        AdTypeArg::Banner => RequestParams::banner(&cli.config_id, cli.sizes.iter().copied())?,
        AdTypeArg::Interstitial => RequestParams::interstitial(&cli.config_id)?,
        AdTypeArg::Native => RequestParams::native(
            &cli.config_id,
            [
                (NativeAssetKind::Title, NativeAssetParams::required().with_len(90)),
                (
                    NativeAssetKind::MainImage,
                    NativeAssetParams::required().with_min_size(300, 250),
                ),
                (NativeAssetKind::CtaText, NativeAssetParams::default()),
            ],
            NativeRequestVersion::default(),
        )?,
    };
    Ok(params.with_keywords(cli.keywords.iter().cloned()))
}
