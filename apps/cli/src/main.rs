mod config;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};

use eveprofit_market_data::{
    AggregateRequest, MarketAggregator, MarketDataConfig, RegionId, RequestContext, TypeId,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;

const USAGE: &str = "usage: eveprofit-market <region_id> <type_id>...";

fn init_tracing() {
    let log_format = std::env::var("EVEPROFIT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// `<region_id> <type_id>...` into a request.
fn parse_args(args: &[String]) -> anyhow::Result<AggregateRequest> {
    let Some((region, types)) = args.split_first() else {
        bail!("missing region_id");
    };
    if types.is_empty() {
        bail!("missing type_id");
    }

    let region_id: RegionId = region
        .parse()
        .with_context(|| format!("invalid region_id {region:?}"))?;
    let type_ids = types
        .iter()
        .map(|raw| {
            raw.parse::<TypeId>()
                .with_context(|| format!("invalid type_id {raw:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(AggregateRequest::new(region_id, type_ids))
}

/// Deadline for one whole aggregation: every attempt of a fetch may use the
/// full per-call timeout.
fn aggregation_timeout(config: &MarketDataConfig) -> Duration {
    config
        .request_timeout
        .saturating_mul(config.retry_attempts.saturating_add(1))
}

async fn run(request: AggregateRequest) -> anyhow::Result<()> {
    let config = Config::from_env();
    let aggregator = MarketAggregator::from_config(&config.market);

    let ctx = RequestContext::with_timeout(aggregation_timeout(&config.market));
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling request");
            interrupt.cancel();
        }
    });

    tracing::info!(
        "Fetching {} types in region {} from {}",
        request.type_ids.len(),
        request.region_id,
        config.market.base_url
    );

    let response = aggregator.get_market_data(&ctx, &request).await?;
    println!("{}", serde_json::to_string_pretty(&*response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request = match parse_args(&args) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("error: {e:#}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(request).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
