//! Smart Fulfillment service.
//!
//! HTTP surface the hosting storefront calls at its lifecycle points: price
//! and stock resolution during catalog rendering, cart partitioning and rate
//! filtering during shipping calculation, line tagging at order creation,
//! plus the admin operations (settings, system check, connection test and the
//! shipping-debug inspector).

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::Validate;

use smart_fulfillment::config::{split_method_list, FulfillmentConfig, Turn14ApiConfig};
use smart_fulfillment::domain::cart::{self, CartLine, FulfillmentPackage, PackageContext, PackageType};
use smart_fulfillment::domain::order::{self, OrderLineFulfillment};
use smart_fulfillment::domain::pricing::{self, PriceMode};
use smart_fulfillment::domain::product::RawProductFields;
use smart_fulfillment::domain::shipping::{self, ShippingRate};
use smart_fulfillment::turn14::{ConnectionTest, RateClient};
use smart_fulfillment::FulfillmentError;

#[derive(Clone)]
struct AppState {
    config: Arc<RwLock<FulfillmentConfig>>,
    turn14: Arc<RateClient>,
    notices: Arc<NoticeThrottle>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = FulfillmentConfig::from_env()?;
    let state = AppState {
        config: Arc::new(RwLock::new(config)),
        turn14: Arc::new(RateClient::new()),
        notices: Arc::new(NoticeThrottle::default()),
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "smart-fulfillment"})) }))
        .route("/api/v1/price", post(resolve_price))
        .route("/api/v1/stock", post(resolve_stock))
        .route("/api/v1/cart/partition", post(partition_cart))
        .route("/api/v1/rates/filter", post(filter_rates))
        .route("/api/v1/rates/quote", post(quote_rates))
        .route("/api/v1/orders/tag-line", post(tag_order_line))
        .route("/api/v1/admin/settings", get(get_settings).put(put_settings))
        .route("/api/v1/admin/system-check", get(system_check))
        .route("/api/v1/admin/connection-test", post(connection_test))
        .route("/api/v1/admin/shipping-debug", post(shipping_debug))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    tracing::info!("smart-fulfillment listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Core touchpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PriceRequest {
    platform_price: Decimal,
    product: RawProductFields,
}

#[derive(Debug, Serialize)]
struct PriceResponse {
    effective_price: Decimal,
}

async fn resolve_price(State(s): State<AppState>, Json(req): Json<PriceRequest>) -> Json<PriceResponse> {
    let cfg = s.config.read().await;
    let fields = req.product.normalize();
    let effective_price =
        pricing::resolve_price(cfg.price_mode, &fields, cfg.stock_threshold, req.platform_price);
    Json(PriceResponse { effective_price })
}

#[derive(Debug, Deserialize)]
struct StockRequest {
    product: RawProductFields,
}

#[derive(Debug, Serialize)]
struct StockResponse {
    stock_quantity: u32,
    in_stock: bool,
    stock_status: &'static str,
}

async fn resolve_stock(Json(req): Json<StockRequest>) -> Json<StockResponse> {
    let fields = req.product.normalize();
    Json(StockResponse {
        stock_quantity: fields.combined_stock(),
        in_stock: fields.is_in_stock(),
        stock_status: fields.stock_status(),
    })
}

#[derive(Debug, Deserialize)]
struct PartitionRequest {
    lines: Vec<CartLine>,
    context: PackageContext,
}

#[derive(Debug, Serialize)]
struct PartitionResponse {
    packages: Vec<FulfillmentPackage>,
}

async fn partition_cart(State(s): State<AppState>, Json(req): Json<PartitionRequest>) -> Json<PartitionResponse> {
    let threshold = s.config.read().await.stock_threshold;
    let packages = cart::partition(req.lines, req.context, threshold);
    tracing::debug!(count = packages.len(), "cart partitioned");
    Json(PartitionResponse { packages })
}

#[derive(Debug, Deserialize)]
struct FilterRatesRequest {
    package_type: PackageType,
    rates: Vec<ShippingRate>,
}

#[derive(Debug, Serialize)]
struct RatesResponse {
    rates: Vec<ShippingRate>,
}

async fn filter_rates(State(s): State<AppState>, Json(req): Json<FilterRatesRequest>) -> Json<RatesResponse> {
    let cfg = s.config.read().await;
    let offered = req.rates.len();
    let kept = shipping::filter_rates(req.rates, req.package_type, &cfg.local_methods, &cfg.remote_method_id);

    if kept.is_empty() && offered > 0 {
        s.notices.warn_empty_rates(req.package_type);
    }
    Json(RatesResponse { rates: kept })
}

#[derive(Debug, Deserialize)]
struct QuoteRequest {
    package: FulfillmentPackage,
}

async fn quote_rates(State(s): State<AppState>, Json(req): Json<QuoteRequest>) -> Json<RatesResponse> {
    if req.package.package_type != PackageType::Remote {
        tracing::debug!(package = %req.package.id, "quote requested for a non-remote package, nothing to do");
        return Json(RatesResponse { rates: Vec::new() });
    }
    let cfg = s.config.read().await.clone();
    let rates = s.turn14.quote_package_rates(&cfg, &req.package).await;
    Json(RatesResponse { rates })
}

#[derive(Debug, Deserialize)]
struct TagLineRequest {
    product: RawProductFields,
    quantity: u32,
}

async fn tag_order_line(State(s): State<AppState>, Json(req): Json<TagLineRequest>) -> Json<OrderLineFulfillment> {
    let threshold = s.config.read().await.stock_threshold;
    let fields = req.product.normalize();
    Json(order::tag_line(&fields, threshold, req.quantity))
}

// ---------------------------------------------------------------------------
// Admin operations
// ---------------------------------------------------------------------------

async fn get_settings(State(s): State<AppState>) -> Json<FulfillmentConfig> {
    Json(s.config.read().await.clone())
}

#[derive(Debug, Deserialize, Validate)]
struct SettingsUpdate {
    price_mode: PriceMode,
    stock_threshold: u32,
    #[validate(length(min = 1, message = "at least one local method is required"))]
    local_methods: Vec<String>,
    #[validate(length(min = 1, message = "remote method id is required"))]
    remote_method_id: String,
    #[validate(range(min = 0.0, max = 100.0))]
    markup_percent: f64,
    #[validate]
    api: ApiSettingsUpdate,
}

#[derive(Debug, Deserialize, Validate)]
struct ApiSettingsUpdate {
    #[validate(url)]
    base_url: String,
    client_id: String,
    client_secret: String,
    #[validate(range(min = 1, max = 120))]
    timeout_secs: u64,
}

async fn put_settings(
    State(s): State<AppState>,
    Json(req): Json<SettingsUpdate>,
) -> Result<Json<FulfillmentConfig>, (StatusCode, String)> {
    req.validate().map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let local_methods = split_method_list(&req.local_methods.join(","));
    if local_methods.is_empty() {
        let err = FulfillmentError::InvalidSettings("local methods are all blank".into());
        return Err((StatusCode::UNPROCESSABLE_ENTITY, err.to_string()));
    }

    let remote_method_id = req.remote_method_id.trim().to_string();
    if remote_method_id.is_empty() {
        let err = FulfillmentError::InvalidSettings("remote method id is blank".into());
        return Err((StatusCode::UNPROCESSABLE_ENTITY, err.to_string()));
    }

    let updated = FulfillmentConfig {
        price_mode: req.price_mode,
        stock_threshold: req.stock_threshold,
        local_methods,
        remote_method_id,
        markup_percent: req.markup_percent,
        api: Turn14ApiConfig {
            base_url: req.api.base_url.trim().trim_end_matches('/').to_string(),
            client_id: req.api.client_id.trim().to_string(),
            client_secret: req.api.client_secret.trim().to_string(),
            timeout_secs: req.api.timeout_secs,
        },
    };

    let mut cfg = s.config.write().await;
    let credentials_changed = cfg.api.base_url != updated.api.base_url
        || cfg.api.client_id != updated.api.client_id
        || cfg.api.client_secret != updated.api.client_secret;
    *cfg = updated.clone();
    drop(cfg);

    if credentials_changed {
        s.turn14.invalidate_token().await;
        tracing::info!("turn14 credentials changed, token cache invalidated");
    }

    Ok(Json(updated))
}

#[derive(Debug, Serialize)]
struct SystemCheck {
    name: &'static str,
    ok: bool,
    detail: String,
}

async fn system_check(State(s): State<AppState>) -> Json<Vec<SystemCheck>> {
    let cfg = s.config.read().await;
    let checks = vec![
        SystemCheck {
            name: "api_credentials",
            ok: cfg.api.has_credentials(),
            detail: if cfg.api.has_credentials() {
                "Turn14 API credentials are configured".to_string()
            } else {
                "Turn14 client id/secret are missing; remote rate quotes will be empty".to_string()
            },
        },
        SystemCheck {
            name: "api_base_url",
            ok: !cfg.api.base_url.trim().is_empty(),
            detail: format!("base url: {}", cfg.api.base_url),
        },
        SystemCheck {
            name: "local_methods",
            ok: !cfg.local_methods.is_empty(),
            detail: format!("allow-list: {}", cfg.local_methods.join(", ")),
        },
        SystemCheck {
            name: "remote_method_id",
            ok: !cfg.remote_method_id.trim().is_empty(),
            detail: format!("remote method: {}", cfg.remote_method_id),
        },
        SystemCheck {
            name: "stock_threshold",
            ok: true,
            detail: format!("threshold: {}", cfg.stock_threshold),
        },
    ];
    Json(checks)
}

async fn connection_test(State(s): State<AppState>) -> Json<ConnectionTest> {
    let api = s.config.read().await.api.clone();
    Json(s.turn14.test_connection(&api).await)
}

#[derive(Debug, Deserialize)]
struct ShippingDebugRequest {
    lines: Vec<CartLine>,
    context: PackageContext,
    /// The full rate set the platform would offer each package.
    rates: Vec<ShippingRate>,
}

#[derive(Debug, Serialize)]
struct LineTrace {
    key: String,
    source: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct PackageTrace {
    package_type: PackageType,
    label: String,
    line_keys: Vec<String>,
    contents_cost: Decimal,
    kept_rate_ids: Vec<String>,
    dropped_rate_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ShippingDebugResponse {
    trace_id: Uuid,
    threshold: u32,
    lines: Vec<LineTrace>,
    packages: Vec<PackageTrace>,
}

/// Dry-runs partitioning and rate filtering for a submitted cart so the admin
/// can see why checkout offered (or failed to offer) particular options.
async fn shipping_debug(State(s): State<AppState>, Json(req): Json<ShippingDebugRequest>) -> Json<ShippingDebugResponse> {
    let cfg = s.config.read().await.clone();

    let lines = req
        .lines
        .iter()
        .map(|line| {
            let fields = line.product.normalize();
            let source = smart_fulfillment::domain::policy::decide(
                fields.local_stock,
                fields.remote_stock,
                cfg.stock_threshold,
                line.quantity,
            );
            LineTrace { key: line.key.clone(), source: source.as_str(), label: source.label() }
        })
        .collect();

    let packages = cart::partition(req.lines, req.context, cfg.stock_threshold)
        .into_iter()
        .map(|p| {
            let kept = shipping::filter_rates(
                req.rates.clone(),
                p.package_type,
                &cfg.local_methods,
                &cfg.remote_method_id,
            );
            let kept_ids: Vec<String> = kept.iter().map(|r| r.id.clone()).collect();
            let dropped_ids = req
                .rates
                .iter()
                .filter(|r| !kept_ids.contains(&r.id))
                .map(|r| r.id.clone())
                .collect();
            PackageTrace {
                package_type: p.package_type,
                label: p.label,
                line_keys: p.contents.iter().map(|l| l.key.clone()).collect(),
                contents_cost: p.contents_cost,
                kept_rate_ids: kept_ids,
                dropped_rate_ids: dropped_ids,
            }
        })
        .collect();

    Json(ShippingDebugResponse {
        trace_id: Uuid::new_v4(),
        threshold: cfg.stock_threshold,
        lines,
        packages,
    })
}

// ---------------------------------------------------------------------------
// Empty-rate admin notice, throttled so zone misconfiguration does not spam
// the log on every shipping recalculation.
// ---------------------------------------------------------------------------

const NOTICE_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Default)]
struct NoticeThrottle {
    last: Mutex<HashMap<&'static str, Instant>>,
}

impl NoticeThrottle {
    fn should_warn(&self, key: &'static str) -> bool {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match last.get(key) {
            Some(at) if at.elapsed() < NOTICE_WINDOW => false,
            _ => {
                last.insert(key, Instant::now());
                true
            }
        }
    }

    fn warn_empty_rates(&self, package_type: PackageType) {
        let key = match package_type {
            PackageType::Local => "local",
            PackageType::Remote => "remote",
        };
        if self.should_warn(key) {
            match package_type {
                PackageType::Local => tracing::warn!(
                    "local package has no shipping options; the zones covering this destination need one of the allow-listed local methods enabled"
                ),
                PackageType::Remote => tracing::warn!(
                    "remote package has no shipping options; the zones covering this destination need the remote shipping method enabled"
                ),
            }
        }
    }
}
