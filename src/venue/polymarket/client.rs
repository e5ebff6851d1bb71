//! Polymarket CLOB REST client.
//!
//! Market metadata and book snapshots are public; order placement, cancel
//! and status require signed requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::clock::Clock;
use crate::domain::{
    BookLevel, BookSnapshot, MarketId, MarketInfo, Order, OrderId, OrderRequest, OrderStatus,
    TokenId,
};
use crate::error::{Error, Result};

use super::auth::{self, ApiCredentials};

const HEADER_API_KEY: &str = "POLY-API-KEY";
const HEADER_SIGNATURE: &str = "POLY-SIGNATURE";
const HEADER_TIMESTAMP: &str = "POLY-TIMESTAMP";
const HEADER_PASSPHRASE: &str = "POLY-PASSPHRASE";

#[derive(Debug, Deserialize)]
struct TokenDto {
    token_id: String,
    outcome: String,
}

#[derive(Debug, Deserialize)]
struct MarketDto {
    condition_id: String,
    question: Option<String>,
    #[serde(default)]
    tokens: Vec<TokenDto>,
    minimum_tick_size: Option<Decimal>,
    #[serde(default)]
    active: bool,
    end_date_iso: Option<String>,
}

impl MarketDto {
    /// Markets without a clean Yes/No token pair are not tradeable here.
    fn into_info(self) -> Option<MarketInfo> {
        let yes = self
            .tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("yes"))?;
        let no = self
            .tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("no"))?;

        Some(MarketInfo {
            market_id: MarketId::new(self.condition_id.clone()),
            condition_id: self.condition_id,
            question: self.question.unwrap_or_default(),
            yes_token_id: TokenId::new(yes.token_id.clone()),
            no_token_id: TokenId::new(no.token_id.clone()),
            min_tick: self.minimum_tick_size.unwrap_or_else(|| Decimal::new(1, 2)),
            active: self.active,
            end_date: self.end_date_iso,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RestLevelDto {
    price: String,
    size: String,
}

#[derive(Debug, Deserialize)]
struct BookDto {
    #[serde(default)]
    bids: Vec<RestLevelDto>,
    #[serde(default)]
    asks: Vec<RestLevelDto>,
}

#[derive(Debug, Serialize)]
struct PlaceOrderDto<'a> {
    token_id: &'a str,
    price: String,
    size: String,
    side: &'a str,
    order_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct PlaceOrderResponse {
    #[serde(alias = "orderID", alias = "order_id")]
    order_id: Option<String>,
    status: Option<String>,
    #[serde(default)]
    success: bool,
    #[serde(alias = "errorMsg")]
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderStatusDto {
    status: Option<String>,
    price: Option<String>,
    original_size: Option<String>,
    size_matched: Option<String>,
    asset_id: Option<String>,
    market: Option<String>,
}

/// REST client for the CLOB API.
pub struct ClobClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<ApiCredentials>,
    fee_rate: Decimal,
    clock: Arc<dyn Clock>,
}

impl ClobClient {
    pub fn new(
        base_url: &str,
        proxy_url: Option<&str>,
        credentials: Option<ApiCredentials>,
        fee_rate: Decimal,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(std::time::Duration::from_secs(10));
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            credentials,
            fee_rate,
            clock,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("bad API url: {e}")))
    }

    fn signed_headers(&self, method: &str, path: &str, body: &str) -> Result<Vec<(String, String)>> {
        let credentials = auth::require(self.credentials.as_ref())?;
        let timestamp = self.clock.now().timestamp().to_string();
        let signature = credentials.sign_request(&timestamp, method, path, body);
        Ok(vec![
            (HEADER_API_KEY.into(), credentials.api_key.clone()),
            (HEADER_SIGNATURE.into(), signature),
            (HEADER_TIMESTAMP.into(), timestamp),
            (HEADER_PASSPHRASE.into(), credentials.passphrase.clone()),
        ])
    }

    /// List markets that have a Yes/No token pair.
    pub async fn markets(&self, active_only: bool) -> Result<Vec<MarketInfo>> {
        let mut url = self.endpoint("/markets")?;
        if active_only {
            url.query_pairs_mut().append_pair("active", "true");
        }

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Venue(format!(
                "market list failed: HTTP {}",
                response.status()
            )));
        }

        let dtos: Vec<MarketDto> = response.json().await?;
        let markets: Vec<MarketInfo> = dtos.into_iter().filter_map(MarketDto::into_info).collect();
        debug!(markets = markets.len(), "Fetched market list");
        Ok(markets)
    }

    /// One market's metadata, or `None` when unknown or not binary.
    pub async fn market(&self, market_id: &MarketId) -> Result<Option<MarketInfo>> {
        let url = self.endpoint(&format!("/markets/{market_id}"))?;
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Venue(format!(
                "market lookup failed: HTTP {}",
                response.status()
            )));
        }
        let dto: MarketDto = response.json().await?;
        Ok(dto.into_info())
    }

    /// Current book for one token.
    pub async fn book(&self, token_id: &TokenId, now: DateTime<Utc>) -> Result<Option<BookSnapshot>> {
        let mut url = self.endpoint("/book")?;
        url.query_pairs_mut()
            .append_pair("token_id", token_id.as_str());

        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Venue(format!(
                "book fetch failed: HTTP {}",
                response.status()
            )));
        }

        let dto: BookDto = response.json().await?;
        Ok(Some(BookSnapshot {
            market_id: None,
            token_id: token_id.clone(),
            bids: parse_rest_levels(&dto.bids),
            asks: parse_rest_levels(&dto.asks),
            timestamp: now,
            sequence: None,
        }))
    }

    /// Place an order; venue rejection comes back as a REJECTED order, not
    /// an error, so the execution engine can record it.
    pub async fn place_order(&self, request: &OrderRequest) -> Result<Order> {
        let path = "/order";
        let dto = PlaceOrderDto {
            token_id: request.token_id.as_str(),
            price: request.price.to_string(),
            size: request.size.to_string(),
            side: request.side.as_str(),
            order_type: request.order_type.as_str(),
        };
        let body = serde_json::to_string(&dto)?;
        let headers = self.signed_headers("POST", path, &body)?;

        let mut call = self
            .http
            .post(self.endpoint(path)?)
            .header("content-type", "application/json")
            .body(body);
        for (name, value) in headers {
            call = call.header(name, value);
        }

        let response = call.send().await?;
        let http_status = response.status();
        let placed: PlaceOrderResponse = response.json().await?;
        let now = self.clock.now();

        if !http_status.is_success() || !placed.success {
            warn!(
                status = %http_status,
                error = placed.error_msg.as_deref().unwrap_or("unknown"),
                "Order placement rejected"
            );
            // The venue assigns no id to a rejected placement; synthesize
            // one so the ledger row is still unique.
            let id = placed.order_id.map_or_else(
                || OrderId::new(format!("rejected-{}", uuid::Uuid::new_v4())),
                OrderId::new,
            );
            return Ok(Order::from_request(id, request, OrderStatus::Rejected, now));
        }

        let order_id = placed
            .order_id
            .ok_or_else(|| Error::Venue("placement response missing order id".into()))?;
        let status = placed
            .status
            .as_deref()
            .map_or(OrderStatus::Pending, parse_order_status);

        Ok(Order::from_request(
            OrderId::new(order_id),
            request,
            status,
            now,
        ))
    }

    /// Cancel an order. True when the venue accepted the cancel.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<bool> {
        let path = "/order";
        let body = serde_json::json!({ "orderID": order_id.as_str() }).to_string();
        let headers = self.signed_headers("DELETE", path, &body)?;

        let mut call = self
            .http
            .delete(self.endpoint(path)?)
            .header("content-type", "application/json")
            .body(body);
        for (name, value) in headers {
            call = call.header(name, value);
        }

        let response = call.send().await?;
        Ok(response.status().is_success())
    }

    /// Current state of an order, reconstructed into the domain type.
    pub async fn order_status(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let path = format!("/data/order/{order_id}");
        let headers = self.signed_headers("GET", &path, "")?;

        let mut call = self.http.get(self.endpoint(&path)?);
        for (name, value) in headers {
            call = call.header(name, value);
        }

        let response = call.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Venue(format!(
                "order status failed: HTTP {}",
                response.status()
            )));
        }

        let dto: OrderStatusDto = response.json().await?;
        Ok(Some(self.order_from_status(order_id, &dto)))
    }

    fn order_from_status(&self, order_id: &OrderId, dto: &OrderStatusDto) -> Order {
        let price: Decimal = dto
            .price
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        let size: Decimal = dto
            .original_size
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        let matched: Decimal = dto
            .size_matched
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();

        let mut status = dto
            .status
            .as_deref()
            .map_or(OrderStatus::Open, parse_order_status);
        if status == OrderStatus::Open && matched > Decimal::ZERO && matched < size {
            status = OrderStatus::PartiallyFilled;
        }

        let now = self.clock.now();
        Order {
            id: order_id.clone(),
            market_id: MarketId::new(dto.market.clone().unwrap_or_default()),
            token_id: TokenId::new(dto.asset_id.clone().unwrap_or_default()),
            side: crate::domain::OrderSide::Buy,
            order_type: crate::domain::OrderType::Limit,
            price,
            size,
            status,
            filled_size: matched,
            avg_fill_price: (matched > Decimal::ZERO).then_some(price),
            fee: matched * price * self.fee_rate,
            created_at: now,
            updated_at: now,
        }
    }
}

fn parse_rest_levels(levels: &[RestLevelDto]) -> Vec<BookLevel> {
    levels
        .iter()
        .filter_map(|level| {
            Some(BookLevel::new(
                level.price.parse().ok()?,
                level.size.parse().ok()?,
            ))
        })
        .collect()
}

fn parse_order_status(raw: &str) -> OrderStatus {
    match raw.to_ascii_lowercase().as_str() {
        "live" | "open" => OrderStatus::Open,
        "matched" | "filled" => OrderStatus::Filled,
        "delayed" | "pending" => OrderStatus::Pending,
        "canceled" | "cancelled" => OrderStatus::Cancelled,
        "rejected" | "unmatched" => OrderStatus::Rejected,
        "expired" => OrderStatus::Expired,
        other => {
            warn!(status = other, "Unknown order status from venue");
            OrderStatus::Open
        }
    }
}
