// src/bidding/exchange_client.rs

use std::time::Instant;

use futures::future::join_all;
use reqwest::Client;
use thiserror::Error;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::bidder::model::{BidderCall, HttpRequest, HttpResponse};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Timeout calling {0}")]
    Timeout(String),
    #[error("Request to {uri} failed: {reason}")]
    Request { uri: String, reason: String },
}

/// 把适配器产出的请求描述真正发出去
#[derive(Clone)]
pub struct ExchangeClient {
    client: Client,
    default_timeout: Duration,
}

impl ExchangeClient {
    pub fn new(default_timeout_ms: u64) -> Self {
        Self {
            client: Client::new(),
            default_timeout: Duration::from_millis(default_timeout_ms),
        }
    }

    /// 并发发送全部请求，结果顺序与入参一致
    /// `tmax` 存在时作为每个请求的超时
    pub async fn send_all(
        &self,
        requests: Vec<HttpRequest>,
        tmax: Option<u64>,
    ) -> Vec<Result<BidderCall, TransportError>> {
        let timeout_duration = tmax.map(Duration::from_millis).unwrap_or(self.default_timeout);

        let tasks: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let client = self.client.clone();
                tokio::spawn(async move { Self::send(client, request, timeout_duration).await })
            })
            .collect();

        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    Err(TransportError::Request {
                        uri: String::new(),
                        reason: e.to_string(),
                    })
                })
            })
            .collect()
    }

    async fn send(
        client: Client,
        request: HttpRequest,
        timeout_duration: Duration,
    ) -> Result<BidderCall, TransportError> {
        let start = Instant::now();
        let uri = request.uri.clone();
        let request_error = |e: reqwest::Error| TransportError::Request {
            uri: uri.clone(),
            reason: e.to_string(),
        };

        let exchange = async {
            let resp = client
                .request(request.method.clone(), &request.uri)
                .headers(request.headers.clone())
                .body(request.body.clone())
                .send()
                .await
                .map_err(request_error)?;
            let status_code = resp.status().as_u16();
            let headers = resp.headers().clone();
            let body = resp.text().await.map_err(request_error)?;
            Ok::<_, TransportError>(HttpResponse {
                status_code,
                headers,
                body,
            })
        };

        let response = match timeout(timeout_duration, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Exchange call to {} timed out after {:?}", uri, timeout_duration);
                return Err(TransportError::Timeout(uri));
            }
        };

        debug!(
            "Exchange call to {} returned {} in {} ms",
            uri,
            response.status_code,
            start.elapsed().as_millis()
        );

        Ok(BidderCall { request, response })
    }
}
