//! Operation dispatch.
//!
//! # Data Flow
//! ```text
//! invoke(name, params)
//!     → request id + scoped RequestContext entry
//!     → Operation::from_name (unknown → INVALID_PARAMETERS)
//!     → Schema::validate (every failure aggregated)
//!     → handlers::handle (panics caught)
//!     → ErrorNormalizer (failures only, exactly once)
//!     → ResponseEnvelope
//! ```

pub mod handlers;
pub mod operation;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::response::{IntoResponse, Response};
use futures_util::stream::{BoxStream, StreamExt};
use futures_util::FutureExt;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::blockchain::chain::ChainClient;
use crate::blockchain::contract::ContractRegistry;
use crate::blockchain::history::{resolve_range, stream_history};
use crate::blockchain::wallet::WalletStore;
use crate::config::schema::GatewayConfig;
use crate::context::RequestContext;
use crate::envelope::{ResponseEnvelope, StreamFormatter};
use crate::errors::api::ApiError;
use crate::errors::failure::{Failure, HandlerResult};
use crate::errors::normalizer::ErrorNormalizer;
use crate::observability::metrics;

pub use operation::Operation;

/// Limits handlers apply on top of validation.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub max_history_range: u64,
    /// Upper bound on a client-requested stream `batchSize`.
    pub max_stream_batch: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&GatewayConfig::default())
    }
}

impl From<&GatewayConfig> for Limits {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            receipt_timeout: Duration::from_secs(config.blockchain.receipt_timeout_secs),
            receipt_poll_interval: Duration::from_millis(config.blockchain.receipt_poll_interval_ms),
            max_history_range: config.blockchain.max_history_range,
            max_stream_batch: config.response.max_stream_batch_size,
        }
    }
}

/// Everything a handler may touch.
#[derive(Clone)]
pub struct Services {
    pub chain: Arc<dyn ChainClient>,
    pub wallets: WalletStore,
    pub contracts: ContractRegistry,
    pub limits: Limits,
}

impl Services {
    pub fn new(chain: Arc<dyn ChainClient>, limits: Limits) -> Self {
        Self {
            chain,
            wallets: WalletStore::new(),
            contracts: ContractRegistry::new(),
            limits,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }
}

/// The request a handler is serving. Notes land in the request context so
/// the normalizer can fill error details.
#[derive(Debug, Clone)]
pub struct Call {
    request_id: Uuid,
    context: RequestContext,
}

impl Call {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn note(&self, key: &str, value: impl Into<Value>) {
        self.context.note(self.request_id, key, value.into());
    }
}

/// A validated history stream ready to be framed.
pub struct HistoryStream {
    pub formatter: StreamFormatter,
    pub items: BoxStream<'static, Result<Value, ApiError>>,
}

impl HistoryStream {
    pub fn frames(self) -> BoxStream<'static, Value> {
        self.formatter.frames(self.items)
    }
}

impl IntoResponse for HistoryStream {
    fn into_response(self) -> Response {
        self.formatter.into_response(self.items)
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    services: Services,
    normalizer: ErrorNormalizer,
    pretty: bool,
}

impl Dispatcher {
    /// `debug` adds exception details to internal errors.
    pub fn new(services: Services, debug: bool) -> Self {
        Self {
            services,
            normalizer: ErrorNormalizer::new(debug, RequestContext::new()),
            pretty: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn context(&self) -> &RequestContext {
        self.normalizer.context()
    }

    pub fn chain_id(&self) -> u64 {
        self.services.chain_id()
    }

    /// Run one operation. Always produces an envelope.
    pub async fn invoke(&self, method: &str, params: Value) -> ResponseEnvelope {
        self.invoke_as(Uuid::new_v4(), method, params).await
    }

    /// [`Dispatcher::invoke`] under a caller-chosen request id, so logs
    /// written before dispatch share it. The id keys the request context and
    /// must be fresh for every call.
    pub async fn invoke_as(&self, request_id: Uuid, method: &str, params: Value) -> ResponseEnvelope {
        let started = Instant::now();
        let label = Operation::from_name(method).map_or("unknown", |op| op.name());

        let outcome = self.run(method, params, request_id).await;
        let envelope = match &outcome {
            Ok(result) => {
                ResponseEnvelope::success(result.clone(), request_id, self.chain_id(), started)
            }
            Err(e) => ResponseEnvelope::error(e, request_id, self.chain_id(), started),
        };
        let status = if outcome.is_ok() { "success" } else { "error" };
        metrics::record_request(label, status, started);
        tracing::debug!(
            request_id = %request_id,
            method = %method,
            status,
            processing_time = %envelope.metadata().processing_time,
            "Operation finished"
        );
        envelope.pretty(self.pretty)
    }

    async fn run(&self, method: &str, params: Value, request_id: Uuid) -> Result<Value, ApiError> {
        let mut fields = Map::new();
        fields.insert("method".to_string(), json!(method));
        let _guard = self.context().scope(request_id, fields);

        let call = Call {
            request_id,
            context: self.context().clone(),
        };
        let handled = AssertUnwindSafe(self.prepare_and_handle(method, &params, &call))
            .catch_unwind()
            .await;

        let failure = match handled {
            Ok(Ok(result)) => return Ok(result),
            Ok(Err(failure)) => failure,
            Err(panic) => Failure::from_panic(panic),
        };
        Err(self.normalizer.normalize(failure, Some(request_id)))
    }

    async fn prepare_and_handle(&self, method: &str, params: &Value, call: &Call) -> HandlerResult<Value> {
        let op = Operation::from_name(method).ok_or_else(|| ApiError::unsupported_method(method))?;
        let validated = op.schema().validate(params)?;
        handlers::handle(op, &self.services, call, validated).await
    }

    /// Error envelope for a failure raised before dispatch, such as an
    /// unreadable request body.
    pub fn reject(&self, failure: impl Into<Failure>) -> ResponseEnvelope {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let err = self.normalizer.normalize(failure.into(), Some(request_id));
        ResponseEnvelope::error(&err, request_id, self.chain_id(), started).pretty(self.pretty)
    }

    /// Validate a streaming history request. Only `eth_getTransactionHistory`
    /// streams; anything else, bad parameters, or a `batch_size` outside
    /// `1..=max_stream_batch` yields an error envelope.
    pub async fn open_stream(
        &self,
        method: &str,
        params: Value,
        batch_size: usize,
    ) -> Result<HistoryStream, ResponseEnvelope> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let _guard = self.context().scope(request_id, Map::new());

        let prepared = async {
            if Operation::from_name(method) != Some(Operation::GetTransactionHistory) {
                return Err(Failure::from(ApiError::unsupported_method(method)));
            }
            let max_batch = self.services.limits.max_stream_batch;
            if batch_size == 0 || batch_size > max_batch {
                return Err(Failure::from(ApiError::invalid_parameters(
                    "batchSize",
                    &format!("batchSize must be between 1 and {}, got {}", max_batch, batch_size),
                )));
            }
            let validated = Operation::GetTransactionHistory.schema().validate(&params)?;
            let address = validated
                .address("address")
                .ok_or_else(|| crate::validation::schema::missing("address"))?;
            let range = resolve_range(
                self.services.chain.as_ref(),
                validated.u64("startBlock"),
                validated.u64("endBlock"),
                self.services.limits.max_history_range,
            )
            .await?;
            Ok((address, range))
        }
        .await;

        let (address, range) = match prepared {
            Ok(ok) => ok,
            Err(failure) => {
                let err = self.normalizer.normalize(failure, Some(request_id));
                metrics::record_request(Operation::GetTransactionHistory.name(), "error", started);
                return Err(ResponseEnvelope::error(&err, request_id, self.chain_id(), started)
                    .pretty(self.pretty));
            }
        };

        tracing::info!(
            request_id = %request_id,
            address = %address,
            start = range.start,
            end = range.end,
            "Streaming transaction history"
        );
        metrics::record_request(Operation::GetTransactionHistory.name(), "success", started);

        let normalizer = self.normalizer.clone();
        let items = stream_history(self.services.chain.clone(), address, range)
            .map(move |item| match item {
                Ok(tx) => Ok(json!(tx)),
                Err(e) => Err(normalizer.normalize(e.into(), Some(request_id))),
            })
            .boxed();

        Ok(HistoryStream {
            formatter: StreamFormatter::new(request_id, self.chain_id(), "transactions", batch_size),
            items,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("chain_id", &self.chain_id())
            .field("debug", &self.normalizer.debug())
            .finish()
    }
}
