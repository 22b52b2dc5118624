//! Newline-delimited JSON streaming for large results.
//!
//! Frame sequence:
//! ```text
//! {"metadata": {..., "stream_start": true}}
//! {"data": [...], "chunk_metadata": {"chunk_size": n, "total_items": t}}   (repeated)
//! {"error": {...}}                                                         (producer failure only)
//! {"metadata": {"stream_end": true, "total_items": t, ...}}
//! ```

use std::convert::Infallible;
use std::pin::Pin;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::envelope::{format_processing_time, X_CHAIN_ID, X_REQUEST_ID};
use crate::errors::api::ApiError;

pub const NDJSON: &str = "application/x-ndjson";
pub const X_STREAM_FORMAT: &str = "x-stream-format";

/// Chunk buffers grow past this on demand instead of reserving up front.
const PREALLOCATE_LIMIT: usize = 1024;

/// Turns a producer of items into framed NDJSON.
#[derive(Debug, Clone)]
pub struct StreamFormatter {
    request_id: Uuid,
    chain_id: u64,
    stream_type: String,
    batch_size: usize,
}

enum Phase {
    Start,
    Running,
    Failed(ApiError),
    End,
    Done,
}

struct State {
    items: Pin<Box<dyn Stream<Item = Result<Value, ApiError>> + Send>>,
    phase: Phase,
    total: usize,
    started: Instant,
    formatter: StreamFormatter,
}

impl StreamFormatter {
    pub fn new(request_id: Uuid, chain_id: u64, stream_type: impl Into<String>, batch_size: usize) -> Self {
        Self {
            request_id,
            chain_id,
            stream_type: stream_type.into(),
            batch_size: batch_size.max(1),
        }
    }

    fn start_frame(&self) -> Value {
        json!({
            "metadata": {
                "timestamp": Utc::now().to_rfc3339(),
                "request_id": self.request_id,
                "chain_id": self.chain_id,
                "stream_type": self.stream_type,
                "stream_start": true,
            }
        })
    }

    fn end_frame(&self, total: usize, started: Instant) -> Value {
        json!({
            "metadata": {
                "stream_end": true,
                "total_items": total,
                "timestamp": Utc::now().to_rfc3339(),
                "processing_time": format_processing_time(started.elapsed()),
            }
        })
    }

    /// Frames for `items`. Items are pulled lazily, one batch at a time.
    pub fn frames<S>(self, items: S) -> BoxStream<'static, Value>
    where
        S: Stream<Item = Result<Value, ApiError>> + Send + 'static,
    {
        let state = State {
            items: Box::pin(items),
            phase: Phase::Start,
            total: 0,
            started: Instant::now(),
            formatter: self,
        };

        stream::unfold(state, |mut st| async move {
            loop {
                match std::mem::replace(&mut st.phase, Phase::Done) {
                    Phase::Start => {
                        st.phase = Phase::Running;
                        return Some((st.formatter.start_frame(), st));
                    }
                    Phase::Running => {
                        let capacity = st.formatter.batch_size.min(PREALLOCATE_LIMIT);
                        let mut batch = Vec::with_capacity(capacity);
                        st.phase = Phase::Running;
                        while batch.len() < st.formatter.batch_size {
                            match st.items.next().await {
                                Some(Ok(item)) => batch.push(item),
                                Some(Err(e)) => {
                                    st.phase = Phase::Failed(e);
                                    break;
                                }
                                None => {
                                    st.phase = Phase::End;
                                    break;
                                }
                            }
                        }
                        if !batch.is_empty() {
                            st.total += batch.len();
                            let frame = json!({
                                "data": batch,
                                "chunk_metadata": {
                                    "chunk_size": batch.len(),
                                    "total_items": st.total,
                                }
                            });
                            return Some((frame, st));
                        }
                    }
                    Phase::Failed(e) => {
                        tracing::warn!(
                            request_id = %st.formatter.request_id,
                            code = %e.kind(),
                            "Stream producer failed"
                        );
                        st.phase = Phase::End;
                        return Some((json!({ "error": e.to_body() }), st));
                    }
                    Phase::End => {
                        st.phase = Phase::Done;
                        let frame = st.formatter.end_frame(st.total, st.started);
                        return Some((frame, st));
                    }
                    Phase::Done => return None,
                }
            }
        })
        .boxed()
    }

    /// NDJSON HTTP response with stream headers.
    pub fn into_response<S>(self, items: S) -> Response
    where
        S: Stream<Item = Result<Value, ApiError>> + Send + 'static,
    {
        let request_id = self.request_id;
        let chain_id = self.chain_id;
        let lines = self.frames(items).map(|frame| {
            let mut line = frame.to_string();
            line.push('\n');
            Ok::<_, Infallible>(Bytes::from(line))
        });

        let mut response = (StatusCode::OK, Body::from_stream(lines)).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(NDJSON));
        headers.insert(X_STREAM_FORMAT, HeaderValue::from_static("jsonlines"));
        if let Ok(v) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert(X_REQUEST_ID, v);
        }
        if let Ok(v) = HeaderValue::from_str(&chain_id.to_string()) {
            headers.insert(X_CHAIN_ID, v);
        }
        response
    }
}
