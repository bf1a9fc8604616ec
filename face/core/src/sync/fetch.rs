//! Background icon fetch: resolve, decode off the async threads, publish.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::SyncRequest;
use crate::error::SyncError;
use crate::host::{AssetResolver, IconDecoder, RedrawSink};
use crate::presentation::{IconImage, PresentationStore};

/// Everything one fetch needs, detached from the pipeline
pub(crate) struct FetchContext {
    pub(crate) store: PresentationStore,
    pub(crate) redraw: Arc<dyn RedrawSink>,
    pub(crate) resolver: Arc<dyn AssetResolver>,
    pub(crate) decoder: Arc<dyn IconDecoder>,
    pub(crate) timeout: Duration,
    pub(crate) icon_size: u32,
    pub(crate) discard_stale: bool,
    pub(crate) in_flight: Arc<AtomicUsize>,
}

impl FetchContext {
    /// Count this fetch as in flight; returns the new count
    pub(crate) fn begin(&self) -> usize {
        self.in_flight.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Decrements the in-flight count however the fetch ends
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Run one fetch to completion
///
/// On failure the previous icon stays in place and no redraw is requested.
pub(crate) async fn run(ctx: FetchContext, request: SyncRequest) -> Result<bool, SyncError> {
    let _in_flight = InFlight(Arc::clone(&ctx.in_flight));

    match fetch_icon(&ctx, &request).await {
        Ok(icon) => {
            let applied = ctx.store.replace_icon(icon, request.id, ctx.discard_stale);
            if applied {
                ctx.redraw.request_redraw();
                tracing::info!(request_id = request.id, asset = %request.asset, "Weather icon updated");
            } else {
                tracing::debug!(
                    request_id = request.id,
                    asset = %request.asset,
                    "Discarding icon older than the one on screen"
                );
            }
            Ok(applied)
        }
        Err(e) => {
            tracing::warn!(
                request_id = request.id,
                asset = %request.asset,
                kind = e.kind(),
                error = %e,
                "Icon fetch failed, keeping previous icon"
            );
            Err(e)
        }
    }
}

async fn fetch_icon(ctx: &FetchContext, request: &SyncRequest) -> Result<IconImage, SyncError> {
    let bytes = tokio::time::timeout(ctx.timeout, ctx.resolver.resolve(&request.asset))
        .await
        .map_err(|_| {
            SyncError::transport(
                &request.asset,
                format!("timed out after {}ms", ctx.timeout.as_millis()),
            )
        })??;

    if bytes.is_empty() {
        return Err(SyncError::DecodeFailure(format!(
            "asset {} is empty",
            request.asset
        )));
    }

    let decoder = Arc::clone(&ctx.decoder);
    let size = ctx.icon_size;
    tokio::task::spawn_blocking(move || decoder.decode_and_scale(&bytes, size))
        .await
        .map_err(|e| SyncError::DecodeFailure(format!("decoder task failed: {e}")))?
}
