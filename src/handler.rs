//! The application dispatch callback.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

/// Receives every message the pump reads off the transport, in order.
///
/// A handler's `handle` call blocks the reader task until it returns, so a
/// handler that does real work should decorate itself with
/// [`ParallelHandler`](crate::worker::ParallelHandler) rather than `.await`
/// long operations directly. `cancel` is the pump's own shutdown token, so
/// a handler (or a decorator wrapping one) can check it before taking on
/// new work it would only have to abandon.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, cancel: &CancellationToken, msg: Bytes);
}

/// Adapts a plain async closure into a [`Handler`].
pub struct HandlerFn<F>(pub F);

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(CancellationToken, Bytes) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ()> + Send,
{
    async fn handle(&self, cancel: &CancellationToken, msg: Bytes) {
        (self.0)(cancel.clone(), msg).await
    }
}
