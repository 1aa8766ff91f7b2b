//! Single-assignment completion handles for non-blocking store calls.
//!
//! A non-blocking call takes an [`ActionListener`]: a value with a success
//! callback and a failure callback. Both callbacks consume the listener, so at
//! most one of them can ever run. [`deferred`] pairs a [`Completer`] (the
//! listener half) with a [`Deferred`] (the awaitable half). If the completer is
//! dropped without firing, the handle resolves to [`StoreError::Abandoned`].

use std::{
    future::Future,
    marker::PhantomData,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::oneshot;

use crate::store::StoreError;

/// Completion callbacks for a non-blocking store call.
pub(crate) trait ActionListener<T>: Send + 'static {
    fn on_response(self, response: T);
    fn on_failure(self, error: StoreError);
}

/// Delivers `result` to whichever callback matches it.
pub(crate) fn notify<T, L>(listener: L, result: Result<T, StoreError>)
where
    L: ActionListener<T>,
{
    match result {
        Ok(response) => listener.on_response(response),
        Err(error) => listener.on_failure(error),
    }
}

pub(crate) fn deferred<T>() -> (Completer<T>, Deferred<T>) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, Deferred { rx })
}

/// Write half of a deferred handle.
#[derive(Debug)]
pub(crate) struct Completer<T> {
    tx: oneshot::Sender<Result<T, StoreError>>,
}

impl<T> Completer<T> {
    pub fn resolve(self, value: T) {
        // A receiver that went away has nobody left to observe the outcome.
        let _ = self.tx.send(Ok(value));
    }

    pub fn reject(self, error: StoreError) {
        let _ = self.tx.send(Err(error));
    }

    /// Adapts this completer into a listener for a different response type,
    /// transforming successful responses with `f` before resolving.
    pub fn map<S, F>(self, f: F) -> Mapped<S, T, F>
    where
        F: FnOnce(S) -> T,
    {
        Mapped {
            completer: self,
            f,
            _response: PhantomData,
        }
    }
}

impl<T: Send + 'static> ActionListener<T> for Completer<T> {
    fn on_response(self, response: T) {
        self.resolve(response);
    }

    fn on_failure(self, error: StoreError) {
        self.reject(error);
    }
}

pub(crate) struct Mapped<S, T, F> {
    completer: Completer<T>,
    f: F,
    _response: PhantomData<fn(S)>,
}

impl<S, T, F> ActionListener<S> for Mapped<S, T, F>
where
    S: 'static,
    T: Send + 'static,
    F: FnOnce(S) -> T + Send + 'static,
{
    fn on_response(self, response: S) {
        self.completer.resolve((self.f)(response));
    }

    fn on_failure(self, error: StoreError) {
        self.completer.reject(error);
    }
}

/// Read half of a deferred handle. Resolves once, with whatever the
/// completer stored, even if the completer fired before the first poll.
#[derive(Debug)]
pub(crate) struct Deferred<T> {
    rx: oneshot::Receiver<Result<T, StoreError>>,
}

impl<T> Future for Deferred<T> {
    type Output = Result<T, StoreError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(StoreError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves_with_value() {
        let (completer, handle) = deferred::<String>();
        completer.resolve("done".to_string());
        assert_eq!(handle.await.unwrap(), "done");
    }

    #[tokio::test]
    async fn rejects_with_error() {
        let (completer, handle) = deferred::<String>();
        completer.reject(StoreError::Timeout);
        assert!(matches!(handle.await, Err(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn dropped_completer_is_abandoned() {
        let (completer, handle) = deferred::<u32>();
        drop(completer);
        assert!(matches!(handle.await, Err(StoreError::Abandoned)));
    }

    #[tokio::test]
    async fn outcome_survives_until_awaited() {
        let (completer, handle) = deferred::<u32>();
        let fired = tokio::spawn(async move { completer.on_response(7) });
        fired.await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn completion_from_another_task_wakes_waiter() {
        let (completer, handle) = deferred::<u32>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            notify(completer, Ok(42));
        });
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn mapped_listener_transforms_success_only() {
        let (completer, handle) = deferred::<String>();
        notify(completer.map(|items: Vec<u32>| format!("{items:?}")), Ok(vec![1, 2]));
        assert_eq!(handle.await.unwrap(), "[1, 2]");

        let (completer, handle) = deferred::<String>();
        notify(
            completer.map(|items: Vec<u32>| format!("{items:?}")),
            Err(StoreError::Transport("refused".to_string())),
        );
        assert!(matches!(handle.await, Err(StoreError::Transport(_))));
    }
}
