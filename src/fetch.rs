//! Data fetch/refresh hook - loading state and manual refetch around any
//! zero-argument async fetch.
//!
//! Every fetch is stamped with a sequence number when issued. Only the
//! result of the most recently issued fetch is applied, so a slow early
//! request can never overwrite a newer one. Failures are logged and leave
//! the previous data in place.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::RemoteError;

type FetchFn<T> = dyn Fn() -> BoxFuture<'static, Result<T, RemoteError>> + Send + Sync;

/// Snapshot of a hook
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: T,
    pub loading: bool,
    /// Message of the latest failure, cleared by the next success
    pub error: Option<String>,
    issued: u64,
}

struct Inner<T> {
    fetch: Box<FetchFn<T>>,
    state: watch::Sender<FetchState<T>>,
    activated: AtomicBool,
}

pub struct FetchHook<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for FetchHook<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> FetchHook<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Hook starting from `T::default()` (an empty list for list screens)
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        T: Default,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RemoteError>> + Send + 'static,
    {
        Self::with_initial(T::default(), fetch)
    }

    pub fn with_initial<F, Fut>(initial: T, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RemoteError>> + Send + 'static,
    {
        let (state, _) = watch::channel(FetchState {
            data: initial,
            loading: false,
            error: None,
            issued: 0,
        });
        Self {
            inner: Arc::new(Inner {
                fetch: Box::new(move || fetch().boxed()),
                state,
                activated: AtomicBool::new(false),
            }),
        }
    }

    /// First activation: fetch once. Later calls do nothing.
    pub async fn initialize(&self) {
        if self.inner.activated.swap(true, Ordering::SeqCst) {
            return;
        }
        self.refetch().await;
    }

    /// Fetch again; the result is applied unless a newer fetch was issued meanwhile.
    pub async fn refetch(&self) {
        let mut ticket = 0;
        self.inner.state.send_modify(|state| {
            state.issued += 1;
            state.loading = true;
            ticket = state.issued;
        });

        let result = (self.inner.fetch)().await;

        self.inner.state.send_modify(|state| {
            if state.issued != ticket {
                debug!(ticket, latest = state.issued, "Dropping stale fetch result");
                return;
            }
            match result {
                Ok(data) => {
                    state.data = data;
                    state.error = None;
                }
                Err(e) => {
                    warn!(error = %e, "Fetch failed, keeping previous data");
                    state.error = Some(e.to_string());
                }
            }
            state.loading = false;
        });
    }

    /// Run [`initialize`](Self::initialize) on the runtime without waiting
    pub fn spawn_initialize(&self) -> JoinHandle<()> {
        let hook = self.clone();
        tokio::spawn(async move { hook.initialize().await })
    }

    /// Run [`refetch`](Self::refetch) on the runtime without waiting
    pub fn spawn_refetch(&self) -> JoinHandle<()> {
        let hook = self.clone();
        tokio::spawn(async move { hook.refetch().await })
    }

    pub fn data(&self) -> T {
        self.inner.state.borrow().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn snapshot(&self) -> FetchState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.inner.state.subscribe()
    }
}
