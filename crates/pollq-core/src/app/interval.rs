//! IntervalTask - run an async closure on a fixed cadence.

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;

use super::runner::{BackgroundRunner, BackgroundWork};
use crate::config::RunnerConfig;
use crate::error::Result;

/// Named closure adapted to `BackgroundWork`.
pub struct FnWork<F, Fut> {
    name: String,
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnWork<F, Fut> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> BackgroundWork for FnWork<F, Fut>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_once(&self) -> Result<()> {
        (self.f)().await
    }
}

/// A periodic background job with the same cadence and backoff rules as a
/// queue processor.
pub type IntervalTask<F, Fut> = BackgroundRunner<FnWork<F, Fut>>;

/// Build an `IntervalTask` running `f` every `interval`.
///
/// ```ignore
/// let task = interval_task("purge", Duration::from_secs(60), move || {
///     let store = Arc::clone(&store);
///     async move { purge(&store).await }
/// });
/// task.start();
/// ```
pub fn interval_task<F, Fut>(name: impl Into<String>, interval: Duration, f: F) -> IntervalTask<F, Fut>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    BackgroundRunner::new(FnWork::new(name, f), RunnerConfig::with_interval(interval))
}
