//! Foundation catalog — a single load on start-up, published as a
//! `loading` / `ready` / `failed` tri-state.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::errors::Result;
use crate::types::{Foundation, MinLatency};

/// Anything that can list donatable foundations.
pub trait CatalogSource: Send + Sync {
    fn fetch_foundations(&self) -> impl Future<Output = Result<Vec<Foundation>>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "foundations", rename_all = "snake_case")]
pub enum CatalogState {
    Loading,
    Ready(Vec<Foundation>),
    /// Terminal for this activation; the error detail is only logged.
    Failed,
}

impl CatalogState {
    /// Look up a foundation by id. Only a ready catalog has entries.
    pub fn find(&self, id: &str) -> Option<&Foundation> {
        match self {
            Self::Ready(list) => list.iter().find(|f| f.id == id),
            Self::Loading | Self::Failed => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Failed => "failed",
        }
    }
}

pub type SharedCatalog = Arc<RwLock<CatalogState>>;

/// Fetch the catalog once, honouring the minimum loading time.
pub async fn load<S: CatalogSource>(source: &S, min_latency: MinLatency) -> CatalogState {
    match min_latency.hold(source.fetch_foundations()).await {
        Ok(list) => {
            info!("Catalog ready with {} foundations", list.len());
            CatalogState::Ready(list)
        }
        Err(e) => {
            error!("Catalog load failed: {e}");
            CatalogState::Failed
        }
    }
}

/// Background task: load once and publish the outcome. No retry.
pub async fn run<S: CatalogSource>(source: S, min_latency: MinLatency, catalog: SharedCatalog) {
    info!("Catalog loader starting");
    let state = load(&source, min_latency).await;
    *catalog.write().await = state;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::errors::DonationError;

    fn foundation(id: &str) -> Foundation {
        Foundation {
            id: id.to_string(),
            name: format!("Foundation {id}"),
            image: format!("{id}.jpg"),
            currency: "THB".to_string(),
        }
    }

    struct FakeSource {
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: Arc::default(),
            }
        }
    }

    impl CatalogSource for FakeSource {
        async fn fetch_foundations(&self) -> Result<Vec<Foundation>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DonationError::Provider("503".to_string()))
            } else {
                Ok(vec![foundation("1"), foundation("2")])
            }
        }
    }

    #[tokio::test]
    async fn successful_load_is_ready() {
        let state = load(&FakeSource::new(false), MinLatency::default()).await;
        assert_eq!(state, CatalogState::Ready(vec![foundation("1"), foundation("2")]));
        assert_eq!(state.find("2"), Some(&foundation("2")));
        assert_eq!(state.find("9"), None);
        assert!(state.is_ready());
        assert_eq!(CatalogState::Failed.name(), "failed");
    }

    #[tokio::test]
    async fn failed_load_is_terminal_and_not_retried() {
        let source = FakeSource::new(true);
        let calls = Arc::clone(&source.calls);
        let catalog: SharedCatalog = Arc::new(RwLock::new(CatalogState::Loading));

        run(source, MinLatency::default(), catalog.clone()).await;
        assert_eq!(*catalog.read().await, CatalogState::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stays_loading_for_the_minimum_delay() {
        let catalog: SharedCatalog = Arc::new(RwLock::new(CatalogState::Loading));
        let task = tokio::spawn(run(
            FakeSource::new(false),
            MinLatency(Duration::from_millis(2_000)),
            catalog.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(*catalog.read().await, CatalogState::Loading);

        task.await.unwrap();
        assert!(matches!(*catalog.read().await, CatalogState::Ready(_)));
    }

    #[test]
    fn serializes_as_tagged_tri_state() {
        assert_eq!(
            serde_json::to_value(CatalogState::Loading).unwrap(),
            serde_json::json!({ "status": "loading" })
        );
        assert_eq!(
            serde_json::to_value(CatalogState::Failed).unwrap(),
            serde_json::json!({ "status": "failed" })
        );
        let ready = serde_json::to_value(CatalogState::Ready(vec![foundation("1")])).unwrap();
        assert_eq!(ready["status"], "ready");
        assert_eq!(ready["foundations"][0]["id"], "1");
    }
}
