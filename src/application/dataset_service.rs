// Dataset service - loads, normalises and caches the dataset for the process lifetime
use crate::application::dataset_source::DatasetSource;
use crate::application::normalizer::normalize;
use crate::domain::reading::Dataset;
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Clone)]
pub struct DatasetService {
    source: Arc<dyn DatasetSource>,
    cache: Arc<OnceCell<Arc<Dataset>>>,
}

impl DatasetService {
    pub fn new(source: Arc<dyn DatasetSource>) -> Self {
        Self {
            source,
            cache: Arc::new(OnceCell::new()),
        }
    }

    pub fn source_name(&self) -> String {
        self.source.describe()
    }

    /// The normalised dataset. Loaded on first call; never invalidated.
    pub async fn dataset(&self) -> anyhow::Result<Arc<Dataset>> {
        let dataset = self
            .cache
            .get_or_try_init(|| async {
                let raw = self.source.load_raw().await?;
                let dataset = normalize(&raw)
                    .with_context(|| format!("Failed to normalise {}", self.source.describe()))?;
                tracing::info!(
                    "Dataset ready: {} readings, {} metric types, {} devices",
                    dataset.len(),
                    dataset.metric_domain().len(),
                    dataset.device_count()
                );
                Ok::<_, anyhow::Error>(Arc::new(dataset))
            })
            .await?;

        Ok(dataset.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::raw_table::RawTable;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        loads: AtomicUsize,
        records: serde_json::Value,
    }

    #[async_trait]
    impl DatasetSource for CountingSource {
        fn describe(&self) -> String {
            "memory".to_string()
        }

        async fn load_raw(&self) -> anyhow::Result<RawTable> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let records = self
                .records
                .as_array()
                .unwrap()
                .iter()
                .map(|r| r.as_object().cloned().unwrap())
                .collect();
            Ok(RawTable::from_records(records))
        }
    }

    #[tokio::test]
    async fn test_dataset_is_loaded_once() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            records: json!([{"dt": "current", "ref_d": "a", "v": 1.0}]),
        });
        let service = DatasetService::new(source.clone());

        let first = service.dataset().await.unwrap();
        let second = service.dataset().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_field_fails_with_context() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            records: json!([{"dt": "current", "ref_d": "a"}]),
        });
        let service = DatasetService::new(source);

        let err = service.dataset().await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to normalise memory"));
        assert!(message.contains("scaled_value"));
    }
}
