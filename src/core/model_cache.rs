use crate::app::models::JsonArtifactDecoder;
use crate::core::registry::CategoryRegistry;
use crate::domain::model::ForecastModel;
use crate::domain::ports::{ModelDecoder, Storage};
use crate::utils::error::{ForecastError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

type ModelSlot = Arc<OnceCell<Arc<ForecastModel>>>;

/// 模型快取：每個類別的模型只讀取、解碼一次，之後回傳同一個 handle
///
/// 每個類別有自己的 `OnceCell`，同一類別的並行首次存取只會載入一次，
/// 不同類別之間互不阻塞。載入失敗不會被快取。
pub struct ModelCache<S: Storage, D: ModelDecoder = JsonArtifactDecoder> {
    storage: Arc<S>,
    decoder: D,
    registry: Arc<CategoryRegistry>,
    slots: Mutex<HashMap<String, ModelSlot>>,
}

impl<S: Storage> ModelCache<S, JsonArtifactDecoder> {
    pub fn new(storage: Arc<S>, registry: Arc<CategoryRegistry>) -> Self {
        Self::with_decoder(storage, registry, JsonArtifactDecoder)
    }
}

impl<S: Storage, D: ModelDecoder> ModelCache<S, D> {
    pub fn with_decoder(storage: Arc<S>, registry: Arc<CategoryRegistry>, decoder: D) -> Self {
        Self {
            storage,
            decoder,
            registry,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, category: &str) -> Result<Arc<ForecastModel>> {
        let model_ref = self.registry.binding(category)?.model_ref.clone();

        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(category.to_string()).or_default().clone()
        };

        slot.get_or_try_init(|| self.load(category, &model_ref))
            .await
            .cloned()
    }

    pub async fn is_cached(&self, category: &str) -> bool {
        self.slots
            .lock()
            .await
            .get(category)
            .is_some_and(|slot| slot.initialized())
    }

    async fn load(&self, category: &str, model_ref: &str) -> Result<Arc<ForecastModel>> {
        tracing::info!("📦 Loading model '{}' for category '{}'", model_ref, category);

        let bytes = self.storage.read_file(model_ref).await.map_err(|e| match e {
            ForecastError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                ForecastError::ModelArtifactMissing {
                    category: category.to_string(),
                    path: model_ref.to_string(),
                }
            }
            other => ForecastError::ModelLoadError {
                category: category.to_string(),
                message: other.to_string(),
            },
        })?;

        let model = self.decoder.decode(category, &bytes).map_err(|e| match e {
            e @ ForecastError::ModelLoadError { .. } => e,
            other => ForecastError::ModelLoadError {
                category: category.to_string(),
                message: other.to_string(),
            },
        })?;

        tracing::debug!(
            "Model for '{}' decoded with capability {}",
            category,
            model.capability.tag()
        );

        Ok(Arc::new(model))
    }
}
