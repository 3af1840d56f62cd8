use std::sync::Arc;
use pd_core::{InferenceModel, PatentSearch, SessionStorage};

pub struct AppState {
    pub inference_model: Arc<dyn InferenceModel>,
    pub search: Arc<dyn PatentSearch>,
    pub storage: Arc<dyn SessionStorage>,
}

impl AppState {
    pub fn new(
        inference_model: Arc<dyn InferenceModel>,
        search: Arc<dyn PatentSearch>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            inference_model,
            search,
            storage,
        }
    }
}
