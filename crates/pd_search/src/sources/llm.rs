use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use pd_core::{InferenceModel, Patent, PatentSearch, Result, SearchQuery};
use pd_inference::{parse, prompts};

/// Similar patents written by the model itself, for use without a search API.
/// The last batch is kept so detail lookups can find its entries.
#[derive(Debug)]
pub struct LlmPatentSource {
    model: Arc<dyn InferenceModel>,
    last_batch: RwLock<Vec<Patent>>,
}

impl LlmPatentSource {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self {
            model,
            last_batch: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PatentSearch for LlmPatentSource {
    fn name(&self) -> &str {
        "llm"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Patent>> {
        let request = prompts::patent_synthesis_request(&query.keywords);
        let generated = self.model.generate(&request).await?;

        let mut patents = parse::parse_patent_list(&generated)?;
        patents.truncate(query.num_of_rows.max(1) as usize);
        debug!("{} synthesized {} patents", self.model.name(), patents.len());

        *self.last_batch.write().await = patents.clone();
        Ok(patents)
    }

    async fn detail(&self, _idx: Option<i64>, apply_number: Option<&str>) -> Result<Option<Patent>> {
        let Some(number) = apply_number else {
            return Ok(None);
        };
        Ok(self
            .last_batch
            .read()
            .await
            .iter()
            .find(|p| p.patent_number == number)
            .cloned())
    }
}
