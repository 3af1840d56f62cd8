use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use pd_core::{Error, InferenceModel, PatentSearch, Result, SearchOutcome, SearchQuery};

pub mod sources;

pub use sources::{BiznaviClient, FilePatentSource, LlmPatentSource};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
pub struct SearchConfig {
    /// Source kind: `biznavi`, `files` or `llm`.
    pub source: String,
    pub base_url: Option<String>,
    pub x_token: Option<String>,
    pub gw_token: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("source", &self.source)
            .field("base_url", &self.base_url)
            .field("x_token", &self.x_token.as_deref().map(|_| "<redacted>"))
            .field("gw_token", &self.gw_token.as_deref().map(|_| "<redacted>"))
            .field("data_dir", &self.data_dir)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            source: "biznavi".to_string(),
            base_url: None,
            x_token: None,
            gw_token: None,
            data_dir: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl SearchConfig {
    /// Biznavi tokens from the environment. The admin token wins over the regular one.
    pub fn with_env_tokens(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        self.x_token = self.x_token.or_else(|| var("BIZNAVI_TOKEN")).or_else(|| var("BIZNAVI_X_TOKEN"));
        self.gw_token = self.gw_token.or_else(|| var("BIZNAVI_GW_TOKEN"));
        self
    }
}

/// Build the configured search source. `model` is only used by the `llm` source.
pub fn create_search(config: &SearchConfig, model: Arc<dyn InferenceModel>) -> Result<Arc<dyn PatentSearch>> {
    let search: Arc<dyn PatentSearch> = match config.source.as_str() {
        "biznavi" => Arc::new(BiznaviClient::new(config)?),
        "files" => {
            let dir = config
                .data_dir
                .clone()
                .ok_or_else(|| Error::Validation("files search requires a data directory".to_string()))?;
            Arc::new(FilePatentSource::new(dir, config.cache_ttl))
        }
        "llm" => Arc::new(LlmPatentSource::new(model)),
        other => return Err(Error::Search(format!("Unknown search source: {}", other))),
    };
    info!("🔎 Using {} patent search", search.name());
    Ok(search)
}

/// Search with the full keyword list, dropping trailing keywords until something matches.
pub async fn search_with_keyword_reduction(
    source: &dyn PatentSearch,
    query: &SearchQuery,
) -> Result<SearchOutcome> {
    let keywords: Vec<String> = query
        .keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return Err(Error::Validation("키워드가 필요합니다.".to_string()));
    }

    let mut attempts = 0;
    for take in (1..=keywords.len()).rev() {
        attempts += 1;
        let used = &keywords[..take];
        debug!("Search attempt {} with keywords: {}", attempts, used.join(", "));

        let patents = source.search(&query.with_keywords(used)).await?;
        if !patents.is_empty() {
            info!("✅ Found {} patents with {} keyword(s)", patents.len(), take);
            return Ok(SearchOutcome {
                patents,
                used_keywords: used.to_vec(),
                attempts,
            });
        }
    }

    Err(Error::NoResults { keywords })
}

pub mod prelude {
    pub use super::{create_search, search_with_keyword_reduction, SearchConfig};
    pub use super::sources::*;
    pub use pd_core::{PatentSearch, SearchOutcome, SearchQuery};
}
