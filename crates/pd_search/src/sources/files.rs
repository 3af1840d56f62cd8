use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use pd_core::{Error, Patent, PatentSearch, ReloadReport, Result, SearchQuery};
use super::biznavi::map_search_item;

struct Cache {
    patents: Vec<Patent>,
    loaded_at: Instant,
}

/// Patent records read from `*.json` files and kept in memory for `ttl`.
pub struct FilePatentSource {
    dir: PathBuf,
    ttl: Duration,
    cache: RwLock<Option<Cache>>,
}

impl std::fmt::Debug for FilePatentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePatentSource")
            .field("dir", &self.dir)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl FilePatentSource {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            cache: RwLock::new(None),
        }
    }

    fn records(value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("patents") {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(map)],
            },
            _ => Vec::new(),
        }
    }

    fn to_patent(record: Value) -> Option<Patent> {
        if record.get("patentNumber").is_some() {
            serde_json::from_value(record).ok()
        } else {
            Some(map_search_item(record)).filter(|p| !p.patent_number.is_empty() || !p.title.is_empty())
        }
    }

    async fn read_file(path: &Path) -> Result<Vec<Patent>> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| Error::FileRead(format!("{}: {}", path.display(), e)))?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::FileRead(format!("{}: {}", path.display(), e)))?;
        Ok(Self::records(value).into_iter().filter_map(Self::to_patent).collect())
    }

    async fn load(&self) -> Result<Vec<Patent>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::FileRead(format!("{}: {}", self.dir.display(), e)))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut patents = Vec::new();
        for path in &paths {
            let loaded = Self::read_file(path).await?;
            debug!("Loaded {} patents from {}", loaded.len(), path.display());
            patents.extend(loaded);
        }
        Ok(patents)
    }

    /// Replace the cache with a fresh read of the directory.
    async fn refresh(&self) -> Result<usize> {
        let patents = self.load().await?;
        let count = patents.len();
        *self.cache.write().await = Some(Cache {
            patents,
            loaded_at: Instant::now(),
        });
        info!("📂 Loaded {} patents from {}", count, self.dir.display());
        Ok(count)
    }

    async fn snapshot(&self) -> Result<Vec<Patent>> {
        {
            let cache = self.cache.read().await;
            if let Some(cache) = cache.as_ref().filter(|c| c.loaded_at.elapsed() < self.ttl) {
                return Ok(cache.patents.clone());
            }
        }
        self.refresh().await?;
        Ok(self
            .cache
            .read()
            .await
            .as_ref()
            .map(|c| c.patents.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PatentSearch for FilePatentSource {
    fn name(&self) -> &str {
        "files"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Patent>> {
        let keywords: Vec<String> = query.keywords.iter().map(|k| k.trim().to_lowercase()).collect();
        let rows = query.num_of_rows.max(1) as usize;
        let skip = query.page_no.saturating_sub(1) as usize * rows;

        Ok(self
            .snapshot()
            .await?
            .into_iter()
            .filter(|p| {
                let text = p.searchable_text();
                keywords.iter().all(|k| text.contains(k.as_str()))
            })
            .skip(skip)
            .take(rows)
            .collect())
    }

    async fn detail(&self, idx: Option<i64>, apply_number: Option<&str>) -> Result<Option<Patent>> {
        let raw_str = |p: &Patent, key: &str| {
            p.raw_data
                .as_ref()
                .and_then(|raw| raw.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Ok(self.snapshot().await?.into_iter().find(|p| {
            let by_number = apply_number.is_some_and(|n| {
                p.patent_number == n || raw_str(p, "apply_number").as_deref() == Some(n)
            });
            let by_idx = idx.is_some_and(|i| {
                p.raw_data.as_ref().and_then(|raw| raw.get("idx")).and_then(Value::as_i64) == Some(i)
            });
            by_number || by_idx
        }))
    }

    async fn reload(&self) -> Result<ReloadReport> {
        match self.refresh().await {
            Ok(count) => Ok(ReloadReport {
                success: true,
                count,
                message: format!("{}개의 특허 데이터를 다시 불러왔습니다.", count),
            }),
            Err(e) => {
                error!("Failed to reload patent files: {}", e);
                Ok(ReloadReport {
                    success: false,
                    count: 0,
                    message: e.to_string(),
                })
            }
        }
    }
}
