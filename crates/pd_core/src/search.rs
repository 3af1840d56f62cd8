use async_trait::async_trait;
use crate::types::{Patent, ReloadReport, SearchQuery};
use crate::Result;

#[async_trait]
pub trait PatentSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Find patents matching every keyword of the query.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Patent>>;

    /// Look up one patent. `Ok(None)` when the source has no record of it.
    async fn detail(&self, idx: Option<i64>, apply_number: Option<&str>) -> Result<Option<Patent>>;

    /// Refresh any cached data. Sources without a cache report success with no records.
    async fn reload(&self) -> Result<ReloadReport> {
        Ok(ReloadReport {
            success: true,
            count: 0,
            message: "API 기반 검색에서는 캐시가 필요하지 않습니다.".to_string(),
        })
    }
}
