use chrono::{DateTime, Utc};
use tracing::warn;
use crate::types::{SaveSessionRequest, SavedSession, SessionSummary, Step3Data};
use crate::{Error, Result};

const UNTITLED: &str = "제목 없음";

impl SavedSession {
    /// Build the persisted form of a save request.
    pub fn assemble(request: SaveSessionRequest, id: String, created_at: DateTime<Utc>) -> Result<Self> {
        let (Some(step1), Some(step2), Some(step3), Some(drafts)) = (
            request.step1_data,
            request.step2_data,
            request.step3_data,
            request.draft_versions,
        ) else {
            return Err(Error::Validation("필수 데이터가 누락되었습니다.".to_string()));
        };

        let (valid, invalid): (Vec<String>, Vec<String>) = step3
            .selected_patents
            .iter()
            .cloned()
            .partition(|number| step2.similar_patents.iter().any(|p| &p.patent_number == number));

        if !invalid.is_empty() {
            warn!(
                "Some selected patents are not in similarPatents: {}",
                invalid.join(", ")
            );
        }

        // An entirely invalid selection is kept unchanged.
        let selected_patents = if valid.is_empty() { step3.selected_patents } else { valid };

        let title = match step1.invention_title.trim() {
            "" => UNTITLED.to_string(),
            title => title.to_string(),
        };

        Ok(Self {
            id,
            created_at,
            title,
            step1_data: step1,
            step2_data: step2,
            step3_data: Step3Data { selected_patents, ..step3 },
            draft_versions: drafts,
        })
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: if self.title.trim().is_empty() { UNTITLED.to_string() } else { self.title.clone() },
            created_at: self.created_at,
            draft_count: self.draft_versions.len(),
            keywords: self.step2_data.selected_keywords.iter().take(3).cloned().collect(),
        }
    }
}
