//! State of one user's pass through the four drafting steps.
//!
//! The current step is derived from the data held; no navigation state is stored.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use crate::types::{
    DraftVersion, ExtractedData, GenerateRequest, GenerationMode, Patent, SaveSessionRequest,
    SavedSession, Step1Data, Step2Data, Step3Data, StructuredData,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    MemoInput,
    CoreInfoSelection,
    PatentSelection,
    Result,
}

impl Step {
    pub fn number(&self) -> u8 {
        match self {
            Step::MemoInput => 1,
            Step::CoreInfoSelection => 2,
            Step::PatentSelection => 3,
            Step::Result => 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatentWorkflow {
    pub memo_text: String,
    pub invention_title: String,
    pub inventor: String,
    pub applicant: String,
    extracted: Option<ExtractedData>,
    selected_keywords: Vec<String>,
    selected_technical_fields: Vec<String>,
    selected_problems: Vec<String>,
    selected_features: Vec<String>,
    similar_patents: Vec<Patent>,
    selected_patents: Vec<String>,
    drafts: Vec<DraftVersion>,
    current_draft: usize,
}

fn toggle(list: &mut Vec<String>, value: &str) {
    if let Some(pos) = list.iter().position(|v| v == value) {
        list.remove(pos);
    } else {
        list.push(value.to_string());
    }
}

impl PatentWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_step(&self) -> Step {
        if !self.drafts.is_empty() {
            Step::Result
        } else if !self.similar_patents.is_empty() {
            Step::PatentSelection
        } else if self.extracted.is_some() {
            Step::CoreInfoSelection
        } else {
            Step::MemoInput
        }
    }

    /// Whether the data needed to show `step` is present.
    pub fn can_enter(&self, step: Step) -> bool {
        match step {
            Step::MemoInput => true,
            Step::CoreInfoSelection => self.extracted.is_some(),
            Step::PatentSelection => !self.similar_patents.is_empty(),
            Step::Result => !self.drafts.is_empty(),
        }
    }

    pub fn extracted(&self) -> Option<&ExtractedData> {
        self.extracted.as_ref()
    }

    /// Store a fresh extraction. Every keyword starts selected, the other lists start empty.
    pub fn apply_extraction(&mut self, data: ExtractedData) {
        self.selected_keywords = data.keywords.clone();
        self.selected_technical_fields.clear();
        self.selected_problems.clear();
        self.selected_features.clear();
        self.similar_patents.clear();
        self.selected_patents.clear();
        self.extracted = Some(data);
    }

    pub fn selected_keywords(&self) -> &[String] {
        &self.selected_keywords
    }

    pub fn selected_technical_fields(&self) -> &[String] {
        &self.selected_technical_fields
    }

    pub fn selected_problems(&self) -> &[String] {
        &self.selected_problems
    }

    pub fn selected_features(&self) -> &[String] {
        &self.selected_features
    }

    pub fn toggle_keyword(&mut self, keyword: &str) {
        toggle(&mut self.selected_keywords, keyword);
    }

    pub fn toggle_technical_field(&mut self, field: &str) {
        toggle(&mut self.selected_technical_fields, field);
    }

    pub fn toggle_problem(&mut self, problem: &str) {
        toggle(&mut self.selected_problems, problem);
    }

    pub fn toggle_feature(&mut self, feature: &str) {
        toggle(&mut self.selected_features, feature);
    }

    pub fn similar_patents(&self) -> &[Patent] {
        &self.similar_patents
    }

    /// Replace the search results; selections no longer in the list are dropped.
    pub fn set_similar_patents(&mut self, patents: Vec<Patent>) {
        self.selected_patents
            .retain(|number| patents.iter().any(|p| &p.patent_number == number));
        self.similar_patents = patents;
    }

    pub fn selected_patents(&self) -> &[String] {
        &self.selected_patents
    }

    pub fn toggle_patent(&mut self, patent_number: &str) {
        toggle(&mut self.selected_patents, patent_number);
    }

    pub fn selected_patent_records(&self) -> Vec<Patent> {
        self.similar_patents
            .iter()
            .filter(|p| self.selected_patents.contains(&p.patent_number))
            .cloned()
            .collect()
    }

    /// Memo-mode generation request from the current selections.
    pub fn generate_request(&self) -> Result<GenerateRequest> {
        if self.selected_patents.is_empty() {
            return Err(Error::Validation("참고할 특허를 1개 이상 선택해주세요.".to_string()));
        }

        Ok(GenerateRequest {
            keywords: self.selected_keywords.join(", "),
            invention_title: self.invention_title.clone(),
            inventor: self.inventor.clone(),
            applicant: self.applicant.clone(),
            mode: GenerationMode::Memo,
            structured_data: self.extracted.as_ref().map(|_| StructuredData {
                technical_field: self.selected_technical_fields.clone(),
                problems: self.selected_problems.clone(),
                features: self.selected_features.clone(),
            }),
            reference_patents: self.selected_patent_records(),
            ..Default::default()
        })
    }

    /// Revision request that feeds the current draft back with reviewer comments.
    pub fn revision_request(&self, feedback: &str) -> Result<GenerateRequest> {
        if feedback.trim().is_empty() {
            return Err(Error::Validation("피드백 내용을 입력해주세요.".to_string()));
        }
        let draft = self
            .current_draft()
            .ok_or_else(|| Error::Validation("수정할 초안이 없습니다.".to_string()))?;

        Ok(GenerateRequest {
            keywords: self.selected_keywords.join(", "),
            invention_title: self.invention_title.clone(),
            inventor: self.inventor.clone(),
            applicant: self.applicant.clone(),
            mode: GenerationMode::Refine,
            original_content: Some(draft.content.clone()),
            feedback_comments: Some(feedback.to_string()),
            is_revision: true,
            ..Default::default()
        })
    }

    pub fn drafts(&self) -> &[DraftVersion] {
        &self.drafts
    }

    /// Append the next version and make it current.
    pub fn add_draft(&mut self, content: impl Into<String>, feedback: Option<String>) -> &DraftVersion {
        let version = self.drafts.len() as u32 + 1;
        self.drafts.push(DraftVersion {
            version,
            content: content.into(),
            timestamp: Utc::now(),
            feedback_used: feedback,
            extra: Default::default(),
        });
        self.current_draft = self.drafts.len() - 1;
        &self.drafts[self.current_draft]
    }

    pub fn current_draft(&self) -> Option<&DraftVersion> {
        self.drafts.get(self.current_draft)
    }

    pub fn current_draft_index(&self) -> usize {
        self.current_draft
    }

    pub fn select_draft(&mut self, index: usize) -> Result<()> {
        if index >= self.drafts.len() {
            return Err(Error::Validation(format!("존재하지 않는 초안입니다: {}", index + 1)));
        }
        self.current_draft = index;
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn to_save_request(&self) -> SaveSessionRequest {
        SaveSessionRequest {
            step1_data: Some(Step1Data {
                memo_text: self.memo_text.clone(),
                invention_title: self.invention_title.clone(),
                inventor: self.inventor.clone(),
                applicant: self.applicant.clone(),
                extracted_data: self.extracted.clone(),
                ..Default::default()
            }),
            step2_data: Some(Step2Data {
                selected_keywords: self.selected_keywords.clone(),
                selected_technical_fields: self.selected_technical_fields.clone(),
                selected_problems: self.selected_problems.clone(),
                selected_features: self.selected_features.clone(),
                similar_patents: self.similar_patents.clone(),
                ..Default::default()
            }),
            step3_data: Some(Step3Data {
                selected_patents: self.selected_patents.clone(),
                ..Default::default()
            }),
            draft_versions: Some(self.drafts.clone()),
        }
    }

    /// Restore a saved session, opening its latest draft.
    pub fn from_saved(session: SavedSession) -> Self {
        let current_draft = session.draft_versions.len().saturating_sub(1);
        Self {
            memo_text: session.step1_data.memo_text,
            invention_title: session.step1_data.invention_title,
            inventor: session.step1_data.inventor,
            applicant: session.step1_data.applicant,
            extracted: session.step1_data.extracted_data,
            selected_keywords: session.step2_data.selected_keywords,
            selected_technical_fields: session.step2_data.selected_technical_fields,
            selected_problems: session.step2_data.selected_problems,
            selected_features: session.step2_data.selected_features,
            similar_patents: session.step2_data.similar_patents,
            selected_patents: session.step3_data.selected_patents,
            drafts: session.draft_versions,
            current_draft,
        }
    }
}
