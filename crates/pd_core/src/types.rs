use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Invention data recovered from the extraction prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub technical_field: Vec<String>,
    #[serde(default)]
    pub problems: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patent {
    #[serde(default)]
    pub patent_number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_code: Option<String>,
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub claim_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,

    // Detail lookup only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub claim_list: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibliography_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipc_info_list: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cpc_info_list: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub family_list: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_art: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advantageous_effects: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_of_drawings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_of_embodiments: Option<String>,

    /// Upstream record as received, for the "view all" panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,

    /// Client fields without a typed counterpart, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Patent {
    /// Text used when matching keywords against a cached record.
    pub fn searchable_text(&self) -> String {
        [
            Some(self.title.as_str()),
            self.summary.as_deref(),
            self.abstract_text.as_deref(),
            self.applicant.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftVersion {
    pub version: u32,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_used: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step1Data {
    #[serde(default)]
    pub memo_text: String,
    #[serde(default)]
    pub invention_title: String,
    #[serde(default)]
    pub inventor: String,
    #[serde(default)]
    pub applicant: String,
    #[serde(default)]
    pub extracted_data: Option<ExtractedData>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step2Data {
    #[serde(default)]
    pub selected_keywords: Vec<String>,
    #[serde(default)]
    pub selected_technical_fields: Vec<String>,
    #[serde(default)]
    pub selected_problems: Vec<String>,
    #[serde(default)]
    pub selected_features: Vec<String>,
    #[serde(default)]
    pub similar_patents: Vec<Patent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step3Data {
    #[serde(default)]
    pub selected_patents: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSessionRequest {
    #[serde(default)]
    pub step1_data: Option<Step1Data>,
    #[serde(default)]
    pub step2_data: Option<Step2Data>,
    #[serde(default)]
    pub step3_data: Option<Step3Data>,
    #[serde(default)]
    pub draft_versions: Option<Vec<DraftVersion>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub step1_data: Step1Data,
    pub step2_data: Step2Data,
    pub step3_data: Step3Data,
    pub draft_versions: Vec<DraftVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub draft_count: usize,
    pub keywords: Vec<String>,
}

/// Selections forwarded to the memo-mode draft prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    #[serde(default)]
    pub technical_field: Vec<String>,
    #[serde(default)]
    pub problems: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Memo,
    Refine,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Accepts either `"a, b"` or `["a", "b"]`.
    #[serde(default, deserialize_with = "keywords_text")]
    pub keywords: String,
    #[serde(default)]
    pub invention_title: String,
    #[serde(default)]
    pub inventor: String,
    #[serde(default)]
    pub applicant: String,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original_content: Option<String>,
    #[serde(default)]
    pub feedback_comments: Option<String>,
    #[serde(default)]
    pub is_revision: bool,
    #[serde(default)]
    pub structured_data: Option<StructuredData>,
    #[serde(default)]
    pub reference_patents: Vec<Patent>,
}

impl GenerateRequest {
    /// Description wins over keywords; `None` when both are blank.
    pub fn input_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| Some(self.keywords.as_str()).filter(|k| !k.trim().is_empty()))
    }
}

fn keywords_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keywords {
        Text(String),
        List(Vec<String>),
        Missing(Option<()>),
    }

    Ok(match Keywords::deserialize(deserializer)? {
        Keywords::Text(text) => text,
        Keywords::List(list) => list.join(", "),
        Keywords::Missing(_) => String::new(),
    })
}

/// Claim counts arrive as `"12"` from Biznavi and as `12` from clients.
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Number(number) => number.to_string(),
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub keywords: Vec<String>,
    #[serde(default = "default_rows")]
    pub num_of_rows: u32,
    #[serde(default = "default_page")]
    pub page_no: u32,
}

fn default_rows() -> u32 {
    10
}

fn default_page() -> u32 {
    1
}

impl SearchQuery {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            num_of_rows: default_rows(),
            page_no: default_page(),
        }
    }

    pub fn with_keywords(&self, keywords: &[String]) -> Self {
        Self {
            keywords: keywords.to_vec(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub patents: Vec<Patent>,
    pub used_keywords: Vec<String>,
    pub attempts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadReport {
    pub success: bool,
    pub count: usize,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_request_accepts_keyword_list() {
        let req: GenerateRequest = serde_json::from_value(json!({
            "keywords": ["스마트팜", "센서"],
            "mode": "memo"
        }))
        .unwrap();
        assert_eq!(req.keywords, "스마트팜, 센서");
        assert_eq!(req.input_text(), Some("스마트팜, 센서"));

        let req: GenerateRequest = serde_json::from_value(json!({ "keywords": null })).unwrap();
        assert_eq!(req.input_text(), None);
    }

    #[test]
    fn test_description_wins_over_keywords() {
        let req = GenerateRequest {
            keywords: "a, b".into(),
            description: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(req.input_text(), Some("a, b"));

        let req = GenerateRequest {
            keywords: "a, b".into(),
            description: Some("memo".into()),
            ..Default::default()
        };
        assert_eq!(req.input_text(), Some("memo"));
    }

    #[test]
    fn test_patent_wire_names() {
        let patent = Patent {
            patent_number: "10-1234567".into(),
            title: "센서 시스템".into(),
            abstract_text: Some("초록".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&patent).unwrap();
        assert_eq!(value["patentNumber"], "10-1234567");
        assert_eq!(value["abstract"], "초록");
        assert!(value.get("applicant").is_none());
        assert!(value.get("claimList").is_none());
    }

    #[test]
    fn test_patent_keeps_unknown_fields() {
        let input = json!({
            "patentNumber": "KR1",
            "title": "t",
            "score": 0.9,
            "technialField": "농업",
            "claimCount": 5
        });
        let patent: Patent = serde_json::from_value(input).unwrap();
        assert_eq!(patent.claim_count.as_deref(), Some("5"));
        assert_eq!(patent.extra["technialField"], "농업");

        let value = serde_json::to_value(&patent).unwrap();
        assert_eq!(value["score"], 0.9);
        assert_eq!(value["technialField"], "농업");
        assert_eq!(value["claimCount"], "5");
    }

    #[test]
    fn test_draft_version_keeps_unknown_fields() {
        let draft: DraftVersion = serde_json::from_value(json!({
            "version": 2,
            "content": "초안",
            "timestamp": "2025-03-01T09:00:00Z",
            "note": "keep me"
        }))
        .unwrap();
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["note"], "keep me");
        assert_eq!(value["version"], 2);
    }

    #[test]
    fn test_search_query_defaults() {
        let query: SearchQuery = serde_json::from_value(json!({ "keywords": ["a"] })).unwrap();
        assert_eq!(query.num_of_rows, 10);
        assert_eq!(query.page_no, 1);
    }
}
