//! Best-effort recovery of structured data from free-form model output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};
use pd_core::{Error, ExtractedData, Patent, Result};

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?m)([\]\},"\d])[ \t]*//.*$"#).unwrap());
static FIRST_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[(.*?)\]").unwrap());

const TIMEOUT_MARKERS: [&str; 2] = ["FUNCTION_INVOCATION_TIMEOUT", "An error occurred"];

fn parse_lenient(candidate: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(candidate) {
        return Some(v);
    }
    let cleaned = LINE_COMMENT.replace_all(candidate, "$1");
    let cleaned = TRAILING_COMMA.replace_all(&cleaned, "$1");
    serde_json::from_str::<Value>(&cleaned).ok()
}

fn fenced_block<'a>(text: &'a str, fence: &str) -> Option<&'a str> {
    let start = text.find(fence)? + fence.len();
    let end = text[start..].find("```")?;
    Some(&text[start..start + end])
}

/// Find a JSON value in model output: the whole text, the outermost `{...}` span,
/// or a fenced code block.
pub fn extract_json(text: &str) -> Option<Value> {
    let t = text.trim().trim_matches('\u{feff}');

    if let Some(v) = parse_lenient(t) {
        return Some(v);
    }

    if let (Some(i), Some(j)) = (t.find('{'), t.rfind('}')) {
        if i < j {
            if let Some(v) = parse_lenient(&t[i..=j]) {
                return Some(v);
            }
        }
    }

    ["```json", "```"]
        .iter()
        .filter_map(|fence| fenced_block(t, fence))
        .find_map(parse_lenient)
}

/// Accept `["a", "b"]`, `"a, b"` or a list of scalars.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn parse_extraction(text: &str) -> Result<ExtractedData> {
    if let Some(value) = extract_json(text).filter(Value::is_object) {
        return Ok(ExtractedData {
            keywords: string_list(&value["keywords"]),
            technical_field: string_list(&value["technicalField"]),
            problems: string_list(&value["problems"]),
            features: string_list(&value["features"]),
        });
    }

    warn!("Failed to parse structured data, falling back to first list in response");
    if let Some(captures) = FIRST_LIST.captures(text) {
        let keywords = captures[1]
            .split(',')
            .map(|k| k.trim().replace('"', ""))
            .filter(|k| !k.is_empty())
            .collect();
        return Ok(ExtractedData {
            keywords,
            ..Default::default()
        });
    }

    Err(Error::Parse("No JSON found in response".to_string()))
}

/// Patents listed under `"patents"` in a synthesis response.
pub fn parse_patent_list(text: &str) -> Result<Vec<Patent>> {
    let value = extract_json(text).ok_or_else(|| Error::Parse("No JSON found in response".to_string()))?;
    let Some(items) = value["patents"].as_array() else {
        return Ok(Vec::new());
    };

    Ok(items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Patent>(item.clone()) {
            Ok(patent) => Some(patent),
            Err(e) => {
                debug!("Skipping malformed patent entry: {}", e);
                None
            }
        })
        .collect())
}

/// Reject generated drafts that are really a platform timeout or an HTML error page.
pub fn check_draft(text: &str) -> Result<()> {
    if TIMEOUT_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Err(Error::Timeout(
            "특허 명세서 생성 시간이 초과되었습니다. 내용을 간략히 하거나 잠시 후 다시 시도해주세요.".to_string(),
        ));
    }
    if text.trim_start().starts_with('<') {
        return Err(Error::InvalidResponse(text.chars().take(200).collect()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_prose() {
        let text = "물론입니다! 결과는 다음과 같습니다.\n{\"keywords\": [\"a\"]}\n감사합니다.";
        assert_eq!(extract_json(text).unwrap()["keywords"][0], "a");
    }

    #[test]
    fn test_extract_json_from_fence() {
        let text = "```json\n[1, 2, 3]\n```";
        assert_eq!(extract_json(text).unwrap()[2], 3);
    }

    #[test]
    fn test_extract_json_tolerates_prompt_style_comments() {
        let text = r#"{
  "keywords": ["센서", "제어"],  // 7-20개의 핵심 기술 키워드
  "technicalField": ["IoT"],  // 기술 분야 (예: "IoT")
  "features": ["원격"],
}"#;
        let data = parse_extraction(text).unwrap();
        assert_eq!(data.keywords, vec!["센서", "제어"]);
        assert_eq!(data.technical_field, vec!["IoT"]);
        assert_eq!(data.features, vec!["원격"]);
    }

    #[test]
    fn test_extract_json_keeps_urls() {
        let value = extract_json(r#"{"url": "http://example.com"}"#).unwrap();
        assert_eq!(value["url"], "http://example.com");
    }

    #[test]
    fn test_extraction_fields_default_to_empty() {
        let data = parse_extraction(r#"{"keywords": "a, b"}"#).unwrap();
        assert_eq!(data.keywords, vec!["a", "b"]);
        assert!(data.technical_field.is_empty());
        assert!(data.problems.is_empty());
    }

    #[test]
    fn test_extraction_falls_back_to_first_list() {
        let text = "키워드: [\"스마트팜\", \"센서\",\n \"관수\"] 입니다 {broken";
        let data = parse_extraction(text).unwrap();
        assert_eq!(data.keywords, vec!["스마트팜", "센서", "관수"]);
        assert!(data.features.is_empty());
    }

    #[test]
    fn test_extraction_without_structure_fails() {
        let err = parse_extraction("죄송합니다. 도와드릴 수 없습니다.").unwrap_err();
        assert_eq!(err.kind().as_str(), "parse_error");
    }

    #[test]
    fn test_parse_patent_list() {
        let text = r#"{"patents": [
            {"patentNumber": "KR10-2023-0000001", "title": "장치", "summary": "요약"},
            {"patentNumber": 5}
        ]}"#;
        let patents = parse_patent_list(text).unwrap();
        assert_eq!(patents.len(), 1);
        assert_eq!(patents[0].summary.as_deref(), Some("요약"));
        assert!(parse_patent_list("{}").unwrap().is_empty());
        assert!(parse_patent_list("no json").is_err());
    }

    #[test]
    fn test_check_draft() {
        assert!(check_draft("# 발명의 명칭\n장치").is_ok());
        assert_eq!(
            check_draft("FUNCTION_INVOCATION_TIMEOUT").unwrap_err().kind().as_str(),
            "timeout"
        );
        assert_eq!(
            check_draft("  <!DOCTYPE html><html>").unwrap_err().kind().as_str(),
            "invalid_response"
        );
    }
}
