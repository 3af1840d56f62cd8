//! Section views over a generated specification draft.
//!
//! Drafts are free text, so sections are located by heading keywords rather than
//! a fixed grammar. Anything not found is left empty.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CLAIM: Lazy<Regex> = Lazy::new(|| Regex::new(r"【청구항\s*\d+】[^【]*").unwrap());
static CLAIM_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"【청구항\s*\d+】").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.。]").unwrap());
static BULLET_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\-•.\s]+").unwrap());
static BULLET_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\-•]").unwrap());

static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"발명의\s*명칭[:\s]*(.+?)(?:\n|$)").unwrap());
static ABSTRACT_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"요약[:\s]*\n").unwrap());
static CLAIMS_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"청구항").unwrap());
static FIELD_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"기술\s*분야[:\s]*\n").unwrap());
static PROBLEM_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"해결하[고자]*\s*하는\s*과제[:\s]*\n").unwrap());
static EFFECT_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"발명의\s*효과[:\s]*\n").unwrap());

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n").unwrap());
static CLAIM_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"청구").unwrap());
static FIELD_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"기술분야").unwrap());
static BACKGROUND_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"배경").unwrap());
static EFFECT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"발명의\s*효과").unwrap());
static SOLUTION_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n[#\s]*과제의\s*해결").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSection {
    pub title: String,
    pub content: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSummary {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub claims: Vec<String>,
    pub technical_field: String,
    pub problems: Vec<String>,
    pub effects: Vec<String>,
}

/// Strip markdown emphasis markers.
pub fn clean_content(content: &str) -> String {
    content.replace('*', "")
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        format!("{}...", text.chars().take(limit).collect::<String>())
    } else {
        text.to_string()
    }
}

fn first_sentence(text: &str) -> &str {
    SENTENCE_END.split(text).next().unwrap_or(text)
}

/// Heading a line introduces, checked in priority order.
fn classify_heading(line: &str) -> Option<(&'static str, &'static str)> {
    let has = |needles: &[&str]| needles.iter().any(|n| line.contains(n));

    if has(&["기술분야", "기술 분야"]) {
        Some(("기술분야", "blue"))
    } else if has(&["배경기술", "발명의 배경"]) {
        Some(("발명배경", "green"))
    } else if has(&["구성요소", "주요 구성", "시스템 구성", "장치 구성"]) {
        Some(("구성요소", "cyan"))
    } else if has(&["발명의 내용", "발명 내용", "구체적인 내용", "실시예"]) {
        Some(("발명내용", "teal"))
    } else if has(&["해결하고자 하는 과제", "해결과제"]) {
        Some(("해결과제", "orange"))
    } else if has(&["과제의 해결 수단", "해결 수단", "발명의 구성"]) {
        Some(("해결수단", "purple"))
    } else if has(&["발명의 효과", "효과"]) {
        Some(("발명효과", "red"))
    } else if has(&["청구항", "특허청구범위"]) {
        Some(("청구항", "indigo"))
    } else if has(&["요약"]) {
        Some(("요약", "gray"))
    } else {
        None
    }
}

fn summarize_section(text: &str, title: &str) -> String {
    let cleaned = text.trim();

    if title == "청구항" {
        let bullets: Vec<String> = CLAIM
            .find_iter(cleaned)
            .take(5)
            .map(|claim| {
                let body = CLAIM_MARKER.replace(claim.as_str(), "");
                format!("• {}...", first_sentence(body.trim()))
            })
            .collect();
        if !bullets.is_empty() {
            return bullets.join("\n");
        }
    }

    let sentences: Vec<&str> = SENTENCE_END
        .split(cleaned)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return format!("{}...", cleaned.chars().take(200).collect::<String>());
    }

    let summary = format!("{}.", sentences.iter().take(3).cloned().collect::<Vec<_>>().join(". "));
    truncate_chars(&summary, 300)
}

/// Split a draft into display sections, each shortened to a preview.
pub fn parse_draft_sections(content: &str) -> Vec<DraftSection> {
    let cleaned = clean_content(content);
    let mut sections: Vec<DraftSection> = Vec::new();
    let mut current: Option<DraftSection> = None;

    for line in cleaned.split('\n') {
        let in_claims = current.as_ref().is_some_and(|s| s.title == "청구항");
        let heading = if in_claims && CLAIM_MARKER.is_match(line) {
            None
        } else {
            classify_heading(line.trim())
        };
        match heading {
            Some((title, color)) => {
                sections.extend(current.take());
                current = Some(DraftSection {
                    title: title.to_string(),
                    content: String::new(),
                    color: color.to_string(),
                });
            }
            None => {
                if let Some(section) = current.as_mut() {
                    section.content.push_str(line);
                    section.content.push('\n');
                }
            }
        }
    }
    sections.extend(current);

    sections
        .into_iter()
        .filter(|s| !s.content.trim().is_empty())
        .map(|s| DraftSection {
            content: summarize_section(&s.content, &s.title),
            ..s
        })
        .collect()
}

/// Text after the first `head` match, up to the earliest `stop` match (or the end).
fn section_body<'a>(content: &'a str, head: &Regex, stops: &[&Regex]) -> Option<&'a str> {
    let start = head.find(content)?.end();
    let rest = &content[start..];
    let end = stops
        .iter()
        .filter_map(|stop| stop.find(rest).map(|m| m.start()))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Claims text from the first `청구항` mention, including an opening `【` bracket.
fn claims_block(content: &str) -> Option<&str> {
    let head = CLAIMS_HEAD.find(content)?;
    let start = if content[..head.start()].ends_with('【') {
        head.start() - '【'.len_utf8()
    } else {
        head.start()
    };
    let rest = &content[start..];
    let end = [&*BLANK_LINE, &*EFFECT_WORD]
        .iter()
        .filter_map(|stop| stop.find(&rest[head.end() - start..]).map(|m| m.start() + head.end() - start))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn listed_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .filter(|line| {
            let trimmed = line.trim();
            BULLET_START.is_match(trimmed) || trimmed.chars().count() > 20
        })
        .take(3)
        .map(|line| BULLET_PREFIX.replace(line, "").trim().to_string())
        .collect()
}

/// Headline facts of a draft for the result overview.
pub fn parse_structured_summary(content: &str, invention_title: &str) -> StructuredSummary {
    let cleaned = clean_content(content);

    let title = TITLE
        .captures(&cleaned)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| Some(invention_title.to_string()).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| "제목 없음".to_string());

    let abstract_text = section_body(&cleaned, &ABSTRACT_HEAD, &[&BLANK_LINE, &CLAIM_WORD, &FIELD_WORD])
        .map(|body| body.trim().to_string())
        .unwrap_or_default();

    let claims = claims_block(&cleaned)
        .map(|block| {
            CLAIM
                .find_iter(block)
                .take(3)
                .map(|claim| {
                    let text = CLAIM_MARKER.replace(claim.as_str(), "");
                    truncate_chars(first_sentence(text.trim()), 150)
                })
                .collect()
        })
        .unwrap_or_default();

    let technical_field = section_body(&cleaned, &FIELD_HEAD, &[&BLANK_LINE, &BACKGROUND_WORD])
        .map(|body| {
            let sentences: Vec<&str> = SENTENCE_END
                .split(body.trim())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(2)
                .collect();
            format!("{}.", sentences.join(". "))
        })
        .unwrap_or_default();

    let problems = section_body(&cleaned, &PROBLEM_HEAD, &[&SOLUTION_BREAK, &EFFECT_WORD])
        .map(listed_lines)
        .unwrap_or_default();

    let effects = section_body(&cleaned, &EFFECT_HEAD, &[&BLANK_LINE, &CLAIM_WORD])
        .map(listed_lines)
        .unwrap_or_default();

    StructuredSummary {
        title,
        abstract_text,
        claims,
        technical_field,
        problems,
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAFT: &str = "**발명의 명칭:** 스마트 관수 시스템\n\n# 요약\n본 발명은 토양 수분을 측정하여 자동으로 물을 공급하는 시스템이다. 물 낭비를 줄인다.\n\n# 특허청구범위\n【청구항 1】 토양 센서와 밸브를 포함하는 관수 시스템. 추가 설명.\n【청구항 2】 청구항 1에 있어서, 무선 통신부를 더 포함하는 시스템.\n\n## 기술분야\n본 발명은 농업 IoT에 관한 것이다. 특히 관수 제어에 관한 것이다. 세 번째 문장.\n\n## 배경기술\n종래에는 사람이 직접 물을 주었다.\n\n### 해결하고자 하는 과제\n1. 물 공급 시점을 자동으로 판단하는 것이다\n- 원격으로 상태를 확인하는 것이다\n짧은 줄\n\n### 과제의 해결 수단\n센서와 제어부를 포함한다.\n\n### 발명의 효과\n• 물 사용량을 크게 절감할 수 있다\n";

    #[test]
    fn test_clean_content() {
        assert_eq!(clean_content("**굵게** *기울임*"), "굵게 기울임");
    }

    #[test]
    fn test_sections_in_order() {
        let sections = parse_draft_sections(DRAFT);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["요약", "청구항", "기술분야", "발명배경", "해결과제", "해결수단", "발명효과"]);

        let claims = &sections[1];
        assert_eq!(claims.color, "indigo");
        assert_eq!(
            claims.content,
            "• 토양 센서와 밸브를 포함하는 관수 시스템...\n• 청구항 1에 있어서, 무선 통신부를 더 포함하는 시스템..."
        );
    }

    #[test]
    fn test_section_summary_limits() {
        let long = format!("# 요약\n{}", "가".repeat(400));
        let sections = parse_draft_sections(&long);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content.chars().count(), 303);
        assert!(sections[0].content.ends_with("..."));

        let sections = parse_draft_sections("## 기술분야\n하나. 둘. 셋. 넷.");
        assert_eq!(sections[0].content, "하나. 둘. 셋.");
    }

    #[test]
    fn test_empty_sections_are_dropped() {
        assert!(parse_draft_sections("# 요약\n\n# 특허청구범위\n").is_empty());
        assert!(parse_draft_sections("").is_empty());
    }

    #[test]
    fn test_structured_summary() {
        let summary = parse_structured_summary(DRAFT, "대체 제목");
        assert_eq!(summary.title, "스마트 관수 시스템");
        assert_eq!(
            summary.abstract_text,
            "본 발명은 토양 수분을 측정하여 자동으로 물을 공급하는 시스템이다. 물 낭비를 줄인다."
        );
        assert_eq!(
            summary.claims,
            vec![
                "토양 센서와 밸브를 포함하는 관수 시스템".to_string(),
                "청구항 1에 있어서, 무선 통신부를 더 포함하는 시스템".to_string(),
            ]
        );
        assert_eq!(summary.technical_field, "본 발명은 농업 IoT에 관한 것이다. 특히 관수 제어에 관한 것이다.");
        assert_eq!(
            summary.problems,
            vec!["물 공급 시점을 자동으로 판단하는 것이다", "원격으로 상태를 확인하는 것이다"]
        );
        assert_eq!(summary.effects, vec!["물 사용량을 크게 절감할 수 있다"]);
    }

    #[test]
    fn test_structured_summary_fallbacks() {
        let summary = parse_structured_summary("내용 없음", "");
        assert_eq!(summary.title, "제목 없음");
        assert!(summary.claims.is_empty());
        assert_eq!(parse_structured_summary("내용 없음", "관수 장치").title, "관수 장치");
    }
}
