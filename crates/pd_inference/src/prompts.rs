//! Korean prompt templates for extraction, patent synthesis and draft generation.

use pd_core::{Error, GenerateRequest, GenerationMode, GenerationRequest, Patent, Result, StructuredData};

const SECTION_OUTLINE: &str = "# 발명의 명칭
# 요약
# 청구범위
# 발명의 설명
## 기술분야
## 배경기술
## 발명의 내용
### 해결하려는 과제
### 과제의 해결 수단
### 발명의 효과
## 발명을 실시하기 위한 구체적인 내용";

pub fn extraction_prompt(text: &str) -> String {
    format!(
        r#"다음 텍스트에서 특허 명세서 작성에 필요한 정보를 추출해주세요.

텍스트: {text}

다음 형식의 JSON으로만 응답해주세요:
{{
  "keywords": ["키워드1", "키워드2", ...],  // 7-20개의 핵심 기술 키워드
  "technicalField": ["분야1", "분야2", "분야3"],  // 3-5개의 기술 분야 (예: "IoT", "농업", "자동화")
  "problems": ["문제1", "문제2", "문제3"],  // 3-5개의 해결하려는 문제점들
  "features": ["기능1", "기능2", ...],  // 3-7개의 핵심 기능/특징
}}

JSON 형식으로만 응답하고, 다른 설명은 포함하지 마세요."#
    )
}

pub fn extraction_request(text: &str) -> GenerationRequest {
    GenerationRequest::new(extraction_prompt(text))
        .temperature(0.3)
        .max_output_tokens(8192)
}

pub fn patent_synthesis_prompt(keywords: &[String]) -> String {
    let keywords_text = keywords.join(", ");
    format!(
        r#"다음 키워드와 관련된 유사 특허 10건을 생성해주세요: {keywords_text}

각 특허는 다음 정보를 포함해야 합니다:
- 특허번호 (예: KR10-2023-0123456)
- 특허명 (구체적이고 기술적인 명칭)
- 출원인 (실제 회사명 또는 기관명)
- 출원일 (YYYY-MM-DD 형식)
- 요약 (2-3문장으로 핵심 기술 설명)

다음 JSON 형식으로만 응답해주세요:
{{
  "patents": [
    {{
      "patentNumber": "특허번호",
      "title": "특허명",
      "applicant": "출원인",
      "applicationDate": "출원일",
      "summary": "요약"
    }}
  ]
}}

JSON 형식으로만 응답하고, 다른 설명은 포함하지 마세요."#
    )
}

pub fn patent_synthesis_request(keywords: &[String]) -> GenerationRequest {
    GenerationRequest::new(patent_synthesis_prompt(keywords))
        .temperature(0.7)
        .max_output_tokens(8192)
}

/// Title used when the user left the invention title blank.
pub fn fallback_title(input_text: &str) -> String {
    let first = input_text.split(',').next().map(str::trim).unwrap_or_default();
    let base = if first.is_empty() {
        input_text.chars().take(30).collect::<String>()
    } else {
        first.to_string()
    };
    format!("{} 기반 시스템", base)
}

fn join_or_na(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}

fn cover_info(title: &str, inventor: &str, applicant: &str) -> String {
    let mut cover = format!("**발명의 명칭:** {}\n\n", title);
    if !inventor.is_empty() {
        cover.push_str(&format!("**발명자:** {}\n\n", inventor));
    }
    if !applicant.is_empty() {
        cover.push_str(&format!("**출원인:** {}\n\n", applicant));
    }
    cover
}

fn invention_lines(title: &str, inventor: &str, applicant: &str, input_text: &str) -> String {
    let mut lines = vec![format!("- 발명의 명칭: {}", title)];
    if !inventor.is_empty() {
        lines.push(format!("- 발명자: {}", inventor));
    }
    if !applicant.is_empty() {
        lines.push(format!("- 출원인: {}", applicant));
    }
    lines.push(format!("- 키워드: {}", input_text));
    lines.join("\n")
}

fn reference_block(patents: &[Patent]) -> String {
    if patents.is_empty() {
        return String::new();
    }
    let entries = patents
        .iter()
        .map(|p| {
            format!(
                "- {}: {}\n  요약: {}",
                p.patent_number,
                p.title,
                p.summary.as_deref().filter(|s| !s.is_empty()).unwrap_or("N/A")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n참고 특허:\n{}", entries)
}

pub fn revision_prompt(original: &str, feedback: &str) -> String {
    format!(
        "다음 특허 명세서를 피드백에 따라 개선해주세요:

=== 기존 명세서 ===
{original}

=== 피드백 ===
{feedback}

위 피드백을 반영하여 한국 특허청 형식에 맞게 개선된 특허 명세서를 작성하세요.
다음 구조를 따르되, 단락 번호나 도면 관련 내용은 제외하세요:

{SECTION_OUTLINE}"
    )
}

fn structured_prompt(
    title: &str,
    inventor: &str,
    applicant: &str,
    input_text: &str,
    data: &StructuredData,
    references: &[Patent],
) -> String {
    let info = invention_lines(title, inventor, applicant, input_text);
    let fields = join_or_na(&data.technical_field);
    let problems = join_or_na(&data.problems);
    let features = join_or_na(&data.features);
    let references = reference_block(references);
    let cover = cover_info(title, inventor, applicant);
    let field_text = if data.technical_field.is_empty() {
        "관련 기술".to_string()
    } else {
        data.technical_field.join(", ")
    };
    let first_problem = data.problems.first().map(String::as_str).unwrap_or("[문제점 1]");

    format!(
        "한국 특허청 형식의 완전한 특허 명세서를 작성하세요.

**발명 정보**
{info}
- 기술분야: {fields}
- 해결할 문제점: {problems}
- 핵심 기능: {features}{references}

**작성 지침**

다음 구조로 완전한 특허 명세서를 작성하세요. 단락 번호([0001] 등)와 도면 관련 내용은 제외합니다.
**중요: 각 섹션을 반드시 완결된 문장으로 마무리하고, 문장이 중간에 끊기지 않도록 하세요.**

# 표지 정보

{cover}
# 요약
발명의 핵심 내용을 500-700자로 요약하세요. 기술분야, 해결하려는 과제, 해결 수단, 효과를 포함하여 자연스러운 문장으로 작성하세요.

# 청구범위

**총 3-5개 청구항 작성 (독립항 1-2개, 종속항 2-3개)**

청구항 1
[독립항] 발명의 핵심 구성요소를 포함한 완전한 청구항을 작성하세요. \"~를 포함하는 시스템\" 또는 \"~하는 방법\" 형식으로 작성하세요.

청구항 2
[종속항] 청구항 1에 있어서, 가장 중요한 추가 특징을 기재하세요.

청구항 3
[종속항] 청구항 1 또는 2에 있어서, 또 다른 핵심 특징을 기재하세요.

청구항 4 (선택)
[독립항 또는 종속항] 발명의 다른 측면이나 추가 특징을 기재하세요.

청구항 5 (선택)
[종속항] 청구항 1 내지 4 중 어느 한 항에 있어서, 구체적인 실시 형태를 기재하세요.

# 발명의 설명

## 기술분야

본 발명은 {field_text}에 관한 것으로, 더욱 상세하게는 [구체적인 기술 내용]에 관한 것이다.

(2개 문단으로 기술분야를 설명하세요. 발명이 속하는 기술 분야와 그 중요성을 설명하세요.)

## 배경기술

종래의 기술에서는 [기존 기술의 내용]이 사용되어 왔다. 그러나 이러한 종래 기술은 다음과 같은 문제점을 가지고 있었다.

첫째, {first_problem}

둘째, [문제점 2에 대한 설명]

따라서, 이러한 문제점들을 해결할 수 있는 새로운 기술의 개발이 요구되고 있는 실정이다.

(3개 문단으로 배경기술과 문제점을 설명하세요.)

## 발명의 내용

### 해결하려는 과제

본 발명은 상기와 같은 종래 기술의 문제점을 해결하기 위하여 안출된 것으로, 그 목적은 [주요 목적]을 제공하는 것이다.

본 발명의 다른 목적은 [부가적인 목적]을 제공하는 것이다.

(2개 문단으로 해결하려는 과제를 명확히 제시하세요.)

### 과제의 해결 수단

상기 목적을 달성하기 위한 본 발명의 일 실시예에 따른 {title}은(는) [핵심 구성요소 1]; [핵심 구성요소 2]; 및 [핵심 구성요소 3]을 포함한다.

상기 [구성요소 1]은(는) [구체적인 기능과 작동 방식]을 수행한다.

상기 [구성요소 2]는 [구체적인 기능]을 수행하며, [작동 원리]를 특징으로 한다.

상기 [구성요소 3]은 [구체적인 기능]을 수행하며, 이를 통해 [달성되는 효과]를 제공한다.

**이 섹션을 반드시 완결된 문장으로 마무리하세요.**

(3-4개 문단으로 발명의 구성과 작동 원리를 설명하세요.)

### 발명의 효과

본 발명에 따르면, [주요 효과 1]을 달성할 수 있다.

또한, 본 발명은 [효과 2]를 제공함으로써, [실용적인 이점]을 가져온다.

더 나아가, 본 발명은 [효과 3]을 통해 [산업적 가치]를 제공한다.

(3개 문단으로 발명의 효과를 설명하세요.)

## 발명을 실시하기 위한 구체적인 내용

이하, 본 발명의 바람직한 실시예를 상세히 설명한다.

**[실시예 1]**

본 발명의 제1 실시예에 따른 {title}은(는) [구체적인 구성]을 포함한다.

[실시예 1의 상세한 설명 - 구성요소, 작동 방식, 구체적인 조건이나 수치 포함]

[실시예 1의 효과 및 특징]

**[실시예 2]**

본 발명의 제2 실시예는 제1 실시예와 유사하나, [차이점]을 특징으로 한다.

[실시예 2의 상세한 설명]

[실시예 2의 효과 및 특징]

**[산업상 이용가능성]**

본 발명은 [산업 분야]에 광범위하게 적용될 수 있다. 특히, [구체적인 응용 분야]에서 유용하게 활용될 수 있다.

또한, 본 발명은 [미래 발전 가능성]을 가지고 있어, [장기적인 산업적 가치]를 제공할 수 있다.

**이 섹션을 반드시 완결된 문장으로 마무리하세요.**

(실시예 2개를 각각 3개 문단으로 작성하고, 산업상 이용가능성을 2개 문단으로 작성하세요.)

**작성 시 주의사항:**
- 모든 섹션을 완결된 문장으로 마무리하세요
- 문장이 중간에 끊기지 않도록 주의하세요
- 자연스러운 문장으로 작성하세요
- 특허 전문 용어를 적절히 사용하세요
- 청구항은 완전한 문장으로 작성하세요"
    )
}

fn basic_prompt(title: &str, inventor: &str, applicant: &str, input_text: &str) -> String {
    let info = invention_lines(title, inventor, applicant, input_text);
    let cover = cover_info(title, inventor, applicant);
    format!(
        "한국 특허청 형식의 완전한 특허 명세서를 작성하세요.

**발명 정보**
{info}

**작성 지침**

다음 구조로 완전한 특허 명세서를 작성하세요. 단락 번호([0001] 등)와 도면 관련 내용은 제외합니다.

# 표지 정보

{cover}
# 요약
발명의 핵심 내용을 500-700자로 요약하세요.

# 청구범위
청구항 1-12 (독립항 2개, 종속항 10개)를 완전한 문장으로 작성하세요.

# 발명의 설명

## 기술분야
2-3개 문단

## 배경기술
4개 문단 (종래 기술과 문제점)

## 발명의 내용

### 해결하려는 과제
3개 문단

### 과제의 해결 수단
5개 문단 (구성과 작동 원리)

### 발명의 효과
4개 문단

## 발명을 실시하기 위한 구체적인 내용
실시예 4개 (각 3개 문단) + 산업상 이용가능성 (2개 문단)

모든 내용을 자연스러운 문장으로 작성하고, 특허 전문 용어를 사용하세요."
    )
}

/// Pick the revision, structured-memo or basic template for a generation request.
pub fn draft_prompt(request: &GenerateRequest) -> Result<String> {
    let input_text = request
        .input_text()
        .ok_or_else(|| Error::Validation("키워드 또는 설명이 필요합니다.".to_string()))?;

    let title = match request.invention_title.trim() {
        "" => fallback_title(input_text),
        title => title.to_string(),
    };
    let inventor = request.inventor.trim();
    let applicant = request.applicant.trim();

    if request.is_revision {
        if let (Some(original), Some(feedback)) = (
            request.original_content.as_deref().filter(|s| !s.is_empty()),
            request.feedback_comments.as_deref().filter(|s| !s.is_empty()),
        ) {
            return Ok(revision_prompt(original, feedback));
        }
    }

    match (&request.structured_data, request.mode) {
        (Some(data), GenerationMode::Memo) => Ok(structured_prompt(
            &title,
            inventor,
            applicant,
            input_text,
            data,
            &request.reference_patents,
        )),
        _ => Ok(basic_prompt(&title, inventor, applicant, input_text)),
    }
}

pub fn draft_request(request: &GenerateRequest) -> Result<GenerationRequest> {
    Ok(GenerationRequest::new(draft_prompt(request)?)
        .temperature(0.9)
        .top_k(40)
        .top_p(0.95)
        .max_output_tokens(8192))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_title() {
        assert_eq!(fallback_title("스마트팜, 센서"), "스마트팜 기반 시스템");
        let long = "가".repeat(40);
        assert_eq!(fallback_title(&format!(", {}", long)), format!(", {} 기반 시스템", "가".repeat(28)));
    }

    #[test]
    fn test_extraction_prompt_embeds_text() {
        let prompt = extraction_prompt("물 주기 자동화 메모");
        assert!(prompt.contains("텍스트: 물 주기 자동화 메모"));
        assert!(prompt.contains("\"technicalField\""));
        assert_eq!(extraction_request("x").temperature, 0.3);
    }

    #[test]
    fn test_missing_input_is_rejected() {
        let err = draft_prompt(&GenerateRequest::default()).unwrap_err();
        assert_eq!(err.user_message(), "키워드 또는 설명이 필요합니다.");
    }

    #[test]
    fn test_revision_prompt_selected() {
        let request = GenerateRequest {
            keywords: "센서".into(),
            is_revision: true,
            original_content: Some("기존 초안".into()),
            feedback_comments: Some("청구항을 늘려주세요".into()),
            ..Default::default()
        };
        let prompt = draft_prompt(&request).unwrap();
        assert!(prompt.contains("=== 기존 명세서 ===\n기존 초안"));
        assert!(prompt.contains("=== 피드백 ===\n청구항을 늘려주세요"));
    }

    #[test]
    fn test_revision_without_feedback_falls_through() {
        let request = GenerateRequest {
            keywords: "센서".into(),
            is_revision: true,
            original_content: Some("기존 초안".into()),
            ..Default::default()
        };
        let prompt = draft_prompt(&request).unwrap();
        assert!(prompt.contains("청구항 1-12"));
    }

    #[test]
    fn test_structured_prompt_includes_references() {
        let request = GenerateRequest {
            keywords: "스마트팜, 센서".into(),
            inventor: "홍길동".into(),
            mode: GenerationMode::Memo,
            structured_data: Some(StructuredData {
                technical_field: vec!["농업".into(), "IoT".into()],
                problems: vec!["인력 부족".into()],
                features: vec![],
            }),
            reference_patents: vec![Patent {
                patent_number: "KR1".into(),
                title: "관수 장치".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let prompt = draft_prompt(&request).unwrap();
        assert!(prompt.contains("- 발명의 명칭: 스마트팜 기반 시스템"));
        assert!(prompt.contains("- 발명자: 홍길동"));
        assert!(!prompt.contains("- 출원인:"));
        assert!(prompt.contains("- 기술분야: 농업, IoT"));
        assert!(prompt.contains("- 핵심 기능: N/A"));
        assert!(prompt.contains("참고 특허:\n- KR1: 관수 장치\n  요약: N/A"));
        assert!(prompt.contains("첫째, 인력 부족"));
        assert!(prompt.contains("**발명자:** 홍길동"));
    }

    #[test]
    fn test_refine_mode_uses_basic_prompt() {
        let request = GenerateRequest {
            description: Some("자동 관수 장치".into()),
            mode: GenerationMode::Refine,
            structured_data: Some(StructuredData::default()),
            ..Default::default()
        };
        let prompt = draft_prompt(&request).unwrap();
        assert!(prompt.contains("실시예 4개"));
        let sampling = draft_request(&request).unwrap();
        assert_eq!(sampling.top_k, Some(40));
    }
}
