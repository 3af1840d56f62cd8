use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use pd_core::{GenerationRequest, Result};
use super::InferenceModel;

const CANNED_EXTRACTION: &str = r#"{
  "keywords": ["센서", "데이터 수집", "자동 제어", "무선 통신", "모니터링", "알림", "분석"],
  "technicalField": ["IoT", "자동화", "데이터 분석"],
  "problems": ["수작업 점검의 비효율", "이상 상황 인지 지연", "데이터 활용 부족"],
  "features": ["실시간 센서 모니터링", "조건 기반 자동 제어", "모바일 알림"]
}"#;

const CANNED_PATENTS: &str = r#"{
  "patents": [
    {
      "patentNumber": "KR10-2023-0000001",
      "title": "센서 기반 자동 제어 시스템",
      "applicant": "예시 주식회사",
      "applicationDate": "2023-01-01",
      "summary": "센서 데이터를 수집하여 장치를 자동으로 제어하는 시스템이다."
    }
  ]
}"#;

const CANNED_DRAFT: &str = "# 발명의 명칭\n센서 기반 자동 제어 시스템\n\n# 요약\n본 발명은 센서 데이터를 이용하여 장치를 자동으로 제어하는 시스템에 관한 것이다.\n\n# 청구범위\n【청구항 1】 센서부와 제어부를 포함하는 시스템.\n\n# 발명의 설명\n## 기술분야\n본 발명은 IoT 자동화 기술에 관한 것이다.\n";

/// Offline model: replays scripted responses, then falls back to canned text
/// chosen by the kind of prompt.
#[derive(Default)]
pub struct DummyModel {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(self, responses: Vec<String>) -> Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.extend(responses);
        }
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn canned(prompt: &str) -> &'static str {
        if prompt.contains("\"patents\"") {
            CANNED_PATENTS
        } else if prompt.contains("\"keywords\"") {
            CANNED_EXTRACTION
        } else {
            CANNED_DRAFT
        }
    }
}

#[async_trait::async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }
        let scripted = self.responses.lock().ok().and_then(|mut q| q.pop_front());
        Ok(scripted.unwrap_or_else(|| Self::canned(&request.prompt).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts;

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new().with_responses(vec!["first".into()]);

        let first = model.generate(&GenerationRequest::new("anything")).await.unwrap();
        assert_eq!(first, "first");

        let extraction = model.generate(&prompts::extraction_request("메모")).await.unwrap();
        assert!(extraction.contains("technicalField"));

        let draft = model.generate(&GenerationRequest::new("명세서 작성")).await.unwrap();
        assert!(draft.contains("청구항 1"));

        assert_eq!(model.prompts().len(), 3);
    }
}
