//! Biznavi keyword search and patent detail API.

use std::fmt;
use std::time::Duration;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use pd_core::{Error, Patent, PatentSearch, Result, SearchQuery};
use crate::SearchConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.biznavi.co.kr/api/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

pub struct BiznaviClient {
    client: Client,
    base_url: String,
    x_token: String,
    gw_token: String,
    retry_delay: Duration,
}

impl fmt::Debug for BiznaviClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiznaviClient")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .field("x_token", &"<redacted>")
            .field("gw_token", &"<redacted>")
            .finish()
    }
}

impl BiznaviClient {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let (Some(x_token), Some(gw_token)) = (config.x_token.clone(), config.gw_token.clone()) else {
            error!("Biznavi API tokens not found");
            return Err(Error::MissingCredentials(
                "API 토큰이 설정되지 않았습니다. 환경변수 BIZNAVI_TOKEN (또는 BIZNAVI_X_TOKEN)과 BIZNAVI_GW_TOKEN을 설정해주세요."
                    .to_string(),
            ));
        };

        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            x_token,
            gw_token,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Base wait between attempts; attempt `n` waits `n` times this.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-Requested-With", "XMLHttpRequest")
            .header("User-Agent", "Chrome")
            .header("x-token", &self.x_token)
            .header("gwtoken", &self.gw_token)
    }

    /// Send with retries on connection failures and, when asked, on 5xx answers.
    async fn send_with_retry<F>(&self, label: &str, retry_server_errors: bool, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("[{}] API call attempt {}/{}", label, attempt, MAX_ATTEMPTS);

            match build().send().await {
                Ok(response)
                    if retry_server_errors && response.status().is_server_error() && attempt < MAX_ATTEMPTS =>
                {
                    warn!(
                        "[{}] Server error ({}) on attempt {}/{}, retrying",
                        label,
                        response.status(),
                        attempt,
                        MAX_ATTEMPTS
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if is_network_error(&e) && attempt < MAX_ATTEMPTS => {
                    warn!("[{}] Network error on attempt {}, retrying: {}", label, attempt, e);
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.retry_delay * attempt).await;
        }
    }
}

fn is_network_error(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

/// Message from a failed answer: JSON `message` or `error`, else the body itself.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = json.get(key).and_then(Value::as_str).filter(|m| !m.is_empty()) {
                return msg.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        format!("API 호출 실패: {}", status)
    } else {
        body.to_string()
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// First non-blank scalar among `keys`, as text.
fn text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_present<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| item.get(key)).find(|v| is_present(v))
}

/// `YYYYMMDD` becomes `YYYY-MM-DD`; anything else is returned trimmed.
pub fn format_date(raw: &str) -> Option<String> {
    let date = raw.trim();
    if date.is_empty() {
        return None;
    }
    if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
        return Some(format!("{}-{}-{}", &date[..4], &date[4..6], &date[6..]));
    }
    Some(date.to_string())
}

fn date(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(item, &[*key]).and_then(|d| format_date(&d)))
}

/// Plain text from an HTML fragment, or from the text-bearing fields of a structured value.
pub fn strip_html(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(strip_html).collect::<Vec<_>>().join(" "),
        Value::Object(map) => {
            if let Some(inner) = ["text", "content", "description", "value"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find(|v| is_present(v))
            {
                return strip_html(inner);
            }
            map.values()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        }
        Value::String(html) => HTML_TAG
            .replace_all(html, "")
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
            .trim()
            .to_string(),
        other => other.to_string(),
    }
}

fn html_text(item: &Value, keys: &[&str]) -> Option<String> {
    first_present(item, keys)
        .map(strip_html)
        .filter(|t| !t.is_empty())
}

fn value_list(item: &Value, key: &str) -> Vec<Value> {
    item.get(key).and_then(Value::as_array).cloned().unwrap_or_default()
}

/// Items from a search answer: a bare array or one under `data`, `items`, `result` or `list`.
fn search_items(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            for key in ["data", "items", "result", "list"] {
                if let Some(Value::Array(items)) = map.remove(key) {
                    return items;
                }
            }
            let keys: Vec<&String> = map.keys().collect();
            warn!("Unexpected API response structure, keys: {:?}", keys);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// Map one search result item.
pub fn map_search_item(item: Value) -> Patent {
    let patent_number = text(&item, &["register_number"])
        .or_else(|| text(&item, &["apply_number", "patentNumber", "applicationNumber"]))
        .unwrap_or_default();

    Patent {
        patent_number,
        title: text(&item, &["invention_name", "title", "inventionTitle", "발명의명칭", "특허명", "patent_title"])
            .unwrap_or_default(),
        applicant: text(&item, &["applicant", "applicantName", "출원인", "최종권리자", "applicant_name"]),
        application_date: date(&item, &["apply_at"])
            .or_else(|| text(&item, &["applicationDate", "출원일자", "출원일", "application_date"])),
        summary: text(&item, &["summary", "abstract", "요약", "요약문", "patent_summary"]),
        abstract_text: text(&item, &["abstract", "상세", "상세설명", "patent_abstract"]),
        inventor: text(&item, &["inventor", "inventorName", "발명자", "발명자명", "inventor_name"]),
        status: text(
            &item,
            &["now_grade", "sm_grade", "status", "legalStatus", "상태", "법적상태", "patent_status"],
        ),
        registration_date: date(&item, &["register_at"])
            .or_else(|| text(&item, &["registrationDate", "등록일자", "등록일", "registration_date"])),
        publication_number: text(&item, &["document_number", "publicationNumber", "공고번호", "publication_number"]),
        publication_date: text(&item, &["publicationDate", "공고일자", "공고일", "publication_date"]),
        english_title: text(&item, &["englishTitle", "영문발명의명칭", "english_title"]),
        classification_code: text(&item, &["classificationCode", "분류코드", "classification_code"]),
        claim_count: text(&item, &["claimCount", "청구항수", "claim_count"]),
        expiration_date: text(&item, &["expirationDate", "만료일자", "expiration_date"]),
        raw_data: Some(item),
        ..Default::default()
    }
}

/// Map a detail payload. Text sections arrive as HTML.
pub fn map_detail_item(item: Value) -> Patent {
    let biblio = item.get("bibliographyInfo").cloned().unwrap_or(Value::Null);
    let claim_list = value_list(&item, "claimList");

    Patent {
        patent_number: text(&item, &["apply_number", "patentNumber", "applicationNumber", "register_number"])
            .unwrap_or_default(),
        title: text(&item, &["invention_name", "title", "inventionTitle"]).unwrap_or_default(),
        applicant: text(&item, &["applicant", "applicantName"]).or_else(|| text(&biblio, &["applicant"])),
        application_date: date(&item, &["apply_at", "application_date"])
            .or_else(|| text(&item, &["applicationDate"]))
            .or_else(|| text(&biblio, &["apply_at"])),
        summary: html_text(&item, &["summary", "abstract", "요약", "요약문", "summary_text"]),
        abstract_text: html_text(
            &item,
            &["abstract", "detail", "상세", "상세설명", "description", "detail_text", "full_text"],
        ),
        inventor: text(&item, &["inventor", "inventorName", "발명자"]).or_else(|| text(&biblio, &["inventor"])),
        status: text(&item, &["now_grade", "sm_grade", "status"]),
        registration_date: date(&item, &["register_at", "registration_date"])
            .or_else(|| text(&item, &["registrationDate"]))
            .or_else(|| text(&biblio, &["register_at"])),
        publication_number: text(
            &item,
            &["publication_number", "publicationNumber", "document_number", "공고번호", "open_number"],
        )
        .or_else(|| text(&biblio, &["publication_number"])),
        publication_date: date(&item, &["publication_at", "publication_date"])
            .or_else(|| text(&item, &["publicationDate", "공고일자"]))
            .or_else(|| text(&biblio, &["publication_at"])),
        english_title: text(&item, &["englishTitle", "english_title", "영문발명의명칭", "english_name"]),
        classification_code: text(
            &item,
            &["classification_code", "classificationCode", "분류코드", "ipc_code", "ipc"],
        ),
        claim_count: text(&item, &["claim_count", "claimCount", "청구항수", "claims_count"])
            .or_else(|| (!claim_list.is_empty()).then(|| claim_list.len().to_string())),
        expiration_date: date(&item, &["expiration_at", "expiration_date"])
            .or_else(|| text(&item, &["expirationDate", "만료일자"])),
        claim_list,
        bibliography_info: Some(biblio).filter(|b| !b.is_null()),
        ipc_info_list: value_list(&item, "ipcInfoList"),
        cpc_info_list: value_list(&item, "cpcInfoList"),
        family_list: value_list(&item, "familyList"),
        technical_field: html_text(&item, &["technialField", "technicalField", "기술분야"]),
        background_art: html_text(&item, &["backgroundArt", "배경기술"]),
        tech_problem: html_text(&item, &["techProblem", "기술적과제", "해결하려는과제"]),
        tech_solution: html_text(&item, &["techSolution", "기술적해결수단", "해결수단"]),
        advantageous_effects: html_text(&item, &["advantageousEffects", "유리한효과", "발명의효과"]),
        description_of_drawings: html_text(&item, &["descriptionOfDrawings", "도면의간단한설명"]),
        description_of_embodiments: html_text(
            &item,
            &["descriptionOfEmbodiments", "실시예", "실시예에대한상세한설명"],
        ),
        raw_data: Some(item),
        extra: Default::default(),
    }
}

#[async_trait]
impl PatentSearch for BiznaviClient {
    fn name(&self) -> &str {
        "biznavi"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Patent>> {
        let url = format!("{}/common/patent/selectKeyword", self.base_url);
        let form = [
            ("keyword", query.keywords.join(" and ")),
            ("page", query.page_no.to_string()),
            ("count", query.num_of_rows.to_string()),
        ];

        let response = self
            .send_with_retry("patent-search", false, || self.authorized(self.client.post(&url)).form(&form))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("[patent-search] API error: {}", status);
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: error_message(status, &body),
                retry_after: None,
            });
        }

        let data: Value = response.json().await?;
        let patents: Vec<Patent> = search_items(data).into_iter().map(map_search_item).collect();
        info!("[patent-search] Parsed {} patents from API response", patents.len());
        Ok(patents)
    }

    async fn detail(&self, _idx: Option<i64>, apply_number: Option<&str>) -> Result<Option<Patent>> {
        let Some(apply_number) = apply_number.map(str::trim).filter(|n| !n.is_empty()) else {
            warn!("[patent-detail] No applyNumber provided");
            return Ok(None);
        };
        let url = format!("{}/common/patent/{}/detail?&nation=KR", self.base_url, apply_number);

        let response = self
            .send_with_retry("patent-detail", true, || {
                self.authorized(self.client.get(&url)).header("Content-Type", "application/json")
            })
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("[patent-detail] Patent detail not found: {}", apply_number);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("[patent-detail] API error: {} {}", status, body);
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: format!("API 호출 실패: {}", status),
                retry_after: None,
            });
        }

        let data: Value = response.json().await?;
        let item = ["data", "item", "result"]
            .iter()
            .filter_map(|key| data.get(*key))
            .find(|v| is_present(v))
            .cloned()
            .unwrap_or(data);
        if !is_present(&item) {
            warn!("[patent-detail] No detail data in response");
            return Ok(None);
        }

        Ok(Some(map_detail_item(item)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Form, Path},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> BiznaviClient {
        let config = SearchConfig {
            base_url: Some(base_url),
            x_token: Some("x-secret".into()),
            gw_token: Some("gw-secret".into()),
            ..Default::default()
        };
        BiznaviClient::new(&config).unwrap().with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("20230115").as_deref(), Some("2023-01-15"));
        assert_eq!(format_date(" 2023.01.15 ").as_deref(), Some("2023.01.15"));
        assert_eq!(format_date("  "), None);
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html(&json!("<p>A&nbsp;&amp;&lt;B&gt;</p>")), "A &<B>");
        assert_eq!(strip_html(&json!(["<b>one</b>", "two"])), "one two");
        assert_eq!(strip_html(&json!({ "content": "<i>inner</i>" })), "inner");
        assert_eq!(strip_html(&json!({ "a": "x", "b": 1, "c": "y" })), "x y");
        assert_eq!(strip_html(&Value::Null), "");
    }

    #[test]
    fn test_map_search_item_fallbacks() {
        let patent = map_search_item(json!({
            "register_number": " ",
            "apply_number": "1020230001234",
            "invention_name": "스마트 관수 장치",
            "apply_at": "20230115",
            "sm_grade": "등록",
            "now_grade": "소멸",
            "idx": 42
        }));
        assert_eq!(patent.patent_number, "1020230001234");
        assert_eq!(patent.application_date.as_deref(), Some("2023-01-15"));
        assert_eq!(patent.status.as_deref(), Some("소멸"));
        assert_eq!(patent.raw_data.unwrap()["idx"], 42);

        let registered = map_search_item(json!({ "register_number": "1012345670000", "apply_number": "1" }));
        assert_eq!(registered.patent_number, "1012345670000");
    }

    #[test]
    fn test_missing_tokens() {
        let err = BiznaviClient::new(&SearchConfig::default()).unwrap_err();
        assert_eq!(err.kind().as_str(), "missing_api_key");
        let debug = format!("{:?}", client("http://localhost".into()));
        assert!(!debug.contains("x-secret"));
    }

    #[tokio::test]
    async fn test_search_sends_form_and_headers() {
        let router = Router::new().route(
            "/common/patent/selectKeyword",
            post(|headers: HeaderMap, Form(form): Form<HashMap<String, String>>| async move {
                assert_eq!(headers["x-token"], "x-secret");
                assert_eq!(headers["gwtoken"], "gw-secret");
                assert_eq!(headers["x-requested-with"], "XMLHttpRequest");
                assert_eq!(form["keyword"], "센서 and 관수");
                assert_eq!(form["page"], "2");
                assert_eq!(form["count"], "5");
                Json(json!({ "data": [{ "apply_number": "A1", "invention_name": "관수" }] }))
            }),
        );
        let client = client(serve(router).await);
        let query = SearchQuery {
            keywords: vec!["센서".into(), "관수".into()],
            num_of_rows: 5,
            page_no: 2,
        };

        let patents = client.search(&query).await.unwrap();
        assert_eq!(patents.len(), 1);
        assert_eq!(patents[0].title, "관수");
    }

    #[tokio::test]
    async fn test_search_error_message() {
        let router = Router::new().route(
            "/common/patent/selectKeyword",
            post(|| async { (AxumStatus::FORBIDDEN, Json(json!({ "message": "토큰 만료" }))) }),
        );
        let err = client(serve(router).await)
            .search(&SearchQuery::new(vec!["a".into()]))
            .await
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "forbidden");
        assert!(err.to_string().contains("토큰 만료"));
    }

    #[tokio::test]
    async fn test_search_unreachable_host_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}", addr))
            .search(&SearchQuery::new(vec!["a".into()]))
            .await
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "network_error");
        assert_eq!(err.kind().status_code(), 503);
    }

    #[tokio::test]
    async fn test_search_retries_dropped_connections() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        });

        let err = client(format!("http://{}", addr))
            .search(&SearchQuery::new(vec!["a".into()]))
            .await
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "network_error");
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_search_server_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/common/patent/selectKeyword",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (AxumStatus::INTERNAL_SERVER_ERROR, "down")
                }
            }),
        );
        let err = client(serve(router).await)
            .search(&SearchQuery::new(vec!["a".into()]))
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, Error::Upstream { status: 500, ref message, .. } if message == "down"));
    }

    #[tokio::test]
    async fn test_detail_retries_server_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/common/patent/:number/detail",
            get(move |Path(number): Path<String>| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        return (AxumStatus::BAD_GATEWAY, Json(json!({})));
                    }
                    (
                        AxumStatus::OK,
                        Json(json!({ "data": {
                            "apply_number": number,
                            "invention_name": "관수 장치",
                            "summary": "<p>요약&nbsp;내용</p>",
                            "claimList": [{ "claim": 1 }, { "claim": 2 }],
                            "bibliographyInfo": { "applicant": "농업회사" }
                        }})),
                    )
                }
            }),
        );
        let client = client(serve(router).await);

        let patent = client.detail(None, Some("1020230001234")).await.unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(patent.patent_number, "1020230001234");
        assert_eq!(patent.summary.as_deref(), Some("요약 내용"));
        assert_eq!(patent.claim_count.as_deref(), Some("2"));
        assert_eq!(patent.applicant.as_deref(), Some("농업회사"));
    }

    #[tokio::test]
    async fn test_detail_not_found_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/common/patent/:number/detail",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    AxumStatus::NOT_FOUND
                }
            }),
        );
        let client = client(serve(router).await);

        assert!(client.detail(Some(1), Some("missing")).await.unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(client.detail(Some(1), None).await.unwrap().is_none());
    }
}
