use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};
use pd_core::{
    ExtractedData, GenerateRequest, ReloadReport, SaveSessionRequest, SavedSession, SearchOutcome,
    SearchQuery,
};
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::AppState;

// Loose request fields; each handler validates its own.

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub text: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub keywords: Option<Value>,
    #[serde(default)]
    pub num_of_rows: Option<Value>,
    #[serde(default)]
    pub page_no: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRequest {
    #[serde(default)]
    pub idx: Option<Value>,
    #[serde(default)]
    pub apply_number: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub invention_title: Option<Value>,
}

/// Non-blank string or number as text.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Positive integer given as a number or numeric string.
fn positive_of(value: Option<&Value>) -> Option<i64> {
    let n = match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (n > 0).then_some(n)
}

pub async fn extract_keywords(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<ExtractRequest>,
) -> ApiResult<Json<ExtractedData>> {
    let Some(text) = text_of(request.text.as_ref()) else {
        return Err(ApiError::validation("텍스트가 필요합니다."));
    };

    let data = pd_inference::extract_invention_data(state.inference_model.as_ref(), &text).await?;
    info!("🔑 Extracted {} keywords", data.keywords.len());
    Ok(Json(data))
}

pub async fn generate_patent(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<GenerateRequest>,
) -> ApiResult<Json<Value>> {
    let draft = pd_inference::generate_draft(state.inference_model.as_ref(), &request).await?;
    info!("📝 Generated draft ({} chars)", draft.chars().count());
    Ok(Json(json!({ "result": draft })))
}

pub async fn search_patents(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<SearchRequest>,
) -> ApiResult<Json<SearchOutcome>> {
    let keywords: Vec<String> = match &request.keywords {
        Some(Value::Array(items)) => items.iter().filter_map(|k| text_of(Some(k))).collect(),
        _ => Vec::new(),
    };
    if keywords.is_empty() {
        return Err(ApiError::validation("키워드가 필요합니다."));
    }

    let mut query = SearchQuery::new(keywords);
    if let Some(rows) = positive_of(request.num_of_rows.as_ref()) {
        query.num_of_rows = u32::try_from(rows).unwrap_or(u32::MAX);
    }
    if let Some(page) = positive_of(request.page_no.as_ref()) {
        query.page_no = u32::try_from(page).unwrap_or(u32::MAX);
    }

    let outcome = pd_search::search_with_keyword_reduction(state.search.as_ref(), &query).await?;
    Ok(Json(outcome))
}

pub async fn patent_detail(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<DetailRequest>,
) -> ApiResult<Json<Value>> {
    let idx = positive_of(request.idx.as_ref());
    let apply_number = text_of(request.apply_number.as_ref());
    if idx.is_none() && apply_number.is_none() {
        return Err(ApiError::validation("idx 또는 applyNumber가 필요합니다."));
    }

    match state.search.detail(idx, apply_number.as_deref()).await {
        Ok(Some(patent)) => Ok(Json(json!({ "patent": patent }))),
        Ok(None) => Err(ApiError::not_found("특허 상세 정보를 찾을 수 없습니다.")),
        Err(e) => {
            error!("Error fetching patent detail: {}", e);
            Err(ApiError::api("특허 상세 정보 조회 중 오류가 발생했습니다.", e.to_string()))
        }
    }
}

pub async fn save_patent(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<SaveSessionRequest>,
) -> ApiResult<Json<Value>> {
    let session = SavedSession::assemble(request, pd_storage::generate_id(), Utc::now())?;
    state.storage.save(&session).await?;
    info!("💾 Saved session {}", session.id);

    Ok(Json(json!({
        "success": true,
        "id": session.id,
        "message": "저장되었습니다.",
    })))
}

/// Section cards and structured summary of a draft.
pub async fn summarize_draft(JsonBody(request): JsonBody<SummaryRequest>) -> ApiResult<Json<Value>> {
    let Some(content) = text_of(request.content.as_ref()) else {
        return Err(ApiError::validation("초안 내용이 필요합니다."));
    };
    let title = text_of(request.invention_title.as_ref()).unwrap_or_default();

    Ok(Json(json!({
        "summary": pd_inference::draft::parse_structured_summary(&content, &title),
        "sections": pd_inference::draft::parse_draft_sections(&content),
    })))
}

pub async fn list_saved(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let patents = state.storage.list().await?;
    Ok(Json(json!({
        "count": patents.len(),
        "patents": patents,
    })))
}

pub async fn get_saved(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SavedSession>> {
    Ok(Json(state.storage.get(&id).await?))
}

pub async fn delete_saved(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.storage.delete(&id).await?;
    info!("🗑️ Deleted session {}", id);
    Ok(Json(json!({
        "success": true,
        "message": "삭제되었습니다.",
    })))
}

pub async fn reload_patents(State(state): State<Arc<AppState>>) -> (axum::http::StatusCode, Json<ReloadReport>) {
    match state.search.reload().await {
        Ok(report) if report.success => (axum::http::StatusCode::OK, Json(report)),
        Ok(report) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(report)),
        Err(e) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(ReloadReport {
                success: false,
                count: 0,
                message: e.user_message(),
            }),
        ),
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.inference_model.name(),
        "search": state.search.name(),
    }))
}
