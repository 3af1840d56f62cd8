use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("No patents found for keywords: {}", keywords.join(", "))]
    NoResults { keywords: Vec<String> },

    /// A non-success answer from the LLM or patent-search endpoint.
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        retry_after: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("File read error: {0}")]
    FileRead(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

/// Tag reported to API clients as `errorType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    BadRequest,
    Forbidden,
    NotFound,
    NoResults,
    QuotaExceeded,
    Network,
    Timeout,
    InvalidResponse,
    Parse,
    EmptyResponse,
    MissingApiKey,
    InvalidApiKey,
    FileRead,
    Api,
    Server,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::BadRequest => "bad_request",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::NoResults => "no_results",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Network => "network_error",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
            Self::Parse => "parse_error",
            Self::EmptyResponse => "empty_response",
            Self::MissingApiKey => "missing_api_key",
            Self::InvalidApiKey => "invalid_api_key",
            Self::FileRead => "file_read_error",
            Self::Api => "api_error",
            Self::Server => "server_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation | Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound | Self::NoResults => 404,
            Self::QuotaExceeded => 429,
            Self::Network => 503,
            Self::Timeout => 504,
            _ => 500,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Validation | Self::BadRequest => "요청 형식이 올바르지 않습니다.",
            Self::Forbidden => "API 키가 유효하지 않거나 권한이 없습니다.",
            Self::NotFound => "요청한 정보를 찾을 수 없습니다.",
            Self::NoResults => "검색 결과가 없습니다. 다른 키워드로 다시 시도해주세요.",
            Self::QuotaExceeded => "API 사용량 한도를 초과했습니다. 잠시 후 다시 시도해주세요.",
            Self::Network => "네트워크 연결에 문제가 있습니다. 인터넷 연결을 확인해주세요.",
            Self::Timeout => "요청 시간이 초과되었습니다. 잠시 후 다시 시도해주세요.",
            Self::InvalidResponse => "서버에서 예상치 못한 응답을 받았습니다. 잠시 후 다시 시도해주세요.",
            Self::Parse => "데이터 파싱에 실패했습니다.",
            Self::EmptyResponse => "생성된 텍스트가 없습니다.",
            Self::MissingApiKey => "API 키가 설정되지 않았습니다.",
            Self::InvalidApiKey => "유효하지 않은 API 키 형식입니다.",
            Self::FileRead => "저장된 파일을 읽는 중 오류가 발생했습니다.",
            Self::Api => "외부 API 호출 중 오류가 발생했습니다.",
            Self::Server => "서버 오류가 발생했습니다. 잠시 후 다시 시도해주세요.",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::NoResults { .. } => ErrorKind::NoResults,
            Error::Upstream { status, .. } => match status {
                400 => ErrorKind::BadRequest,
                401 | 403 => ErrorKind::Forbidden,
                429 => ErrorKind::QuotaExceeded,
                _ => ErrorKind::Server,
            },
            Error::Network(_) => ErrorKind::Network,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Error::Parse(_) | Error::Serialization(_) => ErrorKind::Parse,
            Error::EmptyResponse(_) => ErrorKind::EmptyResponse,
            Error::MissingCredentials(_) => ErrorKind::MissingApiKey,
            Error::InvalidCredentials(_) => ErrorKind::InvalidApiKey,
            Error::FileRead(_) | Error::Io(_) => ErrorKind::FileRead,
            Error::Search(_) => ErrorKind::Api,
            Error::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            Error::Http(e) if e.is_connect() || e.is_request() => ErrorKind::Network,
            Error::Http(_)
            | Error::Inference(_)
            | Error::Storage(_)
            | Error::External(_) => ErrorKind::Server,
        }
    }

    /// Message shown to the end user. Variants raised with user-facing Korean text
    /// keep it; everything else falls back to the tag's default.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg)
            | Error::NotFound(msg)
            | Error::Timeout(msg)
            | Error::EmptyResponse(msg)
            | Error::MissingCredentials(msg)
            | Error::InvalidCredentials(msg) => msg.clone(),
            _ => self.kind().default_message().to_string(),
        }
    }

    /// Retry delay advertised by the upstream for quota errors.
    pub fn retry_after(&self) -> Option<String> {
        match self {
            Error::Upstream { status: 429, retry_after, .. } => {
                Some(retry_after.clone().unwrap_or_else(|| "60s".to_string()))
            }
            _ => None,
        }
    }

    /// True for failures worth another attempt against the same endpoint.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout(_) => true,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_maps_to_tag() {
        let quota = Error::Upstream { status: 429, message: "quota".into(), retry_after: None };
        assert_eq!(quota.kind().as_str(), "quota_exceeded");
        assert_eq!(quota.kind().status_code(), 429);
        assert_eq!(quota.retry_after().as_deref(), Some("60s"));

        let forbidden = Error::Upstream { status: 403, message: "nope".into(), retry_after: None };
        assert_eq!(forbidden.kind().as_str(), "forbidden");
        assert_eq!(forbidden.retry_after(), None);

        let other = Error::Upstream { status: 502, message: "bad gateway".into(), retry_after: None };
        assert_eq!(other.kind().status_code(), 500);
        assert_eq!(other.kind().as_str(), "server_error");
        assert_eq!(Error::Search("down".into()).kind().as_str(), "api_error");
    }

    #[test]
    fn test_user_message_keeps_validation_text() {
        let err = Error::Validation("텍스트가 필요합니다.".into());
        assert_eq!(err.user_message(), "텍스트가 필요합니다.");
        assert_eq!(err.kind().status_code(), 400);

        let err = Error::NoResults { keywords: vec!["a".into()] };
        assert_eq!(err.kind().as_str(), "no_results");
        assert_eq!(err.user_message(), ErrorKind::NoResults.default_message());
    }

    #[test]
    fn test_io_errors_are_file_read_errors() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(err.kind(), ErrorKind::FileRead);
        assert!(!err.is_transient());
        assert!(Error::Network("reset".into()).is_transient());
    }
}
