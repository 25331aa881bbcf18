use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("update stream broken: {0}")]
    Stream(String),
    #[error("server error: {status} - {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed payload ({source}): {raw}")]
    Parse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("screenshot decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("backend rejected request: {0}")]
    Rejected(String),
    #[error("request superseded")]
    Cancelled,
}

impl DashboardError {
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        DashboardError::Network {
            url: url.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_carries_code_and_body() {
        let err = DashboardError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "goal store unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "server error: 500 Internal Server Error - goal store unavailable"
        );
    }
}
