use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Transport failure, timeout, undecodable body or non-2xx status.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Well-formed response lacking an expected key, e.g. a currency the
    /// coin is not priced in.
    #[error("missing field `{field}` in {endpoint} response")]
    MissingField { endpoint: String, field: String },

    /// A series entry that is not a `[instant, value]` numeric pair.
    #[error("malformed series entry at index {index}: {reason}")]
    MalformedData { index: usize, reason: String },

    #[error("currency `{0}` is not supported upstream")]
    UnsupportedCurrency(String),

    #[error("no coin matches `{0}`")]
    UnknownCoin(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl MarketDataError {
    pub(crate) fn missing(endpoint: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            endpoint: endpoint.into(),
            field: field.into(),
        }
    }

    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedData {
            index,
            reason: reason.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_missing_field(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedData { .. })
    }
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("http status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("undecodable response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for NetworkError {
    fn from(e: reqwest::Error) -> Self {
        let url = e
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if e.is_timeout() {
            Self::Timeout { url }
        } else if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
                url,
            }
        } else if e.is_decode() {
            Self::Body(e)
        } else {
            Self::Transport(e)
        }
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.into())
    }
}
