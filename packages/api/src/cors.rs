use axum::http::{HeaderValue, Method, request::Parts};
use regex::Regex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Browser origins allowed to call the API. Empty means any origin.
#[derive(Clone, Debug, Default)]
pub struct CorsPolicy {
    allowed: Vec<Regex>,
}

impl CorsPolicy {
    pub fn new(allowed: Vec<Regex>) -> Self {
        Self { allowed }
    }

    /// Comma-separated regexes. Each must match the whole origin.
    pub fn parse(patterns: &str) -> Result<Self, regex::Error> {
        let allowed = patterns
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Regex::new(&format!("^(?:{p})$")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { allowed })
    }

    pub fn from_env() -> Result<Self, regex::Error> {
        Self::parse(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default())
    }

    pub fn is_permissive(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.is_permissive() || self.allowed.iter().any(|re| re.is_match(origin))
    }

    pub fn layer(&self) -> CorsLayer {
        if self.is_permissive() {
            return CorsLayer::permissive();
        }

        let policy = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &Parts| {
                    origin.to_str().is_ok_and(|origin| policy.allows(origin))
                },
            ))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    }
}
