use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::ErrorReport;

const MAX_LEN: usize = 32 * 1024;

fn redact_connection_url(input: &str) -> String {
    let Some(scheme_idx) = input.find("://") else {
        return input.to_string();
    };

    let rest = &input[scheme_idx + 3..];
    let Some(at_idx) = rest.find('@') else {
        return input.to_string();
    };

    let prefix = &input[..scheme_idx + 3];
    let suffix = &rest[at_idx + 1..];
    format!("{}[REDACTED]@{}", prefix, suffix)
}

fn redact_kv(input: &str, key: &str) -> String {
    let mut out = input.to_string();
    let needle = format!("{}=", key);
    let mut search_start = 0;
    while let Some(pos) = out[search_start..].find(&needle) {
        let value_start = search_start + pos + needle.len();
        let value_end = out[value_start..]
            .find(|c: char| c == '&' || c == ';' || c == ',' || c.is_whitespace())
            .map(|p| value_start + p)
            .unwrap_or(out.len());
        out.replace_range(value_start..value_end, "[REDACTED]");
        search_start = value_start + "[REDACTED]".len();
    }
    out
}

fn sanitize_text(input: String) -> String {
    let mut input = redact_connection_url(&input);
    for key in ["password", "secret", "token", "api_key"] {
        input = redact_kv(&input, key);
    }

    if input.len() > MAX_LEN {
        let mut end = MAX_LEN;
        while !input.is_char_boundary(end) {
            end -= 1;
        }
        input.truncate(end);
    }
    input
}

/// Logs reported errors under the id the client received in `x-error-id`.
pub async fn error_reporting_middleware(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let mut response = next.run(req).await;

    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };

    let summary = sanitize_text(report.summary);
    tracing::error!(
        error_id = %report.id,
        status_code = report.status_code,
        public_code = %report.public_code,
        method = %method,
        path = %path,
        "{}", summary
    );
    if let Some(details) = report.details.map(sanitize_text) {
        if !details.is_empty() {
            tracing::error!(error_id = %report.id, "details: {}", details);
        }
    }

    response
}
