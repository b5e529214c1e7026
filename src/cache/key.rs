//! Cache key derivation.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::transport::HttpMethod;

/// Deterministic fingerprint of a request: `METHOD:url:body:headers`
///
/// The body segment is the JSON serialization of the body (empty when
/// absent); the header segment is the JSON object of caller-supplied headers,
/// ordered by name.
pub fn fingerprint(
    method: HttpMethod,
    url: &str,
    body: Option<&Value>,
    headers: &BTreeMap<String, String>,
) -> String {
    let body = body
        .map(|b| serde_json::to_string(b).unwrap_or_default())
        .unwrap_or_default();
    let headers = serde_json::to_string(headers).unwrap_or_else(|_| "{}".to_string());

    format!("{method}:{url}:{body}:{headers}")
}
