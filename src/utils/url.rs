//! URL helpers for the council API.
//!
//! Base URLs come from user configuration and frequently carry a trailing
//! slash; endpoint paths are joined without producing `//`.

/// Strip trailing slashes from a configured base URL.
///
/// ```
/// use council::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8001/"), "http://localhost:8001");
/// assert_eq!(normalize_base_url("http://localhost:8001"), "http://localhost:8001");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join an API path onto the base URL.
///
/// ```
/// use council::utils::url::api_url;
///
/// assert_eq!(
///     api_url("http://localhost:8001/", "/api/models"),
///     "http://localhost:8001/api/models"
/// );
/// ```
pub fn api_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        path.trim_start_matches('/')
    )
}

/// Path of a conversation resource, optionally followed by a sub-resource.
pub fn conversation_path(conversation_id: &str, tail: Option<&str>) -> String {
    let id = encode_path_segment(conversation_id);
    match tail {
        Some(tail) => format!("api/conversations/{id}/{}", tail.trim_start_matches('/')),
        None => format!("api/conversations/{id}"),
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
