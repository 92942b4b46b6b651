//! CGI-style view of a request.
//!
//! The trace log records every request the way a CGI runtime would expose
//! it: a flat set of server variables (`REQUEST_METHOD`, `SCRIPT_NAME`,
//! `PATH_INFO`, ...) with one `HTTP_*` entry per transported header.

use crate::request::Request;

/// Ordered map of CGI-style server variables for one request.
pub struct ServerVars {
    entries: Vec<(String, String)>,
}

impl ServerVars {
    /// Builds the variable set for a request.
    ///
    /// `SERVER_NAME`/`SERVER_PORT` are taken from the `Host` header when the
    /// client sent one; a CGI runtime would get them from its own config.
    pub fn build(
        rq: &Request,
        script_name: &str,
        path_info: &str,
        query_string: &str,
    ) -> ServerVars {
        let mut entries = vec![
            ("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string()),
            (
                "SERVER_SOFTWARE".to_string(),
                "mock-httpd (Rust)".to_string(),
            ),
            (
                "SERVER_PROTOCOL".to_string(),
                format!("HTTP/{}", rq.http_version()),
            ),
        ];

        let (server_name, server_port) = match rq.header_value("Host") {
            Some(host) => match host.rfind(':') {
                Some(pos) => (host[..pos].to_string(), host[pos + 1..].to_string()),
                None => (host.to_string(), "80".to_string()),
            },
            None => (String::new(), String::new()),
        };
        entries.push(("SERVER_NAME".to_string(), server_name));
        entries.push(("SERVER_PORT".to_string(), server_port));

        entries.push(("REQUEST_METHOD".to_string(), rq.method().to_string()));
        entries.push(("REQUEST_URI".to_string(), rq.url().to_string()));
        entries.push(("SCRIPT_NAME".to_string(), script_name.to_string()));
        entries.push(("PATH_INFO".to_string(), path_info.to_string()));
        entries.push(("QUERY_STRING".to_string(), query_string.to_string()));

        if let Some(addr) = rq.remote_addr() {
            entries.push(("REMOTE_ADDR".to_string(), addr.ip().to_string()));
            entries.push(("REMOTE_PORT".to_string(), addr.port().to_string()));
        }

        if let Some(ct) = rq.header_value("Content-Type") {
            entries.push(("CONTENT_TYPE".to_string(), ct.to_string()));
        }
        if let Some(cl) = rq.header_value("Content-Length") {
            entries.push(("CONTENT_LENGTH".to_string(), cl.to_string()));
        }

        for header in rq.headers() {
            let key = format!(
                "HTTP_{}",
                header
                    .field
                    .as_str()
                    .as_str()
                    .to_ascii_uppercase()
                    .replace('-', "_")
            );
            entries.push((key, header.value.to_string()));
        }

        ServerVars { entries }
    }

    #[cfg(test)]
    pub(crate) fn from_entries(entries: Vec<(String, String)>) -> ServerVars {
        ServerVars { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Human-readable multi-line dump for the trace log.
    pub fn dump(&self) -> String {
        let mut out = String::from("Array\n(\n");
        for (key, value) in &self.entries {
            out.push_str(&format!("    [{}] => {}\n", key, value));
        }
        out.push_str(")\n");
        out
    }
}

/// Extracts the transported headers from the server variables.
///
/// Only `HTTP_*` entries are considered. The prefix is stripped and the rest
/// is normalized to the canonical `Capitalized-Hyphenated` header name, so
/// `HTTP_CONTENT_TYPE` becomes `Content-Type`. Each result is a formatted
/// `"Name: value"` string.
pub fn extract_headers(vars: &ServerVars) -> Vec<String> {
    let mut headers = Vec::new();

    for (key, value) in vars.iter() {
        let raw = match key.strip_prefix("HTTP_") {
            Some(r) => r,
            None => continue,
        };

        let name = raw
            .split('_')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join("-");

        headers.push(format!("{}: {}", name, value));
    }

    headers
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    }
}
