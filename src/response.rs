use crate::common::{Header, HttpVersion, StatusCode};
use std::io::{Result as IoResult, Write};
use std::time::SystemTime;

/// Object representing an HTTP response.
///
/// A response always carries its full body in memory; the fixture only ever
/// sends short canned strings. Note that unlike a regular HTTP server, the
/// body is written even for responses to `HEAD` requests: the surrounding
/// test harness observes it.
pub struct Response {
    status_code: StatusCode,
    headers: Vec<Header>,
    data: Vec<u8>,
}

impl Response {
    pub fn new(status_code: StatusCode, headers: Vec<Header>, data: Vec<u8>) -> Response {
        Response {
            status_code,
            headers,
            data,
        }
    }

    /// Builds a 200 response from a body.
    pub fn from_data<D>(data: D) -> Response
    where
        D: Into<Vec<u8>>,
    {
        Response::new(StatusCode(200), Vec::new(), data.into())
    }

    /// Builds a 200 response with a text body.
    pub fn from_string<S>(data: S) -> Response
    where
        S: Into<String>,
    {
        Response::from_data(data.into().into_bytes())
    }

    /// Builds an empty response with the given status code.
    pub fn empty<S>(status_code: S) -> Response
    where
        S: Into<StatusCode>,
    {
        Response::new(status_code.into(), Vec::new(), Vec::new())
    }

    /// Returns the same response, but with an additional header.
    pub fn with_header(mut self, header: Header) -> Response {
        self.headers.push(header);
        self
    }

    /// Returns the same response, but with a different status code.
    pub fn with_status_code<S>(mut self, code: S) -> Response
    where
        S: Into<StatusCode>,
    {
        self.status_code = code.into();
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code.clone()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Writes the complete response to `writer`.
    ///
    /// `Server`, `Date` and `Content-Length` are filled in unless the caller
    /// set them explicitly. If `close` is true a `Connection: close` header
    /// is emitted.
    pub fn raw_print<W: Write>(
        &self,
        mut writer: W,
        version: HttpVersion,
        close: bool,
    ) -> IoResult<()> {
        write!(
            writer,
            "HTTP/{} {} {}\r\n",
            version,
            self.status_code.as_u16(),
            self.status_code.default_reason_phrase()
        )?;

        if !self.headers.iter().any(|h| h.field.equiv("Server")) {
            write!(writer, "Server: mock-httpd (Rust)\r\n")?;
        }

        if !self.headers.iter().any(|h| h.field.equiv("Date")) {
            write!(writer, "Date: {}\r\n", httpdate::fmt_http_date(SystemTime::now()))?;
        }

        if !self.headers.iter().any(|h| h.field.equiv("Content-Length")) {
            write!(writer, "Content-Length: {}\r\n", self.data.len())?;
        }

        for header in &self.headers {
            write!(writer, "{}: {}\r\n", header.field, header.value)?;
        }

        if close {
            write!(writer, "Connection: close\r\n")?;
        }

        write!(writer, "\r\n")?;
        writer.write_all(&self.data)?;
        writer.flush()
    }
}

#[cfg(test)]
mod test {
    use super::Response;
    use crate::common::HttpVersion;

    #[test]
    fn test_raw_print_contains_body_and_length() {
        let response = Response::from_string("hello");

        let mut out = Vec::new();
        response.raw_print(&mut out, HttpVersion(1, 1), false).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn test_connection_close_header() {
        let response = Response::empty(204);

        let mut out = Vec::new();
        response.raw_print(&mut out, HttpVersion(1, 0), true).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.0 204 No Content\r\n"));
        assert!(text.contains("Connection: close\r\n"));
    }
}
