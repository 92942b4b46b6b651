use crate::common::{Header, HttpVersion, Method, StatusCode};
use crate::response::Response;
use crate::util::EqualReader;
use log::error;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::SocketAddr;

/// Represents an HTTP request made by a client.
///
/// The body is read in full while the request is being built, framed either
/// by `Content-Length` or by chunked transfer encoding. Bodies in this
/// fixture are small test payloads, and buffering them keeps the connection
/// positioned at the start of the next request.
///
/// # Automatic cleanup
///
/// If a `Request` is dropped without `respond` being called, an empty
/// response with a 500 status code is automatically sent back to the client.
pub struct Request {
    method: Method,
    url: String,
    http_version: HttpVersion,
    headers: Vec<Header>,
    body: Vec<u8>,
    remote_addr: Option<SocketAddr>,

    // if this writer is empty, the request has been answered
    response_writer: Option<Box<dyn Write + Send>>,

    // true if the response must carry `Connection: close`
    must_close: bool,
}

/// Builds a new request, reading the body off `source`.
pub(crate) fn new_request<R, W>(
    method: Method,
    url: String,
    version: HttpVersion,
    headers: Vec<Header>,
    remote_addr: Option<SocketAddr>,
    mut source: R,
    mut writer: W,
) -> io::Result<Request>
where
    R: Read,
    W: Write + Send + 'static,
{
    let transfer_encoding = headers
        .iter()
        .find(|h| h.field.equiv("Transfer-Encoding"))
        .map(|h| h.value.clone());

    // if a transfer encoding is specified, Content-Length must be
    // ignored (RFC 2616 #4.4)
    let content_length = if transfer_encoding.is_some() {
        None
    } else {
        headers
            .iter()
            .find(|h| h.field.equiv("Content-Length"))
            .and_then(|h| h.value.as_str().trim().parse::<usize>().ok())
    };

    // the client may wait for a `100 Continue` before sending the body
    let expects_continue = headers
        .iter()
        .find(|h| h.field.equiv("Expect"))
        .map_or(false, |h| h.value.as_str().eq_ignore_ascii_case("100-continue"));

    if expects_continue && (content_length.unwrap_or(0) > 0 || transfer_encoding.is_some()) {
        write!(
            writer,
            "HTTP/{} {} {}\r\n\r\n",
            version,
            100,
            StatusCode(100).default_reason_phrase()
        )?;
        writer.flush()?;
    }

    let mut body = Vec::new();
    if transfer_encoding.is_some() {
        // "chunked" is always applied over the message (RFC 2616 #3.6)
        chunked_transfer::Decoder::new(source).read_to_end(&mut body)?;
    } else if let Some(len) = content_length {
        if len > 0 {
            EqualReader::new(source.by_ref(), len).read_to_end(&mut body)?;
        }
    }

    Ok(Request {
        method,
        url,
        http_version: version,
        headers,
        body,
        remote_addr,
        response_writer: Some(Box::new(writer)),
        must_close: false,
    })
}

impl Request {
    /// Returns the method requested by the client (eg. `GET`, `POST`, etc.).
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the resource requested by the client, as written on the
    /// request line (path plus query string).
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns a list of all headers sent by the client.
    #[inline]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Returns the value of the given header, if present.
    pub fn header_value(&self, field: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.field.equiv(field))
            .map(|h| h.value.as_str())
    }

    /// Returns the HTTP version of the request.
    #[inline]
    pub fn http_version(&self) -> HttpVersion {
        self.http_version
    }

    /// Returns the raw body of the request.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the address of the client that sent this request.
    #[inline]
    pub fn remote_addr(&self) -> Option<&SocketAddr> {
        self.remote_addr.as_ref()
    }

    pub(crate) fn set_must_close(&mut self, close: bool) {
        self.must_close = close;
    }

    /// Sends a response to this request.
    ///
    /// The body of the response is always written, even when responding to a
    /// `HEAD` request: the harness on the other side inspects it.
    pub fn respond(mut self, response: Response) -> io::Result<()> {
        self.respond_impl(response)
    }

    fn respond_impl(&mut self, response: Response) -> io::Result<()> {
        let mut writer = match self.response_writer.take() {
            Some(w) => w,
            None => return Ok(()),
        };

        match response.raw_print(writer.by_ref(), self.http_version, self.must_close) {
            Ok(()) => (),
            Err(ref err) if connection_lost(err.kind()) => (),
            Err(err) => {
                error!("error while sending answer: {}", err);
                return Err(err);
            }
        }

        writer.flush().ok();
        Ok(())
    }
}

fn connection_lost(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
    )
}

impl fmt::Debug for Request {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "Request({} {})", self.method, self.url)
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if self.response_writer.is_some() {
            let response = Response::empty(500);
            self.respond_impl(response).ok();
        }
    }
}
