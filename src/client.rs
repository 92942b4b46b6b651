use crate::common::{HttpVersion, Method};
use crate::request::{new_request, Request};
use crate::response::Response;
use log::debug;
use std::io::{self, BufReader, BufWriter, Read};
use std::net::{SocketAddr, TcpStream};
use std::str::FromStr;

/// A `ClientConnection` wraps a socket to a client and yields the requests
/// that arrive on it, one at a time.
pub(crate) struct ClientConnection {
    // reading side of the socket
    reader: BufReader<TcpStream>,

    // writing side; cloned from the same socket
    write_socket: TcpStream,

    remote_addr: Option<SocketAddr>,

    // set to true when we know the previous request was the last one
    no_more_requests: bool,
}

/// Error that can happen when reading a request.
enum ReadError {
    WrongRequestLine,
    WrongHeader(HttpVersion),
    ReadIoError(io::Error),
}

impl ClientConnection {
    /// Creates a new `ClientConnection` that takes ownership of the stream.
    pub(crate) fn new(stream: TcpStream, remote_addr: SocketAddr) -> io::Result<ClientConnection> {
        let write_socket = stream.try_clone()?;

        Ok(ClientConnection {
            reader: BufReader::new(stream),
            write_socket,
            remote_addr: Some(remote_addr),
            no_more_requests: false,
        })
    }

    /// Reads one line, consuming the terminating CRLF.
    fn read_next_line(&mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        let mut prev_byte_was_cr = false;

        loop {
            let mut byte = [0u8; 1];
            if self.reader.read(&mut byte)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-line",
                ));
            }
            let byte = byte[0];

            if byte == b'\n' && prev_byte_was_cr {
                buf.pop(); // strip the CR
                return String::from_utf8(buf)
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "non-utf8 line"));
            }

            prev_byte_was_cr = byte == b'\r';
            buf.push(byte);
        }
    }

    /// Reads a request from the stream. Blocks until the header has been read.
    fn read(&mut self) -> Result<Request, ReadError> {
        let line = self.read_next_line().map_err(ReadError::ReadIoError)?;
        let (method, url, version) = parse_request_line(line.trim())?;

        let mut headers = Vec::new();
        loop {
            let line = self.read_next_line().map_err(ReadError::ReadIoError)?;
            if line.trim().is_empty() {
                break;
            }
            match line.trim().parse() {
                Ok(h) => headers.push(h),
                Err(_) => return Err(ReadError::WrongHeader(version)),
            }
        }

        let writer = BufWriter::new(
            self.write_socket
                .try_clone()
                .map_err(ReadError::ReadIoError)?,
        );

        new_request(
            method,
            url,
            version,
            headers,
            self.remote_addr,
            self.reader.by_ref(),
            writer,
        )
        .map_err(ReadError::ReadIoError)
    }

    /// Reads the next request off the connection.
    ///
    /// Returns `None` when no more requests will come from this client.
    pub(crate) fn next_request(&mut self) -> Option<Request> {
        if self.no_more_requests {
            return None;
        }

        let mut rq = match self.read() {
            Err(ReadError::WrongRequestLine) => {
                self.send_error(HttpVersion(1, 1));
                // we don't know where the next request would start, so we
                // have to close
                return None;
            }

            Err(ReadError::WrongHeader(version)) => {
                self.send_error(version);
                return None;
            }

            Err(ReadError::ReadIoError(err)) => {
                debug!("error while reading a request: {}", err);
                return None;
            }

            Ok(rq) => rq,
        };

        // updating the status of the connection
        let connection_header = rq
            .header_value("Connection")
            .map(|v| v.to_ascii_lowercase());

        let close = match connection_header.as_deref() {
            Some("close") => true,
            Some("upgrade") => true,
            Some(v) if v != "keep-alive" && rq.http_version() == HttpVersion(1, 0) => true,
            None if rq.http_version() == HttpVersion(1, 0) => true,
            _ => false,
        };

        self.no_more_requests = close;
        rq.set_must_close(close);

        Some(rq)
    }

    fn send_error(&mut self, version: HttpVersion) {
        let writer = BufWriter::new(match self.write_socket.try_clone() {
            Ok(s) => s,
            Err(_) => return,
        });
        Response::empty(400).raw_print(writer, version, true).ok();
    }
}

/// Parses a "HTTP/1.1" string.
fn parse_http_version(version: &str) -> Result<HttpVersion, ReadError> {
    let num = match version.strip_prefix("HTTP/") {
        Some(n) => n,
        None => return Err(ReadError::WrongRequestLine),
    };

    let mut elems = num.splitn(2, '.');
    let major = elems.next().and_then(|e| e.parse().ok());
    let minor = elems.next().and_then(|e| e.parse().ok());

    match (major, minor) {
        (Some(major), Some(minor)) => Ok(HttpVersion(major, minor)),
        _ => Err(ReadError::WrongRequestLine),
    }
}

/// Parses the request line. eg. `GET / HTTP/1.1`
fn parse_request_line(line: &str) -> Result<(Method, String, HttpVersion), ReadError> {
    let mut words = line.split_whitespace();

    let (method, url, version) = match (words.next(), words.next(), words.next()) {
        (Some(m), Some(u), Some(v)) => (m, u, v),
        _ => return Err(ReadError::WrongRequestLine),
    };

    let method = Method::from_str(method).map_err(|_| ReadError::WrongRequestLine)?;
    let version = parse_http_version(version)?;

    Ok((method, url.to_string(), version))
}
