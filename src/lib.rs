/*!
# mock-httpd

A mock HTTP server used as a test fixture. It accepts requests of any
method, answers with a canned response, and appends a trace of each request
(server variables, headers, parsed parameters, uploaded files) to a local
log file that a test harness inspects afterwards.

The first step is to create a `Server`:

```no_run
let mut server = mock_httpd::Server::http("0.0.0.0:0").unwrap();
```

A newly-created `Server` immediately starts listening for incoming
connections. `server.recv()` blocks until the next request is available,
and `MockHandler` traces it and sends the canned answer:

```no_run
# let mut server = mock_httpd::Server::http("0.0.0.0:0").unwrap();
let handler = mock_httpd::MockHandler::new("run.log");

loop {
    let request = match server.recv() {
        Ok(rq) => rq,
        Err(e) => {
            eprintln!("error: {}", e);
            break;
        }
    };

    if let Err(e) = handler.handle(request) {
        eprintln!("error: {}", e);
    }
}
```

Requests are served synchronously, one at a time; the fixture needs no
internal concurrency.
*/

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use crate::client::ClientConnection;

pub use crate::cgi::{extract_headers, ServerVars};
pub use crate::common::{Header, HeaderField, HttpVersion, Method, StatusCode};
pub use crate::handler::{HandlerError, MockHandler, RequestContext};
pub use crate::multipart::UploadedFile;
pub use crate::params::{parse_form, parse_query, ParamMap, ParamValue};
pub use crate::request::Request;
pub use crate::response::Response;
pub use crate::test::MockRequest;
pub use crate::trace::TraceLog;

mod cgi;
mod client;
mod common;
mod handler;
mod multipart;
mod params;
mod request;
mod response;
mod trace;
mod util;

/// The main type of this library.
///
/// Listens on a socket and produces `Request` objects, one at a time.
/// Clients are served sequentially: a connection is drained of its requests
/// before the next one is accepted.
pub struct Server {
    listener: TcpListener,
    connection: Option<ClientConnection>,
}

impl Server {
    /// Builds a new server that listens on the specified address.
    ///
    /// Binding to port 0 picks a random free port, which is useful for
    /// tests; the chosen address is available through `server_addr()`.
    pub fn http<A: ToSocketAddrs>(addr: A) -> io::Result<Server> {
        let listener = TcpListener::bind(addr)?;

        Ok(Server {
            listener,
            connection: None,
        })
    }

    /// Returns the address the server is listening on.
    pub fn server_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Blocks until an HTTP request has been submitted and returns it.
    pub fn recv(&mut self) -> io::Result<Request> {
        loop {
            if let Some(connection) = self.connection.as_mut() {
                if let Some(rq) = connection.next_request() {
                    return Ok(rq);
                }
                self.connection = None;
            }

            let (stream, remote_addr) = self.listener.accept()?;
            self.connection = Some(ClientConnection::new(stream, remote_addr)?);
        }
    }
}
