use mock_httpd::{MockHandler, Server};
use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Builds a unique log path for one test.
pub fn temp_log(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "mock-httpd-test-{}-{}-{}",
        std::process::id(),
        name,
        n
    ));
    std::fs::remove_file(&path).ok();
    path
}

/// Spawns a fixture server on a random port that serves up to `requests`
/// requests, then returns its address and the trace log path.
pub fn new_mock_server(name: &str, requests: usize) -> (SocketAddr, PathBuf) {
    let mut server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().unwrap();

    let log_path = temp_log(name);
    let handler_log = log_path.clone();

    thread::spawn(move || {
        let handler = MockHandler::new(handler_log);
        for _ in 0..requests {
            match server.recv() {
                Ok(rq) => {
                    handler.handle(rq).ok();
                }
                Err(_) => break,
            }
        }
    });

    (addr, log_path)
}

/// Creates a single-request server and a client connected to it.
pub fn new_client_to_mock_server(name: &str) -> (TcpStream, PathBuf) {
    let (addr, log_path) = new_mock_server(name, 1);
    (TcpStream::connect(addr).unwrap(), log_path)
}

/// Reads the stream to EOF and returns everything as text.
pub fn read_to_string(client: &mut TcpStream) -> String {
    let mut out = String::new();
    client.read_to_string(&mut out).unwrap();
    out
}

/// Returns the body part of a raw HTTP response.
pub fn body_of(response: &str) -> &str {
    match response.find("\r\n\r\n") {
        Some(pos) => &response[pos + 4..],
        None => "",
    }
}
