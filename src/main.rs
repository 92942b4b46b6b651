use mock_httpd::{HandlerError, MockHandler, Server, TraceLog};
use std::env;
use std::process;

fn main() {
    let log_path = env::current_dir()
        .map(|dir| dir.join("run.log"))
        .unwrap_or_else(|_| "run.log".into());

    // the log must be appendable before any request is handled
    if let Err(err) = TraceLog::open(&log_path) {
        eprintln!("cannot open {}: {}", log_path.display(), err);
        process::exit(255);
    }

    let mut server = match Server::http("0.0.0.0:9000") {
        Ok(server) => server,
        Err(err) => {
            eprintln!("cannot bind: {}", err);
            process::exit(1);
        }
    };

    if let Ok(addr) = server.server_addr() {
        println!("Now listening on {}", addr);
    }

    let handler = MockHandler::new(log_path);

    loop {
        let request = match server.recv() {
            Ok(rq) => rq,
            Err(err) => {
                eprintln!("error: {}", err);
                continue;
            }
        };

        match handler.handle(request) {
            Ok(()) => (),
            Err(HandlerError::LogOpen(err)) => {
                eprintln!("cannot open trace log: {}", err);
                process::exit(255);
            }
            Err(HandlerError::Io(err)) => eprintln!("error: {}", err),
        }
    }
}
