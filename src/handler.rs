use crate::cgi::{self, ServerVars};
use crate::common::Method;
use crate::multipart::{self, UploadedFile};
use crate::params::{parse_form, parse_query, ParamMap};
use crate::request::Request;
use crate::response::Response;
use crate::trace::TraceLog;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Everything the dispatcher needs to know about one request, gathered up
/// front. Passed around explicitly; nothing request-scoped is ambient.
pub struct RequestContext {
    pub method: Method,
    pub uri: String,
    pub path_info: String,
    pub query_string: String,
    pub query: ParamMap,
    pub body_params: ParamMap,
    pub raw_body: Vec<u8>,
    pub files: Vec<UploadedFile>,
    pub server_vars: ServerVars,
    pub headers: Vec<String>,
}

impl RequestContext {
    /// Builds the context for a request.
    ///
    /// The path-info is the URL path with the script-name prefix removed;
    /// when the path does not start with the script name the whole path is
    /// the path-info.
    pub fn build(rq: &Request, script_name: &str) -> RequestContext {
        let uri = rq.url().to_string();

        let (path, query_string) = match uri.find('?') {
            Some(pos) => (&uri[..pos], &uri[pos + 1..]),
            None => (uri.as_str(), ""),
        };

        let path_info = match path.strip_prefix(script_name) {
            Some(rest) if !script_name.is_empty() => rest.to_string(),
            _ => path.to_string(),
        };

        let query = parse_query(query_string);

        let multipart_boundary = rq
            .header_value("Content-Type")
            .and_then(multipart::boundary);

        let (body_params, files) = match (&multipart_boundary, rq.method()) {
            (Some(boundary), _) => multipart::parse(rq.body(), boundary),
            (None, Method::Put) => (parse_form(rq.body()), Vec::new()),
            (None, Method::Post) if is_urlencoded(rq) => (parse_form(rq.body()), Vec::new()),
            _ => (ParamMap::new(), Vec::new()),
        };

        let server_vars = ServerVars::build(rq, script_name, &path_info, query_string);
        let headers = cgi::extract_headers(&server_vars);

        let query_string = query_string.to_string();
        RequestContext {
            method: rq.method().clone(),
            uri,
            path_info,
            query_string,
            query,
            body_params,
            raw_body: rq.body().to_vec(),
            files,
            server_vars,
            headers,
        }
    }
}

fn is_urlencoded(rq: &Request) -> bool {
    match rq.header_value("Content-Type") {
        Some(ct) => ct
            .split(';')
            .next()
            .map_or(false, |mime| {
                mime.trim()
                    .eq_ignore_ascii_case("application/x-www-form-urlencoded")
            }),
        // no content type given; assume a form body, the harness is sloppy
        None => true,
    }
}

/// Error produced while handling one request.
#[derive(Debug)]
pub enum HandlerError {
    /// The trace log could not be opened for append. Fatal for the fixture
    /// process.
    LogOpen(io::Error),
    /// Any other I/O failure during handling.
    Io(io::Error),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HandlerError::LogOpen(err) => write!(formatter, "cannot open trace log: {}", err),
            HandlerError::Io(err) => write!(formatter, "i/o error while handling request: {}", err),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerError::LogOpen(err) | HandlerError::Io(err) => Some(err),
        }
    }
}

/// The mock request handler.
///
/// For every request it writes a trace block to the log file and answers
/// with a canned response:
///
/// - `GET` with query parameters:
///   `"This is GET method response! Input: <flattened query>"`
/// - any other supported method `M`: `"This is M method response!"`
/// - unsupported methods get an empty body.
///
/// A request whose path-info is exactly `/file` gets three extra trace
/// sections: the raw body, the uploaded-file metadata, and a debug-formatted
/// dump of the parsed body parameters.
pub struct MockHandler {
    log_path: PathBuf,
    script_name: String,
}

impl MockHandler {
    /// Creates a handler writing its trace to `log_path`.
    pub fn new<P: Into<PathBuf>>(log_path: P) -> MockHandler {
        MockHandler {
            log_path: log_path.into(),
            script_name: "/simple-server.php".to_string(),
        }
    }

    /// Overrides the script name used to split the path-info off the URL.
    pub fn with_script_name<S: Into<String>>(mut self, script_name: S) -> MockHandler {
        self.script_name = script_name.into();
        self
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Handles one request: trace, then respond.
    ///
    /// The trace log is opened per call and closed when this function
    /// returns, error or not.
    pub fn handle(&self, rq: Request) -> Result<(), HandlerError> {
        let ctx = RequestContext::build(&rq, &self.script_name);

        let mut trace = TraceLog::open(&self.log_path).map_err(HandlerError::LogOpen)?;
        let body = dispatch(&ctx, &mut trace).map_err(HandlerError::Io)?;

        rq.respond(Response::from_string(body))
            .map_err(HandlerError::Io)
    }
}

/// Writes the trace for one request and produces the response body.
pub(crate) fn dispatch(ctx: &RequestContext, trace: &mut TraceLog) -> io::Result<String> {
    // pre-dispatch trace, written for every method
    trace.method_line(&ctx.method)?;
    trace.server_vars(&ctx.server_vars)?;
    trace.headers(&ctx.headers)?;

    let body = match &ctx.method {
        Method::Get => {
            trace.params(&ctx.query)?;
            if ctx.query.is_empty() {
                plain_response(&ctx.method)
            } else {
                format!(
                    "This is {} method response! Input: {}",
                    ctx.method,
                    ctx.query.flatten()
                )
            }
        }
        Method::Post | Method::Put => {
            trace.params(&ctx.body_params)?;
            plain_response(&ctx.method)
        }
        Method::Delete | Method::Head => {
            trace.params(&ctx.query)?;
            plain_response(&ctx.method)
        }
        Method::NonStandard(_) => String::new(),
    };

    if ctx.path_info == "/file" {
        trace.raw_body(&ctx.raw_body)?;
        trace.files(&ctx.files)?;
        trace.debug_params(&ctx.body_params)?;
    }

    Ok(body)
}

fn plain_response(method: &Method) -> String {
    format!("This is {} method response!", method)
}
