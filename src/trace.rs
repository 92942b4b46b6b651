use crate::cgi::ServerVars;
use crate::common::Method;
use crate::multipart::UploadedFile;
use crate::params::ParamMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Append-only trace of handled requests.
///
/// The log is opened in append mode, never truncate mode: several
/// independently spawned fixture processes may share the file, and the OS
/// keeps their appends from interleaving inside each other as long as each
/// block is written in one call. The handle is closed when the `TraceLog`
/// goes out of scope, on every exit path.
pub struct TraceLog {
    file: File,
}

impl TraceLog {
    /// Opens (creating if needed) the log file for appending.
    pub fn open(path: &Path) -> io::Result<TraceLog> {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        Ok(TraceLog { file })
    }

    /// Writes the method name on its own line.
    pub fn method_line(&mut self, method: &Method) -> io::Result<()> {
        self.write_block(format!("{}\n", method))
    }

    /// Writes the full server-variable dump.
    pub fn server_vars(&mut self, vars: &ServerVars) -> io::Result<()> {
        self.write_block(format!("{}\n", vars.dump()))
    }

    /// Writes the extracted headers, one `"Name: value"` per line.
    pub fn headers(&mut self, headers: &[String]) -> io::Result<()> {
        self.write_block(format!("{}\n", headers.join("\n")))
    }

    /// Writes a plain dump of a parameter map.
    pub fn params(&mut self, params: &ParamMap) -> io::Result<()> {
        self.write_block(format!("{}\n", params.dump()))
    }

    /// Writes the raw request body, marked as such.
    pub fn raw_body(&mut self, body: &[u8]) -> io::Result<()> {
        let mut block = Vec::with_capacity(body.len() + 16);
        block.extend_from_slice(b"--raw-body\n");
        block.extend_from_slice(body);
        block.push(b'\n');
        self.file.write_all(&block)
    }

    /// Writes the metadata of the uploaded files.
    pub fn files(&mut self, files: &[UploadedFile]) -> io::Result<()> {
        let mut block = String::from("--files\nArray\n(\n");
        for file in files {
            block.push_str(&format!(
                "    [{}] => Array\n    (\n        \
                 [name] => {}\n        \
                 [type] => {}\n        \
                 [tmp_name] => {}\n        \
                 [size] => {}\n    )\n",
                file.name,
                file.filename,
                file.content_type,
                file.tmp_name.display(),
                file.size
            ));
        }
        block.push_str(")\n");
        self.write_block(block)
    }

    /// Writes a debug-formatted parameter dump, with per-field type
    /// information. Visibly distinct from the plain dump.
    pub fn debug_params(&mut self, params: &ParamMap) -> io::Result<()> {
        self.write_block(format!("--post-debug\n{:#?}\n", params))
    }

    fn write_block(&mut self, block: String) -> io::Result<()> {
        self.file.write_all(block.as_bytes())
    }
}
