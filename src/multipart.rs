//! Minimal `multipart/form-data` parsing.
//!
//! Just enough to take apart the bodies the test harness uploads: parts are
//! split on the boundary, parts carrying a `filename` become uploaded files
//! (spooled to a temp location so the logged metadata has a real path), and
//! the remaining parts land in the form-parameter map.

use crate::params::ParamMap;
use log::error;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metadata of one uploaded file.
pub struct UploadedFile {
    /// Form field name of the part.
    pub name: String,
    /// Client-side file name.
    pub filename: String,
    /// Content type of the part, empty if the part did not carry one.
    pub content_type: String,
    /// Where the contents were spooled, empty if spooling failed.
    pub tmp_name: PathBuf,
    /// Size of the contents in bytes.
    pub size: usize,
}

/// Extracts the boundary out of a `Content-Type` header value.
pub fn boundary(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    for param in content_type.split(';').skip(1) {
        let param = param.trim();
        if let Some(value) = param
            .strip_prefix("boundary=")
            .or_else(|| param.strip_prefix("BOUNDARY="))
        {
            return Some(value.trim_matches('"').to_string());
        }
    }

    None
}

/// Parses a multipart body into form fields and uploaded files.
///
/// Malformed parts are skipped; the fixture treats every input as valid.
pub fn parse(body: &[u8], boundary: &str) -> (ParamMap, Vec<UploadedFile>) {
    let mut fields = ParamMap::new();
    let mut files = Vec::new();

    let delim = format!("--{}", boundary).into_bytes();
    let mut pos = match find(body, &delim, 0) {
        Some(p) => p + delim.len(),
        None => return (fields, files),
    };

    loop {
        if body[pos..].starts_with(b"--") {
            // closing delimiter
            break;
        }

        let part_start = if body[pos..].starts_with(b"\r\n") {
            pos + 2
        } else {
            pos
        };

        let (part_end, next) = match find(body, &delim, part_start) {
            Some(p) => (p, Some(p + delim.len())),
            None => (body.len(), None),
        };

        let mut part = &body[part_start..part_end];
        if part.ends_with(b"\r\n") {
            part = &part[..part.len() - 2];
        }
        handle_part(part, &mut fields, &mut files);

        pos = match next {
            Some(p) if p < body.len() => p,
            _ => break,
        };
    }

    (fields, files)
}

fn handle_part(part: &[u8], fields: &mut ParamMap, files: &mut Vec<UploadedFile>) {
    let header_end = match find(part, b"\r\n\r\n", 0) {
        Some(p) => p,
        None => return,
    };
    let content = &part[header_end + 4..];

    let mut name = String::new();
    let mut filename = None;
    let mut content_type = String::new();

    for line in String::from_utf8_lossy(&part[..header_end]).lines() {
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("content-disposition:") {
            if let Some(v) = disposition_param(line, "name") {
                name = v;
            }
            filename = disposition_param(line, "filename").or(filename);
        } else if let Some(v) = lower.strip_prefix("content-type:") {
            // take the value from the original line to keep its case
            content_type = line[line.len() - v.len()..].trim().to_string();
        }
    }

    match filename {
        Some(filename) => files.push(UploadedFile {
            name,
            filename,
            content_type,
            tmp_name: spool(content),
            size: content.len(),
        }),
        None if !name.is_empty() => {
            fields.insert_parsed(&name, String::from_utf8_lossy(content).into_owned());
        }
        None => (),
    }
}

/// Finds `param="value"` inside a `Content-Disposition` line.
fn disposition_param(line: &str, param: &str) -> Option<String> {
    let marker = format!("{}=\"", param);
    let start = line.find(&marker)? + marker.len();
    let end = line[start..].find('"')? + start;
    Some(line[start..end].to_string())
}

/// Writes uploaded contents to a temp path so the metadata has a real
/// `tmp_name` to report.
fn spool(content: &[u8]) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!("mock-httpd-upload-{}-{}", process::id(), n));

    match fs::write(&path, content) {
        Ok(()) => path,
        Err(err) => {
            error!("cannot spool uploaded file to {}: {}", path.display(), err);
            PathBuf::new()
        }
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() + from {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}

#[cfg(test)]
mod test {
    use super::{boundary, parse};
    use crate::params::ParamValue;

    fn sample_body(b: &str) -> Vec<u8> {
        format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"somekey\"\r\n\
             \r\n\
             somevalue\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"upload\"; filename=\"test.txt\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             file contents\r\n\
             --{b}--\r\n",
            b = b
        )
        .into_bytes()
    }

    #[test]
    fn test_boundary_extraction() {
        assert_eq!(
            boundary("multipart/form-data; boundary=----HttbBoundaryAbCd1234"),
            Some("----HttbBoundaryAbCd1234".to_string())
        );
        assert_eq!(
            boundary("multipart/form-data; boundary=\"quoted\""),
            Some("quoted".to_string())
        );
        assert_eq!(boundary("application/x-www-form-urlencoded"), None);
    }

    #[test]
    fn test_parse_fields_and_files() {
        let body = sample_body("xyz");
        let (fields, files) = parse(&body, "xyz");

        match fields.get("somekey") {
            Some(ParamValue::Scalar(s)) => assert_eq!(s, "somevalue"),
            _ => panic!("somekey missing"),
        }

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "upload");
        assert_eq!(files[0].filename, "test.txt");
        assert_eq!(files[0].content_type, "text/plain");
        assert_eq!(files[0].size, "file contents".len());
        assert!(files[0].tmp_name.exists());
        assert_eq!(
            std::fs::read(&files[0].tmp_name).unwrap(),
            b"file contents".to_vec()
        );
    }

    #[test]
    fn test_parse_without_boundary_match() {
        let (fields, files) = parse(b"no parts here", "xyz");
        assert!(fields.is_empty());
        assert!(files.is_empty());
    }
}
