use std::fmt;

/// A parameter value: either a plain string or a nested map.
///
/// Query strings and form bodies use bracket syntax for nesting (`a[x]=1`,
/// `b[]=2`), so a value is always one of these two shapes.
pub enum ParamValue {
    Scalar(String),
    Nested(ParamMap),
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Scalar(s) => formatter.debug_tuple("Scalar").field(s).finish(),
            ParamValue::Nested(m) => formatter.debug_tuple("Nested").field(m).finish(),
        }
    }
}

/// An ordered string-to-value map.
///
/// Iteration follows insertion order; both the flattened response text and
/// the log dumps depend on it.
#[derive(Default)]
pub struct ParamMap {
    entries: Vec<(String, ParamValue)>,
}

/// One step of a bracket path inside a key.
enum Segment {
    /// `[]`: append at the next free integer index.
    Auto,
    /// `[name]`
    Key(String),
}

impl ParamMap {
    pub fn new() -> ParamMap {
        ParamMap::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sets `key` to a scalar value, overwriting any previous entry.
    pub fn set_scalar(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = ParamValue::Scalar(value),
            None => self.entries.push((key, ParamValue::Scalar(value))),
        }
    }

    /// Inserts a value under a raw key that may carry bracket syntax.
    ///
    /// `a=1` sets a scalar, `a[x]=1` creates a nested map, `a[]=1` appends at
    /// the next integer index. A key whose brackets are unbalanced is taken
    /// literally.
    pub fn insert_parsed(&mut self, key: &str, value: String) {
        match parse_key(key) {
            Some((head, segments)) => self.nested_entry(head).insert_segments(&segments, value),
            None => self.set_scalar(key.to_string(), value),
        }
    }

    fn insert_segments(&mut self, path: &[Segment], value: String) {
        match path {
            [] => (),
            [last] => match last {
                Segment::Auto => {
                    let key = self.next_index();
                    self.entries.push((key, ParamValue::Scalar(value)));
                }
                Segment::Key(k) => self.set_scalar(k.clone(), value),
            },
            [first, rest @ ..] => {
                let key = match first {
                    Segment::Auto => self.next_index(),
                    Segment::Key(k) => k.clone(),
                };
                self.nested_entry(&key).insert_segments(rest, value);
            }
        }
    }

    /// Next free integer index, one past the highest numeric key.
    fn next_index(&self) -> String {
        self.entries
            .iter()
            .filter_map(|(k, _)| k.parse::<usize>().ok())
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
            .to_string()
    }

    /// Returns the nested map stored under `key`, creating it (and replacing
    /// a scalar in the way) if necessary.
    fn nested_entry(&mut self, key: &str) -> &mut ParamMap {
        let idx = match self.entries.iter().position(|(k, _)| k == key) {
            Some(i) => {
                if !matches!(self.entries[i].1, ParamValue::Nested(_)) {
                    self.entries[i].1 = ParamValue::Nested(ParamMap::new());
                }
                i
            }
            None => {
                self.entries
                    .push((key.to_string(), ParamValue::Nested(ParamMap::new())));
                self.entries.len() - 1
            }
        };

        match &mut self.entries[idx].1 {
            ParamValue::Nested(m) => m,
            ParamValue::Scalar(_) => unreachable!(),
        }
    }

    /// Serializes the map into a single delimited string.
    ///
    /// Scalars become `key=value;`, nested maps become
    /// `key[<recursive flatten>];`, in insertion order.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            match value {
                ParamValue::Scalar(s) => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(s);
                    out.push(';');
                }
                ParamValue::Nested(m) => {
                    out.push_str(key);
                    out.push('[');
                    out.push_str(&m.flatten());
                    out.push_str("];");
                }
            }
        }
        out
    }

    /// Human-readable multi-line dump for the trace log.
    pub fn dump(&self) -> String {
        let mut out = String::from("Array\n(\n");
        self.dump_entries(&mut out, 1);
        out.push_str(")\n");
        out
    }

    fn dump_entries(&self, out: &mut String, depth: usize) {
        let pad = "    ".repeat(depth);
        for (key, value) in &self.entries {
            match value {
                ParamValue::Scalar(s) => {
                    out.push_str(&format!("{}[{}] => {}\n", pad, key, s));
                }
                ParamValue::Nested(m) => {
                    out.push_str(&format!("{}[{}] => Array\n{}(\n", pad, key, pad));
                    m.dump_entries(out, depth + 1);
                    out.push_str(&format!("{})\n", pad));
                }
            }
        }
    }
}

impl fmt::Debug for ParamMap {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

/// Parses a URL query string (or urlencoded form body) into a `ParamMap`.
///
/// Pairs without a `=` become keys with an empty value. Malformed
/// percent-escapes are kept as-is rather than rejected: the fixture treats
/// every input as valid.
pub fn parse_query(input: &str) -> ParamMap {
    let mut map = ParamMap::new();

    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.find('=') {
            Some(pos) => (&pair[..pos], &pair[pos + 1..]),
            None => (pair, ""),
        };

        map.insert_parsed(&decode_component(key), decode_component(value));
    }

    map
}

/// Parses a raw urlencoded body.
pub fn parse_form(body: &[u8]) -> ParamMap {
    parse_query(&String::from_utf8_lossy(body))
}

fn decode_component(s: &str) -> String {
    let plus_decoded = s.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => plus_decoded,
    }
}

/// Splits a raw key into its head and bracket path.
///
/// Returns `None` for keys without (valid) brackets.
fn parse_key(key: &str) -> Option<(&str, Vec<Segment>)> {
    let open = key.find('[')?;
    let head = &key[..open];
    if head.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return None;
        }
        let close = rest.find(']')?;
        let segment = &rest[1..close];
        segments.push(if segment.is_empty() {
            Segment::Auto
        } else {
            Segment::Key(segment.to_string())
        });
        rest = &rest[close + 1..];
    }

    Some((head, segments))
}

#[cfg(test)]
mod test {
    use super::{parse_form, parse_query, ParamValue};

    #[test]
    fn test_flatten_scalars() {
        let map = parse_query("a=1&b=2");
        assert_eq!(map.flatten(), "a=1;b=2;");
    }

    #[test]
    fn test_flatten_nested() {
        let map = parse_query("a[x]=1");
        assert_eq!(map.flatten(), "a[x=1;];");
    }

    #[test]
    fn test_auto_index_brackets() {
        let map = parse_query("b[]=2&b[]=3");
        assert_eq!(map.flatten(), "b[0=2;1=3;];");
    }

    #[test]
    fn test_deep_nesting() {
        let map = parse_query("a[x][y]=1");
        assert_eq!(map.flatten(), "a[x[y=1;];];");
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let map = parse_query("name=John+Doe&city=New%20York");
        assert_eq!(map.flatten(), "name=John Doe;city=New York;");
    }

    #[test]
    fn test_key_without_value() {
        let map = parse_query("flag");
        assert_eq!(map.flatten(), "flag=;");
    }

    #[test]
    fn test_later_key_overwrites() {
        let map = parse_query("a=1&a=2");
        assert_eq!(map.flatten(), "a=2;");
    }

    #[test]
    fn test_parse_form_bytes() {
        let map = parse_form(b"k=v&k2=v2");
        match map.get("k") {
            Some(ParamValue::Scalar(s)) => assert_eq!(s, "v"),
            _ => panic!("k missing"),
        }
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_dump_recoverable() {
        let map = parse_query("a=1&b[]=2");
        let dump = map.dump();
        assert!(dump.contains("[a] => 1"));
        assert!(dump.contains("[b] => Array"));
        assert!(dump.contains("[0] => 2"));
    }

    #[test]
    fn test_debug_dump_has_type_info() {
        let map = parse_query("a=1");
        let debug = format!("{:#?}", map);
        assert!(debug.contains("Scalar"));
    }
}
