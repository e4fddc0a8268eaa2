use std::collections::HashMap;
use std::collections::hash_map;

use crate::http::error::ParseError;

const CRLF: &[u8] = b"\r\n";

/// Case-insensitive header table.
///
/// Names are stored lowercased. A repeated name is combined into a single
/// comma-separated value instead of overwriting the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses at most one header line from the front of `data`.
    ///
    /// Returns the number of bytes consumed and whether the blank line ending
    /// the header section was reached. `(0, false)` means a complete line is
    /// not yet available and the caller should supply more data.
    ///
    /// # Example
    ///
    /// ```
    /// # use httpfromtcp::http::headers::Headers;
    /// let mut headers = Headers::new();
    /// let (n, done) = headers.parse(b"Host: localhost:42069\r\n\r\n").unwrap();
    /// assert_eq!(n, 23);
    /// assert!(!done);
    /// assert_eq!(headers.get("host"), Some("localhost:42069"));
    /// ```
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), ParseError> {
        let Some(idx) = find_crlf(data) else {
            return Ok((0, false));
        };

        if idx == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = &data[..idx];
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Err(ParseError::MalformedHeader(format!(
                "no colon in {:?}",
                String::from_utf8_lossy(line)
            )));
        };
        let (name, value) = (&line[..colon], &line[colon + 1..]);

        if !is_valid_name(name) {
            return Err(ParseError::MalformedHeader(format!(
                "invalid header name {:?}",
                String::from_utf8_lossy(name)
            )));
        }

        // Names are tokens, so plain ASCII. Values may carry obs-text bytes.
        let name = String::from_utf8_lossy(name);
        let value = String::from_utf8_lossy(value);
        self.append(name, value.trim());

        Ok((idx + CRLF.len(), false))
    }

    /// Looks up a header value by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Sets a header, replacing any existing value.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Adds a value, joining it to an existing non-empty value with `", "`.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        let value = value.as_ref();
        match self.entries.entry(name.as_ref().to_ascii_lowercase()) {
            hash_map::Entry::Occupied(mut slot) if !slot.get().is_empty() => {
                let existing = slot.get_mut();
                existing.push_str(", ");
                existing.push_str(value);
            }
            hash_map::Entry::Occupied(mut slot) => {
                *slot.get_mut() = value.to_string();
            }
            hash_map::Entry::Vacant(slot) => {
                slot.insert(value.to_string());
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == CRLF)
}

/// A header name is a non-empty token (RFC 9110 `tchar`s only), which also
/// rules out any surrounding or interior whitespace.
fn is_valid_name(name: &[u8]) -> bool {
    !name.is_empty() && name.iter().copied().all(is_token_char)
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}
