/// =======================================================
/// ORDERED HEADER LIST
/// =======================================================
///
/// Header names compare case-insensitively, but the list keeps the
/// original spelling, order and duplicates exactly as received.
/// Caching relies on that: a stored header block must come back
/// byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.entries
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every occurrence of `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// Appends only when the header is missing.
    pub fn set_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.entries.push((name, value.into()));
        }
    }

    /// Removes every occurrence of `name`, returning how many were dropped.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    /// Comma separated values of every `name` header, in order.
    pub fn tokens<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.get_all(name).flat_map(split_header_tokens)
    }

    /// True if any `name` header lists `token` among its comma separated values.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.tokens(name).any(|t| t.eq_ignore_ascii_case(token))
    }

    /// True if any `name` header value equals `value` exactly (after trimming).
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.get_all(name).any(|v| v.trim() == value)
    }

    /// Approximate wire size of the header block (`Name: value\r\n` per entry).
    pub fn wire_len(&self) -> usize {
        self.entries.iter().map(|(n, v)| n.len() + v.len() + 4).sum()
    }
}

impl From<Vec<(String, String)>> for Headers {
    fn from(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn split_header_tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').filter_map(|token| {
        let trimmed = token.trim().trim_matches(|c| c == '"' || c == '\'');
        if trimmed.is_empty() { None } else { Some(trimmed) }
    })
}

#[cfg(test)]
mod tests {
    use super::Headers;

    fn sample() -> Headers {
        let mut h = Headers::new();
        h.append("Host", "example.com");
        h.append("Set-Cookie", "a=1");
        h.append("set-cookie", "b=2");
        h.append("Accept", "*/*");
        h
    }

    #[test]
    fn lookup_is_case_insensitive_and_keeps_duplicates() {
        let h = sample();
        assert_eq!(h.get("HOST"), Some("example.com"));
        let cookies: Vec<_> = h.get_all("Set-Cookie").collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[test]
    fn remove_drops_every_occurrence_and_keeps_order() {
        let mut h = sample();
        assert_eq!(h.remove("SET-COOKIE"), 2);
        let names: Vec<_> = h.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Host", "Accept"]);
    }

    #[test]
    fn set_replaces_all_values() {
        let mut h = sample();
        h.set("Set-Cookie", "c=3");
        assert_eq!(h.get_all("set-cookie").count(), 1);
        assert_eq!(h.get("set-cookie"), Some("c=3"));
    }

    #[test]
    fn has_token_splits_on_commas() {
        let mut h = Headers::new();
        h.append("Transfer-Encoding", "gzip, \"Chunked\"");
        assert!(h.has_token("transfer-encoding", "chunked"));
        assert!(!h.has_token("transfer-encoding", "deflate"));
    }

    #[test]
    fn value_outlives_the_looked_up_name() {
        let h = sample();
        let host = {
            let name = String::from("host");
            h.get(&name)
        };
        assert_eq!(host, Some("example.com"));
    }
}
