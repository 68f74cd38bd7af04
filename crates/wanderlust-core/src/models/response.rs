use std::borrow::Cow;

/// A fully buffered response.
///
/// A network body can only be read once, so responses are snapshotted into
/// memory as soon as they arrive; `clone()` then gives an independent copy for
/// the cache while the original goes back to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Empty image served in place of an icon that could not be fetched
    pub fn placeholder_image() -> Self {
        Self::new(200, Vec::new()).with_header("Content-Type", "image/png")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Status in the 200-299 range
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Lower-cased header names listed in `Vary`
    pub fn vary(&self) -> Vec<String> {
        self.header("Vary")
            .map(|v| {
                v.split(',')
                    .map(|name| name.trim().to_ascii_lowercase())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_image() {
        let resp = Response::placeholder_image();
        assert_eq!(resp.status, 200);
        assert!(resp.body.is_empty());
        assert_eq!(resp.content_type(), Some("image/png"));
    }

    #[test]
    fn test_ok_range() {
        assert!(Response::new(200, "").ok());
        assert!(Response::new(204, "").ok());
        assert!(!Response::new(304, "").ok());
        assert!(!Response::new(404, "").ok());
    }

    #[test]
    fn test_vary_parsing() {
        let resp = Response::new(200, "").with_header("vary", "Accept-Encoding, Accept-Language");
        assert_eq!(resp.vary(), vec!["accept-encoding", "accept-language"]);
        assert!(Response::new(200, "").vary().is_empty());
    }
}
