//! Output document assembly.
//!
//! Enforces the fixed three-line header every output file starts with.

use super::endpoint::{Endpoint, HttpMethod};

/// One output file: metadata header plus Markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    /// URL as given in the input.
    pub source: String,
    pub method: HttpMethod,
    /// Joined endpoint segments.
    pub endpoint: String,
    pub body: String,
}

impl MarkdownDocument {
    pub fn new(source: impl Into<String>, endpoint: &Endpoint, body: impl Into<String>) -> Self {
        Self { source: source.into(), method: endpoint.method, endpoint: endpoint.name(), body: body.into() }
    }

    /// Header format:
    /// ```text
    /// <!-- Source: <source URL> -->
    /// <!-- Method: <METHOD> -->
    /// <!-- Endpoint: <joined path segments> -->
    /// ```
    pub fn header(&self) -> String {
        format!(
            "<!-- Source: {} -->\n<!-- Method: {} -->\n<!-- Endpoint: {} -->",
            escape_comment(&self.source),
            self.method,
            escape_comment(&self.endpoint)
        )
    }

    /// Header, a blank line, the trimmed body and a final newline.
    pub fn to_markdown(&self) -> String {
        format!("{}\n\n{}\n", self.header(), self.body.trim())
    }
}

/// Keep a value from closing the comment early.
fn escape_comment(s: &str) -> String {
    s.replace("-->", "--&gt;").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            method: HttpMethod::Get,
            segments: vec!["users".into(), "get".into()],
            filename: "GET-users-get.md".into(),
        }
    }

    #[test]
    fn test_document_header_exact() {
        let doc = MarkdownDocument::new("https://example.com/docs/users/get", &endpoint(), "# Get Users");
        assert_eq!(
            doc.to_markdown(),
            "<!-- Source: https://example.com/docs/users/get -->\n<!-- Method: GET -->\n<!-- Endpoint: users-get -->\n\n# Get Users\n"
        );
    }

    #[test]
    fn test_document_trims_body() {
        let doc = MarkdownDocument::new("https://x", &endpoint(), "\n\n  Content  \n\n");
        assert!(doc.to_markdown().ends_with("-->\n\nContent\n"));
    }

    #[test]
    fn test_document_empty_body() {
        let doc = MarkdownDocument::new("https://x", &endpoint(), "");
        assert!(doc.to_markdown().ends_with("<!-- Endpoint: users-get -->\n\n\n"));
    }

    #[test]
    fn test_escape_comment() {
        assert_eq!(escape_comment("https://x/?q=a-->b"), "https://x/?q=a--&gt;b");
        assert_eq!(escape_comment("plain"), "plain");
    }

    #[test]
    fn test_document_method_from_endpoint() {
        let mut ep = endpoint();
        ep.method = HttpMethod::Delete;
        let doc = MarkdownDocument::new("https://x", &ep, "body");
        assert!(doc.header().contains("<!-- Method: DELETE -->"));
    }
}
