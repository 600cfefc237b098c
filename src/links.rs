/// Decides whether a chat message points at a supported file host.
#[derive(Debug, Clone)]
pub struct LinkValidator {
    domains: Vec<String>,
}

impl LinkValidator {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// True when the text mentions any supported domain, ignoring case.
    pub fn is_supported(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.domains.iter().any(|domain| text.contains(domain.as_str()))
    }

    /// First whitespace-separated token that mentions a supported domain,
    /// with surrounding punctuation stripped.
    pub fn find_link<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.split_whitespace()
            .map(|raw| {
                raw.trim_matches(|c: char| {
                    matches!(c, ',' | ';' | '.' | ')' | '(' | ']' | '[' | '>' | '<' | '"' | '\'')
                })
            })
            .find(|token| self.is_supported(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> LinkValidator {
        LinkValidator::new(["teraboxlink.com", "1024terabox.com"])
    }

    #[test]
    fn test_matches_any_case() {
        let v = validator();
        assert!(v.is_supported("https://1024terabox.com/s/abc"));
        assert!(v.is_supported("HTTPS://TeraBoxLink.COM/s/xyz"));
        assert!(v.is_supported("check this out https://1024terabox.com/s/abc"));
    }

    #[test]
    fn test_rejects_other_hosts() {
        let v = validator();
        assert!(!v.is_supported("https://example.com/file"));
        assert!(!v.is_supported("terabox.com/s/abc"));
    }

    #[test]
    fn test_empty_and_whitespace() {
        let v = validator();
        assert!(!v.is_supported(""));
        assert!(!v.is_supported("   \n\t"));
        assert_eq!(v.find_link("  "), None);
    }

    #[test]
    fn test_is_idempotent() {
        let v = validator();
        let text = "see https://teraboxlink.com/s/1";
        assert_eq!(v.is_supported(text), v.is_supported(text));
        assert_eq!(v.is_supported("nope"), v.is_supported("nope"));
    }

    #[test]
    fn test_configured_domains_are_normalized() {
        let v = LinkValidator::new([" Terabox.App ", ""]);
        assert_eq!(v.domains(), &["terabox.app".to_string()]);
        assert!(v.is_supported("https://www.terabox.app/s/1"));
    }

    #[test]
    fn test_find_link_extracts_token() {
        let v = validator();
        assert_eq!(
            v.find_link("check this out https://1024terabox.com/s/abc"),
            Some("https://1024terabox.com/s/abc")
        );
        assert_eq!(
            v.find_link("(https://TERABOXLINK.com/s/Q1)."),
            Some("https://TERABOXLINK.com/s/Q1")
        );
        assert_eq!(v.find_link("https://example.com/file"), None);
    }

    #[test]
    fn test_find_link_agrees_with_is_supported() {
        let v = validator();
        for text in [
            "1024terabox.com",
            "a b c teraboxlink.com/s/x d",
            "\"https://1024terabox.com/s/q\"",
            "nothing here",
        ] {
            assert_eq!(v.is_supported(text), v.find_link(text).is_some(), "{text}");
        }
    }
}
