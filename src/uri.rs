//! Verbatim URI splitting.
//!
//! Navigation callbacks hand us whatever string the page produced. We split it
//! the way the embedding platform's `Uri` does: no normalisation, no percent
//! decoding, no case folding. That matters for the allow-list (a decoded host
//! is not what the rendering engine will connect to) and for scheme dispatch
//! (`TEL:` is not `tel:`).

use url::form_urlencoded;

/// Components of a URI string, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawUri<'a> {
    scheme: Option<&'a str>,
    ssp: &'a str,
    fragment: Option<&'a str>,
}

impl<'a> RawUri<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let (before_fragment, fragment) = match raw.find('#') {
            Some(i) => (&raw[..i], Some(&raw[i + 1..])),
            None => (raw, None),
        };

        let scheme_end = raw
            .char_indices()
            .find(|&(_, c)| matches!(c, ':' | '/' | '?' | '#'))
            .and_then(|(i, c)| (c == ':').then_some(i));

        let (scheme, ssp) = match scheme_end {
            Some(i) => (Some(&raw[..i]), &before_fragment[i + 1..]),
            None => (None, before_fragment),
        };

        Self {
            scheme,
            ssp,
            fragment,
        }
    }

    /// Text before the first `:` that precedes any `/`, `?` or `#`. May be empty.
    pub fn scheme(&self) -> Option<&'a str> {
        self.scheme
    }

    pub fn fragment(&self) -> Option<&'a str> {
        self.fragment
    }

    /// `mailto:x`, `tel:1` and friends: a scheme followed by a non-`/` part.
    pub fn is_opaque(&self) -> bool {
        self.scheme.is_some() && !self.ssp.starts_with('/')
    }

    pub fn authority(&self) -> Option<&'a str> {
        let rest = self.ssp.strip_prefix("//")?;
        let end = rest.find(['/', '?']).unwrap_or(rest.len());
        Some(&rest[..end])
    }

    /// Credentials before the last `@` of the authority.
    pub fn user_info(&self) -> Option<&'a str> {
        let authority = self.authority()?;
        authority.rfind('@').map(|i| &authority[..i])
    }

    /// Host exactly as written, between the user-info and the port.
    pub fn host(&self) -> Option<&'a str> {
        let authority = self.authority()?;
        let start = authority.rfind('@').map_or(0, |i| i + 1);
        let host_and_port = &authority[start..];
        let end = port_separator(host_and_port).unwrap_or(host_and_port.len());
        Some(&host_and_port[..end])
    }

    pub fn port(&self) -> Option<u16> {
        let authority = self.authority()?;
        let start = authority.rfind('@').map_or(0, |i| i + 1);
        let host_and_port = &authority[start..];
        let sep = port_separator(host_and_port)?;
        host_and_port[sep + 1..].parse().ok()
    }

    pub fn path(&self) -> Option<&'a str> {
        if self.is_opaque() {
            return None;
        }
        let after_authority = match self.ssp.strip_prefix("//") {
            Some(rest) => &rest[rest.find(['/', '?']).unwrap_or(rest.len())..],
            None => self.ssp,
        };
        let end = after_authority.find('?').unwrap_or(after_authority.len());
        Some(&after_authority[..end])
    }

    pub fn query(&self) -> Option<&'a str> {
        if self.is_opaque() {
            return None;
        }
        self.ssp.find('?').map(|i| &self.ssp[i + 1..])
    }

    /// First value of query parameter `name`, form-decoded.
    pub fn query_parameter(&self, name: &str) -> Option<String> {
        let query = self.query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// Index of the `:` that starts a trailing run of ASCII digits.
fn port_separator(host_and_port: &str) -> Option<usize> {
    for (i, b) in host_and_port.bytes().enumerate().rev() {
        if b == b':' {
            return Some(i);
        }
        if !b.is_ascii_digit() {
            return None;
        }
    }
    None
}

/// Keep at most `max` characters. Pure prefix cut.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => s[..i].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_only_before_path_chars() {
        assert_eq!(RawUri::parse("tel:+1-555").scheme(), Some("tel"));
        assert_eq!(RawUri::parse("example.com/a:b").scheme(), None);
        assert_eq!(RawUri::parse("no scheme here").scheme(), None);
        assert_eq!(RawUri::parse(":empty").scheme(), Some(""));
        assert_eq!(RawUri::parse("?q=a:b").scheme(), None);
    }

    #[test]
    fn hierarchical_components() {
        let u = RawUri::parse("https://user:pw@sub.example.com:8443/a/b?x=1&y=two+words#frag");
        assert_eq!(u.scheme(), Some("https"));
        assert_eq!(u.authority(), Some("user:pw@sub.example.com:8443"));
        assert_eq!(u.user_info(), Some("user:pw"));
        assert_eq!(u.host(), Some("sub.example.com"));
        assert_eq!(u.port(), Some(8443));
        assert_eq!(u.path(), Some("/a/b"));
        assert_eq!(u.query(), Some("x=1&y=two+words"));
        assert_eq!(u.query_parameter("y").as_deref(), Some("two words"));
        assert_eq!(u.fragment(), Some("frag"));
    }

    #[test]
    fn host_is_not_decoded() {
        let u = RawUri::parse("https://exa%6dple.com/");
        assert_eq!(u.host(), Some("exa%6dple.com"));
    }

    #[test]
    fn last_at_sign_splits_user_info() {
        let u = RawUri::parse("https://a@b@example.com/");
        assert_eq!(u.user_info(), Some("a@b"));
        assert_eq!(u.host(), Some("example.com"));
    }

    #[test]
    fn bracketed_ipv6_has_no_port_separator() {
        let u = RawUri::parse("http://[::1]/x");
        assert_eq!(u.host(), Some("[::1]"));
        assert_eq!(u.port(), None);
        let u = RawUri::parse("http://[::1]:80/x");
        assert_eq!(u.host(), Some("[::1]"));
        assert_eq!(u.port(), Some(80));
    }

    #[test]
    fn opaque_uris_have_no_authority_or_query() {
        let u = RawUri::parse("mailto:a@b.com?subject=x");
        assert!(u.is_opaque());
        assert_eq!(u.authority(), None);
        assert_eq!(u.host(), None);
        assert_eq!(u.query(), None);
    }

    #[test]
    fn truncate_is_a_char_prefix() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("ääää", 2), "ää");
    }
}
