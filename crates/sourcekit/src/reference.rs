//! Parsed source references.
//!
//! A [`Reference`] is the RFC 3986 split of a URL-like string into scheme,
//! authority, path, query and fragment. Splitting is lossless: the
//! [`Display`](fmt::Display) form reproduces the input exactly, so sources
//! built from a reference externalize to the string they were parsed from.
//!
//! Compound schemes such as `tar+https` or `jar+s3` carry an archive prefix in
//! front of the transport. [`Reference::transport`] and [`Reference::base`]
//! strip the prefix so that archive adapters can reuse the plain transport.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// RFC 3986, Appendix B.
static URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .expect("static URI pattern is valid")
});

/// A parsed, immutable source reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    scheme: String,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Reference {
    /// Parse a reference. A scheme is required.
    ///
    /// # Example
    ///
    /// ```
    /// use sourcekit::Reference;
    ///
    /// let r = Reference::parse("tar+https://example.com/app.tgz#app/bin/run").unwrap();
    /// assert_eq!(r.scheme(), "tar+https");
    /// assert_eq!(r.prefix(), Some("tar"));
    /// assert_eq!(r.transport(), "https");
    /// assert_eq!(r.fragment(), Some("app/bin/run"));
    /// assert_eq!(r.to_string(), "tar+https://example.com/app.tgz#app/bin/run");
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let caps = URI_PATTERN
            .captures(input)
            .ok_or_else(|| Error::invalid(input, "not a URI"))?;

        let scheme = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::invalid(input, "a scheme is required"))?;

        Ok(Self {
            scheme,
            authority: caps.get(2).map(|m| m.as_str().to_string()),
            path: caps.get(3).map_or_else(String::new, |m| m.as_str().to_string()),
            query: caps.get(4).map(|m| m.as_str().to_string()),
            fragment: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }

    /// Full scheme, including any archive prefix.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Authority (`user:pass@host:port`), if the reference has one.
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// Path component, possibly empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query component, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Fragment component, without the leading `#`.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Userinfo part of the authority.
    pub fn userinfo(&self) -> Option<&str> {
        let authority = self.authority.as_deref()?;
        authority.rsplit_once('@').map(|(userinfo, _)| userinfo)
    }

    /// Host part of the authority, without userinfo or port.
    pub fn host(&self) -> Option<&str> {
        let authority = self.authority.as_deref()?;
        let hostport = authority
            .rsplit_once('@')
            .map_or(authority, |(_, hostport)| hostport);
        // Bracketed IPv6 literals contain colons of their own.
        if hostport.starts_with('[') {
            return hostport.find(']').map(|end| &hostport[..=end]);
        }
        Some(hostport.split_once(':').map_or(hostport, |(host, _)| host))
    }

    /// Archive prefix of a compound scheme (`tar` in `tar+https`).
    pub fn prefix(&self) -> Option<&str> {
        self.scheme.rsplit_once('+').map(|(prefix, _)| prefix)
    }

    /// Transport of the scheme (`https` in `tar+https`, `s3` in `s3`).
    pub fn transport(&self) -> &str {
        self.scheme
            .rsplit_once('+')
            .map_or(self.scheme.as_str(), |(_, transport)| transport)
    }

    /// Whether the path ends with `/`, giving the reference directory nature.
    pub fn is_dirlike(&self) -> bool {
        self.path.ends_with('/')
    }

    /// The plain transport reference: archive prefix and fragment removed.
    #[must_use]
    pub fn base(&self) -> Self {
        Self {
            scheme: self.transport().to_string(),
            fragment: None,
            ..self.clone()
        }
    }

    /// Ensure the scheme is one of `accepted`.
    pub(crate) fn require_scheme<S: AsRef<str>>(
        &self,
        adapter: &'static str,
        accepted: &[S],
    ) -> Result<()> {
        if accepted.iter().any(|s| s.as_ref() == self.scheme) {
            Ok(())
        } else {
            Err(Error::InvalidScheme {
                adapter,
                accepted: accepted
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<&str>>()
                    .join(", "),
                scheme: self.scheme.clone(),
            })
        }
    }

    /// Ensure there is no fragment.
    pub(crate) fn forbid_fragment(&self, what: &str) -> Result<()> {
        match self.fragment {
            Some(_) => Err(Error::invalid(
                self.display(),
                format!("{what} URLs can not have fragments"),
            )),
            None => Ok(()),
        }
    }

    /// Display form with any password in the userinfo masked.
    pub fn display(&self) -> String {
        match (self.userinfo(), self.authority.as_deref()) {
            (Some(userinfo), Some(authority)) => {
                let net = &authority[userinfo.len() + 1..];
                let masked = match userinfo.split_once(':') {
                    Some((user, _)) => format!("{user}:..."),
                    None => "...".to_string(),
                };
                Self {
                    authority: Some(format!("{masked}@{net}")),
                    ..self.clone()
                }
                .to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(authority) = &self.authority {
            write!(f, "//{authority}")?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Decode `%XX` escapes.
///
/// Fails on truncated escapes and on sequences that do not decode to UTF-8.
pub fn percent_decode(input: &str) -> Result<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::invalid(input, "malformed percent escape"))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| Error::invalid(input, "escapes do not decode to UTF-8"))
}
