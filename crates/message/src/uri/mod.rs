//! Uniform Resource Identifier value.
//!
//! [`Uri`] stores every component in canonical form: scheme and host are ASCII lowercased,
//! userinfo/path/query/fragment are percent-encoded for their character class, and a port
//! equal to the default port of the scheme is dropped. All `with_*` operations return a new
//! value; when the normalized argument equals the stored component the very same instance is
//! returned, which can be observed with [`Uri::ptr_eq`].
//!
//! # Example
//!
//! ```
//! use micro_message::uri::Uri;
//!
//! let uri = Uri::parse("HTTP://Example.COM:80/a b?x=1").unwrap();
//! assert_eq!(uri.scheme(), "http");
//! assert_eq!(uri.authority(), "example.com");
//! assert_eq!(uri.to_string(), "http://example.com/a%20b?x=1");
//!
//! let same = uri.with_host("EXAMPLE.com").unwrap();
//! assert!(Uri::ptr_eq(&uri, &same));
//! ```

mod encoding;
mod parser;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use triomphe::Arc;

use crate::error::{MessageError, Result};
use crate::utils::{ensure, fold};

/// Returns the registered default port of `scheme`.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct Components {
    scheme: String,
    user_info: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
}

/// An immutable, normalized uri.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    inner: Arc<Components>,
}

impl Default for Uri {
    fn default() -> Self {
        Self { inner: Arc::new(Components::default()) }
    }
}

impl Uri {
    /// Parses `text` into a uri. The empty string yields the empty uri.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidUri`] if the text can not be decomposed into
    /// scheme/authority/path/query/fragment.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::default());
        }

        let parts = parser::split(text).ok_or_else(|| MessageError::invalid_uri(text))?;

        let scheme = fold(parts.scheme.unwrap_or_default());
        let mut user_info = parts.user.map(encoding::encode_user_info).unwrap_or_default();
        if let Some(pass) = parts.pass {
            user_info.push(':');
            user_info.push_str(&encoding::encode_user_info(pass));
        }
        let port = filter_port(&scheme, parts.port);

        let components = Components {
            user_info,
            host: fold(parts.host.unwrap_or_default()),
            port,
            path: encoding::encode_path(parts.path),
            query: parts.query.map(encoding::encode_query_or_fragment).unwrap_or_default(),
            fragment: parts.fragment.map(encoding::encode_query_or_fragment).unwrap_or_default(),
            scheme,
        };

        Ok(Self { inner: Arc::new(components) })
    }

    /// Returns true when both values are the same instance.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    #[inline]
    pub fn scheme(&self) -> &str {
        &self.inner.scheme
    }

    /// Returns `[userinfo@]host[:port]`, or the empty string when there is no host.
    pub fn authority(&self) -> String {
        let inner = &self.inner;
        if inner.host.is_empty() {
            return String::new();
        }

        let mut authority = String::with_capacity(inner.user_info.len() + inner.host.len() + 6);
        if !inner.user_info.is_empty() {
            authority.push_str(&inner.user_info);
            authority.push('@');
        }
        authority.push_str(&inner.host);
        if let Some(port) = inner.port {
            authority.push(':');
            authority.push_str(&port.to_string());
        }
        authority
    }

    #[inline]
    pub fn user_info(&self) -> &str {
        &self.inner.user_info
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.inner.host
    }

    /// Returns the port, `None` when absent or equal to the scheme default.
    #[inline]
    pub fn port(&self) -> Option<u16> {
        self.inner.port
    }

    /// Returns the path as it should be displayed.
    ///
    /// A rootless path gets a leading `/` when a host is present and a path starting with
    /// several slashes is reduced to a single one. The stored path is left as it is.
    pub fn path(&self) -> Cow<'_, str> {
        let path = self.inner.path.as_str();
        if !path.is_empty() && !path.starts_with('/') {
            if self.inner.host.is_empty() {
                Cow::Borrowed(path)
            } else {
                Cow::Owned(format!("/{path}"))
            }
        } else if path.starts_with("//") {
            Cow::Owned(format!("/{}", path.trim_start_matches('/')))
        } else {
            Cow::Borrowed(path)
        }
    }

    #[inline]
    pub fn query(&self) -> &str {
        &self.inner.query
    }

    #[inline]
    pub fn fragment(&self) -> &str {
        &self.inner.fragment
    }

    pub fn with_scheme(&self, scheme: &str) -> Self {
        let scheme = fold(scheme);
        self.derive(|components| {
            components.port = filter_port(&scheme, components.port);
            components.scheme = scheme;
        })
    }

    /// Replaces the userinfo; the password is only appended when it is non-empty.
    pub fn with_user_info(&self, user: &str, password: Option<&str>) -> Self {
        let mut info = encoding::encode_user_info(user);
        if let Some(password) = password.filter(|password| !password.is_empty()) {
            info.push(':');
            info.push_str(&encoding::encode_user_info(password));
        }
        self.derive(|components| components.user_info = info)
    }

    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] when `host` holds whitespace, a delimiter
    /// (`/`, `?`, `#`, `@`) or a `:` outside of an ip literal.
    pub fn with_host(&self, host: &str) -> Result<Self> {
        ensure!(parser::is_host(host), MessageError::invalid_argument(format!("invalid host `{host}`")));
        let host = fold(host);
        Ok(self.derive(|components| components.host = host))
    }

    /// Replaces the port. A port equal to the scheme default is stored as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidPort`] if the port is above 65535.
    pub fn with_port(&self, port: Option<u32>) -> Result<Self> {
        let port = match port {
            Some(port) => {
                ensure!(port <= 0xFFFF, MessageError::InvalidPort { port });
                u16::try_from(port).ok()
            }
            None => None,
        };
        Ok(self.derive(|components| components.port = filter_port(&components.scheme, port)))
    }

    pub fn with_path(&self, path: &str) -> Self {
        let path = encoding::encode_path(path);
        self.derive(|components| components.path = path)
    }

    pub fn with_query(&self, query: &str) -> Self {
        let query = encoding::encode_query_or_fragment(query);
        self.derive(|components| components.query = query)
    }

    pub fn with_fragment(&self, fragment: &str) -> Self {
        let fragment = encoding::encode_query_or_fragment(fragment);
        self.derive(|components| components.fragment = fragment)
    }

    /// Applies `change` to a copy of the components, keeping this instance when nothing changed.
    fn derive<F>(&self, change: F) -> Self
    where
        F: FnOnce(&mut Components),
    {
        let mut components = Components::clone(&self.inner);
        change(&mut components);
        if components == *self.inner { self.clone() } else { Self { inner: Arc::new(components) } }
    }
}

fn filter_port(scheme: &str, port: Option<u16>) -> Option<u16> {
    port.filter(|port| default_port(scheme) != Some(*port))
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        let authority = self.authority();

        if !inner.scheme.is_empty() {
            write!(f, "{}:", inner.scheme)?;
        }

        if !authority.is_empty() {
            write!(f, "//{authority}")?;
        }

        let path = inner.path.as_str();
        if !path.is_empty() {
            if !path.starts_with('/') && !authority.is_empty() {
                f.write_str("/")?;
                f.write_str(path)?;
            } else if path.starts_with("//") && authority.is_empty() {
                f.write_str("/")?;
                f.write_str(path.trim_start_matches('/'))?;
            } else {
                f.write_str(path)?;
            }
        }

        if !inner.query.is_empty() {
            write!(f, "?{}", inner.query)?;
        }

        if !inner.fragment.is_empty() {
            write!(f, "#{}", inner.fragment)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Uri").field(&self.to_string()).finish()
    }
}

impl FromStr for Uri {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Converts into the `http` crate uri type, e.g. to hand the target to a transport.
impl TryFrom<&Uri> for http::Uri {
    type Error = http::uri::InvalidUri;

    fn try_from(uri: &Uri) -> Result<Self, Self::Error> {
        uri.to_string().parse()
    }
}

/// Conversion accepted wherever a uri is expected: a parsed [`Uri`] or uri text.
pub trait IntoUri {
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidUri`] if the text form can not be parsed.
    fn into_uri(self) -> Result<Uri>;
}

impl IntoUri for Uri {
    #[inline]
    fn into_uri(self) -> Result<Uri> {
        Ok(self)
    }
}

impl IntoUri for &Uri {
    #[inline]
    fn into_uri(self) -> Result<Uri> {
        Ok(self.clone())
    }
}

impl IntoUri for &str {
    fn into_uri(self) -> Result<Uri> {
        Uri::parse(self)
    }
}

impl IntoUri for String {
    fn into_uri(self) -> Result<Uri> {
        Uri::parse(&self)
    }
}

impl IntoUri for &String {
    fn into_uri(self) -> Result<Uri> {
        Uri::parse(self)
    }
}
