use std::borrow::Cow;
use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;

use crate::error::{MessageError, Result};

/// Modes whose resources may be read from.
const READABLE: &[&str] = &[
    "r", "w+", "r+", "x+", "c+", "rb", "w+b", "r+b", "x+b", "c+b", "rt", "w+t", "r+t", "x+t", "c+t", "a+", "a+b", "a+t",
];

/// Modes whose resources may be written to.
const WRITABLE: &[&str] = &[
    "w", "w+", "r+", "x", "x+", "c", "c+", "wb", "w+b", "r+b", "xb", "x+b", "cb", "c+b", "wt", "w+t", "r+t", "xt",
    "x+t", "ct", "c+t", "a", "a+", "ab", "a+b", "at", "a+t",
];

/// A `fopen` style access mode such as `r`, `w+b` or `a+`.
///
/// The base letter selects how the file is opened, `+` adds the missing direction, and a
/// `b` or `t` flag is accepted and ignored. The `+` may come before or after the flag, so
/// `r+b` and `rb+` are the same mode.
///
/// | mode | read | write | create | truncate |
/// |------|------|-------|--------|----------|
/// | `r`  | yes  |       |        |          |
/// | `w`  |      | yes   | yes    | yes      |
/// | `a`  |      | append| yes    |          |
/// | `x`  |      | yes   | new    |          |
/// | `c`  |      | yes   | yes    |          |
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpenMode {
    text: String,
}

impl OpenMode {
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] when `mode` is not a `fopen` mode.
    pub fn parse(mode: &str) -> Result<Self> {
        let valid = matches!(
            mode.as_bytes(),
            [b'r' | b'w' | b'a' | b'x' | b'c']
                | [b'r' | b'w' | b'a' | b'x' | b'c', b'+' | b'b' | b't']
                | [b'r' | b'w' | b'a' | b'x' | b'c', b'+', b'b' | b't']
                | [b'r' | b'w' | b'a' | b'x' | b'c', b'b' | b't', b'+']
        );
        if !valid {
            return Err(MessageError::invalid_argument(format!("the mode {mode:?} is invalid")));
        }
        Ok(Self { text: mode.to_owned() })
    }

    pub(crate) fn internal(text: &str) -> Self {
        Self { text: text.to_owned() }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_readable(&self) -> bool {
        READABLE.contains(&&*self.canonical())
    }

    pub fn is_writable(&self) -> bool {
        WRITABLE.contains(&&*self.canonical())
    }

    /// The mode with `+` ahead of the `b`/`t` flag.
    fn canonical(&self) -> Cow<'_, str> {
        match self.text.as_bytes() {
            [base, flag @ (b'b' | b't'), b'+'] => Cow::Owned(format!("{}+{}", char::from(*base), char::from(*flag))),
            _ => Cow::Borrowed(&self.text),
        }
    }

    pub(crate) fn open_options(&self) -> OpenOptions {
        let update = self.text.contains('+');
        let mut options = OpenOptions::new();
        match self.text.as_bytes().first() {
            Some(b'w') => options.write(true).create(true).truncate(true).read(update),
            Some(b'a') => options.append(true).create(true).read(update),
            Some(b'x') => options.write(true).create_new(true).read(update),
            Some(b'c') => options.write(true).create(true).read(update),
            _ => options.read(true).write(update),
        };
        options
    }
}

impl FromStr for OpenMode {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
