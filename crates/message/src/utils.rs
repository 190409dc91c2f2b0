//! Validation and folding helpers shared by the value types.

/// Returns `Err($error)` from the enclosing function unless `$predicate` holds.
///
/// Like `assert!`, but for argument validation in `with_*` operations.
///
/// # Example
///
/// ```ignore
/// ensure!(port <= 0xFFFF, MessageError::InvalidPort { port });
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Lowercases ASCII letters only. Schemes, hosts and header names are folded this way.
#[inline]
pub(crate) fn fold(value: &str) -> String {
    value.to_ascii_lowercase()
}
