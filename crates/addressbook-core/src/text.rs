//! String helpers for derived keys and field validation.

use crate::{Error, Result};

/// Join the non-blank fragments with a single space. Each fragment is trimmed
/// first; absent and blank fragments are dropped.
pub fn join_nonblank<'a, I>(fragments: I) -> String
where
  I: IntoIterator<Item = Option<&'a str>>,
{
  fragments
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Reject a blank value for a required field.
pub fn require(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::Required { field });
  }
  Ok(())
}

/// Reject a value longer than `max` characters.
pub fn max_len(field: &'static str, value: &str, max: usize) -> Result<()> {
  let len = value.chars().count();
  if len > max {
    return Err(Error::TooLong { field, max, len });
  }
  Ok(())
}

/// [`max_len`] for an optional field.
pub fn max_len_opt(
  field: &'static str,
  value: Option<&str>,
  max: usize,
) -> Result<()> {
  value.map_or(Ok(()), |v| max_len(field, v, max))
}

/// Collapse `Some("")` and whitespace-only strings to `None`.
pub fn nonblank(value: Option<String>) -> Option<String> {
  value.filter(|s| !s.trim().is_empty())
}

/// Parse a `strum`-derived enum from its string form, mapping failures onto
/// [`Error::UnknownVariant`].
pub fn parse_variant<T>(field: &'static str, value: &str) -> Result<T>
where
  T: std::str::FromStr,
{
  value.parse().map_err(|_| Error::UnknownVariant {
    field,
    value: value.to_owned(),
  })
}
