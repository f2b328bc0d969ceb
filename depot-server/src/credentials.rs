//! Matching of `username:password` credential entries.
//!
//! Entries come straight from the configuration file. An entry that does not
//! consist of exactly one `:` with a non-empty name and password on either side
//! is inert: it never matches, and it does not invalidate the other entries.

/// Splits a configured entry into `(username, password)`.
fn parse_entry(entry: &str) -> Option<(&str, &str)> {
    let (username, password) = entry.split_once(':')?;
    if username.is_empty() || password.is_empty() || password.contains(':') {
        return None;
    }
    Some((username, password))
}

/// Returns true if any well-formed entry in `credentials` equals the given pair.
///
/// Comparison is exact and case-sensitive.
pub fn matches<S: AsRef<str>>(credentials: &[S], username: &str, password: &str) -> bool {
    credentials
        .iter()
        .filter_map(|entry| parse_entry(entry.as_ref()))
        .any(|(user, pass)| user == username && pass == password)
}
