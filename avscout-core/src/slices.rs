//! Multi-part (slice) filename reconciliation.
//!
//! Files sharing an identity in one folder are either the parts of one title or
//! unrelated files that happen to resolve to the same id. They are accepted as one
//! title only when their names differ by a single alphanumeric token following a
//! common prefix, e.g. `ABC-123-1.mp4` / `ABC-123-2.mp4` or `ABC-123.CD1.mp4` /
//! `ABC-123.CD2.mp4`.

use regex::Regex;
use thiserror::Error;

/// Why a group of names is not a valid slice sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SliceError {
    #[error("'{0}' has no part token after the shared prefix")]
    MissingToken(String),

    #[error("names differ after the part token")]
    MixedPostfix,

    #[error("part '{0}' appears more than once")]
    DuplicateToken(char),

    #[error("parts must start at 0, 1 or a (found '{0}')")]
    BadOrigin(char),

    #[error("part '{missing}' is missing")]
    Gap { missing: char },

    #[error("cannot build slice pattern: {0}")]
    Pattern(String),
}

/// Accepted ordering of a slice group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceOrder {
    /// Longest literal prefix shared by every name
    pub prefix: String,
    /// Part tokens in ascending order (lowercase)
    pub tokens: Vec<char>,
    /// Input indices sorted by part token
    pub order: Vec<usize>,
}

/// Longest common prefix of a set of names, never splitting a character.
pub fn longest_common_prefix(names: &[&str]) -> String {
    let Some((first, rest)) = names.split_first() else {
        return String::new();
    };

    let mut len = first.len();
    for name in rest {
        len = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(len);
    }
    first[..len].to_string()
}

/// Check that `names` form one contiguous slice sequence and return their order.
///
/// Groups of zero or one name are trivially ordered. For larger groups every name
/// must be `prefix` + one alphanumeric token (surrounding whitespace allowed) +
/// the same postfix. Tokens are compared case-insensitively, must be distinct, must
/// start at `0`, `1` or `a`, and must have no gaps.
pub fn order_slices(names: &[&str]) -> Result<SliceOrder, SliceError> {
    if names.len() < 2 {
        return Ok(SliceOrder {
            prefix: names.first().map(|n| n.to_string()).unwrap_or_default(),
            tokens: Vec::new(),
            order: (0..names.len()).collect(),
        });
    }

    let prefix = longest_common_prefix(names);
    let pattern = format!(r"(?i)^{}\s*([a-z0-9])\s*", regex::escape(&prefix));
    let re = Regex::new(&pattern).map_err(|e| SliceError::Pattern(e.to_string()))?;

    let mut parts: Vec<(char, usize)> = Vec::with_capacity(names.len());
    let mut postfix: Option<String> = None;

    for (index, name) in names.iter().enumerate() {
        let caps = re
            .captures(name)
            .ok_or_else(|| SliceError::MissingToken(name.to_string()))?;
        let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
            return Err(SliceError::MissingToken(name.to_string()));
        };
        let token = token
            .as_str()
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .ok_or_else(|| SliceError::MissingToken(name.to_string()))?;

        let rest = name[whole.end()..].to_lowercase();
        match &postfix {
            None => postfix = Some(rest),
            Some(expected) if *expected != rest => return Err(SliceError::MixedPostfix),
            Some(_) => {}
        }

        parts.push((token, index));
    }

    parts.sort();
    for pair in parts.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(SliceError::DuplicateToken(pair[0].0));
        }
    }

    let origin = parts[0].0;
    if !matches!(origin, '0' | '1' | 'a') {
        return Err(SliceError::BadOrigin(origin));
    }

    for (expected, (token, _)) in (origin as u32..).zip(&parts) {
        if *token as u32 != expected {
            let missing = char::from_u32(expected).unwrap_or(*token);
            return Err(SliceError::Gap { missing });
        }
    }

    Ok(SliceOrder {
        prefix,
        tokens: parts.iter().map(|&(t, _)| t).collect(),
        order: parts.iter().map(|&(_, i)| i).collect(),
    })
}

#[cfg(test)]
#[path = "tests/slices_tests.rs"]
mod tests;
