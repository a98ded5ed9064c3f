//! Format-token arithmetic.
//!
//! A format token is a byte-order marker followed by wire codes, e.g. `!BHb`
//! or `<I16s?`. The token alone determines the encoded size and how each
//! scalar is read, so it is checked against the computed layout size every
//! time a schema is compiled.

use lazy_static::lazy_static;
use regex::Regex;
use safepack_schema::{ByteOrder, Scalar};

use crate::error::FormatError;

lazy_static! {
    static ref FORMAT_ITEM: Regex = Regex::new(r"(\d*)([?bBhHiIqQfds])").unwrap();
}

/// One entry of a parsed format token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCode {
    Scalar(Scalar),
    /// An `Ns` run of raw bytes.
    Bytes(usize),
}

impl FormatCode {
    pub fn size(self) -> usize {
        match self {
            FormatCode::Scalar(scalar) => scalar.size(),
            FormatCode::Bytes(len) => len,
        }
    }
}

/// Splits a token into its byte order and runs of `(code, repeat)`. On `s`
/// the count is the length and the repeat is 1.
fn parse_runs(token: &str) -> Result<(ByteOrder, Vec<(FormatCode, usize)>), FormatError> {
    let fail = |reason: String| FormatError {
        token: token.to_owned(),
        reason,
    };

    let mut chars = token.chars();
    let marker = chars
        .next()
        .ok_or_else(|| fail("token is empty".to_owned()))?;
    let order = ByteOrder::from_marker(marker).ok_or_else(|| {
        fail(format!(
            "{:?} is not an explicit byte order marker (expected '<', '>' or '!')",
            marker
        ))
    })?;

    let body = chars.as_str();
    let mut runs = Vec::new();
    let mut last_end = 0;

    for caps in FORMAT_ITEM.captures_iter(body) {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        if whole.0 != last_end {
            return Err(fail(format!(
                "unexpected text {:?}",
                &body[last_end..whole.0]
            )));
        }
        last_end = whole.1;

        let count = match caps.get(1).map(|m| m.as_str()).unwrap_or("") {
            "" => None,
            digits => Some(
                digits
                    .parse::<usize>()
                    .map_err(|_| fail(format!("repeat count {:?} is too large", digits)))?,
            ),
        };
        let code = caps
            .get(2)
            .and_then(|m| m.as_str().chars().next())
            .ok_or_else(|| fail("missing wire code".to_owned()))?;

        if code == 's' {
            runs.push((FormatCode::Bytes(count.unwrap_or(1)), 1));
        } else {
            let scalar = Scalar::from_code(code)
                .ok_or_else(|| fail(format!("unknown wire code {:?}", code)))?;
            runs.push((FormatCode::Scalar(scalar), count.unwrap_or(1)));
        }
    }

    if last_end != body.len() {
        return Err(fail(format!("unexpected text {:?}", &body[last_end..])));
    }

    Ok((order, runs))
}

/// Splits a token into its byte order and codes. Repeat counts on scalar
/// codes (`4I`) expand into that many entries; on `s` they are the length.
pub fn parse_format(token: &str) -> Result<(ByteOrder, Vec<FormatCode>), FormatError> {
    let (order, runs) = parse_runs(token)?;
    calcsize(token)?;
    let codes = runs
        .into_iter()
        .flat_map(|(code, repeat)| std::iter::repeat(code).take(repeat))
        .collect();
    Ok((order, codes))
}

/// The codes of a token without its byte order.
pub fn codes(token: &str) -> Result<Vec<FormatCode>, FormatError> {
    parse_format(token).map(|(_, codes)| codes)
}

/// Number of bytes a token describes. Repeats are not expanded, and a size
/// that does not fit in `usize` is an error.
pub fn calcsize(token: &str) -> Result<usize, FormatError> {
    let (_, runs) = parse_runs(token)?;
    runs.iter()
        .try_fold(0usize, |total, &(code, repeat)| {
            code.size()
                .checked_mul(repeat)
                .and_then(|size| total.checked_add(size))
        })
        .ok_or_else(|| FormatError {
            token: token.to_owned(),
            reason: "size overflows".to_owned(),
        })
}
