//! Helpers shared by the PSML and PDML parsers.
//!
//! The analyzer escapes all markup characters inside attribute values and
//! element text, so markers can be located by byte scanning without a full
//! XML parser.

use nom::{FindSubstring, Needed};

use crate::error::DumpError;

pub(crate) const PACKET_OPEN: &str = "<packet>";
pub(crate) const PACKET_CLOSE: &str = "</packet>";

pub(crate) const STRUCTURE_OPEN: &str = "<structure";
pub(crate) const STRUCTURE_CLOSE: &str = "</structure>";
pub(crate) const PSML_OPEN: &str = "<psml";
pub(crate) const PSML_CLOSE: &str = "</psml>";

pub(crate) const PDML_OPEN: &str = "<pdml";
pub(crate) const PDML_CLOSE: &str = "</pdml>";

/// Locate the next record fragment.
///
/// Returns the fragment content (start marker stripped) and the remaining
/// input after the end marker. `Incomplete` means no decision can be made
/// yet; reaching the document close marker first means the end of the
/// stream. `first` allows the start marker to be absent, for the case where
/// it was already consumed together with the preamble.
pub(crate) fn packet_fragment<'a>(
    i: &'a [u8],
    close_root: &str,
    first: bool,
) -> Result<(&'a [u8], &'a [u8]), nom::Err<DumpError>> {
    let end = i.find_substring(PACKET_CLOSE);
    let close = i.find_substring(close_root);
    let end = match (end, close) {
        (Some(end), Some(close)) if close < end => return Err(nom::Err::Error(DumpError::Eof)),
        (Some(end), _) => end,
        (None, Some(_)) => return Err(nom::Err::Error(DumpError::Eof)),
        (None, None) => return Err(nom::Err::Incomplete(Needed::Unknown)),
    };
    let fragment = &i[..end];
    let rem = &i[end + PACKET_CLOSE.len()..];
    let content = match fragment.find_substring(PACKET_OPEN) {
        Some(start) => &fragment[start + PACKET_OPEN.len()..],
        None if first => fragment,
        None => return Err(nom::Err::Error(DumpError::CorruptRecord)),
    };
    Ok((content, rem))
}

/// Decode XML character entities.
///
/// Handles the five named entities and decimal or hexadecimal character
/// references. Returns `None` if the input is not valid UTF-8 or an entity
/// cannot be decoded.
pub(crate) fn decode_entities(raw: &[u8]) -> Option<String> {
    let s = std::str::from_utf8(raw).ok()?;
    if !s.contains('&') {
        return Some(s.to_string());
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let end = tail.find(';')?;
        let c = match &tail[..end] {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            name => {
                let num = name.strip_prefix('#')?;
                let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                    None => num.parse::<u32>().ok()?,
                };
                char::from_u32(code)?
            }
        };
        out.push(c);
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

/// Extract the raw value of an attribute from the inside of an element open
/// tag.
///
/// The attribute name must be preceded by whitespace or start the region, so
/// that looking up `name` does not match the tail of `showname`.
pub(crate) fn raw_attribute<'a>(region: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = region;
    loop {
        let pos = rest.find(name)?;
        let preceded = pos == 0 || rest.as_bytes()[pos - 1].is_ascii_whitespace();
        let after = &rest[pos + name.len()..];
        if preceded {
            if let Some(value) = after.strip_prefix("=\"") {
                let end = value.find('"')?;
                return Some(&value[..end]);
            }
        }
        rest = after;
    }
}
