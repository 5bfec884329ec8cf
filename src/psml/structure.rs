use nom::{FindSubstring, IResult, Needed};

use crate::error::DumpError;
use crate::psml::parse_sections;
use crate::xml::{STRUCTURE_CLOSE, STRUCTURE_OPEN};

/// Column layout announced by a summary stream before the first record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PsmlStructure {
    /// Column names, in output order
    pub sections: Vec<String>,
}

impl PsmlStructure {
    /// Position of the named column
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s == name)
    }
}

/// Read the column structure announced before the first summary record
///
/// This is a streaming parser: as long as the end of the structure element
/// has not been received, it returns `Incomplete` and the caller is expected
/// to refill its buffer and try again. A structure that turns out to be
/// absent or unreadable is a [`DumpError::MalformedPreamble`].
pub fn parse_psml_structure(i: &[u8]) -> IResult<&[u8], PsmlStructure, DumpError> {
    let end = match i.find_substring(STRUCTURE_CLOSE) {
        Some(end) => end,
        None => return Err(nom::Err::Incomplete(Needed::Unknown)),
    };
    let fragment = &i[..end];
    let rem = &i[end + STRUCTURE_CLOSE.len()..];
    let start = fragment
        .find_substring(STRUCTURE_OPEN)
        .ok_or(nom::Err::Error(DumpError::MalformedPreamble))?;
    let body = &fragment[start + STRUCTURE_OPEN.len()..];
    let gt = body
        .find_substring(">")
        .ok_or(nom::Err::Error(DumpError::MalformedPreamble))?;
    let sections = parse_sections(&body[gt + 1..])
        .map_err(|_| nom::Err::Error(DumpError::MalformedPreamble))?;
    if sections.is_empty() {
        // a structure announcing no columns cannot describe any record
        return Err(nom::Err::Error(DumpError::MalformedPreamble));
    }
    Ok((rem, PsmlStructure { sections }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRUCTURE: &[u8] = br#"<?xml version="1.0"?>
<psml version="0" creator="wireshark/4.0.6">
<structure>
<section>No.</section>
<section>Time</section>
<section>Info</section>
</structure>

<packet>"#;

    #[test]
    fn test_parse_psml_structure() {
        let (rem, structure) = parse_psml_structure(STRUCTURE).expect("structure parsing failed");
        assert_eq!(structure.sections, ["No.", "Time", "Info"]);
        assert_eq!(structure.index_of("Time"), Some(1));
        assert_eq!(structure.index_of("Source"), None);
        assert_eq!(rem, b"\n\n<packet>");
    }

    #[test]
    fn test_structure_incomplete() {
        // end marker not seen yet
        assert!(matches!(
            parse_psml_structure(&STRUCTURE[..40]),
            Err(nom::Err::Incomplete(_))
        ));
    }

    #[test]
    fn test_structure_missing_open_marker() {
        let input: &[u8] = b"<psml>garbage</structure>";
        assert!(matches!(
            parse_psml_structure(input),
            Err(nom::Err::Error(DumpError::MalformedPreamble))
        ));
    }

    #[test]
    fn test_structure_without_columns() {
        let input: &[u8] = b"<psml>\n<structure>\n</structure>\n";
        assert!(matches!(
            parse_psml_structure(input),
            Err(nom::Err::Error(DumpError::MalformedPreamble))
        ));
    }
}
