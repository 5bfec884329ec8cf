use nom::{FindSubstring, IResult, Needed};

use crate::error::DumpError;
use crate::xml::{decode_entities, raw_attribute, PDML_OPEN};

/// Document header announced by a detail stream before the first record
///
/// All attributes are written by the analyzer but none is required to give
/// meaning to the records, so each is optional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdmlHeader {
    /// PDML format version
    pub version: Option<String>,
    /// Producing tool and its version
    pub creator: Option<String>,
    /// Document creation time, as written by the tool
    pub time: Option<String>,
    /// Path of the capture file the dump was produced from
    pub capture_file: Option<String>,
}

/// Read the document header announced before the first detail record
///
/// This is a streaming parser: as long as the open tag of the document root
/// has not been fully received, it returns `Incomplete` and the caller is
/// expected to refill its buffer and try again.
pub fn parse_pdml_header(i: &[u8]) -> IResult<&[u8], PdmlHeader, DumpError> {
    let start = match i.find_substring(PDML_OPEN) {
        Some(start) => start,
        None => return Err(nom::Err::Incomplete(Needed::Unknown)),
    };
    let body = &i[start + PDML_OPEN.len()..];
    let gt = match body.find_substring(">") {
        Some(gt) => gt,
        None => return Err(nom::Err::Incomplete(Needed::Unknown)),
    };
    let region = std::str::from_utf8(&body[..gt])
        .map_err(|_| nom::Err::Error(DumpError::MalformedPreamble))?;
    let attr = |name: &str| -> Result<Option<String>, nom::Err<DumpError>> {
        match raw_attribute(region, name) {
            Some(raw) => decode_entities(raw.as_bytes())
                .map(Some)
                .ok_or(nom::Err::Error(DumpError::MalformedPreamble)),
            None => Ok(None),
        }
    };
    let header = PdmlHeader {
        version: attr("version")?,
        creator: attr("creator")?,
        time: attr("time")?,
        capture_file: attr("capture_file")?,
    };
    Ok((&body[gt + 1..], header))
}
