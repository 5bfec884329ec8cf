use nom::bytes::complete::{tag, take_until};
use nom::character::complete::multispace0;
use nom::multi::many0;
use nom::IResult;

use crate::error::DumpError;
use crate::psml::PsmlStructure;
use crate::xml::{decode_entities, packet_fragment, PSML_CLOSE};

/// One summary record: the column values of a single packet
///
/// Values are positional; the matching column names are given by the
/// [`PsmlStructure`] announced at the start of the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PsmlPacket {
    /// Column values, in structure order
    pub values: Vec<String>,
}

impl PsmlPacket {
    /// Value of the column `name`, as announced by `structure`
    pub fn section<'a>(&'a self, structure: &PsmlStructure, name: &str) -> Option<&'a str> {
        let index = structure.index_of(name)?;
        self.values.get(index).map(String::as_str)
    }
}

/// Read one summary record
///
/// This is a streaming parser: it scans for the record end marker and
/// returns `Incomplete` as long as the marker has not been received.
/// Reaching the document close marker instead means the end of the stream
/// and is reported as [`DumpError::Eof`]. A record whose boundary is found
/// but whose content cannot be decoded is a [`DumpError::CorruptRecord`].
///
/// `first` allows the record start marker to be absent, for the case where
/// it was already consumed together with the preamble; it should be true
/// only while no record has been read from the stream yet.
pub fn parse_psml_packet(i: &[u8], first: bool) -> IResult<&[u8], PsmlPacket, DumpError> {
    let (content, rem) = packet_fragment(i, PSML_CLOSE, first)?;
    let values = parse_sections(content).map_err(nom::Err::Error)?;
    Ok((rem, PsmlPacket { values }))
}

/// Decode a whitespace-separated run of `section` elements.
///
/// Used for both the structure preamble and record contents, which share the
/// same inner markup.
pub(crate) fn parse_sections(i: &[u8]) -> Result<Vec<String>, DumpError> {
    let (rem, values) = match many0(parse_section)(i) {
        Ok(x) => x,
        Err(_) => return Err(DumpError::CorruptRecord),
    };
    // a failed or foreign element leaves residue behind
    if !rem.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(DumpError::CorruptRecord);
    }
    Ok(values)
}

fn parse_section(i: &[u8]) -> IResult<&[u8], String, DumpError> {
    let (i, _) = multispace0(i)?;
    let (i, _) = tag("<section")(i)?;
    let (i, head) = take_until(">")(i)?;
    let (i, _) = tag(">")(i)?;
    if head.last() == Some(&b'/') {
        // self-closing section, empty column value
        return Ok((i, String::new()));
    }
    let (i, text) = take_until("</section>")(i)?;
    let (i, _) = tag("</section>")(i)?;
    let value = decode_entities(text).ok_or(nom::Err::Error(DumpError::CorruptRecord))?;
    Ok((i, value))
}
