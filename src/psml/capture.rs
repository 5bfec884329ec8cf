use crate::error::DumpError;
use crate::psml::{parse_psml_packet, parse_psml_structure, PsmlPacket, PsmlStructure};

/// A complete summary dump loaded into memory
///
/// ```rust
/// use tshark_parser::PsmlDump;
/// use std::fs;
///
/// # let path = "assets/capture.psml";
/// let data = fs::read(path).unwrap();
/// let dump = PsmlDump::from_slice(&data).unwrap();
/// println!("{} packets", dump.packets.len());
/// ```
#[derive(Debug)]
pub struct PsmlDump {
    pub structure: PsmlStructure,
    pub packets: Vec<PsmlPacket>,
}

impl PsmlDump {
    /// Parse an entire summary document
    ///
    /// Note: this requires the dump to be fully loaded into memory. Use
    /// [`PsmlReader`](crate::PsmlReader) for incremental parsing.
    pub fn from_slice(i: &[u8]) -> Result<PsmlDump, DumpError> {
        let (mut rem, structure) = match parse_psml_structure(i) {
            Ok(x) => x,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(e),
            Err(nom::Err::Incomplete(_)) => return Err(DumpError::MalformedPreamble),
        };
        let mut packets = Vec::new();
        loop {
            match parse_psml_packet(rem, packets.is_empty()) {
                Ok((r, packet)) => {
                    if packet.values.len() != structure.sections.len() {
                        return Err(DumpError::CorruptRecord);
                    }
                    rem = r;
                    packets.push(packet);
                }
                Err(nom::Err::Error(DumpError::Eof)) => break,
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(e),
                Err(nom::Err::Incomplete(_)) => {
                    if rem.iter().all(u8::is_ascii_whitespace) {
                        // document close marker missing but no record pending
                        break;
                    }
                    return Err(DumpError::UnexpectedEof);
                }
            }
        }
        Ok(PsmlDump { structure, packets })
    }
}
