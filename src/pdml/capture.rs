use crate::error::DumpError;
use crate::pdml::{parse_pdml_header, parse_pdml_packet, PdmlHeader, PdmlPacket};

/// A complete detail dump loaded into memory
///
/// ```rust
/// use tshark_parser::PdmlDump;
/// use std::fs;
///
/// # let path = "assets/capture.pdml";
/// let data = fs::read(path).unwrap();
/// let dump = PdmlDump::from_slice(&data).unwrap();
/// println!("{} packets", dump.packets.len());
/// ```
#[derive(Debug)]
pub struct PdmlDump {
    pub header: PdmlHeader,
    pub packets: Vec<PdmlPacket>,
}

impl PdmlDump {
    /// Parse an entire detail document
    ///
    /// Note: this requires the dump to be fully loaded into memory. Use
    /// [`PdmlReader`](crate::PdmlReader) for incremental parsing.
    pub fn from_slice(i: &[u8]) -> Result<PdmlDump, DumpError> {
        let (mut rem, header) = match parse_pdml_header(i) {
            Ok(x) => x,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(e),
            Err(nom::Err::Incomplete(_)) => return Err(DumpError::MalformedPreamble),
        };
        let mut packets = Vec::new();
        loop {
            match parse_pdml_packet(rem, packets.is_empty()) {
                Ok((r, packet)) => {
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
        Ok(PdmlDump { header, packets })
    }
}
