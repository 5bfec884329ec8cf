use crate::pdml::{PdmlHeader, PdmlPacket};
use crate::psml::{PsmlPacket, PsmlStructure};

/// A block from a summary or detail stream
///
/// Blocks own their contents, so they stay valid after the bytes they were
/// parsed from have been consumed from the reader's buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DumpBlock {
    /// Column structure announced by a summary stream (first block)
    PsmlStructure(PsmlStructure),
    /// One summary record
    PsmlPacket(PsmlPacket),
    /// Document header announced by a detail stream (first block)
    PdmlHeader(PdmlHeader),
    /// One detail record
    PdmlPacket(PdmlPacket),
}

impl From<PsmlStructure> for DumpBlock {
    fn from(b: PsmlStructure) -> DumpBlock {
        DumpBlock::PsmlStructure(b)
    }
}

impl From<PsmlPacket> for DumpBlock {
    fn from(b: PsmlPacket) -> DumpBlock {
        DumpBlock::PsmlPacket(b)
    }
}

impl From<PdmlHeader> for DumpBlock {
    fn from(b: PdmlHeader) -> DumpBlock {
        DumpBlock::PdmlHeader(b)
    }
}

impl From<PdmlPacket> for DumpBlock {
    fn from(b: PdmlPacket) -> DumpBlock {
        DumpBlock::PdmlPacket(b)
    }
}
