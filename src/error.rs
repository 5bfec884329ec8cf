use nom::error::{ErrorKind, ParseError};
use std::fmt;

/// The error type which is returned when reading a dump stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DumpError {
    /// No more data available
    Eof,
    /// Error while reading from the byte source
    ReadError,
    /// Buffer does not contain a complete block yet. Refill and retry.
    ///
    /// The number of missing bytes is a hint only: scanning for an end
    /// marker cannot know the block size in advance, in which case 0 is
    /// given.
    Incomplete(usize),
    /// Buffer is too small to hold a complete block. Grow it and retry.
    BufferTooSmall,
    /// The byte source ended in the middle of a record
    UnexpectedEof,
    /// The preamble announcing the stream structure is missing or unreadable
    MalformedPreamble,
    /// A record boundary was found but its content could not be decoded
    CorruptRecord,
    /// Indexed access requires the capture to keep packets
    PacketsNotKept,
    /// No packet with this index exists in the capture
    PacketNotFound(usize),

    /// Parsing error (nom)
    NomError(ErrorKind),
}

impl<I> ParseError<I> for DumpError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        DumpError::NomError(kind)
    }
    fn append(_input: I, kind: ErrorKind, _other: Self) -> Self {
        DumpError::NomError(kind)
    }
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DumpError::Eof => write!(f, "end of stream"),
            DumpError::ReadError => write!(f, "read error"),
            DumpError::Incomplete(n) => write!(f, "incomplete data, missing: {}", n),
            DumpError::BufferTooSmall => write!(f, "buffer is too small"),
            DumpError::UnexpectedEof => write!(f, "unexpected end of stream"),
            DumpError::MalformedPreamble => write!(f, "malformed or missing preamble"),
            DumpError::CorruptRecord => write!(f, "corrupt record"),
            DumpError::PacketsNotKept => write!(f, "packets are not kept by this capture"),
            DumpError::PacketNotFound(index) => {
                write!(f, "packet of index {} does not exist in capture", index)
            }
            DumpError::NomError(kind) => write!(f, "parsing error: {:?}", kind),
        }
    }
}

impl std::error::Error for DumpError {}
