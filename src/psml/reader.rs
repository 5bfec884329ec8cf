use circular::Buffer;
use nom::{Needed, Offset};
use std::io::Read;
use tracing::{debug, warn};

use crate::blocks::DumpBlock;
use crate::error::DumpError;
use crate::psml::{parse_psml_packet, parse_psml_structure, PsmlStructure};
use crate::traits::DumpReaderIterator;

/// Parsing iterator over a summary (PSML) stream
///
/// ## PSML Reader
///
/// This reader is a streaming parser based on a circular buffer, which means
/// memory usage is constant, and that it can be used to parse huge dumps or
/// a stream the analyzer is still writing to. It creates an abstraction over
/// any input providing the `Read` trait, and takes care of managing the
/// circular buffer to provide an iterator-like interface.
///
/// The first call to `next` returns the column structure announced before
/// the first record. It must be stored to give meaning to the positional
/// values of the records returned by the following calls.
///
/// The buffer capacity has to be big enough for the structure element and
/// any single record. A record that does not fit is reported as
/// [`DumpError::BufferTooSmall`]; call [`grow`](DumpReaderIterator::grow)
/// and retry to recover.
///
/// ## Example
///
/// ```rust
/// use tshark_parser::*;
/// use tshark_parser::traits::DumpReaderIterator;
/// use std::fs::File;
///
/// # let path = "assets/capture.psml";
/// let file = File::open(path).unwrap();
/// let mut num_records = 0;
/// let mut reader = PsmlReader::new(65536, file);
/// loop {
///     match reader.next() {
///         Ok((offset, block)) => {
///             match block {
///                 DumpBlock::PsmlStructure(s) => {
///                     // keep the column names
///                     assert!(!s.sections.is_empty());
///                 }
///                 DumpBlock::PsmlPacket(_p) => {
///                     num_records += 1;
///                 }
///                 _ => unreachable!(),
///             }
///             reader.consume(offset);
///         }
///         Err(DumpError::Eof) => break,
///         Err(DumpError::Incomplete(_)) => {
///             reader.refill().unwrap();
///         }
///         Err(e) => panic!("error while reading: {:?}", e),
///     }
/// }
/// println!("num_records: {}", num_records);
/// ```
pub struct PsmlReader<R>
where
    R: Read,
{
    structure: Option<PsmlStructure>,
    reader: R,
    buffer: Buffer,
    consumed: usize,
    structure_sent: bool,
    got_first_packet: bool,
    reader_exhausted: bool,
}

impl<R> PsmlReader<R>
where
    R: Read,
{
    /// Creates a new `PsmlReader<R>` with the provided buffer capacity.
    ///
    /// Nothing is read until the first call to `next` or `refill`.
    pub fn new(capacity: usize, reader: R) -> PsmlReader<R> {
        Self::from_buffer(Buffer::with_capacity(capacity), reader)
    }
    /// Creates a new `PsmlReader<R>` using the provided `Buffer`.
    pub fn from_buffer(buffer: Buffer, reader: R) -> PsmlReader<R> {
        PsmlReader {
            structure: None,
            reader,
            buffer,
            consumed: 0,
            structure_sent: false,
            got_first_packet: false,
            reader_exhausted: false,
        }
    }
    /// The column structure, once `next` has returned it.
    pub fn structure(&self) -> Option<&PsmlStructure> {
        self.structure.as_ref()
    }
}

impl<R> DumpReaderIterator for PsmlReader<R>
where
    R: Read,
{
    fn next(&mut self) -> Result<(usize, DumpBlock), DumpError> {
        if !self.structure_sent {
            let data = self.buffer.data();
            return match parse_psml_structure(data) {
                Ok((rem, structure)) => {
                    let offset = data.offset(rem);
                    debug!("psml structure: {} columns", structure.sections.len());
                    self.structure = Some(structure.clone());
                    self.structure_sent = true;
                    Ok((offset, DumpBlock::from(structure)))
                }
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e),
                Err(nom::Err::Incomplete(_)) => {
                    if self.reader_exhausted {
                        // the stream ended before announcing any structure
                        Err(DumpError::MalformedPreamble)
                    } else if self.buffer.available_data() == self.buffer.capacity() {
                        Err(DumpError::BufferTooSmall)
                    } else {
                        Err(DumpError::Incomplete(0))
                    }
                }
            };
        }
        // Return Eof if
        // 1) all bytes have been read
        // 2) no more data is available
        if self.buffer.available_data() == 0
            && (self.buffer.position() == 0 && self.reader_exhausted)
        {
            return Err(DumpError::Eof);
        }
        let data = self.buffer.data();
        match parse_psml_packet(data, !self.got_first_packet) {
            Ok((rem, packet)) => {
                let offset = data.offset(rem);
                if let Some(structure) = &self.structure {
                    if packet.values.len() != structure.sections.len() {
                        warn!(
                            "summary record carries {} values, structure announced {}",
                            packet.values.len(),
                            structure.sections.len()
                        );
                        return Err(DumpError::CorruptRecord);
                    }
                }
                self.got_first_packet = true;
                Ok((offset, DumpBlock::from(packet)))
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e),
            Err(nom::Err::Incomplete(n)) => {
                if self.reader_exhausted {
                    if self.buffer.data().iter().all(u8::is_ascii_whitespace) {
                        // nothing left but trailing whitespace
                        Err(DumpError::Eof)
                    } else {
                        // expected more bytes but reader is EOF, truncated dump?
                        Err(DumpError::UnexpectedEof)
                    }
                } else {
                    match n {
                        Needed::Size(n) => {
                            if self.buffer.available_data() + usize::from(n)
                                >= self.buffer.capacity()
                            {
                                Err(DumpError::BufferTooSmall)
                            } else {
                                Err(DumpError::Incomplete(n.into()))
                            }
                        }
                        Needed::Unknown => {
                            if self.buffer.available_data() == self.buffer.capacity() {
                                Err(DumpError::BufferTooSmall)
                            } else {
                                Err(DumpError::Incomplete(0))
                            }
                        }
                    }
                }
            }
        }
    }
    fn consume(&mut self, offset: usize) {
        self.consumed += offset;
        self.buffer.consume(offset);
    }
    fn consume_noshift(&mut self, offset: usize) {
        self.consumed += offset;
        self.buffer.consume_noshift(offset);
    }
    fn consumed(&self) -> usize {
        self.consumed
    }
    fn refill(&mut self) -> Result<(), DumpError> {
        self.buffer.shift();
        let space = self.buffer.space();
        // check if available space is empty, so we can distinguish
        // a read() returning 0 because of EOF or because we requested 0
        if space.is_empty() {
            return Ok(());
        }
        let sz = self.reader.read(space).or(Err(DumpError::ReadError))?;
        self.reader_exhausted = sz == 0;
        self.buffer.fill(sz);
        Ok(())
    }
    fn position(&self) -> usize {
        self.buffer.position()
    }
    fn grow(&mut self, new_size: usize) -> bool {
        self.buffer.grow(new_size)
    }
    fn data(&self) -> &[u8] {
        self.buffer.data()
    }
    fn reader_exhausted(&self) -> bool {
        self.reader_exhausted
    }
}
