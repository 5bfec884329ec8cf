use circular::Buffer;
use nom::{Needed, Offset};
use std::io::Read;
use tracing::debug;

use crate::blocks::DumpBlock;
use crate::error::DumpError;
use crate::pdml::{parse_pdml_header, parse_pdml_packet, PdmlHeader};
use crate::traits::DumpReaderIterator;

/// Parsing iterator over a detail (PDML) stream
///
/// ## PDML Reader
///
/// This reader is a streaming parser based on a circular buffer, which means
/// memory usage is constant, and that it can be used to parse huge dumps or
/// a stream the analyzer is still writing to. It creates an abstraction over
/// any input providing the `Read` trait, and takes care of managing the
/// circular buffer to provide an iterator-like interface.
///
/// The first call to `next` returns the stream header, which carries the
/// creator version and the name of the capture file when one is known.
///
/// The buffer capacity has to be big enough for the header and any single
/// record. Detail records are much larger than summary records, so a
/// capacity suited for a [`PsmlReader`](crate::PsmlReader) may be too small
/// here. A record that does not fit is reported as
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
/// # let path = "assets/capture.pdml";
/// let file = File::open(path).unwrap();
/// let mut num_records = 0;
/// let mut reader = PdmlReader::new(65536, file);
/// loop {
///     match reader.next() {
///         Ok((offset, block)) => {
///             match block {
///                 DumpBlock::PdmlHeader(h) => {
///                     println!("creator: {:?}", h.creator);
///                 }
///                 DumpBlock::PdmlPacket(_p) => {
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
pub struct PdmlReader<R>
where
    R: Read,
{
    header: Option<PdmlHeader>,
    reader: R,
    buffer: Buffer,
    consumed: usize,
    header_sent: bool,
    got_first_packet: bool,
    reader_exhausted: bool,
}

impl<R> PdmlReader<R>
where
    R: Read,
{
    /// Creates a new `PdmlReader<R>` with the provided buffer capacity.
    ///
    /// Nothing is read until the first call to `next` or `refill`.
    pub fn new(capacity: usize, reader: R) -> PdmlReader<R> {
        Self::from_buffer(Buffer::with_capacity(capacity), reader)
    }
    /// Creates a new `PdmlReader<R>` using the provided `Buffer`.
    pub fn from_buffer(buffer: Buffer, reader: R) -> PdmlReader<R> {
        PdmlReader {
            header: None,
            reader,
            buffer,
            consumed: 0,
            header_sent: false,
            got_first_packet: false,
            reader_exhausted: false,
        }
    }
    /// The stream header, once `next` has returned it.
    pub fn header(&self) -> Option<&PdmlHeader> {
        self.header.as_ref()
    }
}

impl<R> DumpReaderIterator for PdmlReader<R>
where
    R: Read,
{
    fn next(&mut self) -> Result<(usize, DumpBlock), DumpError> {
        if !self.header_sent {
            let data = self.buffer.data();
            return match parse_pdml_header(data) {
                Ok((rem, header)) => {
                    let offset = data.offset(rem);
                    debug!("pdml header, creator {:?}", header.creator);
                    self.header = Some(header.clone());
                    self.header_sent = true;
                    Ok((offset, DumpBlock::from(header)))
                }
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e),
                Err(nom::Err::Incomplete(_)) => {
                    if self.reader_exhausted {
                        // the stream ended before the root element
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
        match parse_pdml_packet(data, !self.got_first_packet) {
            Ok((rem, packet)) => {
                let offset = data.offset(rem);
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
