use circular::Buffer;
use nom::FindSubstring;
use std::fmt;
use std::io::Read;
use tracing::{debug, trace, warn};

use crate::blocks::DumpBlock;
use crate::error::DumpError;
use crate::pdml::{PdmlHeader, PdmlPacket, PdmlReader};
use crate::psml::{PsmlPacket, PsmlReader, PsmlStructure};
use crate::traits::DumpReaderIterator;
use crate::xml::{PDML_OPEN, PSML_OPEN};

/// Default buffer capacity used by [`DumpCapture::new`]
pub const DEFAULT_BUFFER_CAPACITY: usize = 65536;

/// Output mode of the analyzer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpFormat {
    /// Summary mode: one line of column values per packet
    Psml,
    /// Detail mode: the full dissection tree per packet
    Pdml,
}

/// Parsed content of one packet, depending on the dump format
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketData {
    Summary(PsmlPacket),
    Detail(PdmlPacket),
}

/// One packet produced by a [`DumpCapture`]
///
/// The index is the position of the packet in the capture, starting at 0,
/// and identifies the packet regardless of retention.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpPacket {
    pub index: usize,
    pub data: PacketData,
}

impl DumpPacket {
    /// The summary record, if this capture is in summary mode
    pub fn summary(&self) -> Option<&PsmlPacket> {
        match &self.data {
            PacketData::Summary(p) => Some(p),
            PacketData::Detail(_) => None,
        }
    }
    /// The detail record, if this capture is in detail mode
    pub fn detail(&self) -> Option<&PdmlPacket> {
        match &self.data {
            PacketData::Summary(_) => None,
            PacketData::Detail(p) => Some(p),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CaptureState {
    Uninitialized,
    DescriptorParsed,
    Producing,
    Exhausted,
}

enum FormatReader<R>
where
    R: Read,
{
    Psml(PsmlReader<R>),
    Pdml(PdmlReader<R>),
}

impl<R> DumpReaderIterator for FormatReader<R>
where
    R: Read,
{
    fn next(&mut self) -> Result<(usize, DumpBlock), DumpError> {
        match self {
            FormatReader::Psml(r) => r.next(),
            FormatReader::Pdml(r) => r.next(),
        }
    }
    fn consume(&mut self, offset: usize) {
        match self {
            FormatReader::Psml(r) => r.consume(offset),
            FormatReader::Pdml(r) => r.consume(offset),
        }
    }
    fn consume_noshift(&mut self, offset: usize) {
        match self {
            FormatReader::Psml(r) => r.consume_noshift(offset),
            FormatReader::Pdml(r) => r.consume_noshift(offset),
        }
    }
    fn consumed(&self) -> usize {
        match self {
            FormatReader::Psml(r) => r.consumed(),
            FormatReader::Pdml(r) => r.consumed(),
        }
    }
    fn refill(&mut self) -> Result<(), DumpError> {
        match self {
            FormatReader::Psml(r) => r.refill(),
            FormatReader::Pdml(r) => r.refill(),
        }
    }
    fn position(&self) -> usize {
        match self {
            FormatReader::Psml(r) => r.position(),
            FormatReader::Pdml(r) => r.position(),
        }
    }
    fn grow(&mut self, new_size: usize) -> bool {
        match self {
            FormatReader::Psml(r) => r.grow(new_size),
            FormatReader::Pdml(r) => r.grow(new_size),
        }
    }
    fn data(&self) -> &[u8] {
        match self {
            FormatReader::Psml(r) => r.data(),
            FormatReader::Pdml(r) => r.data(),
        }
    }
    fn reader_exhausted(&self) -> bool {
        match self {
            FormatReader::Psml(r) => r.reader_exhausted(),
            FormatReader::Pdml(r) => r.reader_exhausted(),
        }
    }
}

/// High-level capture over a dump stream
///
/// A capture drives a streaming reader on demand: nothing is read from the
/// source at construction, and each packet is produced when requested. The
/// buffer management (refills, growing on oversized records) is taken care
/// of internally.
///
/// Packets are retained by default, so they can be addressed by index with
/// [`get`](DumpCapture::get) and the capture can be iterated again after
/// [`rewind`](DumpCapture::rewind). Retention can be turned off with
/// [`keep_packets`](DumpCapture::keep_packets) to bound memory use on huge
/// dumps, leaving only forward iteration available.
///
/// Errors are fatal to the capture: after a failed production the capture
/// behaves as exhausted, and further calls report normal termination rather
/// than the same error again.
///
/// ## Example
///
/// ```rust
/// use tshark_parser::{DumpCapture, DumpFormat};
/// use std::fs::File;
///
/// # let path = "assets/capture.psml";
/// let file = File::open(path).unwrap();
/// let mut capture = DumpCapture::new(DumpFormat::Psml, path, file);
/// while let Some(packet) = capture.next_packet().unwrap() {
///     println!("packet {}", packet.index);
/// }
/// println!("{}", capture);
/// ```
pub struct DumpCapture<R>
where
    R: Read,
{
    source: String,
    format: DumpFormat,
    keep: bool,
    capacity: usize,
    reader: FormatReader<R>,
    structure: Option<PsmlStructure>,
    header: Option<PdmlHeader>,
    packets: Vec<DumpPacket>,
    current: Option<DumpPacket>,
    cursor: usize,
    produced: usize,
    state: CaptureState,
}

impl<R> DumpCapture<R>
where
    R: Read,
{
    /// Creates a capture over `reader` with the default buffer capacity.
    ///
    /// `source` is an identifier for display purposes only, usually the path
    /// of the dump file or the command line of the analyzer process.
    pub fn new(format: DumpFormat, source: &str, reader: R) -> DumpCapture<R> {
        Self::with_capacity(format, source, reader, DEFAULT_BUFFER_CAPACITY)
    }
    /// Creates a capture with the provided initial buffer capacity.
    ///
    /// The buffer is grown automatically when a record does not fit, so a
    /// small capacity is only a starting point, not a limit.
    pub fn with_capacity(
        format: DumpFormat,
        source: &str,
        reader: R,
        capacity: usize,
    ) -> DumpCapture<R> {
        let reader = match format {
            DumpFormat::Psml => FormatReader::Psml(PsmlReader::new(capacity, reader)),
            DumpFormat::Pdml => FormatReader::Pdml(PdmlReader::new(capacity, reader)),
        };
        DumpCapture {
            source: source.to_string(),
            format,
            keep: true,
            capacity,
            reader,
            structure: None,
            header: None,
            packets: Vec::new(),
            current: None,
            cursor: 0,
            produced: 0,
            state: CaptureState::Uninitialized,
        }
    }
    /// Sets whether produced packets are retained for indexed access.
    pub fn keep_packets(mut self, keep: bool) -> DumpCapture<R> {
        self.keep = keep;
        self
    }

    /// Drive the reader until it yields a record, refilling and growing the
    /// buffer as needed. Preamble blocks are stored on the way.
    fn produce(&mut self) -> Result<Option<DumpPacket>, DumpError> {
        if self.state == CaptureState::Exhausted {
            return Ok(None);
        }
        loop {
            match self.reader.next() {
                Ok((offset, block)) => {
                    self.reader.consume(offset);
                    match block {
                        DumpBlock::PsmlStructure(structure) => {
                            debug!("capture structure: {} columns", structure.sections.len());
                            self.structure = Some(structure);
                            self.state = CaptureState::DescriptorParsed;
                        }
                        DumpBlock::PdmlHeader(header) => {
                            debug!("capture header, creator {:?}", header.creator);
                            self.header = Some(header);
                            self.state = CaptureState::DescriptorParsed;
                        }
                        DumpBlock::PsmlPacket(packet) => {
                            self.state = CaptureState::Producing;
                            let index = self.produced;
                            self.produced += 1;
                            trace!("summary record {}", index);
                            return Ok(Some(DumpPacket {
                                index,
                                data: PacketData::Summary(packet),
                            }));
                        }
                        DumpBlock::PdmlPacket(packet) => {
                            self.state = CaptureState::Producing;
                            let index = self.produced;
                            self.produced += 1;
                            trace!("detail record {}", index);
                            return Ok(Some(DumpPacket {
                                index,
                                data: PacketData::Detail(packet),
                            }));
                        }
                    }
                }
                Err(DumpError::Eof) => {
                    debug!("capture exhausted after {} packets", self.produced);
                    self.state = CaptureState::Exhausted;
                    return Ok(None);
                }
                Err(DumpError::Incomplete(_)) => {
                    if let Err(e) = self.reader.refill() {
                        return Err(self.fail(e));
                    }
                }
                Err(DumpError::BufferTooSmall) => {
                    let new_capacity = self.capacity * 2;
                    trace!("record does not fit, growing buffer to {}", new_capacity);
                    if !self.reader.grow(new_capacity) {
                        return Err(self.fail(DumpError::BufferTooSmall));
                    }
                    self.capacity = new_capacity;
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    fn fail(&mut self, e: DumpError) -> DumpError {
        warn!("capture on {} failed: {}", self.source, e);
        self.state = CaptureState::Exhausted;
        e
    }

    /// Returns the next packet, or `None` once the capture is exhausted.
    ///
    /// With retention on, iterating again after [`rewind`](Self::rewind)
    /// replays retained packets before producing new ones.
    pub fn next_packet(&mut self) -> Result<Option<&DumpPacket>, DumpError> {
        if !self.keep {
            self.current = self.produce()?;
            return Ok(self.current.as_ref());
        }
        if self.cursor >= self.packets.len() {
            match self.produce()? {
                Some(packet) => self.packets.push(packet),
                None => return Ok(None),
            }
        }
        let packet = &self.packets[self.cursor];
        self.cursor += 1;
        Ok(Some(packet))
    }

    /// Returns the packet of the given index, producing from the stream as
    /// needed.
    ///
    /// Does not move the iteration cursor: mixing `get` and
    /// [`next_packet`](Self::next_packet) is allowed in any order, and both
    /// see the same packets at the same indices.
    ///
    /// Fails with [`DumpError::PacketsNotKept`] when retention is off, and
    /// with [`DumpError::PacketNotFound`] when the capture ends before
    /// reaching the index.
    pub fn get(&mut self, index: usize) -> Result<&DumpPacket, DumpError> {
        if !self.keep {
            return Err(DumpError::PacketsNotKept);
        }
        while index >= self.packets.len() {
            match self.produce()? {
                Some(packet) => self.packets.push(packet),
                None => return Err(DumpError::PacketNotFound(index)),
            }
        }
        Ok(&self.packets[index])
    }

    /// Number of retained packets so far.
    ///
    /// This is the capture's total size only once it has been fully drained.
    pub fn len(&self) -> usize {
        self.packets.len()
    }
    /// True if no packet has been retained.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
    /// True once the stream has ended or a fatal error was reported.
    pub fn is_exhausted(&self) -> bool {
        self.state == CaptureState::Exhausted
    }
    /// Moves the iteration cursor back to the first packet.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
    /// The dump format this capture was created for.
    pub fn format(&self) -> DumpFormat {
        self.format
    }
    /// The source identifier given at creation.
    pub fn source(&self) -> &str {
        &self.source
    }
    /// The column structure of a summary capture, once parsed.
    pub fn structure(&self) -> Option<&PsmlStructure> {
        self.structure.as_ref()
    }
    /// The stream header of a detail capture, once parsed.
    pub fn pdml_header(&self) -> Option<&PdmlHeader> {
        self.header.as_ref()
    }
}

impl<R> fmt::Display for DumpCapture<R>
where
    R: Read,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.keep {
            write!(
                f,
                "DumpCapture({}, {} packets)",
                self.source,
                self.packets.len()
            )
        } else {
            write!(f, "DumpCapture({})", self.source)
        }
    }
}

/// Create a dump reader for input in either PSML or PDML format
///
/// Reads from `reader` until the document root element is seen, then builds
/// the matching streaming reader. The bytes read while probing stay in the
/// reader's buffer, so nothing is lost.
///
/// Fails with [`DumpError::MalformedPreamble`] if the input ends, or the
/// buffer fills up, before a root element is found.
pub fn create_reader<'b, R>(
    capacity: usize,
    mut reader: R,
) -> Result<Box<dyn DumpReaderIterator + 'b>, DumpError>
where
    R: Read + 'b,
{
    let mut buffer = Buffer::with_capacity(capacity);
    loop {
        let data = buffer.data();
        let psml = data.find_substring(PSML_OPEN);
        let pdml = data.find_substring(PDML_OPEN);
        match (psml, pdml) {
            // when both markers somehow appear, the earlier one is the root
            (Some(p), Some(d)) if d < p => {
                return Ok(Box::new(PdmlReader::from_buffer(buffer, reader)))
            }
            (Some(_), _) => return Ok(Box::new(PsmlReader::from_buffer(buffer, reader))),
            (None, Some(_)) => return Ok(Box::new(PdmlReader::from_buffer(buffer, reader))),
            (None, None) => (),
        }
        let space = buffer.space();
        if space.is_empty() {
            return Err(DumpError::MalformedPreamble);
        }
        let sz = reader.read(space).or(Err(DumpError::ReadError))?;
        if sz == 0 {
            return Err(DumpError::MalformedPreamble);
        }
        buffer.fill(sz);
    }
}
