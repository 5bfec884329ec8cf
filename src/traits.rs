use crate::blocks::DumpBlock;
use crate::error::DumpError;

/// Streaming iterator over dump streams
///
/// Implementors of this trait are usually based on a circular buffer, which
/// means memory usage is constant, and that huge dumps or streams still being
/// written by the analyzer can be parsed.
///
/// Each call to `next` returns the next block: the preamble first, then one
/// record per call. It must be followed by a call to `consume` to avoid
/// reading the same data again. `consume` takes care of shifting data in the
/// buffer if required, but does not refill it.
///
/// Unlike the underlying buffer, blocks own their contents, so they stay
/// valid after `consume` or `refill`.
///
/// To determine when a refill is needed, test `next()` for an incomplete
/// read. You can also use `position` to implement a heuristic refill (for ex,
/// when `position > capacity / 2`).
pub trait DumpReaderIterator {
    /// Get the next block, if possible. Returns the number of bytes read and the block.
    fn next(&mut self) -> Result<(usize, DumpBlock), DumpError>;
    /// Consume data, and shift buffer if needed.
    ///
    /// If the position gets past the buffer's half, this will move the
    /// remaining data to the beginning of the buffer.
    fn consume(&mut self, offset: usize);
    /// Consume data, but do not change the buffer.
    fn consume_noshift(&mut self, offset: usize);
    /// Get the number of consumed bytes
    fn consumed(&self) -> usize;
    /// Refill the internal buffer, shifting it if necessary.
    fn refill(&mut self) -> Result<(), DumpError>;
    /// Get the position in the internal buffer. Can be used to determine if `refill` is required.
    fn position(&self) -> usize;
    /// Grow size of the internal buffer.
    fn grow(&mut self, new_size: usize) -> bool;
    /// Returns a slice with all the available data
    fn data(&self) -> &[u8];
    /// Returns true if underlying reader is exhausted
    ///
    /// Note that exhausted reader only means that next `refill` will not
    /// add any data, but there can still be data not consumed in the current buffer.
    fn reader_exhausted(&self) -> bool;
}
