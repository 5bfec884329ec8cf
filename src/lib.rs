//! # PSML and PDML dump parsers
//!
//! This crate contains parsers for the PSML (packet summary) and PDML
//! (packet details) dump formats produced by the tshark and wireshark
//! analyzers.
//!
//! Compared to loading a whole dump into an XML library, it is designed to
//! work on streams: each packet is parsed as soon as its bytes have been
//! received, memory usage is bounded by a circular buffer, and the input may
//! still be appended to by a running analyzer process.
//!
//! # Example: streaming parsers
//!
//! The following code shows how to parse a summary stream using a
//! [`PsmlReader`] streaming parser.
//!
//! ```rust
//! use tshark_parser::*;
//! use tshark_parser::traits::DumpReaderIterator;
//! use std::fs::File;
//!
//! # let path = "assets/capture.psml";
//! let file = File::open(path).unwrap();
//! let mut num_blocks = 0;
//! let mut reader = PsmlReader::new(65536, file);
//! loop {
//!     match reader.next() {
//!         Ok((offset, _block)) => {
//!             println!("got new block");
//!             num_blocks += 1;
//!             reader.consume(offset);
//!         }
//!         Err(DumpError::Eof) => break,
//!         Err(DumpError::Incomplete(_)) => {
//!             reader.refill().unwrap();
//!         }
//!         Err(e) => panic!("error while reading: {:?}", e),
//!     }
//! }
//! println!("num_blocks: {}", num_blocks);
//! ```
//!
//! See [`PsmlReader`] for a complete example, including handling of the
//! column structure and accessing record values.
//!
//! For detail dumps, use similar code with the [`PdmlReader`] streaming
//! parser.
//!
//! To create a dump reader for input in either format, use the
//! [`create_reader`] function.
//!
//! # Example: captures
//!
//! A [`DumpCapture`] wraps a streaming reader and takes care of buffer
//! management, providing iterator-like and indexed access to the packets.
//!
//! ```rust
//! use tshark_parser::{DumpCapture, DumpFormat};
//! use std::fs::File;
//!
//! # let path = "assets/capture.pdml";
//! let file = File::open(path).unwrap();
//! let mut capture = DumpCapture::new(DumpFormat::Pdml, path, file);
//! let first = capture.get(0).unwrap();
//! println!("{} layers", first.detail().unwrap().protos.len());
//! ```

mod blocks;
mod error;
pub use blocks::*;
pub use error::*;

pub mod pdml;
pub mod psml;
pub use pdml::*;
pub use psml::*;

pub mod traits;

mod capture;
pub use capture::*;

mod xml;
