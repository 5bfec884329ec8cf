//! PSML: packet summary format
//!
//! A summary stream announces a `structure` element giving the column names
//! of the output, then carries one `packet` element per packet with one
//! positional value per column. See <https://wiki.wireshark.org/PSML> for
//! details.
//!
//! There are 2 main ways of parsing a summary stream. [`PsmlDump::from_slice`]
//! requires the entire dump to be loaded into memory, and thus may not be
//! good for large files. [`PsmlReader`] parses incrementally and can be used
//! on a dump that is still being written.

mod capture;
mod packet;
mod reader;
mod structure;

pub use capture::*;
pub use packet::*;
pub use reader::*;
pub use structure::*;
