//! PDML: packet details format
//!
//! A detail stream opens with a `pdml` document header, then carries one
//! `packet` element per packet holding the full dissection: a list of
//! `proto` elements whose `field` elements may nest arbitrarily. See
//! <https://wiki.wireshark.org/PDML> for details.
//!
//! There are 2 main ways of parsing a detail stream. [`PdmlDump::from_slice`]
//! requires the entire dump to be loaded into memory, and thus may not be
//! good for large files. [`PdmlReader`] parses incrementally and can be used
//! on a dump that is still being written.

mod capture;
mod header;
mod packet;
mod reader;

pub use capture::*;
pub use header::*;
pub use packet::*;
pub use reader::*;
