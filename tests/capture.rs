use std::fs::File;
use std::io::Read;

use tshark_parser::{DumpCapture, DumpError, DumpFormat, DumpPacket};

static TEST_PSML: &[u8] = include_bytes!("../assets/capture.psml");
static TEST_PDML: &[u8] = include_bytes!("../assets/capture.pdml");

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

struct ChunkedReader<'a> {
    data: &'a [u8],
    chunk: usize,
}

impl<'a> ChunkedReader<'a> {
    fn new(data: &'a [u8], chunk: usize) -> ChunkedReader<'a> {
        ChunkedReader { data, chunk }
    }
}

impl<'a> Read for ChunkedReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

fn drain(capture: &mut DumpCapture<impl Read>) -> Vec<DumpPacket> {
    let mut packets = Vec::new();
    while let Some(packet) = capture.next_packet().expect("next_packet failed") {
        packets.push(packet.clone());
    }
    packets
}

#[test]
fn test_capture_iteration() {
    let file = File::open("assets/capture.psml").unwrap();
    let mut capture = DumpCapture::new(DumpFormat::Psml, "assets/capture.psml", file);
    let packets = drain(&mut capture);
    assert_eq!(packets.len(), 10);
    // indices are dense, starting at 0
    for (i, packet) in packets.iter().enumerate() {
        assert_eq!(packet.index, i);
    }
    assert_eq!(capture.len(), 10);
    assert!(capture.is_exhausted());
    // exhaustion is terminal and not an error
    assert!(capture.next_packet().unwrap().is_none());
    assert!(capture.next_packet().unwrap().is_none());
    let structure = capture.structure().expect("no structure");
    assert_eq!(structure.index_of("Info"), Some(6));
    assert_eq!(
        packets[0].summary().unwrap().section(structure, "Protocol"),
        Some("DNS")
    );
}

#[test]
fn test_capture_get_matches_iteration() {
    let mut by_next = DumpCapture::new(DumpFormat::Psml, "psml", TEST_PSML);
    let packets = drain(&mut by_next);

    // indexed access materializes lazily, in any order
    let mut by_get = DumpCapture::new(DumpFormat::Psml, "psml", TEST_PSML);
    for i in (0..10).rev() {
        assert_eq!(by_get.get(i).unwrap(), &packets[i]);
    }
    // the iteration cursor was not moved by get
    let replayed = drain(&mut by_get);
    assert_eq!(replayed, packets);
}

#[test]
fn test_capture_get_out_of_range() {
    let mut capture = DumpCapture::new(DumpFormat::Psml, "psml", TEST_PSML);
    assert_eq!(capture.get(10), Err(DumpError::PacketNotFound(10)));
    // every packet before the failed index is still there
    assert_eq!(capture.len(), 10);
    assert!(capture.get(3).is_ok());
}

#[test]
fn test_capture_without_retention() {
    let mut capture =
        DumpCapture::new(DumpFormat::Psml, "psml", TEST_PSML).keep_packets(false);
    assert_eq!(capture.get(0), Err(DumpError::PacketsNotKept));
    let mut count = 0;
    while let Some(packet) = capture.next_packet().unwrap() {
        assert_eq!(packet.index, count);
        count += 1;
    }
    assert_eq!(count, 10);
    assert_eq!(capture.len(), 0);
    assert_eq!(capture.get(0), Err(DumpError::PacketsNotKept));
}

#[test]
fn test_capture_rewind() {
    let file = File::open("assets/capture.pdml").unwrap();
    let mut capture = DumpCapture::new(DumpFormat::Pdml, "assets/capture.pdml", file);
    let packets = drain(&mut capture);
    assert_eq!(packets.len(), 3);
    assert!(capture.next_packet().unwrap().is_none());
    capture.rewind();
    let replayed = drain(&mut capture);
    assert_eq!(replayed, packets);
}

#[test]
fn test_capture_mixed_get_and_next() {
    let mut capture = DumpCapture::new(DumpFormat::Psml, "psml", TEST_PSML);
    assert_eq!(capture.get(5).unwrap().index, 5);
    // next_packet starts from the beginning regardless of get calls
    assert_eq!(capture.next_packet().unwrap().unwrap().index, 0);
    assert_eq!(capture.next_packet().unwrap().unwrap().index, 1);
    assert_eq!(capture.get(1).unwrap().index, 1);
    assert_eq!(capture.next_packet().unwrap().unwrap().index, 2);
}

#[test]
fn test_capture_malformed_preamble() {
    let input: &[u8] = b"this is not a dump\n";
    let mut capture = DumpCapture::new(DumpFormat::Psml, "bogus", input);
    assert!(matches!(
        capture.next_packet(),
        Err(DumpError::MalformedPreamble)
    ));
    // failures are fatal, later calls report a normal termination
    assert!(capture.next_packet().unwrap().is_none());
    assert!(capture.is_exhausted());
}

static CORRUPT_MID: &[u8] = br#"<?xml version="1.0"?>
<psml version="0" creator="wireshark/4.0.6">
<structure>
<section>No.</section>
<section>Info</section>
</structure>
<packet>
<section>1</section>
<section>first</section>
</packet>
<packet>
<section>2</section>
</packet>
</psml>
"#;

#[test]
fn test_capture_corrupt_record_is_fatal() {
    let mut capture = DumpCapture::new(DumpFormat::Psml, "corrupt", CORRUPT_MID);
    let first = capture.next_packet().unwrap().expect("no first packet");
    assert_eq!(first.index, 0);
    assert!(matches!(
        capture.next_packet(),
        Err(DumpError::CorruptRecord)
    ));
    // the well-formed record after the corrupt one is never produced
    assert!(capture.next_packet().unwrap().is_none());
    assert_eq!(capture.len(), 1);
}

#[test]
fn test_capture_truncated_stream() {
    let cut = find_last(TEST_PSML, b"<section>10</section>").unwrap();
    let mut capture = DumpCapture::new(DumpFormat::Psml, "truncated", &TEST_PSML[..cut]);
    let mut count = 0;
    loop {
        match capture.next_packet() {
            Ok(Some(_)) => count += 1,
            Ok(None) => panic!("expected a truncation error"),
            Err(DumpError::UnexpectedEof) => break,
            Err(e) => panic!("error while reading: {:?}", e),
        }
    }
    assert_eq!(count, 9);
    assert!(capture.next_packet().unwrap().is_none());
}

#[test]
fn test_capture_chunked_source() {
    // a source trickling 7 bytes at a time produces the same packets
    let mut reference = DumpCapture::new(DumpFormat::Psml, "psml", TEST_PSML);
    let expected = drain(&mut reference);
    let mut capture =
        DumpCapture::new(DumpFormat::Psml, "psml", ChunkedReader::new(TEST_PSML, 7));
    assert_eq!(drain(&mut capture), expected);
}

#[test]
fn test_capture_grows_buffer() {
    // records larger than the initial capacity are handled transparently
    let mut reference = DumpCapture::new(DumpFormat::Pdml, "pdml", TEST_PDML);
    let expected = drain(&mut reference);
    let mut capture = DumpCapture::with_capacity(DumpFormat::Pdml, "pdml", TEST_PDML, 256);
    assert_eq!(drain(&mut capture), expected);
    assert_eq!(capture.len(), 3);
}

#[test]
fn test_capture_display() {
    let mut capture = DumpCapture::new(DumpFormat::Psml, "assets/capture.psml", TEST_PSML);
    assert_eq!(capture.to_string(), "DumpCapture(assets/capture.psml, 0 packets)");
    drain(&mut capture);
    assert_eq!(capture.to_string(), "DumpCapture(assets/capture.psml, 10 packets)");
    let streaming =
        DumpCapture::new(DumpFormat::Psml, "assets/capture.psml", TEST_PSML).keep_packets(false);
    assert_eq!(streaming.to_string(), "DumpCapture(assets/capture.psml)");
}

#[test]
fn test_capture_accessors() {
    let mut capture = DumpCapture::new(DumpFormat::Pdml, "pdml", TEST_PDML);
    assert_eq!(capture.format(), DumpFormat::Pdml);
    assert_eq!(capture.source(), "pdml");
    assert!(capture.pdml_header().is_none());
    assert!(capture.is_empty());
    capture.get(0).unwrap();
    let header = capture.pdml_header().expect("no header");
    assert_eq!(header.capture_file.as_deref(), Some("/tmp/ntp.pcap"));
    assert!(capture.structure().is_none());
}

fn _assert_send<T: Send>() {}

#[test]
fn test_capture_is_send() {
    _assert_send::<DumpCapture<File>>();
}
