use std::{fs::File, io::BufReader};

use tshark_parser::traits::DumpReaderIterator;
use tshark_parser::{create_reader, DumpBlock, DumpError};

static TEST_PSML: &[u8] = include_bytes!("../assets/capture.psml");
static TEST_PDML: &[u8] = include_bytes!("../assets/capture.pdml");

#[test]
fn test_empty_reader_error() {
    let empty: &[u8] = &[];
    let res = create_reader(1024, empty);
    assert!(res.is_err());
    if let Err(err) = res {
        assert_eq!(err, DumpError::MalformedPreamble);
    } else {
        unreachable!();
    }
}

#[test]
fn test_unknown_format_error() {
    let garbage: &[u8] = b"\xd4\xc3\xb2\xa1 not a dump at all";
    let res = create_reader(1024, garbage);
    assert!(res.is_err());
    if let Err(err) = res {
        assert_eq!(err, DumpError::MalformedPreamble);
    } else {
        unreachable!();
    }
}

fn first_block(data: &[u8]) -> DumpBlock {
    let mut reader = create_reader(65536, data).expect("create_reader");
    loop {
        match reader.next() {
            Ok((_offset, block)) => return block,
            Err(DumpError::Incomplete(_)) => reader.refill().unwrap(),
            Err(e) => panic!("error while reading: {:?}", e),
        }
    }
}

#[test]
fn test_detect_psml() {
    match first_block(TEST_PSML) {
        DumpBlock::PsmlStructure(s) => assert_eq!(s.sections.len(), 7),
        b => panic!("expected a structure block, got {:?}", b),
    }
}

#[test]
fn test_detect_pdml() {
    match first_block(TEST_PDML) {
        DumpBlock::PdmlHeader(h) => assert_eq!(h.version.as_deref(), Some("0")),
        b => panic!("expected a header block, got {:?}", b),
    }
}

#[test]
fn test_generic_reader_consumed() {
    let path = "assets/capture.psml";
    let file = File::open(path).unwrap();
    let buffered = BufReader::new(file);
    let mut reader = create_reader(65536, buffered).expect("create_reader");
    let mut sum = 0;
    loop {
        match reader.next() {
            Ok((offset, _block)) => {
                sum += offset;
                reader.consume(offset);
            }
            Err(DumpError::Eof) => break,
            Err(DumpError::Incomplete(_)) => {
                reader.refill().unwrap();
            }
            Err(e) => panic!("error while reading: {:?}", e),
        }
    }
    assert_eq!(reader.consumed(), sum);
    // everything up to the document close marker has been consumed
    assert_eq!(reader.consumed(), TEST_PSML.len() - b"\n\n</psml>\n".len());
}

#[test]
fn test_generic_reader_probe_too_small() {
    // the pdml root element sits after a prolog larger than the buffer
    let res = create_reader(64, TEST_PDML);
    assert!(res.is_err());
    if let Err(err) = res {
        assert_eq!(err, DumpError::MalformedPreamble);
    } else {
        unreachable!();
    }
}
