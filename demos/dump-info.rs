use std::env;
use std::error::Error;
use std::fs::File;

use tshark_parser::traits::DumpReaderIterator;
use tshark_parser::*;

fn main() {
    for arg in env::args().skip(1) {
        print_dump_info(&arg).unwrap();
    }
}

fn print_dump_info(arg: &str) -> Result<(), Box<dyn Error>> {
    println!("Name: {}", arg);

    let file = File::open(arg)?;
    let file_size = file.metadata()?.len();
    println!("\tfile size: {}", file_size);

    let mut reader = create_reader(10 * 1024, file)?;

    // the first block announces the format and the stream structure
    loop {
        match reader.next() {
            Ok((offset, DumpBlock::PsmlStructure(structure))) => {
                println!("\tformat: PSML (packet summaries)");
                println!("\tcolumns: {}", structure.sections.join(", "));
                reader.consume_noshift(offset);
                break;
            }
            Ok((offset, DumpBlock::PdmlHeader(header))) => {
                println!("\tformat: PDML (packet details)");
                if let Some(creator) = &header.creator {
                    println!("\tcreator: {}", creator);
                }
                if let Some(capture_file) = &header.capture_file {
                    println!("\tcapture file: {}", capture_file);
                }
                reader.consume_noshift(offset);
                break;
            }
            Ok(_) => return Err("unexpected first block, or wrong file format".into()),
            Err(DumpError::Incomplete(_)) => {
                reader.refill()?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    // count records in the dump
    let mut num_records = 0;

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                print_record_info(&block);
                num_records += 1;
                reader.consume_noshift(offset);
            }
            Err(DumpError::Eof) => break,
            Err(DumpError::Incomplete(_)) => {
                reader.refill()?;
            }
            Err(DumpError::BufferTooSmall) => {
                return Err("record too large for the reader buffer".into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("\tnum_records: {}", num_records);

    Ok(())
}

fn print_record_info(block: &DumpBlock) {
    match block {
        DumpBlock::PsmlPacket(packet) => {
            if let Some(info) = packet.values.last() {
                println!("\t\t{}", info);
            }
        }
        DumpBlock::PdmlPacket(packet) => {
            let names: Vec<&str> = packet.protos.iter().map(|p| p.name.as_str()).collect();
            println!("\t\t{}", names.join(":"));
        }
        _ => (),
    }
}
