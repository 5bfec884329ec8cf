use nom::bytes::complete::{tag, take_until};
use nom::character::complete::multispace0;
use nom::multi::many0;
use nom::IResult;

use crate::error::DumpError;
use crate::xml::{decode_entities, packet_fragment, raw_attribute, PDML_CLOSE};

/// One dissected field, possibly carrying nested subfields
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdmlField {
    /// Filter name, for ex. `ip.flags.df`
    pub name: String,
    /// Human-readable rendering of name and value
    pub showname: Option<String>,
    /// Displayed value
    pub show: Option<String>,
    /// Raw value, as hexadecimal text
    pub value: Option<String>,
    /// Offset of the field inside the packet data
    pub pos: Option<usize>,
    /// Length in bytes of the field inside the packet data
    pub size: Option<usize>,
    /// Nested fields
    pub fields: Vec<PdmlField>,
}

impl PdmlField {
    /// Find a field by filter name among the nested fields, depth-first.
    pub fn field(&self, name: &str) -> Option<&PdmlField> {
        find_field(&self.fields, name)
    }
}

/// One dissected protocol layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdmlProto {
    /// Protocol filter name, for ex. `ip`
    pub name: String,
    /// Human-readable protocol summary
    pub showname: Option<String>,
    /// Offset of the layer inside the packet data
    pub pos: Option<usize>,
    /// Length in bytes of the layer inside the packet data
    pub size: Option<usize>,
    /// Top-level fields of this layer
    pub fields: Vec<PdmlField>,
}

impl PdmlProto {
    /// Find a field by filter name anywhere in this layer, depth-first.
    pub fn field(&self, name: &str) -> Option<&PdmlField> {
        find_field(&self.fields, name)
    }
}

/// One detail record: the dissected protocol layers of a single packet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdmlPacket {
    /// Protocol layers, in dissection order
    pub protos: Vec<PdmlProto>,
}

impl PdmlPacket {
    /// First protocol layer with the given filter name
    pub fn proto(&self, name: &str) -> Option<&PdmlProto> {
        self.protos.iter().find(|p| p.name == name)
    }
    /// Find a field by filter name anywhere in the packet, depth-first.
    ///
    /// Field names are full filter paths, so `field("ip.flags.df")` reaches
    /// a field nested below `ip.flags` directly.
    pub fn field(&self, name: &str) -> Option<&PdmlField> {
        self.protos.iter().find_map(|p| p.field(name))
    }
}

fn find_field<'a>(fields: &'a [PdmlField], name: &str) -> Option<&'a PdmlField> {
    for field in fields {
        if field.name == name {
            return Some(field);
        }
        if let Some(inner) = find_field(&field.fields, name) {
            return Some(inner);
        }
    }
    None
}

/// Read one detail record
///
/// This is a streaming parser: it scans for the record end marker and
/// returns `Incomplete` as long as the marker has not been received.
/// Reaching the document close marker instead means the end of the stream
/// and is reported as [`DumpError::Eof`]. A record whose boundary is found
/// but whose content cannot be decoded is a [`DumpError::CorruptRecord`].
///
/// `first` allows the record start marker to be absent, for the case where
/// it was already consumed together with the preamble; it should be true
/// only while no record has been read from the stream yet.
pub fn parse_pdml_packet(i: &[u8], first: bool) -> IResult<&[u8], PdmlPacket, DumpError> {
    let (content, rem) = packet_fragment(i, PDML_CLOSE, first)?;
    let (leftover, protos) = many0(parse_proto)(content)?;
    // a failed or foreign element leaves residue behind
    if !leftover.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(nom::Err::Error(DumpError::CorruptRecord));
    }
    Ok((rem, PdmlPacket { protos }))
}

fn opt_attr(region: &str, name: &str) -> Result<Option<String>, nom::Err<DumpError>> {
    match raw_attribute(region, name) {
        Some(raw) => decode_entities(raw.as_bytes())
            .map(Some)
            .ok_or(nom::Err::Error(DumpError::CorruptRecord)),
        None => Ok(None),
    }
}

fn num_attr(region: &str, name: &str) -> Result<Option<usize>, nom::Err<DumpError>> {
    match raw_attribute(region, name) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) => Ok(Some(n)),
            Err(_) => Err(nom::Err::Error(DumpError::CorruptRecord)),
        },
        None => Ok(None),
    }
}

/// Open tag already consumed up to its name; returns the attribute region
/// and whether the element is self-closing.
fn element_head<'a>(i: &'a [u8]) -> IResult<&'a [u8], (&'a str, bool), DumpError> {
    let (i, head) = take_until(">")(i)?;
    let (i, _) = tag(">")(i)?;
    let self_closing = head.last() == Some(&b'/');
    let head = if self_closing {
        &head[..head.len() - 1]
    } else {
        head
    };
    let region =
        std::str::from_utf8(head).map_err(|_| nom::Err::Error(DumpError::CorruptRecord))?;
    Ok((i, (region, self_closing)))
}

fn parse_field(i: &[u8]) -> IResult<&[u8], PdmlField, DumpError> {
    let (i, _) = multispace0(i)?;
    let (i, _) = tag("<field")(i)?;
    let (i, (region, self_closing)) = element_head(i)?;
    let mut field = PdmlField {
        name: opt_attr(region, "name")?.unwrap_or_default(),
        showname: opt_attr(region, "showname")?,
        show: opt_attr(region, "show")?,
        value: opt_attr(region, "value")?,
        pos: num_attr(region, "pos")?,
        size: num_attr(region, "size")?,
        fields: Vec::new(),
    };
    if self_closing {
        return Ok((i, field));
    }
    let (i, children) = many0(parse_field)(i)?;
    let (i, _) = multispace0(i)?;
    let (i, _) = tag("</field>")(i)?;
    field.fields = children;
    Ok((i, field))
}

fn parse_proto(i: &[u8]) -> IResult<&[u8], PdmlProto, DumpError> {
    let (i, _) = multispace0(i)?;
    let (i, _) = tag("<proto")(i)?;
    let (i, (region, self_closing)) = element_head(i)?;
    let mut proto = PdmlProto {
        name: opt_attr(region, "name")?.unwrap_or_default(),
        showname: opt_attr(region, "showname")?,
        pos: num_attr(region, "pos")?,
        size: num_attr(region, "size")?,
        fields: Vec::new(),
    };
    if self_closing {
        return Ok((i, proto));
    }
    let (i, fields) = many0(parse_field)(i)?;
    let (i, _) = multispace0(i)?;
    let (i, _) = tag("</proto>")(i)?;
    proto.fields = fields;
    Ok((i, proto))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &[u8] = br#"
<packet>
  <proto name="geninfo" pos="0" showname="General information" size="90">
    <field name="num" pos="0" show="1" showname="Number" value="1" size="90"/>
    <field name="len" pos="0" show="90" showname="Frame Length" value="5a" size="90"/>
  </proto>
  <proto name="ip" showname="Internet Protocol Version 4" size="20" pos="14">
    <field name="ip.version" showname="0100 .... = Version: 4" size="1" pos="14" show="4" value="45"/>
    <field name="ip.flags" showname="Flags: 0x0000" size="2" pos="20" show="0x0000" value="0000">
      <field name="ip.flags.rb" showname="0... .... .... .... = Reserved bit: Not set" size="2" pos="20" show="0" value="0"/>
      <field name="ip.flags.df" showname=".0.. .... .... .... = Don&#x27;t fragment: Not set" size="2" pos="20" show="0" value="0"/>
    </field>
  </proto>
</packet>
</pdml>"#;

    #[test]
    fn test_parse_pdml_packet() {
        let (rem, packet) = parse_pdml_packet(RECORD, false).expect("packet parsing failed");
        assert_eq!(rem, b"\n</pdml>");
        assert_eq!(packet.protos.len(), 2);
        let geninfo = packet.proto("geninfo").expect("no geninfo layer");
        assert_eq!(geninfo.showname.as_deref(), Some("General information"));
        assert_eq!(geninfo.size, Some(90));
        assert_eq!(geninfo.fields.len(), 2);
        assert_eq!(geninfo.field("num").and_then(|f| f.show.as_deref()), Some("1"));
        assert_eq!(geninfo.field("len").and_then(|f| f.value.as_deref()), Some("5a"));
    }

    #[test]
    fn test_nested_field_lookup() {
        let (_, packet) = parse_pdml_packet(RECORD, false).expect("packet parsing failed");
        let flags = packet.field("ip.flags").expect("no ip.flags field");
        assert_eq!(flags.fields.len(), 2);
        let df = packet.field("ip.flags.df").expect("no ip.flags.df field");
        assert_eq!(df.show.as_deref(), Some("0"));
        assert_eq!(
            df.showname.as_deref(),
            Some(".0.. .... .... .... = Don't fragment: Not set")
        );
        // lookup is also available from any level of the tree
        assert_eq!(
            packet.proto("ip").and_then(|p| p.field("ip.flags.rb")),
            flags.field("ip.flags.rb")
        );
        assert_eq!(packet.field("tcp.port"), None);
    }

    #[test]
    fn test_parse_pdml_packet_incomplete() {
        assert!(matches!(
            parse_pdml_packet(&RECORD[..100], false),
            Err(nom::Err::Incomplete(_))
        ));
    }

    #[test]
    fn test_parse_pdml_packet_eof() {
        assert!(matches!(
            parse_pdml_packet(b"\n</pdml>\n", false),
            Err(nom::Err::Error(DumpError::Eof))
        ));
    }

    #[test]
    fn test_parse_pdml_packet_corrupt() {
        // unbalanced field element
        let input: &[u8] = b"<packet><proto name=\"ip\"><field name=\"a\"></proto></packet>";
        assert!(matches!(
            parse_pdml_packet(input, false),
            Err(nom::Err::Error(DumpError::CorruptRecord))
        ));
        // numeric attribute that does not parse
        let input: &[u8] = b"<packet><proto name=\"ip\" size=\"big\"/></packet>";
        assert!(matches!(
            parse_pdml_packet(input, false),
            Err(nom::Err::Error(DumpError::CorruptRecord))
        ));
    }

    #[test]
    fn test_parse_empty_packet() {
        let (_, packet) = parse_pdml_packet(b"<packet></packet>", false).unwrap();
        assert!(packet.protos.is_empty());
    }
}
