use super::FbxError;
use super::node::{Node, Property};
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::io::{Cursor, Read};

pub const MAGIC: &[u8; 21] = b"Kaydara FBX Binary  \0";

/// Size of the fixed header: magic, two reserved bytes and the version.
const HEADER_LEN: u64 = 27;

/// First version that stores record offsets as 64-bit values.
const WIDE_HEADER_VERSION: u32 = 7500;

#[derive(Debug, Clone)]
pub struct FbxFile {
    pub version: u32,
    pub nodes: Vec<Node>,
}

impl FbxFile {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Parse a complete binary FBX file held in memory.
pub fn parse(bytes: &[u8]) -> Result<FbxFile, FbxError> {
    if bytes.len() < HEADER_LEN as usize || &bytes[..MAGIC.len()] != MAGIC {
        return Err(if looks_like_ascii(bytes) {
            FbxError::Ascii
        } else {
            FbxError::BadMagic
        });
    }

    let mut cur = Cursor::new(bytes);
    cur.set_position(23);
    let version = cur.read_u32::<LittleEndian>()?;
    log::debug!("FBX binary version {version}");

    let len = bytes.len() as u64;
    let mut nodes = Vec::new();
    // the top-level list ends with a null record, followed by the footer
    while cur.position() < len {
        match read_node(&mut cur, version, len)? {
            Some(node) => nodes.push(node),
            None => break,
        }
    }

    Ok(FbxFile { version, nodes })
}

fn looks_like_ascii(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    head.starts_with(b";") || head.windows(18).any(|w| w == b"FBXHeaderExtension")
}

/// Bytes left between the cursor and the end of the file.
fn remaining(cur: &Cursor<&[u8]>) -> u64 {
    (cur.get_ref().len() as u64).saturating_sub(cur.position())
}

/// Reads one record that must end at or before `limit`, the end of the
/// enclosing record or of the file.
fn read_node(cur: &mut Cursor<&[u8]>, version: u32, limit: u64) -> Result<Option<Node>, FbxError> {
    let start = cur.position();
    let len = cur.get_ref().len() as u64;
    let (end_offset, num_properties, _property_list_len) = if version >= WIDE_HEADER_VERSION {
        (
            cur.read_u64::<LittleEndian>()?,
            cur.read_u64::<LittleEndian>()?,
            cur.read_u64::<LittleEndian>()?,
        )
    } else {
        (
            cur.read_u32::<LittleEndian>()? as u64,
            cur.read_u32::<LittleEndian>()? as u64,
            cur.read_u32::<LittleEndian>()? as u64,
        )
    };
    let name_len = cur.read_u8()?;

    if end_offset == 0 {
        return Ok(None);
    }
    let name_end = cur.position() + name_len as u64;
    if end_offset > limit || end_offset < name_end {
        return Err(FbxError::Truncated { offset: start, len });
    }

    let mut name = vec![0u8; name_len as usize];
    cur.read_exact(&mut name)?;
    let mut node = Node::new(String::from_utf8_lossy(&name).into_owned());

    for _ in 0..num_properties {
        node.properties.push(read_property(cur)?);
    }
    if cur.position() > end_offset {
        return Err(FbxError::Truncated { offset: start, len });
    }

    while cur.position() < end_offset {
        match read_node(cur, version, end_offset)? {
            Some(child) => node.children.push(child),
            None => break,
        }
    }
    cur.set_position(end_offset);

    Ok(Some(node))
}

fn read_property(cur: &mut Cursor<&[u8]>) -> Result<Property, FbxError> {
    let offset = cur.position();
    let code = cur.read_u8()?;
    let property = match code {
        b'Y' => Property::I16(cur.read_i16::<LittleEndian>()?),
        b'C' => Property::Bool(cur.read_u8()? != 0),
        b'I' => Property::I32(cur.read_i32::<LittleEndian>()?),
        b'F' => Property::F32(cur.read_f32::<LittleEndian>()?),
        b'D' => Property::F64(cur.read_f64::<LittleEndian>()?),
        b'L' => Property::I64(cur.read_i64::<LittleEndian>()?),
        b'S' => {
            let bytes = read_blob(cur)?;
            Property::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        b'R' => Property::Raw(read_blob(cur)?),
        b'f' => {
            let (count, data) = read_array(cur, 4)?;
            let mut rdr = Cursor::new(data.as_slice());
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(rdr.read_f32::<LittleEndian>()?);
            }
            Property::F32Array(out)
        }
        b'd' => {
            let (count, data) = read_array(cur, 8)?;
            let mut rdr = Cursor::new(data.as_slice());
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(rdr.read_f64::<LittleEndian>()?);
            }
            Property::F64Array(out)
        }
        b'i' => {
            let (count, data) = read_array(cur, 4)?;
            let mut rdr = Cursor::new(data.as_slice());
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(rdr.read_i32::<LittleEndian>()?);
            }
            Property::I32Array(out)
        }
        b'l' => {
            let (count, data) = read_array(cur, 8)?;
            let mut rdr = Cursor::new(data.as_slice());
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(rdr.read_i64::<LittleEndian>()?);
            }
            Property::I64Array(out)
        }
        b'b' => {
            let (count, data) = read_array(cur, 1)?;
            Property::BoolArray(data[..count].iter().map(|&b| b != 0).collect())
        }
        other => {
            return Err(FbxError::UnknownPropertyType {
                code: other as char,
                offset,
            });
        }
    };
    Ok(property)
}

fn read_blob(cur: &mut Cursor<&[u8]>) -> Result<Vec<u8>, FbxError> {
    let offset = cur.position();
    let len = cur.read_u32::<LittleEndian>()? as u64;
    if len > remaining(cur) {
        return Err(FbxError::Truncated {
            offset,
            len: cur.get_ref().len() as u64,
        });
    }
    let mut bytes = vec![0u8; len as usize];
    cur.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Reads an array header and payload, inflating it when zlib encoded.
/// Returns the element count and the raw little-endian element bytes.
fn read_array(cur: &mut Cursor<&[u8]>, elem_size: usize) -> Result<(usize, Vec<u8>), FbxError> {
    let offset = cur.position();
    let count = cur.read_u32::<LittleEndian>()? as usize;
    let encoding = cur.read_u32::<LittleEndian>()?;
    let stored_len = cur.read_u32::<LittleEndian>()? as u64;

    if stored_len > remaining(cur) {
        return Err(FbxError::Truncated {
            offset,
            len: cur.get_ref().len() as u64,
        });
    }
    let expected = count.checked_mul(elem_size).ok_or(FbxError::ArrayLength {
        expected: usize::MAX,
        actual: stored_len as usize,
    })?;

    let mut stored = vec![0u8; stored_len as usize];
    cur.read_exact(&mut stored)?;

    let data = match encoding {
        0 => stored,
        1 => {
            // the declared count is untrusted: inflate no further than it
            let mut inflated = Vec::new();
            ZlibDecoder::new(stored.as_slice())
                .take(expected as u64)
                .read_to_end(&mut inflated)
                .map_err(FbxError::Decompress)?;
            inflated
        }
        other => return Err(FbxError::UnknownArrayEncoding(other)),
    };

    if data.len() < expected {
        return Err(FbxError::ArrayLength {
            expected,
            actual: data.len(),
        });
    }
    Ok((count, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn header(version: u32) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[0x1a, 0x00]);
        out.write_u32::<LittleEndian>(version).unwrap();
        out
    }

    /// Appends a 32-bit record holding `props` (pre-encoded) and no children.
    fn leaf(out: &mut Vec<u8>, name: &str, props: &[u8], num_props: u32) {
        let start = out.len();
        let end = start + 13 + name.len() + props.len();
        out.write_u32::<LittleEndian>(end as u32).unwrap();
        out.write_u32::<LittleEndian>(num_props).unwrap();
        out.write_u32::<LittleEndian>(props.len() as u32).unwrap();
        out.write_u8(name.len() as u8).unwrap();
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(props);
    }

    #[test]
    fn rejects_ascii_files() {
        let text = b"; FBX 7.4.0 project file\nFBXHeaderExtension:  {\n}";
        assert!(matches!(parse(text), Err(FbxError::Ascii)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse(&[0u8; 64]), Err(FbxError::BadMagic)));
    }

    #[test]
    fn reads_scalar_properties() {
        let mut out = header(7400);
        let mut props = Vec::new();
        props.push(b'I');
        props.write_i32::<LittleEndian>(-7).unwrap();
        props.push(b'D');
        props.write_f64::<LittleEndian>(2.5).unwrap();
        props.push(b'S');
        props.write_u32::<LittleEndian>(3).unwrap();
        props.extend_from_slice(b"abc");
        leaf(&mut out, "Leaf", &props, 3);
        out.extend_from_slice(&[0u8; 13]);

        let file = parse(&out).unwrap();
        assert_eq!(file.version, 7400);
        let node = file.node("Leaf").unwrap();
        assert_eq!(node.properties[0], Property::I32(-7));
        assert_eq!(node.properties[1], Property::F64(2.5));
        assert_eq!(node.properties[2].as_str(), Some("abc"));
    }

    #[test]
    fn inflates_zlib_arrays() {
        let values = [1.0f64, -2.0, 3.5];
        let mut raw = Vec::new();
        for v in values {
            raw.write_f64::<LittleEndian>(v).unwrap();
        }
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&raw).unwrap();
        let packed = enc.finish().unwrap();

        let mut props = vec![b'd'];
        props.write_u32::<LittleEndian>(values.len() as u32).unwrap();
        props.write_u32::<LittleEndian>(1).unwrap();
        props.write_u32::<LittleEndian>(packed.len() as u32).unwrap();
        props.extend_from_slice(&packed);

        let mut out = header(7400);
        leaf(&mut out, "Vertices", &props, 1);
        out.extend_from_slice(&[0u8; 13]);

        let file = parse(&out).unwrap();
        let verts = file.node("Vertices").unwrap().properties[0].to_f64_vec().unwrap();
        assert_eq!(verts, values.to_vec());
    }

    #[test]
    fn reads_wide_headers_and_nested_records() {
        let mut out = header(7500);
        let parent_start = out.len();
        // placeholder header, patched below
        out.extend_from_slice(&[0u8; 25]);
        out.extend_from_slice(b"P");
        {
            let child_start = out.len();
            let child_end = child_start + 25 + 1 + 9;
            out.write_u64::<LittleEndian>(child_end as u64).unwrap();
            out.write_u64::<LittleEndian>(1).unwrap();
            out.write_u64::<LittleEndian>(9).unwrap();
            out.write_u8(1).unwrap();
            out.extend_from_slice(b"C");
            out.push(b'L');
            out.write_i64::<LittleEndian>(42).unwrap();
        }
        out.extend_from_slice(&[0u8; 25]);
        let parent_end = out.len() as u64;
        let mut patched = Vec::new();
        patched.write_u64::<LittleEndian>(parent_end).unwrap();
        patched.write_u64::<LittleEndian>(0).unwrap();
        patched.write_u64::<LittleEndian>(0).unwrap();
        patched.write_u8(1).unwrap();
        out[parent_start..parent_start + 25].copy_from_slice(&patched);
        out.extend_from_slice(&[0u8; 25]);

        let file = parse(&out).unwrap();
        let parent = file.node("P").unwrap();
        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].name, "C");
        assert_eq!(parent.children[0].properties[0].as_i64(), Some(42));
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut out = header(7400);
        out.write_u32::<LittleEndian>(10_000).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u8(1).unwrap();
        out.push(b'X');
        assert!(matches!(parse(&out), Err(FbxError::Truncated { .. })));
    }

    #[test]
    fn record_ending_inside_its_own_header_is_an_error() {
        let mut out = header(7400);
        out.write_u32::<LittleEndian>(HEADER_LEN as u32).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u8(0).unwrap();
        out.extend_from_slice(&[0u8; 13]);
        assert!(matches!(parse(&out), Err(FbxError::Truncated { .. })));
    }

    #[test]
    fn child_overrunning_its_parent_is_an_error() {
        let mut out = header(7400);
        let parent_start = out.len();
        let parent_end = parent_start + 13 + 1 + 13;
        out.write_u32::<LittleEndian>(parent_end as u32).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u8(1).unwrap();
        out.push(b'P');
        // child claims to run well past the parent's end
        out.write_u32::<LittleEndian>(parent_end as u32 + 20).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u8(0).unwrap();
        out.extend_from_slice(&[0u8; 40]);
        assert!(matches!(parse(&out), Err(FbxError::Truncated { .. })));
    }

    #[test]
    fn huge_array_count_is_an_error_not_an_allocation() {
        let mut props = vec![b'd'];
        props.write_u32::<LittleEndian>(u32::MAX).unwrap();
        props.write_u32::<LittleEndian>(1).unwrap();
        props.write_u32::<LittleEndian>(0).unwrap();
        let mut out = header(7400);
        leaf(&mut out, "Vertices", &props, 1);
        out.extend_from_slice(&[0u8; 13]);
        assert!(matches!(
            parse(&out),
            Err(FbxError::ArrayLength { .. } | FbxError::Decompress(_))
        ));
    }

    #[test]
    fn stored_lengths_past_the_end_are_errors() {
        let mut raw = vec![b'R'];
        raw.write_u32::<LittleEndian>(u32::MAX).unwrap();
        let mut out = header(7400);
        leaf(&mut out, "Blob", &raw, 1);
        out.extend_from_slice(&[0u8; 13]);
        assert!(matches!(parse(&out), Err(FbxError::Truncated { .. })));

        let mut array = vec![b'i'];
        array.write_u32::<LittleEndian>(4).unwrap();
        array.write_u32::<LittleEndian>(0).unwrap();
        array.write_u32::<LittleEndian>(u32::MAX).unwrap();
        let mut out = header(7400);
        leaf(&mut out, "Indexes", &array, 1);
        out.extend_from_slice(&[0u8; 13]);
        assert!(matches!(parse(&out), Err(FbxError::Truncated { .. })));
    }
}
