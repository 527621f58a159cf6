//! Forward-only ZIP reader over local file headers.
//!
//! The reader never consults the central directory. It walks local headers
//! from offset 0 and stops at the first 4-byte signature that is not
//! `PK\x03\x04`, so an entry that sits after a corrupted or foreign header
//! is unreachable. Entries written with a trailing data descriptor (sizes
//! zeroed in the local header) cannot be located either: their payload
//! length is unknown at header time.
//!
//! ```text
//! offset  size  field
//!  0      4     signature 0x04034b50
//!  8      2     compression method (0 = stored, 8 = deflate)
//! 18      4     compressed size
//! 26      2     file name length (n)
//! 28      2     extra field length (m)
//! 30      n     file name
//! 30+n    m     extra field
//! 30+n+m  ...   payload (compressed size bytes)
//! ```

use crate::bytes::ByteReader;
use crate::error::ZipError;
use crate::inflate::inflate_raw_limited;

pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const LOCAL_HEADER_LEN: usize = 30;

pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATE: u16 = 8;

/// Largest inflated entry [`read_entry_payload`] will produce.
pub const MAX_ENTRY_BYTES: usize = 32 * 1024 * 1024;

/// One entry discovered by the local-header walk. Recomputed per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub name: String,
    pub compression_method: u16,
    pub compressed_size: u32,
    pub data_offset: u32,
}

/// Iterator over the local headers of a container, in file order.
///
/// Ends at the first non-matching signature or at the first header whose
/// fixed fields or name would read out of bounds.
pub struct LocalHeaders<'a> {
    reader: ByteReader<'a>,
    offset: usize,
    done: bool,
}

impl<'a> LocalHeaders<'a> {
    pub fn new(container: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(container),
            offset: 0,
            done: false,
        }
    }

    fn read_header(&self, at: usize) -> Option<(ZipEntry, usize)> {
        let r = &self.reader;
        if r.read_u32_le(at).ok()? != LOCAL_HEADER_SIGNATURE {
            return None;
        }
        let compression_method = r.read_u16_le(at + 8).ok()?;
        let compressed_size = r.read_u32_le(at + 18).ok()?;
        let name_len = r.read_u16_le(at + 26).ok()? as usize;
        let extra_len = r.read_u16_le(at + 28).ok()? as usize;

        let name_bytes = r.read_bytes(at + LOCAL_HEADER_LEN, name_len).ok()?;
        let data_offset = at + LOCAL_HEADER_LEN + name_len + extra_len;
        let next = data_offset.checked_add(compressed_size as usize)?;

        let entry = ZipEntry {
            name: String::from_utf8_lossy(name_bytes).into_owned(),
            compression_method,
            compressed_size,
            data_offset: u32::try_from(data_offset).ok()?,
        };
        Some((entry, next))
    }
}

impl Iterator for LocalHeaders<'_> {
    type Item = ZipEntry;

    fn next(&mut self) -> Option<ZipEntry> {
        if self.done {
            return None;
        }
        match self.read_header(self.offset) {
            Some((entry, next)) => {
                self.offset = next;
                Some(entry)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// Locate the entry named `target_name`. Absence is `None`, never an error.
pub fn find_entry(container: &[u8], target_name: &str) -> Option<ZipEntry> {
    LocalHeaders::new(container).find(|e| e.name == target_name)
}

/// Return the entry payload, inflating it when it is deflate-compressed.
///
/// Inflation stops with [`DecompressionError::TooLarge`](crate::error::DecompressionError)
/// once the payload passes [`MAX_ENTRY_BYTES`].
pub fn read_entry_payload(container: &[u8], entry: &ZipEntry) -> Result<Vec<u8>, ZipError> {
    let raw = ByteReader::new(container)
        .read_bytes(entry.data_offset as usize, entry.compressed_size as usize)?;
    match entry.compression_method {
        METHOD_STORED => Ok(raw.to_vec()),
        METHOD_DEFLATE => Ok(inflate_raw_limited(raw, MAX_ENTRY_BYTES)?),
        other => Err(ZipError::UnsupportedCompression(other)),
    }
}

/// [`find_entry`] followed by [`read_entry_payload`].
pub fn read_named_entry(container: &[u8], name: &str) -> Result<Vec<u8>, ZipError> {
    let entry =
        find_entry(container, name).ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?;
    read_entry_payload(container, &entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_zip(entries: &[(&str, &[u8])], method: ::zip::CompressionMethod) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = ::zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options =
                ::zip::write::SimpleFileOptions::default().compression_method(method);
            for (name, data) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    /// Hand-written local header, for methods the zip writer cannot produce.
    fn raw_entry(name: &str, method: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&LOCAL_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&[0; 8]); // time, date, crc
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn stored_entry_returned_byte_for_byte() {
        let payload: Vec<u8> = (0..=255u8).collect();
        let container = build_zip(
            &[("a.txt", b"first"), ("X", &payload)],
            ::zip::CompressionMethod::Stored,
        );
        let entry = find_entry(&container, "X").expect("entry X");
        assert_eq!(entry.compression_method, METHOD_STORED);
        assert_eq!(read_entry_payload(&container, &entry).unwrap(), payload);
    }

    #[test]
    fn deflated_entry_round_trips() {
        let original = "<w:document>texte répété </w:document>".repeat(200);
        let container = build_zip(
            &[("word/document.xml", original.as_bytes())],
            ::zip::CompressionMethod::Deflated,
        );
        let entry = find_entry(&container, "word/document.xml").unwrap();
        assert_eq!(entry.compression_method, METHOD_DEFLATE);
        assert!((entry.compressed_size as usize) < original.len());
        let payload = read_entry_payload(&container, &entry).unwrap();
        assert_eq!(payload, original.as_bytes());
    }

    #[test]
    fn missing_entry_is_none() {
        let container = build_zip(&[("a.txt", b"a")], ::zip::CompressionMethod::Stored);
        assert!(find_entry(&container, "X").is_none());
        assert!(find_entry(b"not a zip at all", "X").is_none());
        assert!(find_entry(&[], "X").is_none());
        assert!(matches!(
            read_named_entry(&container, "X"),
            Err(ZipError::EntryNotFound(_))
        ));
    }

    #[test]
    fn walks_headers_in_order() {
        let container = build_zip(
            &[("one", b"1"), ("two", b"22"), ("three", b"333")],
            ::zip::CompressionMethod::Stored,
        );
        let names: Vec<String> = LocalHeaders::new(&container).map(|e| e.name).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
    }

    #[test]
    fn corrupted_header_hides_later_entries() {
        let mut container = raw_entry("first", METHOD_STORED, b"aaa");
        let second_at = container.len();
        container.extend(raw_entry("second", METHOD_STORED, b"bbb"));
        container[second_at] = b'Q';
        assert!(find_entry(&container, "first").is_some());
        assert!(find_entry(&container, "second").is_none());
    }

    #[test]
    fn truncated_header_is_not_found() {
        let container = raw_entry("word/document.xml", METHOD_STORED, b"<xml/>");
        assert!(find_entry(&container[..20], "word/document.xml").is_none());
        assert!(find_entry(&container[..35], "word/document.xml").is_none());
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let container = raw_entry("x", METHOD_STORED, b"0123456789");
        let entry = find_entry(&container, "x").unwrap();
        let cut = &container[..container.len() - 4];
        assert!(matches!(
            read_entry_payload(cut, &entry),
            Err(ZipError::Truncated(_))
        ));
    }

    #[test]
    fn unsupported_method_fails() {
        let container = raw_entry("x", 12, b"bzip2 data");
        let entry = find_entry(&container, "x").unwrap();
        assert!(matches!(
            read_entry_payload(&container, &entry),
            Err(ZipError::UnsupportedCompression(12))
        ));
    }

    #[test]
    fn corrupt_deflate_payload_fails() {
        let container = raw_entry("x", METHOD_DEFLATE, &[0xff, 0xff, 0xff]);
        let entry = find_entry(&container, "x").unwrap();
        assert!(matches!(
            read_entry_payload(&container, &entry),
            Err(ZipError::Decompression(_))
        ));
    }

    #[test]
    fn oversized_deflate_payload_is_refused() {
        use flate2::write::DeflateEncoder;

        let mut enc = DeflateEncoder::new(Vec::new(), flate2::Compression::fast());
        let zeros = vec![0u8; 1024 * 1024];
        for _ in 0..=MAX_ENTRY_BYTES / zeros.len() {
            enc.write_all(&zeros).unwrap();
        }
        let bomb = enc.finish().unwrap();

        let container = raw_entry("word/document.xml", METHOD_DEFLATE, &bomb);
        assert!(matches!(
            read_named_entry(&container, "word/document.xml"),
            Err(ZipError::Decompression(
                crate::error::DecompressionError::TooLarge { limit: MAX_ENTRY_BYTES }
            ))
        ));
    }
}
