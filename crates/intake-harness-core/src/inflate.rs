//! Raw DEFLATE decompression (ZIP method 8).
//!
//! This is the only place in the workspace that touches a decompression
//! backend. Output is produced in fixed-size chunks appended to one buffer.
//! [`inflate_raw`] has no a-priori limit on the inflated size; callers that
//! handle untrusted containers use [`inflate_raw_limited`].

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::DecompressionError;

/// Output grows by at least this many bytes per decompression step.
const CHUNK: usize = 32 * 1024;

/// Inflate a headerless DEFLATE stream.
///
/// A stream that ends before its final block is reported as
/// [`DecompressionError::Truncated`], never returned as a short buffer.
pub fn inflate_raw(compressed: &[u8]) -> Result<Vec<u8>, DecompressionError> {
    inflate_raw_limited(compressed, usize::MAX)
}

/// Inflate a headerless DEFLATE stream, failing with
/// [`DecompressionError::TooLarge`] as soon as the output passes `max_out`
/// bytes.
pub fn inflate_raw_limited(
    compressed: &[u8],
    max_out: usize,
) -> Result<Vec<u8>, DecompressionError> {
    let mut inflater = Decompress::new(false);
    let mut out: Vec<u8> = Vec::with_capacity(CHUNK);

    loop {
        if out.capacity() - out.len() < CHUNK {
            out.reserve(CHUNK);
        }

        let in_before = inflater.total_in() as usize;
        let out_before = inflater.total_out();
        let input = compressed.get(in_before..).unwrap_or_default();

        // The window must survive across calls, so never `Finish` mid-stream.
        let status = inflater
            .decompress_vec(input, &mut out, FlushDecompress::None)
            .map_err(|e| DecompressionError::Corrupt(e.to_string()))?;

        if out.len() > max_out {
            return Err(DecompressionError::TooLarge { limit: max_out });
        }

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                let progressed = inflater.total_in() as usize > in_before
                    || inflater.total_out() > out_before;
                if !progressed {
                    return Err(DecompressionError::Truncated);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    /// Word-processor-like XML whose repeats sit far apart in the output.
    fn paragraphs(count: usize) -> String {
        const WORDS: [&str; 12] = [
            "atelier", "céramique", "tournage", "stage", "porcelaine", "grès",
            "émaillage", "cuisson", "Lyon", "débutants", "tarif", "réservation",
        ];
        (0..count)
            .map(|i| {
                let a = WORDS[i % WORDS.len()];
                let b = WORDS[(i * 7 + 3) % WORDS.len()];
                let c = WORDS[(i * 5 + 1) % WORDS.len()];
                let seance = i * 37 % 1000;
                let line = format!("Paragraphe {i}: {a} et {b}, séance {seance} de {c}.");
                format!("<w:p><w:r><w:t>{line}</w:t></w:r></w:p>")
            })
            .collect()
    }

    #[test]
    fn inflates_what_was_deflated() {
        let original = b"Bonjour, je suis coach en nutrition. ".repeat(40);
        assert_eq!(inflate_raw(&deflate(&original)).unwrap(), original);
    }

    #[test]
    fn output_larger_than_one_chunk() {
        let original: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let inflated = inflate_raw(&deflate(&original)).unwrap();
        assert_eq!(inflated.len(), original.len());
        assert_eq!(inflated, original);
    }

    #[test]
    fn back_references_across_chunks_resolve() {
        let original = paragraphs(3000);
        assert!(original.len() > 4 * CHUNK);
        let inflated = inflate_raw(&deflate(original.as_bytes())).unwrap();
        assert_eq!(inflated.len(), original.len());
        assert_eq!(inflated, original.as_bytes());
    }

    #[test]
    fn output_past_the_limit_is_refused() {
        let bomb = deflate(&vec![0u8; 1024 * 1024]);
        assert!(bomb.len() < 4096);
        assert!(matches!(
            inflate_raw_limited(&bomb, 64 * 1024),
            Err(DecompressionError::TooLarge { limit }) if limit == 64 * 1024
        ));

        let small = b"tenir dans la limite".repeat(10);
        assert_eq!(inflate_raw_limited(&deflate(&small), small.len()).unwrap(), small);
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let compressed = deflate(&b"some text that compresses ".repeat(100));
        let cut = &compressed[..compressed.len() / 2];
        assert!(inflate_raw(cut).is_err());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(inflate_raw(&[0xff, 0xff, 0xff, 0xff]).is_err());
        assert!(inflate_raw(&[]).is_err());
    }
}
