//! One-shot zlib inflate/deflate wrapper (component C2).
//!
//! Grounded on `other_examples/27e120c8_ringo380-idb-utils__src-innodb-sdi.rs.rs`'s
//! `decompress_sdi_data`, which reads a zlib stream out of an InnoDB page the
//! same way RPT page streams are read here.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::IRptError;

/// Inflates `data`, verifying the result is exactly `expected_len` bytes.
/// Callers attach page-specific context (page number) to the error.
pub fn inflate_exact(data: &[u8], expected_len: usize) -> Result<Vec<u8>, IRptError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(expected_len);
    let read_err = decoder.read_to_end(&mut out).is_err();
    if read_err || out.len() != expected_len {
        return Err(IRptError::DecompressError {
            page: 0,
            expected: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}

/// Deflates `data` with zlib's default compression level, for the build path.
pub fn deflate_default(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("in-memory write never fails");
    encoder.finish().expect("in-memory finish never fails")
}
