//! XOR run-length compression for CMem chunks
//!
//! The dynamic memory is XORed against the as-loaded image; nonzero delta
//! bytes are emitted literally, and zero runs become a 0x00 marker followed
//! by a length byte (count - 1). Runs longer than 256 split into repeated
//! maximal markers.

use crate::error::{ZError, ZResult};
use log::debug;

/// Compress `current` as a delta against `original`. Both slices cover
/// exactly the dynamic region.
pub fn compress(current: &[u8], original: &[u8]) -> Vec<u8> {
    debug_assert_eq!(current.len(), original.len());
    let mut out = Vec::new();
    let mut i = 0;
    while i < current.len() {
        let delta = current[i] ^ original[i];
        if delta != 0 {
            out.push(delta);
            i += 1;
        } else {
            let start = i;
            while i < current.len() && current[i] ^ original[i] == 0 {
                i += 1;
            }
            let mut run = i - start;
            while run > 256 {
                out.push(0);
                out.push(255);
                run -= 256;
            }
            out.push(0);
            out.push((run - 1) as u8);
        }
    }
    debug!("compressed {} bytes to {}", current.len(), out.len());
    out
}

/// Apply a compressed delta to a copy of `original`. Fails on a marker
/// with no length byte or on any write past the end of the region;
/// positions the delta never reaches stay at their original values.
pub fn decompress(compressed: &[u8], original: &[u8]) -> ZResult<Vec<u8>> {
    let mut out = original.to_vec();
    let mut pos = 0usize;
    let mut i = 0usize;
    while i < compressed.len() {
        let byte = compressed[i];
        i += 1;
        if byte != 0 {
            if pos >= out.len() {
                return Err(ZError::quetzal("save data overruns dynamic memory"));
            }
            out[pos] ^= byte;
            pos += 1;
        } else {
            if i >= compressed.len() {
                return Err(ZError::quetzal("corrupt run-length state in save data"));
            }
            pos += 1 + compressed[i] as usize;
            i += 1;
        }
    }
    if pos > out.len() {
        return Err(ZError::quetzal("save data overruns dynamic memory"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(current: &[u8], original: &[u8]) {
        let compressed = compress(current, original);
        let restored = decompress(&compressed, original).unwrap();
        assert_eq!(restored, current);
    }

    #[test]
    fn identical_images_compress_to_one_run() {
        let original = vec![0xAA; 100];
        let compressed = compress(&original, &original);
        assert_eq!(compressed, vec![0, 99]);
        round_trip(&original, &original);
    }

    #[test]
    fn fully_different_images_are_all_literals() {
        let original = vec![0x00; 16];
        let current = vec![0x5A; 16];
        let compressed = compress(&current, &original);
        assert_eq!(compressed.len(), 16);
        round_trip(&current, &original);
    }

    #[test]
    fn runs_crossing_the_rle_boundary() {
        for len in [255, 256, 257, 300, 600] {
            let original = vec![0x11; len + 2];
            let mut current = original.clone();
            current[0] = 0x12;
            current[len + 1] = 0x13;
            round_trip(&current, &original);
        }
    }

    #[test]
    fn sparse_changes() {
        let original = vec![0xFF; 1000];
        let mut current = original.clone();
        current[500] = 0xFE;
        let compressed = compress(&current, &original);
        assert!(compressed.len() < 10);
        round_trip(&current, &original);
    }

    #[test]
    fn dangling_run_marker_fails() {
        let original = vec![0u8; 8];
        assert!(decompress(&[0x01, 0x00], &original).is_err());
    }

    #[test]
    fn overrun_fails() {
        let original = vec![0u8; 4];
        // Skip 5 then write: the write lands past the region.
        assert!(decompress(&[0x00, 0x04, 0x01], &original).is_err());
        // A pure skip past the end also fails the final bound check.
        assert!(decompress(&[0x00, 0x09], &original).is_err());
    }

    #[test]
    fn short_delta_leaves_tail_unchanged() {
        let original = vec![1, 2, 3, 4, 5, 6];
        let restored = decompress(&[0x07], &original).unwrap();
        assert_eq!(restored, vec![6, 2, 3, 4, 5, 6]);
    }
}
