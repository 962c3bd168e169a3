// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Printable encodings of key vectors.
//!
//! The bin form is the ASCII 0/1 transcription of the vector in index
//! order. The base64 form left-pads the vector with zero bits to a
//! multiple of 8, packs big-endian (bit 0 of the vector becomes the
//! most significant available bit of the first byte) and applies
//! standard base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::matrix::BitVec;
use crate::Error;

pub fn key_to_bin(v: &BitVec) -> String {
    (0..v.len())
        .map(|i| if v.get_unchecked(i) { '1' } else { '0' })
        .collect()
}

pub fn key_from_bin(s: &str) -> Result<BitVec, Error> {
    s.chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            _ => Err(Error::Parse(format!("invalid key character {c:?}"))),
        })
        .collect()
}

fn front_padding(n: usize) -> usize {
    debug_assert!(n > 0);
    7 - ((n - 1) % 8)
}

pub fn key_to_base64(v: &BitVec) -> String {
    let n = v.len();
    if n == 0 {
        return String::new();
    }
    let pad = front_padding(n);
    let mut bytes = vec![0u8; (pad + n) / 8];
    for i in 0..n {
        if v.get_unchecked(i) {
            let p = pad + i;
            bytes[p / 8] |= 1 << (7 - p % 8);
        }
    }
    STANDARD.encode(&bytes)
}

/// Decode a base64 key of known length n.
pub fn key_from_base64(s: &str, n: usize) -> Result<BitVec, Error> {
    if n == 0 {
        return Ok(BitVec::zeros(0));
    }
    let bytes = STANDARD
        .decode(s)
        .map_err(|e| Error::Parse(format!("invalid base64 key: {e}")))?;
    let pad = front_padding(n);
    if bytes.len() != (pad + n) / 8 {
        return Err(Error::Parse(format!(
            "base64 key has {} bytes, expected {}",
            bytes.len(),
            (pad + n) / 8
        )));
    }
    let mut v = BitVec::zeros(n);
    for i in 0..n {
        let p = pad + i;
        if bytes[p / 8] >> (7 - p % 8) & 1 != 0 {
            v.set_unchecked(i, true);
        }
    }
    Ok(v)
}

#[cfg(test)]
const KEY53: &str = "01001010010011010001101100111011001001111110110100101";

#[test]
fn test_key53() {
    let key = key_from_bin(KEY53).unwrap();
    assert_eq!(key.len(), 53);
    assert_eq!(key_to_bin(&key), KEY53);
    assert_eq!(key_to_base64(&key), "CUmjZ2T9pQ==");
    assert_eq!(key_from_base64("CUmjZ2T9pQ==", 53).unwrap(), key);
}

#[test]
fn test_bin_errors() {
    assert!(key_from_bin("010x1").is_err());
    assert!(key_from_base64("not base64!", 53).is_err());
    // Wrong declared length.
    assert!(key_from_base64("CUmjZ2T9pQ==", 64).is_err());
}

#[test]
fn test_roundtrip() {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    for n in [1, 7, 8, 9, 52, 53, 64, 200] {
        let v = crate::matrix::BitVec::random(n, &mut rng);
        assert_eq!(key_from_bin(&key_to_bin(&v)).unwrap(), v);
        assert_eq!(key_from_base64(&key_to_base64(&v), n).unwrap(), v);
    }
}
