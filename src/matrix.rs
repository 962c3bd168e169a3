// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Bit-packed vectors and matrices over GF(2).
//!
//! The solver spends almost all of its time computing inner products of a
//! vector with columns of an X-program, and XOR-ing columns into vectors.
//! Storage is therefore laid out so that every column starts at a 64-bit
//! word boundary: a column of length r occupies `⌈r/64⌉` consecutive words
//! regardless of where it sits in the matrix. Kernels then run on
//! contiguous word runs with no shift or alignment logic, at the price of
//! at most 63 wasted bits per column.
//!
//! The trailing bits of the last word of a column (and of a vector) are
//! slack and are kept zero by every operation, so that popcount, equality
//! and dot products are exact on whole words.
//!
//! Checked operations return [`Error`] on shape disagreement or index
//! overflow; the `_unchecked` variants only `debug_assert` and are meant
//! for hot loops whose operands were validated on entry.

use std::ops::Range;

use crate::Error;

type Lane = u64;
const LSIZE: usize = Lane::BITS as usize;

fn nwords(bits: usize) -> usize {
    (bits + LSIZE - 1) / LSIZE
}

/// A bit vector of fixed logical length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVec {
    len: usize,
    words: Vec<Lane>,
}

impl BitVec {
    pub fn zeros(len: usize) -> BitVec {
        BitVec {
            len,
            words: vec![0; nwords(len)],
        }
    }

    /// A fresh uniformly random vector.
    pub fn random<R: rand::Rng + ?Sized>(len: usize, rng: &mut R) -> BitVec {
        use rand::Fill;
        let mut v = BitVec::zeros(len);
        v.try_fill(rng).unwrap();
        v
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> Result<bool, Error> {
        if i >= self.len {
            return Err(Error::OutOfBounds(i, self.len));
        }
        Ok(self.get_unchecked(i))
    }

    #[inline]
    pub fn get_unchecked(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        (self.words[i / LSIZE] >> (i % LSIZE)) & 1 != 0
    }

    pub fn set(&mut self, i: usize, x: bool) -> Result<(), Error> {
        if i >= self.len {
            return Err(Error::OutOfBounds(i, self.len));
        }
        self.set_unchecked(i, x);
        Ok(())
    }

    #[inline]
    pub fn set_unchecked(&mut self, i: usize, x: bool) {
        debug_assert!(i < self.len);
        let w = &mut self.words[i / LSIZE];
        if x {
            *w |= 1 << (i % LSIZE);
        } else {
            *w &= !(1 << (i % LSIZE));
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Inner product over GF(2): parity of the popcount of `self AND other`.
    pub fn dot(&self, other: &BitVec) -> Result<bool, Error> {
        if self.len != other.len {
            return Err(Error::DimensionMismatch(self.len, other.len));
        }
        Ok(self.dot_unchecked(other))
    }

    #[inline]
    pub fn dot_unchecked(&self, other: &BitVec) -> bool {
        debug_assert!(self.len == other.len);
        dot_words(&self.words, &other.words)
    }

    /// self ← self ⊕ other.
    pub fn xor(&mut self, other: &BitVec) -> Result<(), Error> {
        if self.len != other.len {
            return Err(Error::DimensionMismatch(self.len, other.len));
        }
        self.xor_unchecked(other);
        Ok(())
    }

    #[inline]
    pub fn xor_unchecked(&mut self, other: &BitVec) {
        debug_assert!(self.len == other.len);
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w ^= o;
        }
    }

    /// Inner product with column `j` of `m`.
    pub fn dot_col(&self, m: &BitMat, j: usize) -> Result<bool, Error> {
        if self.len != m.rows {
            return Err(Error::DimensionMismatch(self.len, m.rows));
        }
        if j >= m.cols {
            return Err(Error::OutOfBounds(j, m.cols));
        }
        Ok(self.dot_col_unchecked(m, j))
    }

    #[inline]
    pub fn dot_col_unchecked(&self, m: &BitMat, j: usize) -> bool {
        debug_assert!(self.len == m.rows);
        dot_words(&self.words, m.col_words(j))
    }

    /// self ← self ⊕ column `j` of `m`.
    pub fn xor_col(&mut self, m: &BitMat, j: usize) -> Result<(), Error> {
        if self.len != m.rows {
            return Err(Error::DimensionMismatch(self.len, m.rows));
        }
        if j >= m.cols {
            return Err(Error::OutOfBounds(j, m.cols));
        }
        self.xor_col_unchecked(m, j);
        Ok(())
    }

    #[inline]
    pub fn xor_col_unchecked(&mut self, m: &BitMat, j: usize) {
        debug_assert!(self.len == m.rows);
        for (w, o) in self.words.iter_mut().zip(m.col_words(j)) {
            *w ^= o;
        }
    }

    pub(crate) fn words(&self) -> &[Lane] {
        &self.words
    }

    pub(crate) fn words_mut(&mut self) -> &mut [Lane] {
        &mut self.words
    }

    fn mask_slack(&mut self) {
        let extra = self.len % LSIZE;
        if extra != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1 << extra) - 1;
            }
        }
    }
}

impl FromIterator<bool> for BitVec {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> BitVec {
        let bits: Vec<bool> = iter.into_iter().collect();
        let mut v = BitVec::zeros(bits.len());
        for (i, &b) in bits.iter().enumerate() {
            if b {
                v.set_unchecked(i, true);
            }
        }
        v
    }
}

impl rand::Fill for BitVec {
    fn try_fill<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), rand::Error> {
        rng.try_fill(&mut self.words[..])?;
        self.mask_slack();
        Ok(())
    }
}

#[inline]
fn dot_words(a: &[Lane], b: &[Lane]) -> bool {
    debug_assert!(a.len() == b.len());
    // Parity of a popcount is additive under XOR, so the AND results
    // fold into a single word before counting.
    let mut acc: Lane = 0;
    for (x, y) in a.iter().zip(b) {
        acc ^= x & y;
    }
    acc.count_ones() % 2 == 1
}

/// A bit matrix of shape (rows, cols) with word-aligned columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitMat {
    rows: usize,
    cols: usize,
    // Words per column.
    wpc: usize,
    words: Vec<Lane>,
}

impl BitMat {
    pub fn zeros(rows: usize, cols: usize) -> BitMat {
        let wpc = nwords(rows);
        BitMat {
            rows,
            cols,
            wpc,
            words: vec![0; wpc * cols],
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn col_range(&self, j: usize) -> Range<usize> {
        debug_assert!(j < self.cols);
        j * self.wpc..(j + 1) * self.wpc
    }

    #[inline]
    pub(crate) fn col_words(&self, j: usize) -> &[Lane] {
        let r = self.col_range(j);
        &self.words[r]
    }

    pub fn get(&self, i: usize, j: usize) -> Result<bool, Error> {
        if i >= self.rows {
            return Err(Error::OutOfBounds(i, self.rows));
        }
        if j >= self.cols {
            return Err(Error::OutOfBounds(j, self.cols));
        }
        Ok(self.get_unchecked(i, j))
    }

    #[inline]
    pub fn get_unchecked(&self, i: usize, j: usize) -> bool {
        debug_assert!(i < self.rows && j < self.cols);
        (self.words[j * self.wpc + i / LSIZE] >> (i % LSIZE)) & 1 != 0
    }

    pub fn set(&mut self, i: usize, j: usize, x: bool) -> Result<(), Error> {
        if i >= self.rows {
            return Err(Error::OutOfBounds(i, self.rows));
        }
        if j >= self.cols {
            return Err(Error::OutOfBounds(j, self.cols));
        }
        self.set_unchecked(i, j, x);
        Ok(())
    }

    #[inline]
    pub fn set_unchecked(&mut self, i: usize, j: usize, x: bool) {
        debug_assert!(i < self.rows && j < self.cols);
        let w = &mut self.words[j * self.wpc + i / LSIZE];
        if x {
            *w |= 1 << (i % LSIZE);
        } else {
            *w &= !(1 << (i % LSIZE));
        }
    }

    /// Overwrite column `j` with the contents of `v`.
    pub fn set_col(&mut self, j: usize, v: &BitVec) -> Result<(), Error> {
        if v.len != self.rows {
            return Err(Error::DimensionMismatch(v.len, self.rows));
        }
        if j >= self.cols {
            return Err(Error::OutOfBounds(j, self.cols));
        }
        self.set_col_unchecked(j, v);
        Ok(())
    }

    #[inline]
    pub fn set_col_unchecked(&mut self, j: usize, v: &BitVec) {
        debug_assert!(v.len == self.rows);
        let r = self.col_range(j);
        self.words[r].copy_from_slice(&v.words);
    }

    /// Extract column `j` as a vector.
    pub fn col(&self, j: usize) -> Result<BitVec, Error> {
        if j >= self.cols {
            return Err(Error::OutOfBounds(j, self.cols));
        }
        Ok(BitVec {
            len: self.rows,
            words: self.col_words(j).to_vec(),
        })
    }

    /// Column `i` ← column `i` ⊕ column `j`, in place.
    pub fn xor_cols(&mut self, i: usize, j: usize) -> Result<(), Error> {
        if i >= self.cols {
            return Err(Error::OutOfBounds(i, self.cols));
        }
        if j >= self.cols {
            return Err(Error::OutOfBounds(j, self.cols));
        }
        self.xor_cols_unchecked(i, j);
        Ok(())
    }

    pub fn xor_cols_unchecked(&mut self, i: usize, j: usize) {
        debug_assert!(i < self.cols && j < self.cols);
        let wpc = self.wpc;
        if i == j {
            // A column XOR-ed onto itself vanishes.
            self.words[i * wpc..(i + 1) * wpc].fill(0);
            return;
        }
        let (dst, src) = if i < j {
            let (lo, hi) = self.words.split_at_mut(j * wpc);
            (&mut lo[i * wpc..(i + 1) * wpc], &hi[..wpc])
        } else {
            let (lo, hi) = self.words.split_at_mut(i * wpc);
            (&mut hi[..wpc], &lo[j * wpc..(j + 1) * wpc])
        };
        for (w, o) in dst.iter_mut().zip(src) {
            *w ^= o;
        }
    }

    /// Copy column `j` of `src` into column `j` of self.
    ///
    /// The destination may have more rows; the extra bits stay zero.
    pub(crate) fn copy_col_from(&mut self, src: &BitMat, j: usize) {
        debug_assert!(src.rows <= self.rows && j < self.cols && j < src.cols);
        let r = self.col_range(j);
        self.words[r][..src.wpc].copy_from_slice(src.col_words(j));
    }
}

#[cfg(test)]
fn make_bitvec(slice: &[u8]) -> BitVec {
    slice.iter().map(|&n| n != 0).collect()
}

#[test]
fn test_get_set() {
    let mut v = BitVec::zeros(70);
    assert!(v.set(69, true).is_ok());
    assert!(v.set(70, true).is_err());
    assert_eq!(v.get(69).unwrap(), true);
    assert_eq!(v.get(0).unwrap(), false);
    assert!(v.get(70).is_err());
    assert_eq!(v.count_ones(), 1);
    v.set(69, false).unwrap();
    assert_eq!(v.count_ones(), 0);

    let mut m = BitMat::zeros(70, 3);
    m.set(69, 2, true).unwrap();
    assert_eq!(m.get(69, 2).unwrap(), true);
    assert!(m.set(70, 2, true).is_err());
    assert!(m.set(69, 3, true).is_err());
}

#[test]
fn test_dot() {
    let x = make_bitvec(&[1, 1, 0, 1]);
    let y = make_bitvec(&[1, 0, 1, 1]);
    assert_eq!(x.dot(&y).unwrap(), false);
    let z = make_bitvec(&[0, 1, 1, 1]);
    assert_eq!(x.dot(&z).unwrap(), true);
    assert!(x.dot(&BitVec::zeros(5)).is_err());

    // Agreement with the naive sum over random pairs.
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    for len in [1, 63, 64, 65, 200] {
        for _ in 0..20 {
            let a = BitVec::random(len, &mut rng);
            let b = BitVec::random(len, &mut rng);
            let mut naive = 0u32;
            for i in 0..len {
                if a.get_unchecked(i) && b.get_unchecked(i) {
                    naive += 1;
                }
            }
            assert_eq!(a.dot_unchecked(&b), naive % 2 == 1);
        }
    }
}

#[test]
fn test_xor_involution() {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    let mut a = BitVec::random(150, &mut rng);
    let b = BitVec::random(150, &mut rng);
    let orig = a.clone();
    a.xor(&b).unwrap();
    a.xor(&b).unwrap();
    assert_eq!(a, orig);
}

#[test]
fn test_col_ops() {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    let mut m = BitMat::zeros(100, 4);
    for j in 0..4 {
        let c = BitVec::random(100, &mut rng);
        m.set_col(j, &c).unwrap();
    }
    let c1 = m.col(1).unwrap();
    let c3 = m.col(3).unwrap();

    // Column swap by triple XOR.
    m.xor_cols(1, 3).unwrap();
    m.xor_cols(3, 1).unwrap();
    m.xor_cols(1, 3).unwrap();
    assert_eq!(m.col(1).unwrap(), c3);
    assert_eq!(m.col(3).unwrap(), c1);

    // dot_col and xor_col agree with the extracted column.
    let v = BitVec::random(100, &mut rng);
    assert_eq!(v.dot_col(&m, 2).unwrap(), v.dot(&m.col(2).unwrap()).unwrap());
    let mut w = v.clone();
    w.xor_col(&m, 2).unwrap();
    let mut w2 = v.clone();
    w2.xor(&m.col(2).unwrap()).unwrap();
    assert_eq!(w, w2);

    assert!(v.dot_col(&m, 4).is_err());
    assert!(BitVec::zeros(99).dot_col(&m, 0).is_err());
}

#[test]
fn test_slack_bits() {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    // Random fills, sets and XORs never touch the slack bits.
    for len in [1, 5, 63, 65, 100] {
        let mut a = BitVec::random(len, &mut rng);
        let b = BitVec::random(len, &mut rng);
        a.xor(&b).unwrap();
        a.set_unchecked(len - 1, true);
        let extra = len % LSIZE;
        if extra != 0 {
            assert_eq!(a.words.last().unwrap() >> extra, 0);
        }
        assert!(a.count_ones() <= len);
    }
    // Same through matrix columns.
    let mut m = BitMat::zeros(65, 3);
    for j in 0..3 {
        let v = BitVec::random(65, &mut rng);
        m.set_col(j, &v).unwrap();
    }
    m.xor_cols_unchecked(0, 1);
    m.xor_cols_unchecked(2, 2);
    for j in 0..3 {
        assert_eq!(m.col_words(j)[1] >> 1, 0);
    }
    assert_eq!(m.col(2).unwrap().count_ones(), 0);
}
