// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Benchmark X-programs from quadratic-residue codes.
//!
//! For a prime q ≡ 7 (mod 8) the cyclic code spanned by the shifts of
//! the quadratic-residue indicator has dimension (q+1)/2 and every
//! codeword has Hamming weight 0 or 3 modulo 4. That weight property is
//! exactly what the key checker tests, so embedding a basis of the code
//! as the rows tagged by a secret vector produces a challenge with a
//! verifiable hidden key:
//!
//! - q coded rows `(a | b)` where the a-columns span the code and the
//!   last bit keeps `<row, s> = 1`,
//! - `extra` uniformly random rows orthogonal to s,
//! - a row shuffle and a coordinate permutation hiding the structure.
//!
//! Bibliography:
//! F. J. MacWilliams, N. J. A. Sloane, The Theory of Error-Correcting
//! Codes, chapter 16 (quadratic-residue codes).

use rand::seq::SliceRandom;
use rand::Rng;

use crate::arith;
use crate::matrix::{BitMat, BitVec};

/// A generated program (in transposed storage) and its planted key.
#[derive(Clone, Debug)]
pub struct Challenge {
    pub program: BitMat,
    pub key: BitVec,
}

/// Build a challenge program for a prime q ≡ 7 (mod 8), with `extra`
/// uncoded padding rows.
pub fn qr_program<R: Rng + ?Sized>(q: u64, extra: usize, rng: &mut R) -> Challenge {
    assert!(
        arith::pseudoprime(q) && q % 8 == 7,
        "q must be a prime congruent to 7 mod 8"
    );
    let qs = q as usize;
    let k = (qs + 1) / 2;
    let n = k + 1;
    let circ = residue_circulant(q);
    let basis = column_basis(&circ);
    assert!(basis.len() == k);

    let s_head = BitVec::random(k, rng);
    let mut rows: Vec<BitVec> = Vec::with_capacity(qs + extra);
    for i in 0..qs {
        let head: BitVec = basis.iter().map(|&b| circ.get_unchecked(i, b)).collect();
        let tail = !head.dot_unchecked(&s_head);
        rows.push(assemble(&head, tail, n));
    }
    for _ in 0..extra {
        let head = BitVec::random(k, rng);
        let tail = head.dot_unchecked(&s_head);
        rows.push(assemble(&head, tail, n));
    }
    rows.shuffle(rng);

    // Scramble the coordinates; the key follows the same permutation.
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(rng);
    let mut key = BitVec::zeros(n);
    for t in 0..n {
        let bit = if perm[t] < k {
            s_head.get_unchecked(perm[t])
        } else {
            true
        };
        if bit {
            key.set_unchecked(t, true);
        }
    }
    let mut program = BitMat::zeros(n, rows.len());
    let mut col = BitVec::zeros(n);
    for (j, row) in rows.iter().enumerate() {
        for t in 0..n {
            col.set_unchecked(t, row.get_unchecked(perm[t]));
        }
        program.set_col_unchecked(j, &col);
    }
    Challenge { program, key }
}

/// The q x q circulant of the quadratic-residue indicator:
/// entry (i, j) is set when j - i is a nonzero square modulo q.
pub fn residue_circulant(q: u64) -> BitMat {
    let qs = q as usize;
    let mut chi = vec![false; qs];
    for x in 1..q {
        if arith::legendre(x, q) == 1 {
            chi[x as usize] = true;
        }
    }
    let mut m = BitMat::zeros(qs, qs);
    for j in 0..qs {
        for i in 0..qs {
            if chi[(j + qs - i) % qs] {
                m.set_unchecked(i, j, true);
            }
        }
    }
    m
}

/// Indices of a maximal set of linearly independent columns,
/// by Gauss-Jordan elimination on a working copy.
pub fn column_basis(m: &BitMat) -> Vec<usize> {
    let (rows, cols) = (m.rows(), m.cols());
    let mut work = m.clone();
    let mut used = vec![false; cols];
    let mut pivots = Vec::new();
    for i in 0..rows {
        let Some(j) = (0..cols).find(|&j| !used[j] && work.get_unchecked(i, j)) else {
            continue;
        };
        used[j] = true;
        pivots.push(j);
        for j2 in 0..cols {
            if j2 != j && work.get_unchecked(i, j2) {
                work.xor_cols_unchecked(j2, j);
            }
        }
    }
    pivots
}

// Concatenate a head with one tail bit.
fn assemble(head: &BitVec, tail: bool, n: usize) -> BitVec {
    debug_assert!(head.len() + 1 == n);
    let mut row = BitVec::zeros(n);
    row.words_mut()[..head.words().len()].copy_from_slice(head.words());
    row.set_unchecked(n - 1, tail);
    row
}

#[cfg(test)]
use rand::SeedableRng;

#[test]
fn test_column_basis() {
    let mut m = BitMat::zeros(3, 4);
    let cols: [&[u8]; 4] = [&[1, 0, 0], &[1, 0, 0], &[0, 1, 0], &[1, 1, 0]];
    for (j, bits) in cols.iter().enumerate() {
        let v: BitVec = bits.iter().map(|&b| b != 0).collect();
        m.set_col(j, &v).unwrap();
    }
    assert_eq!(column_basis(&m), vec![0, 2]);
    // Rank of the residue circulant is (q+1)/2.
    for q in [7u64, 23, 31] {
        let circ = residue_circulant(q);
        assert_eq!(column_basis(&circ).len(), (q as usize + 1) / 2);
    }
}

#[test]
fn test_residue_code_weights() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    for q in [7u64, 23] {
        let qs = q as usize;
        let circ = residue_circulant(q);
        let basis = column_basis(&circ);
        for _ in 0..50 {
            let mut w = BitVec::zeros(qs);
            for &b in &basis {
                if rng.gen::<bool>() {
                    w.xor_col(&circ, b).unwrap();
                }
            }
            let wt = w.count_ones() % 4;
            assert!(wt == 0 || wt == 3, "weight {} mod 4", w.count_ones());
        }
    }
}

#[test]
fn test_challenge_shape() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    let ch = qr_program(23, 12, &mut rng);
    assert_eq!(ch.program.rows(), 13);
    assert_eq!(ch.program.cols(), 35);
    assert_eq!(ch.key.len(), 13);
    // Exactly the q coded rows are tagged by the key.
    let tagged = (0..35)
        .filter(|&j| ch.key.dot_col(&ch.program, j).unwrap())
        .count();
    assert_eq!(tagged, 23);
}

#[test]
#[should_panic]
fn test_bad_prime() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    // 17 is prime but 17 mod 8 = 1.
    qr_program(17, 0, &mut rng);
}
