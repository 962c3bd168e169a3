// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Key recovery for X-programs.
//!
//! The attack builds linear constraints on the hidden key out of pairs of
//! correlated program samples. A sample is the XOR of the program rows
//! not simultaneously non-orthogonal to two random vectors d and e; for a
//! fixed lucky d (probability 1/2) every such sample v satisfies
//! <v, s> = 1. Collecting n independent samples into a triangular system
//! and enumerating its solutions therefore yields the key in a couple of
//! attempts, each candidate being confirmed by the weight-mod-4 codeword
//! test that true X-program keys pass by construction.
//!
//! All routines run on the word-parallel kernels of [`crate::matrix`];
//! program dimensions are validated once on entry of the extraction loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use rand::Rng;
use rayon::prelude::*;

use crate::matrix::{BitMat, BitVec};
use crate::{params, Error, Preferences, Verbosity};

/// Result of a successful key extraction.
#[derive(Clone, Debug)]
pub struct Extracted {
    pub key: BitVec,
    /// Candidate keys checked before the key was confirmed.
    pub tried: u64,
    /// Linear systems built.
    pub attempts: u64,
}

/// Draw one sample from the program: the XOR of all columns c with
/// <d, c> AND <e, c> = 0, for a fresh random e.
pub fn gen_sample<R: Rng + ?Sized>(prog: &BitMat, d: &BitVec, rng: &mut R) -> BitVec {
    let n = prog.rows();
    debug_assert!(d.len() == n);
    let e = BitVec::random(n, rng);
    let mut v = BitVec::zeros(n);
    for j in 0..prog.cols() {
        let alpha = d.dot_col_unchecked(prog, j);
        let beta = e.dot_col_unchecked(prog, j);
        if !(alpha & beta) {
            v.xor_col_unchecked(prog, j);
        }
    }
    v
}

/// Accumulate samples into an (n+1) x n triangular system.
///
/// One d is drawn for the whole system. Each sample is augmented with a
/// constant 1 bit and reduced against the pivoted columns; it either
/// dies out or becomes a new pivot. The loop stops at full rank or after
/// `maxiters` samples, whichever comes first.
///
/// On return, a nonzero column k has its first set bit at row k.
pub fn gen_system<R: Rng + ?Sized>(prog: &BitMat, maxiters: usize, rng: &mut R) -> BitMat {
    let n = prog.rows();
    let mut sys = BitMat::zeros(n + 1, n);
    let d = BitVec::random(n, rng);
    let mut rank = 0;
    for _ in 0..maxiters {
        let v = gen_sample(prog, &d, rng);
        let mut v1 = BitVec::zeros(n + 1);
        v1.words_mut()[..v.words().len()].copy_from_slice(v.words());
        v1.set_unchecked(n, true);
        for k in 0..n {
            if !v1.get_unchecked(k) {
                continue;
            }
            if sys.get_unchecked(k, k) {
                v1.xor_col_unchecked(&sys, k);
            } else {
                sys.set_col_unchecked(k, &v1);
                rank += 1;
                break;
            }
        }
        if rank == n {
            break;
        }
    }
    sys
}

/// Number of unpivoted columns of a triangular system.
pub fn free_columns(sys: &BitMat) -> usize {
    (0..sys.cols())
        .filter(|&k| !sys.get_unchecked(k, k))
        .count()
}

/// Enumerate all solutions of a triangular system.
///
/// Columns are processed from n-1 down to 0. A pivoted column is
/// back-eliminated from the columns below it; a free column forks the
/// set of witness rows kept beyond row n-1, one branch per value of the
/// free variable. The witness rows read across columns at the end are
/// exactly the solution set, of size 2^(free columns).
pub fn back_solve(sys: &BitMat) -> Vec<BitVec> {
    let n = sys.cols();
    assert!(sys.rows() == n + 1);
    let free = free_columns(sys);
    assert!(
        free <= params::MAX_FREE_COLS,
        "system too degenerate: {free} free columns"
    );
    let nsols = 1usize << free;
    let mut work = BitMat::zeros(n + nsols, n);
    for j in 0..n {
        work.copy_col_from(sys, j);
    }
    let mut nsol = 1usize;
    for k in (0..n).rev() {
        if !work.get_unchecked(k, k) {
            // Free variable: fork every witness row, the copy taking
            // the value 1.
            work.set_unchecked(k, k, true);
            for t in 0..nsol {
                for j in 0..n {
                    if work.get_unchecked(n + t, j) {
                        work.set_unchecked(n + nsol + t, j, true);
                    }
                }
                work.set_unchecked(n + nsol + t, k, true);
            }
            nsol *= 2;
        }
        for j in (0..k).rev() {
            if work.get_unchecked(k, j) {
                work.xor_cols_unchecked(j, k);
            }
        }
    }
    debug_assert!(nsol == nsols);
    let mut sols = Vec::with_capacity(nsol);
    for t in 0..nsol {
        let mut v = BitVec::zeros(n);
        for j in 0..n {
            if work.get_unchecked(n + t, j) {
                v.set_unchecked(j, true);
            }
        }
        sols.push(v);
    }
    sols
}

/// Statistical test for a candidate key.
///
/// For the true key the program rows selected by s span a code whose
/// words all have weight 0 or -1 modulo 4; a wrong key survives one
/// round with probability about 1/2. This never fails: a negative
/// answer is a result, not an error.
pub fn check_key<R: Rng + ?Sized>(prog: &BitMat, key: &BitVec, rng: &mut R) -> bool {
    let n = prog.rows();
    assert!(key.len() == n);
    for _ in 0..params::CHECK_ROUNDS {
        let d = BitVec::random(n, rng);
        let mut tot: u64 = 0;
        for j in 0..prog.cols() {
            if key.dot_col_unchecked(prog, j) {
                tot += d.dot_col_unchecked(prog, j) as u64;
            }
        }
        if tot % 4 != 0 && tot % 4 != 3 {
            return false;
        }
    }
    true
}

/// Recover the hidden key of a program by bounded retries.
///
/// Each attempt builds one system and checks all of its candidate
/// solutions. Systems leaving too many free columns are skipped rather
/// than enumerated.
pub fn extract_key<R: Rng + ?Sized>(
    prog: &BitMat,
    prefs: &Preferences,
    rng: &mut R,
) -> Result<Extracted, Error> {
    let n = prog.rows();
    assert!(n > 0 && prog.cols() > 0);
    let maxit = prefs.maxit.unwrap_or(params::DEFAULT_MAXIT);
    let budget = system_budget(n, prefs);
    let mut tried: u64 = 0;
    for attempt in 1..=maxit {
        if prefs.abort() {
            return Err(Error::Cancelled);
        }
        let sys = gen_system(prog, budget, rng);
        let free = free_columns(&sys);
        if free > params::MAX_FREE_COLS {
            if prefs.verbose(Verbosity::Debug) {
                eprintln!("[extract] attempt {attempt}: skipping system with {free} free columns");
            }
            continue;
        }
        for cand in back_solve(&sys) {
            tried += 1;
            if check_key(prog, &cand, rng) {
                if prefs.verbose(Verbosity::Verbose) {
                    eprintln!("[extract] key found after {attempt} attempts, {tried} candidates");
                }
                return Ok(Extracted {
                    key: cand,
                    tried,
                    attempts: attempt,
                });
            }
        }
        if prefs.verbose(Verbosity::Debug) {
            eprintln!("[extract] attempt {attempt}: {tried} candidates rejected so far");
        }
    }
    Err(Error::MaxIterations(maxit))
}

/// Parallel extraction, sharding attempts over a thread pool.
///
/// Attempts are independent and share no mutable state. Workers use
/// thread-local system randomness, so runs are non-deterministic.
pub fn extract_key_par(
    prog: &BitMat,
    prefs: &Preferences,
    pool: &rayon::ThreadPool,
) -> Result<Extracted, Error> {
    let n = prog.rows();
    assert!(n > 0 && prog.cols() > 0);
    let maxit = prefs.maxit.unwrap_or(params::DEFAULT_MAXIT);
    let budget = system_budget(n, prefs);
    let done = AtomicBool::new(false);
    let tried = AtomicU64::new(0);
    let found: Mutex<Option<(BitVec, u64)>> = Mutex::new(None);
    pool.install(|| {
        (1..=maxit).into_par_iter().for_each(|attempt| {
            if done.load(Ordering::Relaxed) || prefs.abort() {
                return;
            }
            let mut rng = rand::thread_rng();
            let sys = gen_system(prog, budget, &mut rng);
            if free_columns(&sys) > params::MAX_FREE_COLS {
                return;
            }
            for cand in back_solve(&sys) {
                tried.fetch_add(1, Ordering::Relaxed);
                if check_key(prog, &cand, &mut rng) {
                    done.store(true, Ordering::Relaxed);
                    let mut slot = found.lock().unwrap();
                    if slot.is_none() {
                        *slot = Some((cand, attempt));
                    }
                    return;
                }
            }
        });
    });
    if prefs.abort() {
        return Err(Error::Cancelled);
    }
    match found.into_inner().unwrap() {
        Some((key, attempt)) => Ok(Extracted {
            key,
            tried: tried.load(Ordering::Relaxed),
            attempts: attempt,
        }),
        None => Err(Error::MaxIterations(maxit)),
    }
}

fn system_budget(n: usize, prefs: &Preferences) -> usize {
    let mult = prefs.sysmaxit.unwrap_or(params::SYS_MAXIT);
    (n as f64 * mult) as usize
}

#[cfg(test)]
use rand::SeedableRng;

#[cfg(test)]
fn test_rng() -> rand::rngs::StdRng {
    rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE)
}

#[cfg(test)]
fn test_challenge(q: u64) -> crate::qrcode::Challenge {
    let mut rng = test_rng();
    crate::qrcode::qr_program(q, (q as usize + 1) / 2, &mut rng)
}

#[test]
fn test_gen_system_triangular() {
    let ch = test_challenge(23);
    let n = ch.program.rows();
    let mut rng = test_rng();
    for _ in 0..5 {
        let sys = gen_system(&ch.program, 2 * n, &mut rng);
        assert_eq!(sys.rows(), n + 1);
        assert_eq!(sys.cols(), n);
        for k in 0..n {
            let col = sys.col(k).unwrap();
            if col.count_ones() == 0 {
                continue;
            }
            // First set bit of a pivoted column is its pivot.
            for i in 0..k {
                assert!(!col.get_unchecked(i));
            }
            assert!(col.get_unchecked(k));
        }
        assert!(free_columns(&sys) <= n);
    }
}

#[test]
fn test_back_solve_small() {
    // 3 unknowns, pivots at columns 0 and 2, column 1 free:
    // x0 + x2 + 1 = 0 and x2 + 1 = 0.
    let mut sys = BitMat::zeros(4, 3);
    sys.set(0, 0, true).unwrap();
    sys.set(2, 0, true).unwrap();
    sys.set(3, 0, true).unwrap();
    sys.set(2, 2, true).unwrap();
    sys.set(3, 2, true).unwrap();
    let sols = back_solve(&sys);
    assert_eq!(sols.len(), 2);
    let expect0: BitVec = [false, false, true].into_iter().collect();
    let expect1: BitVec = [false, true, true].into_iter().collect();
    assert!(sols.contains(&expect0));
    assert!(sols.contains(&expect1));
}

#[cfg(test)]
fn satisfies(sys: &BitMat, x: &BitVec) -> bool {
    let n = sys.cols();
    for j in 0..n {
        let mut acc = sys.get_unchecked(n, j);
        for i in 0..n {
            if sys.get_unchecked(i, j) && x.get_unchecked(i) {
                acc = !acc;
            }
        }
        if acc {
            return false;
        }
    }
    true
}

#[test]
fn test_back_solve_complete() {
    use std::collections::HashSet;
    let ch = test_challenge(23);
    let n = ch.program.rows();
    let mut rng = test_rng();
    for budget in [n / 2, n, 2 * n] {
        let sys = gen_system(&ch.program, budget, &mut rng);
        let free = free_columns(&sys);
        if free > params::MAX_FREE_COLS {
            continue;
        }
        let sols = back_solve(&sys);
        assert_eq!(sols.len(), 1 << free);
        let mut seen = HashSet::new();
        for x in &sols {
            assert!(satisfies(&sys, x));
            assert!(seen.insert(format!("{x:?}")));
        }
    }
}

#[test]
fn test_check_key() {
    let ch = test_challenge(23);
    let mut rng = test_rng();
    assert!(check_key(&ch.program, &ch.key, &mut rng));
    let n = ch.program.rows();
    let mut accepted = 0;
    for _ in 0..50 {
        let w = BitVec::random(n, &mut rng);
        if w != ch.key && check_key(&ch.program, &w, &mut rng) {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 0);
}

#[test]
fn test_extract_key() {
    for q in [23u64, 31, 103] {
        let ch = test_challenge(q);
        let mut rng = test_rng();
        let prefs = Preferences {
            verbosity: Verbosity::Silent,
            ..Default::default()
        };
        let ex = extract_key(&ch.program, &prefs, &mut rng).unwrap();
        assert_eq!(ex.key, ch.key);
        assert!(ex.tried >= 1);
        assert!(check_key(&ch.program, &ex.key, &mut rng));
    }
}

#[test]
fn test_extract_key_par() {
    let ch = test_challenge(23);
    let prefs = Preferences {
        verbosity: Verbosity::Silent,
        ..Default::default()
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(2)
        .build()
        .unwrap();
    let ex = extract_key_par(&ch.program, &prefs, &pool).unwrap();
    assert_eq!(ex.key, ch.key);
}

#[test]
fn test_extract_cancelled() {
    use std::sync::Arc;
    let ch = test_challenge(23);
    let sig = Arc::new(AtomicBool::new(true));
    let prefs = Preferences {
        verbosity: Verbosity::Silent,
        abort_signal: Some(sig),
        ..Default::default()
    };
    let mut rng = test_rng();
    match extract_key(&ch.program, &prefs, &mut rng) {
        Err(Error::Cancelled) => {}
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[test]
fn test_extract_max_iterations() {
    // A random matrix is not an X-program: no candidate passes the
    // weight test and the retry budget runs out.
    let mut rng = test_rng();
    let mut prog = BitMat::zeros(8, 24);
    for j in 0..24 {
        let c = BitVec::random(8, &mut rng);
        prog.set_col(j, &c).unwrap();
    }
    let prefs = Preferences {
        maxit: Some(3),
        verbosity: Verbosity::Silent,
        ..Default::default()
    };
    match extract_key(&prog, &prefs, &mut rng) {
        Err(Error::MaxIterations(3)) => {}
        other => panic!("expected exhaustion, got {other:?}"),
    }
}
