// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Forged samples for a broken X-program.
//!
//! Once the key is known, the quantum sampling distribution can be
//! imitated classically: the ideal device outputs strings non-orthogonal
//! to the key with probability cos²(π/8) ≈ 0.854. Rejection sampling on
//! uniform strings reproduces that bias exactly.

use rand::Rng;

use crate::matrix::{BitMat, BitVec};
use crate::params;

/// Draw `nsamples` biased samples for a known key, one per column.
pub fn gen_samples<R: Rng + ?Sized>(key: &BitVec, nsamples: usize, rng: &mut R) -> BitMat {
    let n = key.len();
    let theta = params::accept_theta();
    let mut out = BitMat::zeros(n, nsamples);
    let mut accepted = 0;
    while accepted < nsamples {
        let v = BitVec::random(n, rng);
        if v.dot_unchecked(key) || rng.gen::<f64>() < theta {
            out.set_col_unchecked(accepted, &v);
            accepted += 1;
        }
    }
    out
}

#[test]
fn test_gen_samples_bias() {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    let key = BitVec::random(31, &mut rng);
    let nsamples = 4000;
    let out = gen_samples(&key, nsamples, &mut rng);
    assert_eq!(out.rows(), 31);
    assert_eq!(out.cols(), nsamples);
    let mut hits = 0;
    for j in 0..nsamples {
        if out.col(j).unwrap().dot(&key).unwrap() {
            hits += 1;
        }
    }
    // Expected fraction is cos²(π/8) ≈ 0.854.
    let frac = hits as f64 / nsamples as f64;
    assert!(0.82 < frac && frac < 0.89, "bias {frac}");
}
