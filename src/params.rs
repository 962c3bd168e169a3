// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Default tuning parameters for the extraction loop.

/// Outer attempts before giving up on a program.
pub const DEFAULT_MAXIT: u64 = 100;

/// Sample budget per linear system, as a multiple of the key length.
///
/// Each sample adds an independent equation with constant probability,
/// so a small multiple of n is almost always enough to reach full rank.
pub const SYS_MAXIT: f64 = 1.2;

/// Rounds of the weight-mod-4 test. False accepts happen with
/// probability about 2^-40.
pub const CHECK_ROUNDS: usize = 40;

/// Refuse to enumerate solution sets larger than 2^20.
pub const MAX_FREE_COLS: usize = 20;

/// Default sample count for the synthesizer CLI.
pub const DEFAULT_NSAMPLES: usize = 4096;

/// Rejection threshold used when forging samples.
///
/// Accepting v non-orthogonal to the key always, and orthogonal v with
/// probability 1/cos²(π/8) − 1, reproduces the cos²(π/8) ≈ 0.854 bias
/// of the ideal IQP distribution.
pub fn accept_theta() -> f64 {
    let c = (std::f64::consts::PI / 8.0).cos();
    1.0 / (c * c) - 1.0
}

#[test]
fn test_accept_theta() {
    let theta = accept_theta();
    assert!((theta - 0.17157).abs() < 1e-4);
}
