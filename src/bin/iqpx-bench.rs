// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Timing harness for key extraction.
//!
//! Sweeps challenge primes q ≡ 7 (mod 8) over a range and prints one
//! CSV row per extraction on stdout:
//!
//! ```text
//! q,n,gen_seconds,extract_seconds,candidate_keys
//! ```

use std::str::FromStr;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use iqpx::{arith, qrcode, solve};
use iqpx::{Preferences, Verbosity};

fn main() {
    let arg = arguments::parse(std::env::args()).unwrap();
    if arg.get::<bool>("help").is_some() {
        eprintln!("Usage: iqpx-bench [OPTIONS]");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --help                 show this help");
        eprintln!("  --qmin Q               smallest challenge prime (default 7)");
        eprintln!("  --qmax Q               largest challenge prime (default 103)");
        eprintln!("  --reps K               extractions per prime (default 1)");
        eprintln!("  --maxit N              extraction attempts (default 100)");
        eprintln!("  --seed S               seed the random generator");
        eprintln!("  --verbose silent|info|verbose|debug");
        return;
    }
    let qmin = arg.get::<u64>("qmin").unwrap_or(7);
    let qmax = arg.get::<u64>("qmax").unwrap_or(103);
    let reps = arg.get::<usize>("reps").unwrap_or(1);
    let seed = arg.get::<u64>("seed");
    let v = arg.get::<String>("verbose").unwrap_or("info".into());
    let mut prefs = Preferences::default();
    prefs.maxit = arg.get::<u64>("maxit");
    prefs.verbosity = Verbosity::from_str(&v).expect("could not read verbosity");

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    for q in qmin..=qmax {
        if q % 8 != 7 || !arith::pseudoprime(q) {
            continue;
        }
        for rep in 0..reps {
            let t0 = Instant::now();
            let ch = qrcode::qr_program(q, (q as usize + 1) / 2, &mut rng);
            let tgen = t0.elapsed().as_secs_f64();
            let n = ch.program.rows();
            let t1 = Instant::now();
            match solve::extract_key(&ch.program, &prefs, &mut rng) {
                Ok(ex) => {
                    let text = t1.elapsed().as_secs_f64();
                    assert!(ex.key == ch.key, "extracted a wrong key for q={q}");
                    println!("{q},{n},{tgen:.6},{text:.6},{}", ex.tried);
                }
                Err(e) => {
                    eprintln!("q={q} rep={rep}: extraction failed: {e}");
                }
            }
            if prefs.verbose(Verbosity::Verbose) {
                eprintln!(
                    "q={q} rep={rep} done in {:.3}s",
                    t0.elapsed().as_secs_f64()
                );
            }
        }
    }
}
