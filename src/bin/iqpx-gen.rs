// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Generate benchmark X-programs with a planted key.

use std::path::Path;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;

use iqpx::{arith, encode, progfile, qrcode};
use iqpx::{Preferences, Verbosity};

fn main() {
    let args = std::env::args().map(|a| if a == "-o" { "--o".into() } else { a });
    let arg = arguments::parse(args).unwrap();
    if arg.get::<bool>("help").is_some() {
        eprintln!("Usage: iqpx-gen [OPTIONS]");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --help                 show this help");
        eprintln!("  --q Q                  challenge prime, 7 mod 8 (default 103)");
        eprintln!("  --extra R              uncoded padding rows (default (q+1)/2)");
        eprintln!("  -o FILE                program output file (default out.prog)");
        eprintln!("  --seed S               seed the random generator");
        eprintln!("  --verbose silent|info|verbose|debug");
        return;
    }
    let q = arg.get::<u64>("q").unwrap_or(103);
    let extra = arg
        .get::<usize>("extra")
        .unwrap_or((q as usize + 1) / 2);
    let outpath = arg.get::<String>("o").unwrap_or("out.prog".into());
    let seed = arg.get::<u64>("seed");
    let v = arg.get::<String>("verbose").unwrap_or("info".into());
    let mut prefs = Preferences::default();
    prefs.verbosity = Verbosity::from_str(&v).expect("could not read verbosity");

    if !arith::pseudoprime(q) || q % 8 != 7 {
        panic!("q = {q} must be a prime congruent to 7 mod 8");
    }
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let ch = qrcode::qr_program(q, extra, &mut rng);
    if prefs.verbose(Verbosity::Info) {
        eprintln!(
            "Generated program with {} rows of length {}",
            ch.program.cols(),
            ch.program.rows()
        );
    }
    if let Err(e) = progfile::write_program(Path::new(&outpath), &ch.program) {
        eprintln!("cannot write {outpath}: {e}");
        std::process::exit(1);
    }
    if prefs.verbose(Verbosity::Info) {
        eprintln!("Wrote program to {outpath}");
    }
    println!("{}", encode::key_to_bin(&ch.key));
    println!("{}", encode::key_to_base64(&ch.key));
}
