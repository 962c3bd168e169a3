// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Attack an X-program: recover the hidden key, then print it or forge
//! the samples a quantum device would return.

use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use iqpx::{encode, params, progfile, solve, synth};
use iqpx::{Preferences, Verbosity};

fn main() {
    // The historical tool spells its flags -N, -o and -s.
    let args = std::env::args().map(|a| match a.as_str() {
        "-N" => "--N".into(),
        "-o" => "--o".into(),
        "-s" => "--s".into(),
        _ => a,
    });
    let arg = arguments::parse(args).unwrap();
    if arg.get::<bool>("help").is_some() || arg.orphans.len() != 1 {
        eprintln!("Usage: iqpx [OPTIONS] PROGRAM");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --help                 show this help");
        eprintln!("  -N COUNT               number of samples to forge (default 4096)");
        eprintln!("  -o FILE                samples output file (default samples.dat)");
        eprintln!("  -s base64|bin          print the key instead of forging samples");
        eprintln!("  --maxit N              extraction attempts (default 100)");
        eprintln!("  --sysmaxit X           sample budget per system, times n (default 1.2)");
        eprintln!("  --threads N            enable up to N computation threads");
        eprintln!("  --seed S               seed the random generator");
        eprintln!("  --verbose silent|info|verbose|debug");
        std::process::exit(i32::from(arg.get::<bool>("help").is_none()));
    }
    let nsamples = arg.get::<usize>("N").unwrap_or(params::DEFAULT_NSAMPLES);
    let outpath = arg.get::<String>("o").unwrap_or("samples.dat".into());
    let keyfmt = arg.get::<String>("s");
    let seed = arg.get::<u64>("seed");
    let v = arg.get::<String>("verbose").unwrap_or("info".into());

    let mut prefs = Preferences::default();
    prefs.maxit = arg.get::<u64>("maxit");
    prefs.sysmaxit = arg.get::<f64>("sysmaxit");
    prefs.threads = arg.get::<usize>("threads");
    prefs.verbosity = Verbosity::from_str(&v).expect("could not read verbosity");

    let path = Path::new(&arg.orphans[0]);
    let prog = match progfile::read_program(path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("cannot read {}: {e}", path.display());
            std::process::exit(1);
        }
    };
    if prefs.verbose(Verbosity::Info) {
        eprintln!(
            "Loaded program with {} rows of length {}",
            prog.cols(),
            prog.rows()
        );
    }

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let t0 = Instant::now();
    let extracted = match prefs.threads {
        None | Some(1) => solve::extract_key(&prog, &prefs, &mut rng),
        Some(t) => {
            if seed.is_some() && prefs.verbose(Verbosity::Info) {
                eprintln!("Multithreaded extraction ignores the seed");
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(t)
                .build()
                .expect("cannot create thread pool");
            solve::extract_key_par(&prog, &prefs, &pool)
        }
    };
    let extracted = match extracted {
        Ok(x) => x,
        Err(e) => {
            eprintln!("extraction failed: {e}");
            std::process::exit(1);
        }
    };
    if prefs.verbose(Verbosity::Info) {
        eprintln!(
            "Key found in {:.3}s after {} attempts ({} candidates checked)",
            t0.elapsed().as_secs_f64(),
            extracted.attempts,
            extracted.tried,
        );
    }

    match keyfmt.as_deref() {
        Some("base64") => println!("{}", encode::key_to_base64(&extracted.key)),
        Some("bin") => println!("{}", encode::key_to_bin(&extracted.key)),
        Some(f) => {
            eprintln!("unknown key format {f}");
            std::process::exit(1);
        }
        None => {
            let samples = synth::gen_samples(&extracted.key, nsamples, &mut rng);
            if let Err(e) = progfile::write_program(Path::new(&outpath), &samples) {
                eprintln!("cannot write {outpath}: {e}");
                std::process::exit(1);
            }
            if prefs.verbose(Verbosity::Info) {
                eprintln!("Wrote {nsamples} samples to {outpath}");
            }
        }
    }
}
