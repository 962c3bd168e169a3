// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Classical key extraction for IQP X-programs.
//!
//! An X-program is a binary matrix whose rows generate a linear code
//! hiding a secret vector s, as in the quantum-supremacy challenge of
//! Shepherd and Bremner. This crate implements the classical attack of
//! Kahanamoku-Meyer: build linear systems from correlated samples of the
//! program, enumerate their solutions and confirm the key with a
//! statistical weight test. A verified key is enough to forge the
//! bitstring samples a quantum device would produce.
//!
//! Bibliography:
//!
//! D. Shepherd, M. Bremner, Temporally unstructured quantum computation
//! <https://arxiv.org/abs/0809.0847>
//!
//! G. Kahanamoku-Meyer, Forging quantum data: classically defeating an
//! IQP-based quantum test
//! <https://arxiv.org/abs/1912.05547>

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod arith;
pub mod encode;
pub mod matrix;
pub mod params;
pub mod progfile;
pub mod qrcode;
pub mod solve;
pub mod synth;

pub use matrix::{BitMat, BitVec};

/// How much diagnostics go to stderr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    #[default]
    Info,
    Verbose,
    Debug,
}

impl FromStr for Verbosity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "silent" => Ok(Verbosity::Silent),
            "info" => Ok(Verbosity::Info),
            "verbose" => Ok(Verbosity::Verbose),
            "debug" => Ok(Verbosity::Debug),
            _ => Err(Error::Parse(format!("unknown verbosity {s}"))),
        }
    }
}

/// User preferences for the extraction loop.
///
/// `None` fields select the defaults from [`params`].
#[derive(Clone, Default)]
pub struct Preferences {
    /// Maximum number of outer extraction attempts.
    pub maxit: Option<u64>,
    /// Sample budget per system, as a multiple of the key length.
    pub sysmaxit: Option<f64>,
    pub threads: Option<usize>,
    pub verbosity: Verbosity,
    /// An external signal to interrupt long computations.
    pub abort_signal: Option<Arc<AtomicBool>>,
}

impl Preferences {
    pub fn verbose(&self, v: Verbosity) -> bool {
        self.verbosity >= v
    }

    pub fn abort(&self) -> bool {
        match &self.abort_signal {
            Some(sig) => sig.load(Ordering::Relaxed),
            None => false,
        }
    }
}

/// Errors surfaced by the solver and the file format collaborators.
#[derive(Debug)]
pub enum Error {
    /// Operands of incompatible shape.
    DimensionMismatch(usize, usize),
    /// Linear or column index outside the valid range.
    OutOfBounds(usize, usize),
    /// The extractor exhausted its retry budget without finding a key.
    MaxIterations(u64),
    /// The abort signal was raised.
    Cancelled,
    Parse(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DimensionMismatch(a, b) => {
                write!(f, "dimension mismatch ({a} vs {b})")
            }
            Error::OutOfBounds(idx, len) => {
                write!(f, "index {idx} out of bounds (length {len})")
            }
            Error::MaxIterations(n) => {
                write!(f, "max iterations reached ({n} attempts)")
            }
            Error::Cancelled => write!(f, "computation cancelled"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
