// Copyright 2023 Rémy Oudompheng. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Text format for X-program files.
//!
//! ```text
//! nr = 103
//! nc = 53
//! 0 1 1 0 ...
//! ...
//! =====
//! ```
//!
//! The file lists the abstract program rows; in memory the matrix is
//! kept transposed (file row i becomes column i) because the solver
//! only ever walks whole program rows. Headers carry the value after
//! five characters; anything after the last data row is ignored.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::matrix::BitMat;
use crate::Error;

pub fn read_program(path: &Path) -> Result<BitMat, Error> {
    let text = fs::read_to_string(path)?;
    parse_program(&text)
}

pub fn parse_program(text: &str) -> Result<BitMat, Error> {
    let mut lines = text.lines();
    let nr = header_value(lines.next(), "nr")?;
    let nc = header_value(lines.next(), "nc")?;
    let mut m = BitMat::zeros(nc, nr);
    for i in 0..nr {
        let line = lines
            .next()
            .ok_or_else(|| Error::Parse(format!("missing data row {}", i + 1)))?;
        let mut count = 0;
        for tok in line.split_whitespace() {
            if count >= nc {
                return Err(Error::Parse(format!(
                    "data row {} has more than {nc} entries",
                    i + 1
                )));
            }
            match tok {
                "0" => {}
                "1" => m.set_unchecked(count, i, true),
                _ => {
                    return Err(Error::Parse(format!(
                        "invalid entry {tok:?} in data row {}",
                        i + 1
                    )))
                }
            }
            count += 1;
        }
        if count != nc {
            return Err(Error::Parse(format!(
                "data row {} has {count} entries, expected {nc}",
                i + 1
            )));
        }
    }
    Ok(m)
}

fn header_value(line: Option<&str>, name: &str) -> Result<usize, Error> {
    let line = line.ok_or_else(|| Error::Parse(format!("missing {name} header")))?;
    let value = match line.get(5..) {
        Some(v) if line.starts_with(name) => v,
        _ => return Err(Error::Parse(format!("malformed header {line:?}"))),
    };
    value
        .trim()
        .parse()
        .map_err(|_| Error::Parse(format!("malformed header {line:?}")))
}

pub fn write_program(path: &Path, m: &BitMat) -> Result<(), Error> {
    fs::write(path, format_program(m))?;
    Ok(())
}

pub fn format_program(m: &BitMat) -> String {
    let mut out = String::new();
    // Emitted headers describe the abstract program, so rows and
    // columns swap roles.
    let _ = writeln!(out, "nr = {}", m.cols());
    let _ = writeln!(out, "nc = {}", m.rows());
    for j in 0..m.cols() {
        for i in 0..m.rows() {
            out.push(if m.get_unchecked(i, j) { '1' } else { '0' });
            out.push(' ');
        }
        out.push('\n');
    }
    out.push_str("=====\n\n");
    out
}

#[test]
fn test_parse_transposed() {
    let text = "nr = 2\nnc = 3\n1 0 1 \n0 1 1 \n=====\n\n";
    let m = parse_program(text).unwrap();
    assert_eq!(m.rows(), 3);
    assert_eq!(m.cols(), 2);
    // File row 0 is column 0 of the matrix.
    assert_eq!(m.get(0, 0).unwrap(), true);
    assert_eq!(m.get(1, 0).unwrap(), false);
    assert_eq!(m.get(2, 0).unwrap(), true);
    assert_eq!(m.get(1, 1).unwrap(), true);
}

#[test]
fn test_parse_errors() {
    assert!(parse_program("").is_err());
    assert!(parse_program("nr = x\nnc = 3\n").is_err());
    assert!(parse_program("rows = 1\nnc = 3\n1 1 1 \n").is_err());
    // Truncated data.
    assert!(parse_program("nr = 2\nnc = 3\n1 0 1 \n").is_err());
    // Bad entry.
    assert!(parse_program("nr = 1\nnc = 3\n1 2 1 \n").is_err());
    // Row too short / too long.
    assert!(parse_program("nr = 1\nnc = 3\n1 1 \n").is_err());
    assert!(parse_program("nr = 1\nnc = 3\n1 1 1 1 \n").is_err());
}

#[test]
fn test_trailing_lines_ignored() {
    let text = "nr = 1\nnc = 2\n1 0 \n=====\n\nnoise here\n";
    let m = parse_program(text).unwrap();
    assert_eq!((m.rows(), m.cols()), (2, 1));
}

#[test]
fn test_roundtrip() {
    use crate::matrix::BitVec;
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xBEEFCAFE);
    let mut m = BitMat::zeros(10, 5);
    for j in 0..5 {
        let c = BitVec::random(10, &mut rng);
        m.set_col(j, &c).unwrap();
    }
    let text = format_program(&m);
    assert!(text.ends_with("=====\n\n"));
    let m2 = parse_program(&text).unwrap();
    assert_eq!(m, m2);
}
