//! Reads DIMACS-like `.col` edge lists and `.col.w` weight files, producing
//! a [`Graph`](crate::graph::Graph).
//!
//! Grammar: `p edge N M` (also accepts the `p col N M` variant some instance
//! sets use), then `e u v` lines (1-based endpoints, converted to 0-based),
//! with `c ...` comment lines and blank lines skipped anywhere.

use std::fs;

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_until};
use nom::character::complete::digit1;
use nom::error::Error as NomError;
use nom::IResult;

use crate::error::{Result, WvcpError};
use crate::graph::Graph;

/// Reads `<name>.col` and, for `wvcp`, `<name>.col.w`; validates the sort
/// contract (the loader does not re-sort) and builds a [`Graph`]. For `gcp`
/// every weight defaults to 1 and the `.col.w` file is never read.
pub fn load_instance(col_path: &str, weight_path: &str, wvcp: bool) -> Result<Graph> {
    let (n, _m, adj_list) = read_edge_list(col_path)?;
    let weight = if wvcp { read_weights(weight_path, n)? } else { vec![1; n] };
    let name = std::path::Path::new(col_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| col_path.to_string());
    let graph = Graph::new(name, adj_list, weight);
    if !graph.check_sorted_contract() {
        log::warn!(
            "instance {} is not sorted in non-increasing (weight, degree) order; \
             initializers that rely on this contract may produce sub-optimal seeds",
            col_path
        );
    }
    Ok(graph)
}

/// Reads the `.col` file; returns `(n, m, adjacency list)`.
pub fn read_edge_list(path: &str) -> Result<(usize, usize, Vec<Vec<usize>>)> {
    let contents = fs::read_to_string(path)
        .map_err(|source| WvcpError::Io { path: path.to_string(), source })?
        .replace('\r', "");
    let cleaned = skip_comments(&contents).map(|(rest, _)| rest).unwrap_or(&contents);
    let (mut rest, (n, m)) = read_header(cleaned).map_err(|e| WvcpError::DimacsParse {
        path: path.to_string(),
        reason: format!("could not parse 'p edge N M' header: {:?}", e),
    })?;
    let mut adj_list = vec![Vec::new(); n];
    let mut read_edges = 0usize;
    loop {
        match read_edge(rest) {
            Ok((tail, (a, b))) => {
                if a == 0 || b == 0 || a > n || b > n {
                    return Err(WvcpError::DimacsParse {
                        path: path.to_string(),
                        reason: format!("edge ({}, {}) out of range 1..={}", a, b, n),
                    });
                }
                adj_list[a - 1].push(b - 1);
                adj_list[b - 1].push(a - 1);
                read_edges += 1;
                rest = tail;
            }
            Err(_) => break,
        }
    }
    if read_edges != m {
        return Err(WvcpError::DimacsParse {
            path: path.to_string(),
            reason: format!("header declared {} edges, found {}", m, read_edges),
        });
    }
    Ok((n, m, adj_list))
}

/// Reads a whitespace-separated list of `n` positive integer weights.
pub fn read_weights(path: &str, n: usize) -> Result<Vec<u32>> {
    let contents =
        fs::read_to_string(path).map_err(|source| WvcpError::Io { path: path.to_string(), source })?;
    let mut weights = Vec::with_capacity(n);
    for token in contents.split_whitespace() {
        let w: u32 = token.parse().map_err(|_| WvcpError::InvalidWeight {
            path: path.to_string(),
            reason: format!("{:?} is not a positive integer", token),
        })?;
        if w == 0 {
            return Err(WvcpError::InvalidWeight {
                path: path.to_string(),
                reason: "vertex weights must be strictly positive".to_string(),
            });
        }
        weights.push(w);
    }
    if weights.len() != n {
        return Err(WvcpError::WeightFileLength { path: path.to_string(), found: weights.len(), expected: n });
    }
    Ok(weights)
}

/// skips a single `c ...` comment line
fn skip_comment(s: &str) -> IResult<&str, &str> {
    let (remaining, _) = tag("c")(s)?;
    let (remaining2, _) = take_until("\n")(remaining)?;
    take(1usize)(remaining2)
}

/// skips all leading comments
fn skip_comments(s: &str) -> IResult<&str, Vec<&str>> {
    nom::multi::many0(skip_comment)(s)
}

/// reads two whitespace-separated integers, consuming a trailing newline if present
fn read_two_integers(s: &str) -> IResult<&str, (usize, usize)> {
    let (rest1, s1) = digit1(s)?;
    let n1: usize = s1.parse().expect("digit1 guarantees a valid integer");
    let (rest2, _) = take(1usize)(rest1)?;
    let (rest3, s2) = digit1(rest2)?;
    let n2: usize = s2.parse().expect("digit1 guarantees a valid integer");
    match rest3.as_bytes().first() {
        Some(b) if nom::character::is_newline(*b) => {
            let (rest4, _) = take::<usize, &str, NomError<&str>>(1usize)(rest3)?;
            Ok((rest4, (n1, n2)))
        }
        _ => Ok((rest3, (n1, n2))),
    }
}

/// reads the `p edge N M` / `p col N M` header
fn read_header(s: &str) -> IResult<&str, (usize, usize)> {
    let (remaining, _) = alt((tag("p edge "), tag("p col ")))(s)?;
    read_two_integers(remaining)
}

/// reads a single `e u v` edge line (1-based endpoints)
fn read_edge(s: &str) -> IResult<&str, (usize, usize)> {
    let (remaining, _) = tag("e ")(s)?;
    read_two_integers(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str, suffix: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("wvcp-test-{}-{}-{}", std::process::id(), unique(), suffix));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn unique() -> u128 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos()
    }

    #[test]
    fn parses_header_and_edges() {
        let s = "c a comment\np edge 4 3\ne 1 2\ne 2 3\ne 3 4\n";
        let path = write_temp(s, "basic.col");
        let (n, m, adj) = read_edge_list(path.to_str().unwrap()).unwrap();
        assert_eq!((n, m), (4, 3));
        assert_eq!(adj[0], vec![1]);
        assert_eq!(adj[1], vec![0, 2]);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_edge_count_mismatch() {
        let s = "p edge 2 2\ne 1 2\n";
        let path = write_temp(s, "mismatch.col");
        assert!(read_edge_list(path.to_str().unwrap()).is_err());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn reads_weights() {
        let path = write_temp("3 2 1\n", "weights.col.w");
        let w = read_weights(path.to_str().unwrap(), 3).unwrap();
        assert_eq!(w, vec![3, 2, 1]);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_zero_weight() {
        let path = write_temp("3 0 1\n", "zero.col.w");
        assert!(read_weights(path.to_str().unwrap(), 3).is_err());
        let _ = fs::remove_file(path);
    }
}
