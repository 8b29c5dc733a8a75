//! The input graph: an ordered list of undirected edges.
//!
//! The edge order is fixed by the input file and defines the ZDD levels:
//! edge `k` is decided at level `E - k`, so the first edge of the file sits
//! at the root. Parallel edges are permitted and distinguished by index.

use std::path::Path;

use crate::error::Error;

/// An immutable, edge-ordered multigraph over vertices `0..vertex_count`.
#[derive(Debug, Clone)]
pub struct Graph {
    edges: Vec<(u32, u32)>,
    vertex_count: usize,
}

impl Graph {
    /// Builds a graph from an explicit edge list. Intended for tests and
    /// programmatic construction; files go through [`Graph::from_path`].
    pub fn from_edges(edges: Vec<(u32, u32)>) -> Self {
        let vertex_count = edges
            .iter()
            .map(|&(u, v)| u.max(v) as usize + 1)
            .max()
            .unwrap_or(0);
        Self { edges, vertex_count }
    }

    /// Reads an edge list from a text file: one `u v` pair per line, in the
    /// intended ZDD edge order, whitespace-separated, no header.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parses edge-list text. `path` is used for error reporting only.
    pub fn parse(text: &str, path: &Path) -> Result<Self, Error> {
        let mut edges = Vec::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let u = parse_vertex(tokens.next(), path, lineno + 1)?;
            let v = parse_vertex(tokens.next(), path, lineno + 1)?;
            if tokens.next().is_some() {
                return Err(Error::GraphParse {
                    path: path.to_path_buf(),
                    line: lineno + 1,
                    msg: "expected exactly two vertex identifiers".to_string(),
                });
            }
            edges.push((u, v));
        }

        if edges.is_empty() {
            return Err(Error::EmptyGraph {
                path: path.to_path_buf(),
            });
        }

        Ok(Self::from_edges(edges))
    }

    /// Number of vertices (one more than the largest identifier).
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Endpoints of edge `index`, in input order.
    pub fn endpoints(&self, index: usize) -> (u32, u32) {
        self.edges[index]
    }

    /// All edges, in input order.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }
}

fn parse_vertex(token: Option<&str>, path: &Path, line: usize) -> Result<u32, Error> {
    let token = token.ok_or_else(|| Error::GraphParse {
        path: path.to_path_buf(),
        line,
        msg: "expected exactly two vertex identifiers".to_string(),
    })?;
    token.parse::<u32>().map_err(|_| Error::GraphParse {
        path: path.to_path_buf(),
        line,
        msg: format!("invalid vertex identifier {:?}", token),
    })
}
