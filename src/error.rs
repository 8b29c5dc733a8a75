use std::fmt;
use std::path::PathBuf;

/// Error type for loading inputs and configuring a run.
///
/// Pruning inside a ZDD specification is *not* an error: it is the normal
/// mechanism by which non-solutions are filtered out. Everything here is
/// fatal and surfaces at the caller of the offending operation.
#[derive(Debug)]
pub enum Error {
    /// An input file could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// A malformed line in the edge-list file.
    GraphParse { path: PathBuf, line: usize, msg: String },
    /// A malformed line in the MOPE list (JSON-Lines).
    MopeParse { path: PathBuf, line: usize, msg: String },
    /// A malformed or inconsistent automorphism list.
    AutomorphismParse { path: PathBuf, msg: String },
    /// The graph has more edges than the widest configured bitmask.
    UnsupportedWidth { edges: usize, max: usize },
    /// The edge list contains no edges.
    EmptyGraph { path: PathBuf },
    /// `--split-depth` out of range for this graph.
    InvalidSplitDepth { depth: u32, edges: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            Error::GraphParse { path, line, msg } => {
                write!(f, "{}:{}: {}", path.display(), line, msg)
            }
            Error::MopeParse { path, line, msg } => {
                write!(f, "{}:{}: {}", path.display(), line, msg)
            }
            Error::AutomorphismParse { path, msg } => {
                write!(f, "{}: {}", path.display(), msg)
            }
            Error::UnsupportedWidth { edges, max } => {
                write!(
                    f,
                    "edge count {} exceeds the maximum supported width ({}); a {}-bit mask would be required",
                    edges,
                    max,
                    edges.next_multiple_of(64)
                )
            }
            Error::EmptyGraph { path } => {
                write!(f, "{}: edge list is empty", path.display())
            }
            Error::InvalidSplitDepth { depth, edges } => {
                write!(f, "split depth {} must be at most 30 and less than the edge count ({})", depth, edges)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
