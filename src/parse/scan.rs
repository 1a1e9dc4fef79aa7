use std::path::{Path, PathBuf};

use super::{ParseError, parse_file};
use crate::core::Invoice;

/// Lazy directory source: lists matching files up front and parses one
/// file per [`next`](Iterator::next).
///
/// Files are visited in name order. Only regular files directly inside the
/// directory are considered.
#[derive(Debug)]
pub struct InvoiceSource {
    files: std::vec::IntoIter<PathBuf>,
}

impl InvoiceSource {
    /// List files in `dir` whose names match `pattern` (`*` and `?`
    /// wildcards).
    pub fn scan(dir: &Path, pattern: &str) -> Result<Self, ParseError> {
        if !dir.is_dir() {
            return Err(ParseError::NotFound(dir.to_path_buf()));
        }
        let entries = std::fs::read_dir(dir).map_err(|source| ParseError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ParseError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let matched = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| wildcard_match(pattern, name));
            if matched && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        tracing::debug!(
            dir = %dir.display(),
            pattern,
            files = files.len(),
            "scanned invoice directory"
        );
        Ok(Self {
            files: files.into_iter(),
        })
    }

    /// Files not yet parsed.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.len() == 0
    }

    /// Successfully parsed invoices only; failures are logged and skipped.
    pub fn invoices(self) -> impl Iterator<Item = Invoice> {
        self.filter_map(|item| match item {
            Ok(invoice) => Some(invoice),
            Err(e) => {
                tracing::error!(error = %e, "failed to parse invoice file");
                None
            }
        })
    }
}

impl Iterator for InvoiceSource {
    type Item = Result<Invoice, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.files.next().map(|path| parse_file(&path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.files.size_hint()
    }
}

/// Shell-style match supporting `*` (any run) and `?` (any one char).
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ni));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ni = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}
