//! Dependency manifest (`requirements.txt`) model.
//!
//! Only the requirement-specifier subset of the pip format is accepted:
//! `name[extra,...] <op>version[,<op>version] ; marker`. pip options (`-r`,
//! `--index-url`, ...) and direct URL references are rejected so the
//! manifest stays a plain, ordered package list.

use crate::error::{ManifestError, RequirementError};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn requirement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<spec>(?:===|==|!=|<=|>=|~=|<|>)[^;]*)?(?:;\s*(?P<marker>.*))?$",
        )
        .expect("requirement regex is valid")
    })
}

fn clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:===|==|!=|<=|>=|~=|<|>)\s*[A-Za-z0-9.*+!_-]+$")
            .expect("version clause regex is valid")
    })
}

fn extra_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("extra name regex is valid")
    })
}

/// One package entry: name plus optional version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    /// Comma-separated specifier clauses with whitespace removed, e.g. `>=3.0,<4`
    pub version: Option<String>,
    pub marker: Option<String>,
}

impl Requirement {
    /// PEP 503 normalized name (`Bokeh_Plot` → `bokeh-plot`).
    pub fn normalized_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut last_sep = false;
        for c in self.name.chars() {
            if matches!(c, '-' | '_' | '.') {
                if !last_sep {
                    out.push('-');
                }
                last_sep = true;
            } else {
                out.extend(c.to_lowercase());
                last_sep = false;
            }
        }
        out
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(ref v) = self.version {
            f.write_str(v)?;
        }
        if let Some(ref m) = self.marker {
            write!(f, "; {}", m)?;
        }
        Ok(())
    }
}

/// Ordered list of requirements read from the manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub path: PathBuf,
    pub requirements: Vec<Requirement>,
}

impl Manifest {
    /// Read and validate the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ManifestError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let requirements = parse_requirements(&content).map_err(|source| ManifestError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            requirements,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// SHA-256 over the canonical requirement list. Comment and whitespace
    /// edits do not change it; any change to a package entry does.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        for req in &self.requirements {
            hasher.update(req.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// Parse manifest text into requirements, preserving order.
pub fn parse_requirements(content: &str) -> Result<Vec<Requirement>, RequirementError> {
    let mut requirements = Vec::new();
    let mut seen = HashSet::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let err = |reason: &str| RequirementError {
            line: idx + 1,
            content: line.to_string(),
            reason: reason.to_string(),
        };

        if line.starts_with('-') {
            return Err(err("pip options are not supported in the manifest"));
        }
        let req = parse_line(line).map_err(|reason| err(&reason))?;
        if !seen.insert(req.normalized_name()) {
            return Err(err("package listed more than once"));
        }
        requirements.push(req);
    }
    Ok(requirements)
}

/// Drop a `#` comment that starts the line or follows whitespace.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            return &line[..i];
        }
    }
    line
}

fn parse_line(line: &str) -> Result<Requirement, String> {
    let caps = requirement_re()
        .captures(line)
        .ok_or_else(|| "expected `name[extras] <op>version ; marker`".to_string())?;

    let name = caps["name"].to_string();

    let extras = match caps.name("extras") {
        Some(m) => {
            let mut extras = Vec::new();
            for e in m.as_str().split(',').map(str::trim).filter(|e| !e.is_empty()) {
                if !extra_re().is_match(e) {
                    return Err(format!("invalid extra '{}'", e));
                }
                extras.push(e.to_string());
            }
            extras
        }
        None => Vec::new(),
    };

    let version = match caps.name("spec") {
        Some(m) => {
            let mut clauses = Vec::new();
            for clause in m.as_str().split(',').map(str::trim) {
                if !clause_re().is_match(clause) {
                    return Err(format!("invalid version clause '{}'", clause));
                }
                clauses.push(clause.split_whitespace().collect::<String>());
            }
            Some(clauses.join(","))
        }
        None => None,
    };

    let marker = match caps.name("marker") {
        Some(m) if m.as_str().trim().is_empty() => {
            return Err("empty environment marker".to_string())
        }
        Some(m) => Some(m.as_str().trim().to_string()),
        None => None,
    };

    Ok(Requirement {
        name,
        extras,
        version,
        marker,
    })
}
