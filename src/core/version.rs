//! Version constraints and numeric version tuples.
//!
//! A project definition can restrict the acceptable upstream versions with
//! a constraint such as `>=20150409`, `>=1.0,<2.0` or `==3.2.1`. At most two
//! clauses are supported and the second one must be an upper bound.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Comparison operator of a version clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionOperator {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
}

impl VersionOperator {
    /// Get the operator as written in a constraint.
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionOperator::Less => "<",
            VersionOperator::LessEqual => "<=",
            VersionOperator::Greater => ">",
            VersionOperator::GreaterEqual => ">=",
            VersionOperator::Equal => "==",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(VersionOperator::Less),
            "<=" => Some(VersionOperator::LessEqual),
            ">" => Some(VersionOperator::Greater),
            ">=" => Some(VersionOperator::GreaterEqual),
            "==" => Some(VersionOperator::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for VersionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{operator}{version}` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionClause {
    pub operator: VersionOperator,
    pub parts: Vec<u64>,
}

impl VersionClause {
    /// The version of the clause joined with `.`.
    pub fn version(&self) -> String {
        self.parts
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Check whether a version tuple satisfies the clause.
    pub fn matches(&self, version: &[u64]) -> bool {
        let bound = self.parts.as_slice();
        match self.operator {
            VersionOperator::Less => version < bound,
            VersionOperator::LessEqual => version <= bound,
            VersionOperator::Greater => version > bound,
            VersionOperator::GreaterEqual => version >= bound,
            VersionOperator::Equal => version == bound,
        }
    }
}

impl fmt::Display for VersionClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version())
    }
}

static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(<=?|>=?|==)([0-9]+)\.?([0-9]+|)\.?([0-9]+|)[.-]?([0-9]+|)$").unwrap()
});

fn parse_clause(s: &str) -> Option<VersionClause> {
    let captures = CLAUSE_RE.captures(s)?;
    let operator = VersionOperator::parse(captures.get(1)?.as_str())?;

    let mut parts = Vec::new();
    for index in 2..=5 {
        let Some(group) = captures.get(index) else {
            continue;
        };
        if group.as_str().is_empty() {
            continue;
        }
        parts.push(group.as_str().parse().ok()?);
    }

    Some(VersionClause { operator, parts })
}

/// Version requirements of a project.
///
/// Malformed constraints are logged and treated as unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectVersionDefinition {
    clauses: Vec<VersionClause>,
    version_string: Option<String>,
}

impl ProjectVersionDefinition {
    /// Parse a constraint string.
    pub fn new(version_string: &str) -> Self {
        if version_string.is_empty() {
            return Self::default();
        }

        let parts: Vec<&str> = version_string.split(',').collect();
        if parts.len() > 2 {
            tracing::warn!("Unsupported version string: {}", version_string);
            return Self::default();
        }

        let mut clauses = Vec::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            if index == 1 && !part.starts_with('<') {
                tracing::warn!("Unsupported version string part: {}", part);
                return Self::default();
            }

            match parse_clause(part) {
                Some(clause) => clauses.push(clause),
                None => {
                    tracing::warn!("Unsupported version string part: {}", part);
                    return Self::default();
                }
            }
        }

        ProjectVersionDefinition {
            clauses,
            version_string: Some(version_string.to_string()),
        }
    }

    /// The constraint string, if it was accepted.
    pub fn version_string(&self) -> Option<&str> {
        self.version_string.as_deref()
    }

    /// The first clause, usually the lower bound or a pin.
    pub fn earliest_version(&self) -> Option<&VersionClause> {
        self.clauses.first()
    }

    /// The second clause, which is always an upper bound.
    pub fn latest_version(&self) -> Option<&VersionClause> {
        self.clauses.get(1)
    }

    /// Whether no constraint applies.
    pub fn is_unconstrained(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Split a version string into its numeric parts.
///
/// `.` and `-` are equivalent separators. Returns `None` if a part is not
/// numeric.
pub fn version_tuple(version: &str) -> Option<Vec<u64>> {
    version
        .split(['.', '-'])
        .map(|part| part.parse::<u64>().ok())
        .collect()
}
