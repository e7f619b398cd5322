// Label selectors
//
// Grammar (comma-joined requirements):
//   key=value  key==value  key!=value
//   key in (a,b)  key notin (a,b)
//   key  !key
// The empty selector matches every label set.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length of a label key or value
const MAX_LABEL_LENGTH: usize = 317;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty requirement in selector")]
    EmptyRequirement,

    #[error("invalid label key '{0}'")]
    InvalidKey(String),

    #[error("invalid label value '{0}'")]
    InvalidValue(String),

    #[error("malformed requirement '{0}'")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// One clause of a selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub operator: Operator,
    pub values: Vec<String>,
}

impl Requirement {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::Equals => value == self.values.first(),
            Operator::NotEquals => value != self.values.first(),
            Operator::In => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotIn => value.map_or(true, |v| !self.values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.values.first().map(String::as_str).unwrap_or_default();
        match self.operator {
            Operator::Equals => write!(f, "{}={}", self.key, first),
            Operator::NotEquals => write!(f, "{}!={}", self.key, first),
            Operator::In => write!(f, "{} in ({})", self.key, self.values.join(",")),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, self.values.join(",")),
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

/// Conjunction of requirements over an instance's labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    /// Selector matching everything
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::everything());
        }

        let requirements = split_top_level(input)?
            .into_iter()
            .map(parse_requirement)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { requirements })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// True when every requirement holds
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", requirement)?;
        }
        Ok(())
    }
}

impl FromStr for LabelSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split on commas that are not inside a value list
fn split_top_level(input: &str) -> Result<Vec<&str>, SelectorError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SelectorError::Malformed(input.to_string()))?;
            }
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(SelectorError::Malformed(input.to_string()));
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn parse_requirement(term: &str) -> Result<Requirement, SelectorError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(SelectorError::EmptyRequirement);
    }

    if let Some(key) = term.strip_prefix('!') {
        return Ok(Requirement {
            key: validate_key(key.trim())?,
            operator: Operator::DoesNotExist,
            values: Vec::new(),
        });
    }

    if let Some(open) = term.find('(') {
        return parse_set_requirement(term, open);
    }

    let (key, operator, value) = if let Some((k, v)) = term.split_once("!=") {
        (k, Operator::NotEquals, v)
    } else if let Some((k, v)) = term.split_once("==") {
        (k, Operator::Equals, v)
    } else if let Some((k, v)) = term.split_once('=') {
        (k, Operator::Equals, v)
    } else {
        return Ok(Requirement {
            key: validate_key(term)?,
            operator: Operator::Exists,
            values: Vec::new(),
        });
    };

    Ok(Requirement {
        key: validate_key(key.trim())?,
        operator,
        values: vec![validate_value(value.trim())?],
    })
}

fn parse_set_requirement(term: &str, open: usize) -> Result<Requirement, SelectorError> {
    let malformed = || SelectorError::Malformed(term.to_string());

    let inner = term[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
    let mut head = term[..open].split_whitespace();
    let (key, op) = match (head.next(), head.next(), head.next()) {
        (Some(key), Some(op), None) => (key, op),
        _ => return Err(malformed()),
    };
    let operator = match op {
        "in" => Operator::In,
        "notin" => Operator::NotIn,
        _ => return Err(malformed()),
    };

    let values = inner
        .split(',')
        .map(|v| validate_value(v.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    if values.iter().all(String::is_empty) {
        return Err(malformed());
    }

    Ok(Requirement {
        key: validate_key(key)?,
        operator,
        values,
    })
}

fn validate_key(key: &str) -> Result<String, SelectorError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_LABEL_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if valid {
        Ok(key.to_string())
    } else {
        Err(SelectorError::InvalidKey(key.to_string()))
    }
}

fn validate_value(value: &str) -> Result<String, SelectorError> {
    let valid = value.len() <= MAX_LABEL_LENGTH
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(value.to_string())
    } else {
        Err(SelectorError::InvalidValue(value.to_string()))
    }
}
