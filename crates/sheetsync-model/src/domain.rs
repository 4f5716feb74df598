//! Record filters in prefix notation
//!
//! A [`Domain`] is a flat list of terms: the operators `&`, `|`, `!` and
//! leaf conditions `(field, operator, value)`. Top-level expressions that are
//! not joined by an operator are implicitly AND-ed. The empty domain matches
//! every record.
//!
//! ```text
//! ["&", ["stage", "=", "won"], "|", ["amount", ">", 10], ["vip", "=", true]]
//! ```

use crate::error::DomainError;
use crate::record::{many2one_id, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a leaf condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `like`, case-sensitive substring
    Like,
    /// `ilike`, case-insensitive substring
    ILike,
}

impl Operator {
    /// Wire form of the operator
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Like => "like",
            Self::ILike => "ilike",
        }
    }
}

impl FromStr for Operator {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::Ne),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            "in" => Ok(Self::In),
            "not in" => Ok(Self::NotIn),
            "like" => Ok(Self::Like),
            "ilike" => Ok(Self::ILike),
            other => Err(DomainError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf condition `(field, operator, value)`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Field name
    pub field: String,
    /// Operator
    pub operator: Operator,
    /// Right-hand side
    pub value: Value,
}

impl Condition {
    /// Create condition
    #[must_use]
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluate against a record; a missing field reads as `false`
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let raw = record.get(&self.field).unwrap_or(&Value::Bool(false));
        if let Some(ids) = as_id_list(raw) {
            return self.matches_id_list(&ids);
        }
        let lhs = many2one_id(raw).map_or_else(|| raw.clone(), |id| Value::from(id.0));

        match self.operator {
            Operator::Eq => values_equal(&lhs, &self.value),
            Operator::Ne => !values_equal(&lhs, &self.value),
            Operator::In => rhs_list(&self.value).iter().any(|v| values_equal(&lhs, v)),
            Operator::NotIn => !rhs_list(&self.value).iter().any(|v| values_equal(&lhs, v)),
            Operator::Gt => compare(&lhs, &self.value) == Some(Ordering::Greater),
            Operator::Ge => matches!(
                compare(&lhs, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => compare(&lhs, &self.value) == Some(Ordering::Less),
            Operator::Le => matches!(
                compare(&lhs, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Like => match (lhs.as_str(), self.value.as_str()) {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
            Operator::ILike => match (lhs.as_str(), self.value.as_str()) {
                (Some(haystack), Some(needle)) => {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
        }
    }

    // x2many values match when any related id matches
    fn matches_id_list(&self, ids: &[i64]) -> bool {
        let wanted = rhs_list(&self.value);
        let hit = ids
            .iter()
            .any(|id| wanted.iter().any(|v| values_equal(&Value::from(*id), v)));
        match self.operator {
            Operator::Eq | Operator::In => hit,
            Operator::Ne | Operator::NotIn => !hit,
            _ => false,
        }
    }
}

/// One term of a prefix-notation domain
#[derive(Debug, Clone, PartialEq)]
pub enum DomainTerm {
    /// `&`, binary
    And,
    /// `|`, binary
    Or,
    /// `!`, unary
    Not,
    /// Leaf condition
    Leaf(Condition),
}

impl DomainTerm {
    /// Net effect on the number of pending expressions
    fn arity_delta(&self) -> i64 {
        match self {
            Self::And | Self::Or => -1,
            Self::Not => 0,
            Self::Leaf(_) => 1,
        }
    }
}

/// Prefix-notation record filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Domain(Vec<DomainTerm>);

impl Domain {
    /// Create domain from terms
    #[inline]
    #[must_use]
    pub fn new(terms: Vec<DomainTerm>) -> Self {
        Self(terms)
    }

    /// Domain with a single condition
    #[must_use]
    pub fn leaf(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self(vec![DomainTerm::Leaf(Condition::new(field, operator, value))])
    }

    /// Terms in prefix order
    #[inline]
    #[must_use]
    pub fn terms(&self) -> &[DomainTerm] {
        &self.0
    }

    /// Whether this domain matches everything
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level expressions (implicitly AND-ed)
    #[must_use]
    pub fn expression_count(&self) -> usize {
        let count: i64 = self.0.iter().map(DomainTerm::arity_delta).sum();
        usize::try_from(count).unwrap_or(0)
    }

    /// Same filter with the implicit AND made explicit
    #[must_use]
    pub fn normalized(&self) -> Self {
        let count = self.expression_count();
        if count <= 1 {
            return self.clone();
        }
        let mut terms = vec![DomainTerm::And; count - 1];
        terms.extend(self.0.iter().cloned());
        Self(terms)
    }

    /// Conjunction of `domains`; empty domains are neutral
    #[must_use]
    pub fn and<'a, I>(domains: I) -> Self
    where
        I: IntoIterator<Item = &'a Domain>,
    {
        let parts: Vec<Domain> = domains
            .into_iter()
            .filter(|d| !d.is_empty())
            .map(Domain::normalized)
            .collect();
        match parts.len() {
            0 => Self::default(),
            1 => parts.into_iter().next().unwrap_or_default(),
            n => {
                let mut terms = vec![DomainTerm::And; n - 1];
                for part in parts {
                    terms.extend(part.0);
                }
                Self(terms)
            }
        }
    }

    /// Evaluate against a record
    ///
    /// # Errors
    /// Returns [`DomainError::Malformed`] if operators lack operands
    pub fn matches(&self, record: &Record) -> Result<bool, DomainError> {
        let mut pos = 0;
        let mut result = true;
        while pos < self.0.len() {
            let value = eval(&self.0, &mut pos, record)?;
            result = result && value;
        }
        Ok(result)
    }
}

impl From<Vec<DomainTerm>> for Domain {
    fn from(terms: Vec<DomainTerm>) -> Self {
        Self(terms)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::from(self.clone()))
    }
}

fn eval(terms: &[DomainTerm], pos: &mut usize, record: &Record) -> Result<bool, DomainError> {
    let term = terms
        .get(*pos)
        .ok_or_else(|| DomainError::Malformed("operator is missing an operand".to_string()))?;
    *pos += 1;
    match term {
        DomainTerm::And => {
            let left = eval(terms, pos, record)?;
            let right = eval(terms, pos, record)?;
            Ok(left && right)
        }
        DomainTerm::Or => {
            let left = eval(terms, pos, record)?;
            let right = eval(terms, pos, record)?;
            Ok(left || right)
        }
        DomainTerm::Not => Ok(!eval(terms, pos, record)?),
        DomainTerm::Leaf(condition) => Ok(condition.matches(record)),
    }
}

fn as_id_list(value: &Value) -> Option<Vec<i64>> {
    let items = value.as_array()?;
    // [id, "name"] is a many2one, not a list of ids
    if items.len() == 2 && items[1].is_string() {
        return None;
    }
    items.iter().map(Value::as_i64).collect()
}

fn rhs_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl TryFrom<Value> for Domain {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Array(items) = value else {
            return Err(DomainError::Malformed(format!("expected a list, got {value}")));
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::String(op) => match op.as_str() {
                    "&" => Ok(DomainTerm::And),
                    "|" => Ok(DomainTerm::Or),
                    "!" => Ok(DomainTerm::Not),
                    _ => Err(DomainError::MalformedTerm(op)),
                },
                Value::Array(mut parts) if parts.len() == 3 => {
                    let value = parts.pop().unwrap_or(Value::Null);
                    let operator = match parts.pop() {
                        Some(Value::String(op)) => op.parse::<Operator>()?,
                        other => {
                            return Err(DomainError::MalformedTerm(format!("{other:?}")));
                        }
                    };
                    let field = match parts.pop() {
                        Some(Value::String(field)) => field,
                        other => {
                            return Err(DomainError::MalformedTerm(format!("{other:?}")));
                        }
                    };
                    Ok(DomainTerm::Leaf(Condition {
                        field,
                        operator,
                        value,
                    }))
                }
                other => Err(DomainError::MalformedTerm(other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<Domain> for Value {
    fn from(domain: Domain) -> Self {
        Value::Array(
            domain
                .0
                .into_iter()
                .map(|term| match term {
                    DomainTerm::And => Value::from("&"),
                    DomainTerm::Or => Value::from("|"),
                    DomainTerm::Not => Value::from("!"),
                    DomainTerm::Leaf(c) => Value::Array(vec![
                        Value::from(c.field),
                        Value::from(c.operator.as_str()),
                        c.value,
                    ]),
                })
                .collect(),
        )
    }
}
