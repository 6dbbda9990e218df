//! Version predicates.
//!
//! A predicate is one or more alternatives separated by `||`; each alternative
//! is a whitespace-separated list of clauses that must all hold:
//!
//! ```text
//! >=1.17 <1.19            between 1.17 (inclusive) and 1.19 (exclusive)
//! 1.18.x || >=1.20        any 1.18 release, or 1.20 and newer
//! ~1.19.2                 >=1.19.2 within 1.19
//! ^0.15.3                 >=0.15.3 within 0.15
//! ```
//!
//! A clause is `<op><version>` where `<op>` is one of `= != > >= < <= ~ ^` and
//! defaults to `=`. The operand may end in a wildcard (`1.18.x`, `1.*`, `*`),
//! which stands for every version sharing the given numeric prefix. The empty
//! predicate matches everything.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use crate::descriptor::is_valid_identifier;
use crate::error::{ChiselResult, PredicateError};
use crate::version::{parse_version, AnyVersion, SemanticVersion};

const OPERATOR_CHARS: &[char] = &['<', '>', '=', '!', '~', '^'];

/// Comparison operator of a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// `~`: at least the operand, same major.minor.
    Tilde,
    /// `^`: at least the operand, same leftmost non-zero component.
    Caret,
}

impl Operator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "" | "=" => Self::Eq,
            "!=" => Self::Ne,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "<" => Self::Lt,
            "<=" => Self::Le,
            "~" => Self::Tilde,
            "^" => Self::Caret,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Tilde => "~",
            Self::Caret => "^",
        }
    }

    fn test_version(self, version: &SemanticVersion, target: &SemanticVersion) -> bool {
        match self {
            Self::Eq => version == target,
            Self::Ne => version != target,
            Self::Gt => version > target,
            Self::Ge => version >= target,
            Self::Lt => version < target,
            Self::Le => version <= target,
            Self::Tilde => {
                let components = target.components();
                let prefix = &components[..components.len().min(2)];
                version >= target && version.cmp_prefix(prefix) == Ordering::Equal
            }
            Self::Caret => {
                let components = target.components();
                let len = components
                    .iter()
                    .position(|c| *c != 0)
                    .map_or(components.len(), |i| i + 1);
                version >= target && version.cmp_prefix(&components[..len]) == Ordering::Equal
            }
        }
    }

    /// Apply the operator to the result of comparing a version with a
    /// wildcard prefix.
    fn test_prefix(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq | Self::Tilde | Self::Caret => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Right-hand side of a clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Version(SemanticVersion),
    /// Numeric prefix of a wildcard such as `1.18.x`; empty for `*`.
    Wildcard(Vec<u64>),
    /// Non-semantic identifier, only produced by lenient parsing.
    Text(String),
}

impl Operand {
    fn parse(clause: &str, operand: &str, lenient: bool) -> Result<Self, PredicateError> {
        if let Some(prefix) = parse_wildcard(operand) {
            return Ok(Self::Wildcard(prefix));
        }
        match parse_version(operand) {
            Ok(version) => Ok(Self::Version(version)),
            Err(_) if lenient && is_valid_identifier(operand) => {
                Ok(Self::Text(operand.to_string()))
            }
            Err(source) => Err(PredicateError::InvalidOperand {
                clause: clause.to_string(),
                source,
            }),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version(v) => v.fmt(f),
            Self::Wildcard(prefix) if prefix.is_empty() => f.write_str("*"),
            Self::Wildcard(prefix) => {
                for c in prefix {
                    write!(f, "{}.", c)?;
                }
                f.write_str("x")
            }
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// `1.18.x`, `1.*.*`, `*` → numeric prefix. `None` when not a wildcard.
fn parse_wildcard(operand: &str) -> Option<Vec<u64>> {
    let is_wild = |part: &str| matches!(part, "x" | "X" | "*");
    let parts: Vec<&str> = operand.split('.').collect();
    let first_wild = parts.iter().position(|p| is_wild(*p))?;
    if !parts[first_wild..].iter().all(|p| is_wild(*p)) {
        return None;
    }
    parts[..first_wild]
        .iter()
        .map(|p| {
            if p.bytes().all(|b| b.is_ascii_digit()) {
                p.parse::<u64>().ok()
            } else {
                None
            }
        })
        .collect()
}

/// One `<op><version>` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub operator: Operator,
    pub operand: Operand,
}

impl Clause {
    fn parse(text: &str, lenient: bool) -> Result<Self, PredicateError> {
        let split = text
            .find(|c: char| !OPERATOR_CHARS.contains(&c))
            .unwrap_or(text.len());
        let (symbol, operand) = text.split_at(split);

        let operator =
            Operator::from_symbol(symbol).ok_or_else(|| PredicateError::UnknownOperator {
                clause: text.to_string(),
                operator: symbol.to_string(),
            })?;
        if operand.is_empty() {
            return Err(PredicateError::MissingOperand {
                operator: operator.symbol().to_string(),
            });
        }

        Ok(Self {
            operator,
            operand: Operand::parse(text, operand, lenient)?,
        })
    }

    /// Whether `version` satisfies this clause.
    pub fn matches(&self, version: &SemanticVersion) -> bool {
        match &self.operand {
            Operand::Version(target) => self.operator.test_version(version, target),
            Operand::Wildcard(prefix) => self.operator.test_prefix(version.cmp_prefix(prefix)),
            Operand::Text(text) => match self.operator {
                Operator::Eq => version.to_string() == *text,
                Operator::Ne => version.to_string() != *text,
                _ => false,
            },
        }
    }

    /// Text versions only support `=` and `!=`; ordered operators never hold.
    pub fn matches_any(&self, version: &AnyVersion) -> bool {
        match version {
            AnyVersion::Semantic(v) => self.matches(v),
            AnyVersion::Text(text) => match (&self.operand, self.operator) {
                (Operand::Text(other), Operator::Eq) => other == text,
                (Operand::Text(other), Operator::Ne) => other != text,
                (_, Operator::Ne) => true,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.operand)
    }
}

/// A parsed predicate: OR of alternatives, each an AND of clauses.
///
/// Predicates hold no state and can be evaluated any number of times.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Predicate {
    alternatives: Vec<Vec<Clause>>,
}

impl Predicate {
    /// The predicate that matches every version.
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse a predicate with strictly semantic operands.
    ///
    /// # Examples
    ///
    /// ```
    /// use chisel_core::{Predicate, SemanticVersion};
    ///
    /// let range = Predicate::parse(">=1.17 <1.19").unwrap();
    /// assert!(range.evaluate(&SemanticVersion::parse("1.18.2").unwrap()));
    /// assert!(!range.evaluate(&SemanticVersion::parse("1.19.0").unwrap()));
    ///
    /// assert!(Predicate::parse("=>1.17").is_err());
    /// ```
    pub fn parse(expression: &str) -> Result<Self, PredicateError> {
        Self::parse_with(expression, false)
    }

    /// Parse a predicate whose operands may also be plain identifiers.
    pub fn parse_lenient(expression: &str) -> Result<Self, PredicateError> {
        Self::parse_with(expression, true)
    }

    fn parse_with(expression: &str, lenient: bool) -> Result<Self, PredicateError> {
        if expression.trim().is_empty() {
            return Ok(Self::any());
        }

        let alternatives = expression
            .split("||")
            .map(|alternative| {
                let clauses = parse_clauses(alternative, lenient)?;
                if clauses.is_empty() {
                    return Err(PredicateError::EmptyAlternative {
                        expression: expression.to_string(),
                    });
                }
                Ok(clauses)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { alternatives })
    }

    pub fn alternatives(&self) -> &[Vec<Clause>] {
        &self.alternatives
    }

    /// Whether `version` satisfies the predicate. Never fails once parsed.
    pub fn evaluate(&self, version: &SemanticVersion) -> bool {
        self.alternatives.is_empty()
            || self
                .alternatives
                .iter()
                .any(|clauses| clauses.iter().all(|c| c.matches(version)))
    }

    /// Like [`Predicate::evaluate`] for a version that may not be semantic.
    pub fn evaluate_any(&self, version: &AnyVersion) -> bool {
        self.alternatives.is_empty()
            || self
                .alternatives
                .iter()
                .any(|clauses| clauses.iter().all(|c| c.matches_any(version)))
    }
}

fn parse_clauses(alternative: &str, lenient: bool) -> Result<Vec<Clause>, PredicateError> {
    let mut tokens = alternative.split_whitespace();
    let mut clauses = Vec::new();

    while let Some(token) = tokens.next() {
        // A detached operator (`>= 1.17`) binds to the next token
        let text: Cow<'_, str> = if token.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            match tokens.next() {
                Some(operand) => Cow::Owned(format!("{}{}", token, operand)),
                None => {
                    return Err(PredicateError::MissingOperand {
                        operator: token.to_string(),
                    })
                }
            }
        } else {
            Cow::Borrowed(token)
        };
        clauses.push(Clause::parse(&text, lenient)?);
    }

    Ok(clauses)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clauses) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(" || ")?;
            }
            for (j, clause) in clauses.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                clause.fmt(f)?;
            }
        }
        Ok(())
    }
}

/// Parse a predicate. See [`Predicate::parse`].
pub fn parse_predicate(expression: &str) -> Result<Predicate, PredicateError> {
    Predicate::parse(expression)
}

/// Parse a predicate, accepting identifier operands. See [`Predicate::parse_lenient`].
pub fn parse_predicate_lenient(expression: &str) -> Result<Predicate, PredicateError> {
    Predicate::parse_lenient(expression)
}

/// Evaluate a parsed predicate against a version.
pub fn evaluate(predicate: &Predicate, version: &SemanticVersion) -> bool {
    predicate.evaluate(version)
}

/// Parse `version` and `predicate` and evaluate one against the other.
pub fn eval(version: &str, predicate: &str) -> ChiselResult<bool> {
    let version = parse_version(version)?;
    Ok(parse_predicate(predicate)?.evaluate(&version))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn holds(predicate: &str, version: &str) -> bool {
        parse_predicate(predicate).unwrap().evaluate(&v(version))
    }

    #[test]
    fn test_range() {
        assert!(holds(">=1.17 <1.19", "1.18.2"));
        assert!(!holds(">=1.17 <1.19", "1.19.0"));
        assert!(holds(">=1.17 <1.19", "1.17"));
        assert!(!holds(">=1.17 <1.19", "1.16.5"));
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        assert!(holds("", "1.0.0"));
        assert!(holds("   ", "0.0.1-alpha"));
        assert_eq!(parse_predicate("").unwrap(), Predicate::any());
    }

    #[test]
    fn test_default_operator_is_eq() {
        assert!(holds("1.18", "1.18.0"));
        assert!(!holds("1.18", "1.18.1"));
        assert_eq!(
            parse_predicate("1.18").unwrap().alternatives()[0][0].operator,
            Operator::Eq
        );
    }

    #[test]
    fn test_each_operator() {
        assert!(holds("=1.18.2", "1.18.2"));
        assert!(holds("!=1.18.2", "1.18.3"));
        assert!(!holds("!=1.18.2", "1.18.2"));
        assert!(holds(">1.18", "1.18.1"));
        assert!(!holds(">1.18", "1.18"));
        assert!(holds("<=1.18", "1.18.0"));
        assert!(!holds("<1.18", "1.18"));
    }

    #[test]
    fn test_tilde() {
        assert!(holds("~1.19.2", "1.19.4"));
        assert!(!holds("~1.19.2", "1.19.1"));
        assert!(!holds("~1.19.2", "1.20"));
        assert!(holds("~1", "1.99"));
        assert!(!holds("~1", "2.0"));
    }

    #[test]
    fn test_caret() {
        assert!(holds("^1.18.2", "1.20.1"));
        assert!(!holds("^1.18.2", "2.0.0"));
        assert!(holds("^0.15.3", "0.15.9"));
        assert!(!holds("^0.15.3", "0.16.0"));
        assert!(holds("^0.0.3", "0.0.3"));
        assert!(!holds("^0.0.3", "0.0.4"));
    }

    #[test]
    fn test_wildcards() {
        assert!(holds("1.18.x", "1.18.2"));
        assert!(holds("1.18.*", "1.18.0-rc.1"));
        assert!(!holds("1.18.x", "1.19"));
        assert!(holds("1.x", "1.20.4"));
        assert!(holds("*", "42.0"));
        assert!(holds(">1.18.x", "1.19"));
        assert!(!holds(">1.18.x", "1.18.9"));
        assert!(holds("<=1.18.x", "1.18.9"));
        assert!(!holds("<1.18.x", "1.18.0"));
        assert!(holds("!=1.18.x", "1.17.1"));
        assert!(!holds(">*", "1.0"));
    }

    #[test]
    fn test_prerelease_in_ranges() {
        assert!(holds(">=1.17 <1.19", "1.19.0-rc.1"));
        assert!(!holds(">=1.19", "1.19.0-rc.1"));
        assert!(holds(">=1.19-alpha", "1.19.0-rc.1"));
    }

    #[test]
    fn test_alternatives() {
        let predicate = parse_predicate("1.18.x || >=1.20").unwrap();
        assert!(predicate.evaluate(&v("1.18.1")));
        assert!(predicate.evaluate(&v("1.20.4")));
        assert!(!predicate.evaluate(&v("1.19.2")));
        assert_eq!(predicate.alternatives().len(), 2);
    }

    #[test]
    fn test_detached_operator() {
        assert!(holds(">= 1.17  < 1.19", "1.18"));
        assert!(matches!(
            parse_predicate(">=1.17 <"),
            Err(PredicateError::MissingOperand { .. })
        ));
    }

    #[test]
    fn test_unknown_operator() {
        for expr in ["=>1.17", "==1.0", "<>1.0", "!1.0", "~>1.2"] {
            assert!(
                matches!(
                    parse_predicate(expr),
                    Err(PredicateError::UnknownOperator { .. })
                ),
                "{}",
                expr
            );
        }
    }

    #[test]
    fn test_invalid_operand() {
        let err = parse_predicate(">=1.17 <banana").unwrap_err();
        match err {
            PredicateError::InvalidOperand { clause, source } => {
                assert_eq!(clause, "<banana");
                assert_eq!(source.input(), "banana");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(parse_predicate("1.x.2").is_err());
    }

    #[test]
    fn test_empty_alternative() {
        assert!(matches!(
            parse_predicate(">=1.17 ||"),
            Err(PredicateError::EmptyAlternative { .. })
        ));
        assert!(matches!(
            parse_predicate("|| 1.0"),
            Err(PredicateError::EmptyAlternative { .. })
        ));
    }

    #[test]
    fn test_lenient_operands() {
        assert!(parse_predicate("23w13a").is_err());
        let predicate = parse_predicate_lenient("23w13a").unwrap();
        assert!(predicate.evaluate_any(&AnyVersion::Text("23w13a".to_string())));
        assert!(!predicate.evaluate_any(&AnyVersion::Text("23w14a".to_string())));
        assert!(!predicate.evaluate(&v("1.19")));
    }

    #[test]
    fn test_text_versions_only_support_equality() {
        let snapshot = AnyVersion::Text("23w13a".to_string());
        assert!(!parse_predicate(">=1.19").unwrap().evaluate_any(&snapshot));
        assert!(!parse_predicate("<1.19").unwrap().evaluate_any(&snapshot));
        assert!(parse_predicate("!=1.19").unwrap().evaluate_any(&snapshot));
        assert!(parse_predicate("").unwrap().evaluate_any(&snapshot));
    }

    #[test]
    fn test_display_is_canonical() {
        let predicate = parse_predicate(">= 1.17   <1.19 ||1.20.*").unwrap();
        assert_eq!(predicate.to_string(), ">=1.17 <1.19 || =1.20.x");
        assert_eq!(parse_predicate(&predicate.to_string()).unwrap(), predicate);
    }

    #[test]
    fn test_eval() {
        assert!(eval("1.18.2", ">=1.17 <1.19").unwrap());
        assert!(!eval("1.19.0", ">=1.17 <1.19").unwrap());
        assert!(eval("1.19.0", "<<1").is_err());
        assert!(eval("nope", ">=1").is_err());
    }
}
