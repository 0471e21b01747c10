//! Native condition and ordering expressions.
//!
//! These are the where/order-by primitives handed to the store. They are plain
//! data: building one never touches the store, and two expressions built from
//! the same inputs compare equal.

use crate::value::Value;
use std::fmt;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A where-clause condition tree.
///
/// # Example
///
/// ```
/// use repobridge_core::Expr;
///
/// let adults = Expr::col("age").ge(18).and(Expr::col("email").is_not_null());
/// assert_eq!(adults.to_string(), "(age >= 18 AND email IS NOT NULL)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `column <op> value`.
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// Case-insensitive equality.
    EqIgnoreCase { column: String, value: String },
    /// `column LIKE pattern`; `%` and `_` are wildcards.
    Like {
        column: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// Regular-expression match.
    Regex {
        column: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// `column IS [NOT] NULL`.
    IsNull { column: String, negated: bool },
    /// `column IN (values)`.
    In { column: String, values: Vec<Value> },
    /// All conditions must hold.
    And(Vec<Expr>),
    /// At least one condition must hold.
    Or(Vec<Expr>),
    /// Negation.
    Not(Box<Expr>),
    /// Store-native condition text, passed through untouched.
    Raw(String),
}

impl Expr {
    /// Start a condition on a storage column.
    pub fn col(name: impl Into<String>) -> ColumnRef {
        ColumnRef { name: name.into() }
    }

    /// Store-native condition text.
    pub fn raw(text: impl Into<String>) -> Self {
        Expr::Raw(text.into())
    }

    /// Conjunction, flattening nested `And`s.
    #[must_use]
    pub fn and(self, other: Expr) -> Self {
        match (self, other) {
            (Expr::And(mut left), Expr::And(right)) => {
                left.extend(right);
                Expr::And(left)
            }
            (Expr::And(mut left), right) => {
                left.push(right);
                Expr::And(left)
            }
            (left, Expr::And(mut right)) => {
                right.insert(0, left);
                Expr::And(right)
            }
            (left, right) => Expr::And(vec![left, right]),
        }
    }

    /// Disjunction, flattening nested `Or`s.
    #[must_use]
    pub fn or(self, other: Expr) -> Self {
        match (self, other) {
            (Expr::Or(mut left), Expr::Or(right)) => {
                left.extend(right);
                Expr::Or(left)
            }
            (Expr::Or(mut left), right) => {
                left.push(right);
                Expr::Or(left)
            }
            (left, Expr::Or(mut right)) => {
                right.insert(0, left);
                Expr::Or(right)
            }
            (left, right) => Expr::Or(vec![left, right]),
        }
    }

    /// Negation.
    #[must_use]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Combine conditions with AND. `None` when the iterator is empty; a single
    /// condition is returned unwrapped.
    pub fn all(conditions: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        let mut items: Vec<Expr> = conditions.into_iter().collect();
        match items.len() {
            0 => None,
            1 => items.pop(),
            _ => Some(Expr::And(items)),
        }
    }

    /// Combine conditions with OR, with the same shape rules as `all`.
    pub fn any(conditions: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        let mut items: Vec<Expr> = conditions.into_iter().collect();
        match items.len() {
            0 => None,
            1 => items.pop(),
            _ => Some(Expr::Or(items)),
        }
    }

    /// Storage columns referenced by this expression, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Compare { column, .. }
            | Expr::EqIgnoreCase { column, .. }
            | Expr::Like { column, .. }
            | Expr::Regex { column, .. }
            | Expr::IsNull { column, .. }
            | Expr::In { column, .. } => {
                if !out.contains(&column.as_str()) {
                    out.push(column);
                }
            }
            Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.collect_columns(out);
                }
            }
            Expr::Not(inner) => inner.collect_columns(out),
            Expr::Raw(_) => {}
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { column, op, value } => write!(f, "{column} {} {value}", op.symbol()),
            Expr::EqIgnoreCase { column, value } => write!(f, "LOWER({column}) = LOWER('{value}')"),
            Expr::Like {
                column,
                pattern,
                case_insensitive,
            } => {
                let op = if *case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, "{column} {op} '{pattern}'")
            }
            Expr::Regex {
                column,
                pattern,
                case_insensitive,
            } => {
                let op = if *case_insensitive { "~*" } else { "~" };
                write!(f, "{column} {op} '{pattern}'")
            }
            Expr::IsNull { column, negated } => {
                if *negated {
                    write!(f, "{column} IS NOT NULL")
                } else {
                    write!(f, "{column} IS NULL")
                }
            }
            Expr::In { column, values } => {
                write!(f, "{column} IN (")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
            Expr::And(items) => write_joined(f, items, " AND "),
            Expr::Or(items) => write_joined(f, items, " OR "),
            Expr::Not(inner) => write!(f, "NOT {inner}"),
            Expr::Raw(text) => f.write_str(text),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(")")
}

/// A column reference, used to build conditions fluently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    name: String,
}

impl ColumnRef {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Expr {
        Expr::Compare {
            column: self.name,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Ge, value)
    }

    /// Case-insensitive equality on text.
    pub fn eq_ignore_case(self, value: impl Into<String>) -> Expr {
        Expr::EqIgnoreCase {
            column: self.name,
            value: value.into(),
        }
    }

    pub fn like(self, pattern: impl Into<String>) -> Expr {
        Expr::Like {
            column: self.name,
            pattern: pattern.into(),
            case_insensitive: false,
        }
    }

    pub fn ilike(self, pattern: impl Into<String>) -> Expr {
        Expr::Like {
            column: self.name,
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    pub fn matches(self, pattern: impl Into<String>, case_insensitive: bool) -> Expr {
        Expr::Regex {
            column: self.name,
            pattern: pattern.into(),
            case_insensitive,
        }
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull {
            column: self.name,
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNull {
            column: self.name,
            negated: true,
        }
    }

    pub fn in_list(self, values: impl IntoIterator<Item = Value>) -> Expr {
        Expr::In {
            column: self.name,
            values: values.into_iter().collect(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    pub const fn is_ascending(self) -> bool {
        matches!(self, Direction::Asc)
    }
}

/// Placement of nulls in an ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NullHandling {
    /// Whatever the store does by default.
    #[default]
    Native,
    NullsFirst,
    NullsLast,
}

/// One order-by term on a storage column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderExpr {
    pub column: String,
    pub direction: Direction,
    pub ignore_case: bool,
    pub nulls: NullHandling,
}

impl OrderExpr {
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Desc)
    }

    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
            ignore_case: false,
            nulls: NullHandling::Native,
        }
    }
}

impl fmt::Display for OrderExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ignore_case {
            write!(f, "LOWER({})", self.column)?;
        } else {
            f.write_str(&self.column)?;
        }
        write!(f, " {}", self.direction.as_sql())?;
        match self.nulls {
            NullHandling::Native => Ok(()),
            NullHandling::NullsFirst => f.write_str(" NULLS FIRST"),
            NullHandling::NullsLast => f.write_str(" NULLS LAST"),
        }
    }
}
