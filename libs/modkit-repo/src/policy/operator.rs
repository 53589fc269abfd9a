//! Portable comparison operators.
//!
//! Callers express filters with [`LogicalOp`]; an [`OperatorTable`] built once
//! per connection maps operators the backend lacks onto the closest
//! equivalent before they are rendered.

use std::fmt;

use sea_orm::{
    ColumnTrait, Condition, DbBackend, Value,
    sea_query::{BinOper, Expr, SimpleExpr, extension::postgres::PgBinOper},
};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    NotLike,
    ILike,
    NotILike,
    Regexp,
    NotRegexp,
    IRegexp,
    NotIRegexp,
    IsNull,
    IsNotNull,
}

impl LogicalOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::ILike => "ILIKE",
            Self::NotILike => "NOT ILIKE",
            Self::Regexp => "REGEXP",
            Self::NotRegexp => "NOT REGEXP",
            Self::IRegexp => "IREGEXP",
            Self::NotIRegexp => "NOT IREGEXP",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    One(Value),
    List(Vec<Value>),
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Self::One(v)
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Self::One(v.into())
    }
}

impl From<Vec<Value>> for Operand {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

/// Operator mapping for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorTable {
    backend: DbBackend,
    native_ilike: bool,
}

impl OperatorTable {
    #[must_use]
    pub fn for_backend(backend: DbBackend) -> Self {
        Self {
            backend,
            native_ilike: matches!(backend, DbBackend::Postgres),
        }
    }

    #[must_use]
    pub fn backend(&self) -> DbBackend {
        self.backend
    }

    /// Operator actually sent to the backend for `op`.
    ///
    /// `ILike`/`NotILike` degrade to `Like`/`NotLike` and `IRegexp`/`NotIRegexp`
    /// to `Regexp`/`NotRegexp` where the dialect has no case-insensitive form.
    /// `LIKE` is already case-insensitive there for ASCII text under the
    /// default collation.
    #[must_use]
    pub fn resolve(&self, op: LogicalOp) -> LogicalOp {
        match op {
            LogicalOp::ILike if !self.native_ilike => LogicalOp::Like,
            LogicalOp::NotILike if !self.native_ilike => LogicalOp::NotLike,
            LogicalOp::IRegexp if !self.native_ilike => LogicalOp::Regexp,
            LogicalOp::NotIRegexp if !self.native_ilike => LogicalOp::NotRegexp,
            other => other,
        }
    }

    /// Render `column <op> operand` after resolving `op`.
    ///
    /// # Errors
    /// `ValidationError::Rejected` if the operand shape does not fit the
    /// operator (a list for `Eq`, a scalar for `In`, a non-text pattern).
    pub fn condition<C: ColumnTrait>(
        &self,
        column: C,
        op: LogicalOp,
        operand: impl Into<Operand>,
    ) -> Result<SimpleExpr, ValidationError> {
        let op = self.resolve(op);
        let operand = operand.into();

        let expr = match (op, operand) {
            (LogicalOp::IsNull, _) => column.is_null(),
            (LogicalOp::IsNotNull, _) => column.is_not_null(),
            (LogicalOp::In, Operand::List(values)) => column.is_in(values),
            (LogicalOp::NotIn, Operand::List(values)) => column.is_not_in(values),
            (LogicalOp::Eq, Operand::One(v)) => column.eq(v),
            (LogicalOp::Ne, Operand::One(v)) => column.ne(v),
            (LogicalOp::Gt, Operand::One(v)) => column.gt(v),
            (LogicalOp::Gte, Operand::One(v)) => column.gte(v),
            (LogicalOp::Lt, Operand::One(v)) => column.lt(v),
            (LogicalOp::Lte, Operand::One(v)) => column.lte(v),
            (LogicalOp::Like, Operand::One(v)) => column.like(pattern(op, &v)?),
            (LogicalOp::NotLike, Operand::One(v)) => column.not_like(pattern(op, &v)?),
            (LogicalOp::ILike, Operand::One(v)) => qualified(column)
                .binary(PgBinOper::ILike, Expr::val(pattern(op, &v)?)),
            (LogicalOp::NotILike, Operand::One(v)) => qualified(column)
                .binary(PgBinOper::NotILike, Expr::val(pattern(op, &v)?)),
            (
                LogicalOp::Regexp
                | LogicalOp::NotRegexp
                | LogicalOp::IRegexp
                | LogicalOp::NotIRegexp,
                Operand::One(v),
            ) => qualified(column).binary(self.regexp_operator(op), Expr::val(pattern(op, &v)?)),
            (op, _) => {
                return Err(ValidationError::Rejected(format!(
                    "operand does not fit operator {op}"
                )));
            }
        };
        Ok(expr)
    }

    /// `OR` of case-insensitive prefix matches, one per non-empty needle of
    /// `query` split on `separator`. `None` when there are no needles.
    #[must_use]
    pub fn prefix_search<C: ColumnTrait>(
        &self,
        column: C,
        query: &str,
        separator: &str,
    ) -> Option<Condition> {
        let needles: Vec<&str> = query.split(separator).filter(|n| !n.is_empty()).collect();
        if needles.is_empty() {
            return None;
        }

        let op = self.resolve(LogicalOp::ILike);
        let cond = needles.into_iter().fold(Condition::any(), |cond, needle| {
            let pattern = format!("{needle}%");
            if op == LogicalOp::ILike {
                cond.add(qualified(column).binary(PgBinOper::ILike, Expr::val(pattern)))
            } else {
                cond.add(column.like(pattern))
            }
        });
        Some(cond)
    }

    /// Backend spelling of a (resolved) regular expression operator.
    fn regexp_operator(self, op: LogicalOp) -> BinOper {
        let postgres = matches!(self.backend, DbBackend::Postgres);
        match op {
            LogicalOp::Regexp if postgres => PgBinOper::Regex.into(),
            LogicalOp::IRegexp => PgBinOper::RegexCaseInsensitive.into(),
            LogicalOp::NotRegexp if postgres => BinOper::Custom("!~"),
            LogicalOp::NotIRegexp => BinOper::Custom("!~*"),
            LogicalOp::NotRegexp => BinOper::Custom("NOT REGEXP"),
            _ => BinOper::Custom("REGEXP"),
        }
    }
}

fn qualified<C: ColumnTrait>(column: C) -> Expr {
    Expr::col((column.entity_name(), column))
}

fn pattern(op: LogicalOp, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(Some(s)) => Ok(s.as_ref().clone()),
        _ => Err(ValidationError::Rejected(format!(
            "operator {op} expects a text pattern"
        ))),
    }
}
