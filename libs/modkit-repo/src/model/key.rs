//! Primary key model: lookups by single or composite identifiers and
//! deterministic row keys.

use std::fmt;
use std::marker::PhantomData;

use sea_orm::{
    ColumnTrait, Condition, EntityTrait, IdenStatic, Iterable, ModelTrait, PrimaryKeyToColumn,
    Value,
};
use uuid::Uuid;

use crate::error::ValidationError;

/// Identifier used to look a record up.
///
/// Composite lookups name their fields; every declared key field must be
/// present and no others are accepted.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordId {
    Single(Value),
    Composite(Vec<(String, Value)>),
}

impl RecordId {
    #[must_use]
    pub fn composite<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Composite(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(v) => f.write_str(&key_fragment(v).unwrap_or_else(|| "null".to_owned())),
            Self::Composite(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| {
                        format!(
                            "{k}={}",
                            key_fragment(v).unwrap_or_else(|| "null".to_owned())
                        )
                    })
                    .collect();
                write!(f, "{{{}}}", parts.join(","))
            }
        }
    }
}

macro_rules! record_id_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for RecordId {
                fn from(v: $t) -> Self {
                    Self::Single(v.into())
                }
            }
        )*
    };
}

record_id_from!(i32, i64, u32, u64, String, &str, Uuid);

impl From<Value> for RecordId {
    fn from(v: Value) -> Self {
        Self::Single(v)
    }
}

/// Ordered key values of a loaded record.
///
/// Displays as the values joined by commas in declared key order, which makes
/// it usable as a cache or map key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(Vec<String>);

impl RowKey {
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.0.len() > 1
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Primary key description of an entity, in declaration order.
#[derive(Clone, Debug)]
pub struct KeySpec<E: EntityTrait> {
    columns: Vec<E::Column>,
    _entity: PhantomData<E>,
}

impl<E: EntityTrait> Default for KeySpec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> KeySpec<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: <E::PrimaryKey as Iterable>::iter()
                .map(PrimaryKeyToColumn::into_column)
                .collect(),
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[E::Column] {
        &self.columns
    }

    /// First declared key column; used as the default `"id"` sort field.
    #[must_use]
    pub fn primary(&self) -> Option<E::Column> {
        self.columns.first().copied()
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }

    /// Key values of a loaded record.
    ///
    /// # Errors
    /// Returns `ValidationError::MissingKeyValue` if a key column is null.
    pub fn row_key(&self, model: &E::Model) -> Result<RowKey, ValidationError> {
        self.columns
            .iter()
            .map(|col| {
                key_fragment(&model.get(*col))
                    .ok_or_else(|| ValidationError::MissingKeyValue(col.as_str().to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(RowKey)
    }

    /// Condition matching exactly the row the model was loaded from.
    #[must_use]
    pub fn row_condition(&self, model: &E::Model) -> Condition {
        self.columns
            .iter()
            .fold(Condition::all(), |cond, col| cond.add(col.eq(model.get(*col))))
    }

    /// Condition matching the record identified by `id`.
    ///
    /// # Errors
    /// Returns `ValidationError` for partial, unknown or mis-shaped keys.
    pub fn condition(&self, id: &RecordId) -> Result<Condition, ValidationError> {
        let values = self.resolve(id)?;
        Ok(self
            .columns
            .iter()
            .zip(values)
            .fold(Condition::all(), |cond, (col, v)| cond.add(col.eq(v))))
    }

    /// Condition matching any of the given identifiers.
    ///
    /// # Errors
    /// Returns `ValidationError` if any identifier is malformed.
    pub fn set_condition(&self, ids: &[RecordId]) -> Result<Condition, ValidationError> {
        match self.columns.as_slice() {
            [single] => {
                let values = ids
                    .iter()
                    .map(|id| self.resolve(id).map(|mut v| v.remove(0)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Condition::all().add(single.is_in(values)))
            }
            _ => ids.iter().try_fold(Condition::any(), |cond, id| {
                Ok(cond.add(self.condition(id)?))
            }),
        }
    }

    /// Values for every key column, in declaration order.
    fn resolve(&self, id: &RecordId) -> Result<Vec<Value>, ValidationError> {
        match id {
            RecordId::Single(v) => {
                if self.is_composite() {
                    return Err(ValidationError::SingleValueForCompositeKey {
                        expected: self.columns.len(),
                    });
                }
                Ok(vec![v.clone()])
            }
            RecordId::Composite(fields) => {
                if let Some((unknown, _)) = fields
                    .iter()
                    .find(|(name, _)| !self.columns.iter().any(|c| c.as_str() == name))
                {
                    return Err(ValidationError::UnknownKeyField(unknown.clone()));
                }

                let mut values = Vec::with_capacity(self.columns.len());
                let mut missing = Vec::new();
                for col in &self.columns {
                    match fields.iter().find(|(name, _)| name == col.as_str()) {
                        Some((_, v)) => values.push(v.clone()),
                        None => missing.push(col.as_str().to_owned()),
                    }
                }
                if !missing.is_empty() {
                    return Err(ValidationError::PartialKey { missing });
                }
                Ok(values)
            }
        }
    }
}

/// String form of a key value; `None` for SQL NULL.
#[allow(clippy::use_debug)] // binary and decimal variants have no `Display`
pub(crate) fn key_fragment(value: &Value) -> Option<String> {
    match value {
        Value::Bool(v) => v.map(|x| x.to_string()),
        Value::TinyInt(v) => v.map(|x| x.to_string()),
        Value::SmallInt(v) => v.map(|x| x.to_string()),
        Value::Int(v) => v.map(|x| x.to_string()),
        Value::BigInt(v) => v.map(|x| x.to_string()),
        Value::TinyUnsigned(v) => v.map(|x| x.to_string()),
        Value::SmallUnsigned(v) => v.map(|x| x.to_string()),
        Value::Unsigned(v) => v.map(|x| x.to_string()),
        Value::BigUnsigned(v) => v.map(|x| x.to_string()),
        Value::Float(v) => v.map(|x| x.to_string()),
        Value::Double(v) => v.map(|x| x.to_string()),
        Value::Char(v) => v.map(|x| x.to_string()),
        Value::String(v) => v.as_ref().map(|x| x.to_string()),
        Value::Uuid(v) => v.as_ref().map(|x| x.to_string()),
        Value::ChronoDateTimeUtc(v) => v.as_ref().map(|x| x.to_rfc3339()),
        Value::ChronoDateTime(v) => v.as_ref().map(|x| x.to_string()),
        Value::ChronoDate(v) => v.as_ref().map(|x| x.to_string()),
        Value::Json(v) => v.as_ref().map(|x| x.to_string()),
        other => Some(format!("{other:?}")),
    }
}

pub(crate) fn is_null(value: &Value) -> bool {
    key_fragment(value).is_none()
}

/// String form of a JSON scalar, comparable with [`key_fragment`].
pub(crate) fn json_key_fragment(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
