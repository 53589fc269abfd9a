//! Eager loading of included relations as JSON rows.

use std::collections::HashMap;

use sea_orm::{
    ConnectionTrait, EntityTrait, FromQueryResult, IdenStatic, Identity, Iterable, ModelTrait,
    sea_query::{Alias, Asterisk, Expr, Query},
};
use serde_json::Value as JsonValue;

use super::Record;
use crate::error::{RepoResult, ValidationError};
use crate::model::key::{json_key_fragment, key_fragment};
use crate::policy::Include;

/// Wrap `rows` into records and attach every include to them.
pub(super) async fn attach<E, C>(
    conn: &C,
    rows: Vec<E::Model>,
    includes: &[Include],
) -> RepoResult<Vec<Record<E::Model>>>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let mut records: Vec<Record<E::Model>> = rows.into_iter().map(Record::new).collect();
    if records.is_empty() {
        return Ok(records);
    }

    for include in includes {
        load_one::<E, C>(conn, &mut records, include).await?;
    }
    Ok(records)
}

async fn load_one<E, C>(
    conn: &C,
    records: &mut [Record<E::Model>],
    include: &Include,
) -> RepoResult<()>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let relation = include.relation();
    let from = single_column(&relation.from_col, &include.name)?;
    let to = single_column(&relation.to_col, &include.name)?;
    let parent_col = E::Column::iter()
        .find(|c| c.as_str() == from)
        .ok_or_else(|| ValidationError::UnsupportedInclude(include.name.clone()))?;

    let parent_keys: Vec<Option<String>> = records
        .iter()
        .map(|r| key_fragment(&r.row.get(parent_col)))
        .collect();

    let mut values = Vec::new();
    let mut seen = Vec::new();
    for (record, key) in records.iter().zip(&parent_keys) {
        if let Some(key) = key
            && !seen.contains(key)
        {
            seen.push(key.clone());
            values.push(record.row.get(parent_col));
        }
    }

    let mut grouped: HashMap<String, Vec<JsonValue>> = HashMap::new();
    if !values.is_empty() {
        let query = Query::select()
            .column(Asterisk)
            .from(relation.to_tbl)
            .and_where(Expr::col(Alias::new(to.as_str())).is_in(values))
            .to_owned();
        let stmt = conn.get_database_backend().build(&query);
        let related = JsonValue::find_by_statement(stmt).all(conn).await?;

        for row in related {
            if let Some(key) = row.get(to.as_str()).and_then(json_key_fragment) {
                grouped.entry(key).or_default().push(row);
            }
        }
    }

    for (record, key) in records.iter_mut().zip(parent_keys) {
        let rows = key
            .and_then(|k| grouped.get(&k).cloned())
            .unwrap_or_default();
        record.related.insert(include.name.clone(), rows);
    }
    Ok(())
}

fn single_column(identity: &Identity, include: &str) -> Result<String, ValidationError> {
    match identity {
        Identity::Unary(iden) => Ok(iden.to_string()),
        _ => Err(ValidationError::UnsupportedInclude(format!(
            "{include}: relations over composite columns cannot be eager loaded"
        ))),
    }
}
