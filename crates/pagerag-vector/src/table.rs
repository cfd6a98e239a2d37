//! LanceDB connection and table helpers.
use anyhow::Result;
use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection, Table};
use std::sync::Arc;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

/// Open `name`, creating it empty with `schema` when missing.
pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<Table> {
    let names = conn.table_names().execute().await?;
    if !names.contains(&name.to_string()) {
        let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
        conn.create_table(name, Box::new(iter)).execute().await?;
        tracing::info!(table = name, "created chunk table");
    }
    Ok(conn.open_table(name).execute().await?)
}

pub fn source_predicate(source: &str) -> String {
    format!("{} = '{}'", crate::schema::SOURCE_COLUMN, source.replace('\'', "''"))
}

/// `source = '...' AND id NOT IN (...)`; the id clause is omitted when `keep` is empty.
pub fn stale_predicate(source: &str, keep: &[String]) -> String {
    let base = source_predicate(source);
    if keep.is_empty() {
        return base;
    }
    let ids: Vec<String> = keep.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect();
    format!("{} AND {} NOT IN ({})", base, crate::schema::ID_COLUMN, ids.join(", "))
}
