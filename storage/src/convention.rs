//! Table definitions discovered from a directory of `<name>.ddl` files.
//!
//! A file may start with a header line
//! `-- type: hive|jdbc|cassandra; schema: <schema>; database: <database>`;
//! every field is optional and `type` defaults to `hive`. CQL tables share
//! the relational definition kind. A sibling `<name>.data`
//! file, when present, becomes the table's data source.

use crate::delimited::FileDataSource;
use errors::{FixtureError, FixtureResult};
use fixture_core::{EmptyDataSource, TableDataSource, TableDefinition, TableHandle, TableKind};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const DDL_EXTENSION: &str = "ddl";
const DATA_EXTENSION: &str = "data";

#[derive(Debug, Default, PartialEq)]
struct Header {
    kind: Option<String>,
    schema: Option<String>,
    database: Option<String>
}

fn parse_header(line: &str) -> FixtureResult<Header> {
    let Some(body) = line.strip_prefix("--") else {
        return Ok(Header::default());
    };
    let fields: HashMap<String, String> = body
        .split(';')
        .filter(|field| !field.trim().is_empty())
        .map(|field| {
            field
                .split_once(':')
                .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
                .ok_or_else(|| FixtureError::configuration(format!("malformed DDL header field: '{field}'")))
        })
        .collect::<FixtureResult<_>>()?;

    Ok(Header {
        kind: fields.get("type").cloned(),
        schema: fields.get("schema").cloned(),
        database: fields.get("database").cloned()
    })
}

fn table_kind(kind: Option<&str>) -> FixtureResult<TableKind> {
    match kind.map(str::to_lowercase).as_deref() {
        None | Some("hive") => Ok(TableKind::Hive),
        Some("jdbc" | "cassandra") => Ok(TableKind::Relational),
        Some(other) => Err(FixtureError::configuration(format!(
            "unsupported table type '{other}' in DDL header"
        )))
    }
}

/// Loads every `.ddl` file of `dir`, in file name order.
pub fn load_convention_definitions(dir: &Path) -> FixtureResult<Vec<TableDefinition>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(DDL_EXTENSION))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|name| utils::is_valid_identifier(name))
                .ok_or_else(|| FixtureError::configuration(format!("invalid DDL file name: {}", path.display())))?;
            let contents = fs::read_to_string(path)?;
            load_definition(name, &contents, &path.with_extension(DATA_EXTENSION))
        })
        .collect()
}

fn load_definition(name: &str, contents: &str, data_path: &Path) -> FixtureResult<TableDefinition> {
    let first_line = contents.lines().next().unwrap_or_default();
    let header = parse_header(first_line)?;
    let ddl = if first_line.starts_with("--") {
        contents.lines().skip(1).collect::<Vec<_>>().join("\n")
    } else {
        contents.to_string()
    };

    let path_suffix = match &header.schema {
        Some(schema) => format!("{schema}/{name}"),
        None => name.to_string()
    };
    let data_source: Arc<dyn TableDataSource> = if data_path.is_file() {
        Arc::new(FileDataSource::new(data_path, path_suffix))
    } else {
        Arc::new(EmptyDataSource::new(path_suffix))
    };

    let mut handle = TableHandle::table(name);
    if let Some(schema) = &header.schema {
        handle = handle.in_schema(schema.clone());
    }

    let mut definition = TableDefinition::new(
        handle,
        table_kind(header.kind.as_deref())?,
        ddl.trim(),
        data_source
    );
    if let Some(database) = header.database {
        definition = definition.with_default_database(database);
    }
    debug!(table = name, kind = definition.kind().type_name(), "loaded convention table definition");
    Ok(definition)
}
