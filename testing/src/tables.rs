//! Small TPC-H style definitions used across test suites.

use fixture_core::{
    InlineDataSource, PartitionDefinition, Row, TableDefinition, TableHandle, TableStatistics,
    TopicSettings
};
use serde_json::json;
use std::sync::Arc;

pub const NATION_DDL: &str =
    "CREATE TABLE %NAME% (n_nationkey BIGINT, n_name VARCHAR(25), n_regionkey BIGINT, n_comment VARCHAR(152))";
pub const REGION_DDL: &str = "CREATE TABLE %NAME% (r_regionkey BIGINT, r_name VARCHAR(25), r_comment VARCHAR(152))";

pub fn nation_rows() -> Vec<Row> {
    vec![
        vec![json!(0), json!("ALGERIA"), json!(0), json!("haggle carefully")],
        vec![json!(1), json!("ARGENTINA"), json!(1), json!("al foxes promise")],
        vec![json!(2), json!("BRAZIL"), json!(1), json!("y alongside of the pending deposits")],
        vec![json!(3), json!("CANADA"), json!(1), json!("eas hang ironic")]
    ]
}

pub fn region_rows() -> Vec<Row> {
    vec![
        vec![json!(0), json!("AFRICA"), json!("lar deposits")],
        vec![json!(1), json!("AMERICA"), json!("hs use ironic")],
        vec![json!(2), json!("ASIA"), json!("ges. thinly even pinto beans")]
    ]
}

pub fn nation_statistics() -> TableStatistics {
    TableStatistics {
        row_count: nation_rows().len() as u64,
        ..TableStatistics::default()
    }
}

/// `nation` for an object-store backed engine, with statistics.
pub fn nation() -> TableDefinition {
    TableDefinition::hive(
        TableHandle::table("nation"),
        NATION_DDL,
        Arc::new(InlineDataSource::new("tpch/nation", nation_rows()).with_statistics(nation_statistics()))
    )
}

pub fn region() -> TableDefinition {
    TableDefinition::hive(
        TableHandle::table("region"),
        REGION_DDL,
        Arc::new(InlineDataSource::new("tpch/region", region_rows()))
    )
}

pub fn nation_relational() -> TableDefinition {
    TableDefinition::relational(
        TableHandle::table("nation"),
        NATION_DDL,
        Arc::new(InlineDataSource::new("tpch/nation", nation_rows()))
    )
}

/// `nation` split into `partitions` partitions by region key, each with one
/// row.
pub fn partitioned_nation(partitions: usize) -> TableDefinition {
    let ddl = "CREATE TABLE %NAME% (n_nationkey BIGINT, n_name VARCHAR(25)) PARTITIONED BY (n_regionkey BIGINT)";
    let partitions = (0..partitions)
        .map(|key| {
            PartitionDefinition::new(
                format!("n_regionkey={key}"),
                Arc::new(InlineDataSource::new(
                    format!("tpch/nation_partitioned/{key}"),
                    vec![vec![json!(key), json!(format!("NATION_{key}"))]]
                ))
            )
        })
        .collect();
    TableDefinition::hive(
        TableHandle::table("nation_partitioned"),
        ddl,
        Arc::new(InlineDataSource::new("tpch/nation_partitioned", Vec::new()))
    )
    .with_partitions(partitions)
}

pub fn nation_topic() -> TableDefinition {
    TableDefinition::topic(
        TableHandle::table("nation_events"),
        TopicSettings {
            partitions: 2,
            replication_factor: 1
        },
        Arc::new(InlineDataSource::new(
            "topics/nation_events",
            nation_rows()
                .into_iter()
                .map(|row| vec![row[0].clone(), row[1].clone()])
                .collect()
        ))
    )
}
