use super::{KAFKA_TYPE, ManagerBuildContext};
use crate::naming::TableNameGenerator;
use async_trait::async_trait;
use errors::{FixtureError, FixtureResult};
use fixture_core::{
    MutableTableState, Row, TableDefinition, TableHandle, TableInstance, TableKind, TableManager,
    TableName, TopicAdmin, TopicMessage
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string())
    }
}

/// Maps a row to a message: `[value]`, `[key, value]` or
/// `[partition, key, value]`.
pub fn topic_message(row: &Row) -> FixtureResult<TopicMessage> {
    match row.as_slice() {
        [value] => Ok(TopicMessage {
            partition: None,
            key: None,
            value: as_text(value).unwrap_or_default()
        }),
        [key, value] => Ok(TopicMessage {
            partition: None,
            key: as_text(key),
            value: as_text(value).unwrap_or_default()
        }),
        [partition, key, value] => {
            let partition = as_text(partition)
                .and_then(|p| p.parse::<i32>().ok())
                .ok_or_else(|| FixtureError::configuration(format!("invalid topic partition: {partition}")))?;
            Ok(TopicMessage {
                partition: Some(partition),
                key: as_text(key),
                value: as_text(value).unwrap_or_default()
            })
        }
        _ => Err(FixtureError::configuration(format!(
            "topic rows need 1 to 3 columns, got {}",
            row.len()
        )))
    }
}

/// Manager for message broker topics. Topics are immutable fixtures:
/// recreated and filled once per suite.
pub struct KafkaTableManager {
    database: String,
    admin: Arc<dyn TopicAdmin>,
    names: Arc<TableNameGenerator>
}

impl KafkaTableManager {
    pub fn new(database: impl Into<String>, admin: Arc<dyn TopicAdmin>, names: Arc<TableNameGenerator>) -> Self {
        Self {
            database: database.into(),
            admin,
            names
        }
    }

    pub fn from_build_context(ctx: &ManagerBuildContext<'_>) -> FixtureResult<Self> {
        Ok(Self::new(
            ctx.database(),
            ctx.require_client::<dyn TopicAdmin>("topic admin")?,
            Arc::clone(ctx.names)
        ))
    }

    async fn recreate_topic(&self, definition: &TableDefinition, topic: &str) -> FixtureResult<usize> {
        let TableKind::Topic(settings) = definition.kind() else {
            return Err(FixtureError::configuration(format!(
                "table {} is not a topic definition",
                definition.handle()
            )));
        };

        if self.admin.list_topics().await?.iter().any(|t| t == topic) {
            debug!(topic, "deleting existing topic");
            self.admin.delete_topic(topic).await?;
        }
        self.admin.create_topic(topic, settings).await?;

        let mut produced = 0;
        for row in definition.data_source().rows()? {
            self.admin.produce(topic, topic_message(&row?)?).await?;
            produced += 1;
        }
        Ok(produced)
    }
}

#[async_trait]
impl TableManager for KafkaTableManager {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn manager_type(&self) -> &str {
        KAFKA_TYPE
    }

    fn accepts(&self, kind: &TableKind) -> bool {
        matches!(kind, TableKind::Topic(_))
    }

    #[instrument(skip(self, definition), fields(database = %self.database))]
    async fn create_immutable(&self, definition: &Arc<TableDefinition>, handle: &TableHandle) -> FixtureResult<TableInstance> {
        let name = self.names.immutable_table_name(&self.database, handle);
        let messages = self
            .recreate_topic(definition, name.bare_name_in_database())
            .await
            .map_err(|e| e.for_table(handle))?;
        info!(topic = %name, messages, "created topic");
        Ok(TableInstance::new(name, Arc::clone(definition)))
    }

    async fn create_mutable(
        &self,
        _definition: &Arc<TableDefinition>,
        _state: MutableTableState,
        handle: &TableHandle
    ) -> FixtureResult<TableInstance> {
        Err(FixtureError::unsupported("mutable tables", KAFKA_TYPE).for_table(handle))
    }

    async fn drop_table(&self, _name: &TableName) -> FixtureResult<()> {
        Err(FixtureError::unsupported("drop table", KAFKA_TYPE))
    }

    async fn drop_stale_mutable_tables(&self) -> FixtureResult<()> {
        Ok(())
    }

    async fn close(&self) -> FixtureResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_shapes() {
        let single = topic_message(&vec![json!("payload")]).unwrap();
        assert_eq!(single.key, None);
        assert_eq!(single.value, "payload");

        let keyed = topic_message(&vec![json!("k"), json!({"a": 1})]).unwrap();
        assert_eq!(keyed.key.as_deref(), Some("k"));
        assert_eq!(keyed.value, r#"{"a":1}"#);

        let partitioned = topic_message(&vec![json!("2"), Value::Null, json!("v")]).unwrap();
        assert_eq!(partitioned.partition, Some(2));
        assert_eq!(partitioned.key, None);

        assert!(topic_message(&vec![json!("x"), json!("k"), json!("v")]).is_err());
        assert!(topic_message(&Vec::new()).is_err());
    }
}
