//! Protobuf value serializer backed by the schema registry.

use crate::error::ProduceError;
use crate::schema_registry::{value_subject, SchemaResolver};
use crate::wire;
use basket_types::{RecordKind, SalesRecord};
use std::collections::HashMap;

/// Index path of the record message inside its schema (always the first message).
const RECORD_MESSAGE_INDEXES: &[i64] = &[0];

/// Serializes records into registry-framed protobuf payloads.
///
/// Schema ids are resolved lazily on the first record of each
/// (subject, kind) pair and cached for the life of the serializer.
pub struct ProtobufSerializer<R> {
    resolver: R,
    schema_ids: HashMap<(String, RecordKind), u32>,
}

impl<R: SchemaResolver> ProtobufSerializer<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            schema_ids: HashMap::new(),
        }
    }

    /// Registry id for `kind` on `topic`, registering the schema on first use.
    pub async fn schema_id(&mut self, topic: &str, kind: RecordKind) -> Result<u32, ProduceError> {
        let subject = value_subject(topic);
        let key = (subject, kind);
        if let Some(id) = self.schema_ids.get(&key) {
            return Ok(*id);
        }
        let id = self.resolver.register(&key.0, kind.proto_schema()).await?;
        self.schema_ids.insert(key, id);
        Ok(id)
    }

    /// Encode and frame a record for `topic`.
    pub async fn serialize(
        &mut self,
        topic: &str,
        record: SalesRecord<'_>,
    ) -> Result<Vec<u8>, ProduceError> {
        let body = record.encode_protobuf()?;
        let schema_id = self.schema_id(topic, record.kind()).await?;
        Ok(wire::frame(schema_id, RECORD_MESSAGE_INDEXES, &body))
    }
}
