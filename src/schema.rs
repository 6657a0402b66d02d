//! Declarative index schema for the managed vector-search service.
//!
//! The schema is plain data: a field list with type and behavior flags, plus
//! the vector-search section naming the HNSW algorithm parameters and the
//! profile that ties the vector field to it. It is consumed by
//! [`crate::index::VectorIndex::ensure_index`], whose create-or-update call
//! is idempotent: applying the same schema twice produces no diff.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Dimensionality of every content vector in the index.
pub const VECTOR_DIMS: usize = 1536;

/// Field type identifiers on the wire.
const TYPE_STRING: &str = "Edm.String";
const TYPE_VECTOR: &str = "Collection(Edm.Single)";

/// Complete index definition, serialized as the service's camelCase JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub vector_search: VectorSearch,
}

/// One field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default = "default_true")]
    pub retrievable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
}

/// Vector-search section: algorithms and the profiles that reference them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearch {
    pub algorithms: Vec<VectorAlgorithm>,
    pub profiles: Vec<VectorProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorAlgorithm {
    pub name: String,
    pub kind: String,
    pub hnsw_parameters: HnswParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HnswParameters {
    pub m: u32,
    pub ef_construction: u32,
    pub ef_search: u32,
    pub metric: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorProfile {
    pub name: String,
    pub algorithm: String,
}

fn default_true() -> bool {
    true
}

impl FieldDef {
    fn string(name: &str) -> Self {
        FieldDef {
            name: name.to_string(),
            field_type: TYPE_STRING.to_string(),
            key: false,
            searchable: false,
            filterable: false,
            retrievable: true,
            dimensions: None,
            vector_search_profile: None,
        }
    }

    fn filterable(name: &str) -> Self {
        FieldDef {
            filterable: true,
            ..Self::string(name)
        }
    }
}

impl IndexSchema {
    /// Load a schema from a JSON definition file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Serialization(format!("cannot read schema file {}: {}", path.display(), e))
        })?;
        let schema: IndexSchema = serde_json::from_str(&raw).map_err(|e| {
            Error::Serialization(format!("invalid schema file {}: {}", path.display(), e))
        })?;
        Ok(schema)
    }

    /// The built-in definition: eight fields, a 1536-dimension cosine HNSW
    /// vector profile, and exact-match filters on the ownership ids.
    pub fn default_for(name: &str) -> Self {
        IndexSchema {
            name: name.to_string(),
            fields: vec![
                FieldDef {
                    key: true,
                    filterable: true,
                    ..FieldDef::string("id")
                },
                FieldDef::filterable("userId"),
                FieldDef::filterable("folderId"),
                FieldDef::filterable("documentId"),
                FieldDef::filterable("type"),
                FieldDef {
                    searchable: true,
                    ..FieldDef::string("content")
                },
                FieldDef {
                    name: "contentVector".to_string(),
                    field_type: TYPE_VECTOR.to_string(),
                    key: false,
                    searchable: true,
                    filterable: false,
                    retrievable: true,
                    dimensions: Some(VECTOR_DIMS),
                    vector_search_profile: Some("content-profile".to_string()),
                },
                FieldDef::string("metadata"),
            ],
            vector_search: VectorSearch {
                algorithms: vec![VectorAlgorithm {
                    name: "hnsw-cosine".to_string(),
                    kind: "hnsw".to_string(),
                    hnsw_parameters: HnswParameters {
                        m: 10,
                        ef_construction: 1000,
                        ef_search: 500,
                        metric: "cosine".to_string(),
                    },
                }],
                profiles: vec![VectorProfile {
                    name: "content-profile".to_string(),
                    algorithm: "hnsw-cosine".to_string(),
                }],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_has_eight_fields() {
        let schema = IndexSchema::default_for("knowledge-index");
        assert_eq!(schema.fields.len(), 8);
        assert_eq!(schema.fields.iter().filter(|f| f.key).count(), 1);
        assert_eq!(schema.fields[0].name, "id");
    }

    #[test]
    fn test_vector_field_shape() {
        let schema = IndexSchema::default_for("knowledge-index");
        let vector = schema
            .fields
            .iter()
            .find(|f| f.name == "contentVector")
            .unwrap();
        assert_eq!(vector.field_type, "Collection(Edm.Single)");
        assert_eq!(vector.dimensions, Some(VECTOR_DIMS));

        // The field's profile must reference a declared algorithm.
        let profile_name = vector.vector_search_profile.as_deref().unwrap();
        let profile = schema
            .vector_search
            .profiles
            .iter()
            .find(|p| p.name == profile_name)
            .unwrap();
        assert!(schema
            .vector_search
            .algorithms
            .iter()
            .any(|a| a.name == profile.algorithm));
    }

    #[test]
    fn test_hnsw_parameters() {
        let schema = IndexSchema::default_for("knowledge-index");
        let algorithm = &schema.vector_search.algorithms[0];
        assert_eq!(algorithm.kind, "hnsw");
        assert_eq!(algorithm.hnsw_parameters.m, 10);
        assert_eq!(algorithm.hnsw_parameters.ef_construction, 1000);
        assert_eq!(algorithm.hnsw_parameters.ef_search, 500);
        assert_eq!(algorithm.hnsw_parameters.metric, "cosine");
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let schema = IndexSchema::default_for("knowledge-index");
        let first = serde_json::to_string(&schema).unwrap();
        let second = serde_json::to_string(&schema).unwrap();
        assert_eq!(first, second);

        // Round-tripping through the wire form changes nothing either.
        let reparsed: IndexSchema = serde_json::from_str(&first).unwrap();
        assert_eq!(reparsed, schema);
    }

    #[test]
    fn test_shipped_definition_matches_builtin() {
        let raw = include_str!("../config/index_schema.json");
        let shipped: IndexSchema = serde_json::from_str(raw).unwrap();
        assert_eq!(shipped, IndexSchema::default_for("knowledge-index"));
    }

    #[test]
    fn test_camel_case_wire_names() {
        let schema = IndexSchema::default_for("knowledge-index");
        let value = serde_json::to_value(&schema).unwrap();
        assert!(value.get("vectorSearch").is_some());
        let params = &value["vectorSearch"]["algorithms"][0]["hnswParameters"];
        assert_eq!(params["efConstruction"], 1000);
        assert_eq!(params["efSearch"], 500);
    }
}
