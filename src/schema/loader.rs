use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::CompiledSchema;
use crate::errors::FuzzError;

pub const COMPILED_QUERIES_FILE: &str = "compiled/compiled_queries.yml";
pub const COMPILED_MUTATIONS_FILE: &str = "compiled/compiled_mutations.yml";
pub const COMPILED_OBJECTS_FILE: &str = "compiled/compiled_objects.yml";
pub const INPUT_OBJECTS_FILE: &str = "extracted/input_object_list.yml";
pub const ENUMS_FILE: &str = "extracted/enum_list.yml";
pub const UNIONS_FILE: &str = "extracted/union_list.yml";
pub const INTERFACES_FILE: &str = "extracted/interface_list.yml";

/// Raw YAML documents making up a compiled schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaSources {
    pub queries: String,
    pub mutations: String,
    pub objects: String,
    pub input_objects: String,
    pub enums: String,
    pub unions: String,
    pub interfaces: String,
}

impl SchemaSources {
    pub fn parse(&self) -> Result<CompiledSchema, FuzzError> {
        let mut schema = CompiledSchema {
            queries: parse_section(&self.queries, COMPILED_QUERIES_FILE)?,
            mutations: parse_section(&self.mutations, COMPILED_MUTATIONS_FILE)?,
            objects: parse_section(&self.objects, COMPILED_OBJECTS_FILE)?,
            input_objects: parse_section(&self.input_objects, INPUT_OBJECTS_FILE)?,
            enums: parse_section(&self.enums, ENUMS_FILE)?,
            unions: parse_section(&self.unions, UNIONS_FILE)?,
            interfaces: parse_section(&self.interfaces, INTERFACES_FILE)?,
        };
        schema.normalize();
        Ok(schema)
    }
}

fn parse_section<T: DeserializeOwned>(content: &str, file: &str) -> Result<BTreeMap<String, T>, FuzzError> {
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let parsed: Option<BTreeMap<String, T>> = serde_yaml::from_str(content)
        .map_err(|e| FuzzError::Schema(format!("{file}: {e}")))?;
    Ok(parsed.unwrap_or_default())
}

async fn read_required(dir: &Path, file: &str) -> Result<String, FuzzError> {
    let path = dir.join(file);
    if !path.exists() {
        return Err(FuzzError::Schema(format!(
            "Compiled file not found: {} (compile the schema first)",
            path.display()
        )));
    }
    Ok(tokio::fs::read_to_string(&path).await?)
}

async fn read_optional(dir: &Path, file: &str) -> Result<String, FuzzError> {
    let path = dir.join(file);
    if !path.exists() {
        debug!(file = %path.display(), "Optional schema file missing, treating as empty");
        return Ok(String::new());
    }
    Ok(tokio::fs::read_to_string(&path).await?)
}

/// Loads the compiled schema from a run directory.
pub async fn load_compiled_schema(dir: &Path) -> Result<CompiledSchema, FuzzError> {
    let sources = SchemaSources {
        queries: read_required(dir, COMPILED_QUERIES_FILE).await?,
        mutations: read_required(dir, COMPILED_MUTATIONS_FILE).await?,
        objects: read_required(dir, COMPILED_OBJECTS_FILE).await?,
        input_objects: read_optional(dir, INPUT_OBJECTS_FILE).await?,
        enums: read_optional(dir, ENUMS_FILE).await?,
        unions: read_optional(dir, UNIONS_FILE).await?,
        interfaces: read_optional(dir, INTERFACES_FILE).await?,
    };
    let schema = sources.parse()?;
    info!(
        queries = schema.queries.len(),
        mutations = schema.mutations.len(),
        objects = schema.objects.len(),
        "Loaded compiled schema"
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MutationType;

    const QUERIES: &str = r#"
getUser:
  name: getUser
  inputs:
    id:
      name: id
      type: null
      kind: NON_NULL
      ofType: {kind: SCALAR, name: ID, ofType: null, type: ID}
  output: {kind: OBJECT, name: User, ofType: null, type: User}
  hardDependsOn: {id: User}
  softDependsOn: {}
"#;

    const MUTATIONS: &str = r#"
removeUser:
  name: removeUser
  inputs: {}
  output: {kind: SCALAR, name: Boolean, ofType: null, type: Boolean}
  hardDependsOn: {}
  softDependsOn: {}
"#;

    #[tokio::test]
    async fn test_missing_compiled_file_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_compiled_schema(dir.path()).await.unwrap_err();
        assert!(matches!(err, FuzzError::Schema(_)));
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("compiled")).unwrap();
        std::fs::write(dir.path().join(COMPILED_QUERIES_FILE), QUERIES).unwrap();
        std::fs::write(dir.path().join(COMPILED_MUTATIONS_FILE), MUTATIONS).unwrap();
        std::fs::write(dir.path().join(COMPILED_OBJECTS_FILE), "").unwrap();

        let schema = load_compiled_schema(dir.path()).await.unwrap();
        assert_eq!(schema.queries.len(), 1);
        assert!(schema.objects.is_empty());
        assert!(schema.enums.is_empty());
        let mutation = &schema.mutations["removeUser"];
        assert_eq!(mutation.mutation_type, Some(MutationType::Delete));
    }
}
