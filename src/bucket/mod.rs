//! Run-scoped memory of the objects and scalar values the target has
//! returned, used to fill dependent inputs in later requests.

mod scalar;

pub use scalar::{quote, PrimitiveKind, ScalarValue};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

use crate::errors::FuzzError;
use crate::schema::{CompiledSchema, TypeRef};

/// Random instance picks before a field lookup gives up.
const MAX_FIELD_LOOKUP_ATTEMPTS: usize = 5;
/// Nesting limit when harvesting nested objects out of a response.
const MAX_HARVEST_DEPTH: usize = 10;

pub type Instance = Map<String, Value>;

/// A stored value handed out to fill an input, and the field it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct UsedValue {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectsBucket {
    objects: BTreeMap<String, Vec<Instance>>,
    scalars: BTreeMap<String, BTreeSet<ScalarValue>>,
}

impl ObjectsBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every object instance and scalar leaf found in a response's
    /// `data` member.
    pub fn put(&mut self, data: &Value, schema: &CompiledSchema) {
        let Some(entries) = data.as_object() else {
            return;
        };
        for (key, value) in entries {
            if let Some(op) = schema.find_operation(key) {
                match op.output.base() {
                    TypeRef::Object(name) => self.record_instance(name, value, schema, 0),
                    TypeRef::Union(_) | TypeRef::Interface(_) => self.record_typed_instance(value, schema, 0),
                    _ => {}
                }
            }
            self.harvest_scalars(key, value);
        }
    }

    fn record_instance(&mut self, object_name: &str, value: &Value, schema: &CompiledSchema, depth: usize) {
        if depth > MAX_HARVEST_DEPTH {
            return;
        }
        match value {
            Value::Array(items) => {
                for item in items {
                    self.record_instance(object_name, item, schema, depth);
                }
            }
            Value::Object(map) if !map.is_empty() => {
                self.add_instance(object_name, map.clone());
                let Some(object) = schema.object(object_name) else {
                    return;
                };
                for field in &object.fields {
                    let Some(nested) = map.get(&field.name) else {
                        continue;
                    };
                    match field.ty.base() {
                        TypeRef::Object(name) => self.record_instance(name, nested, schema, depth + 1),
                        TypeRef::Union(_) | TypeRef::Interface(_) => {
                            self.record_typed_instance(nested, schema, depth + 1)
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Abstract types can only be stored when the response names the concrete
    /// type through `__typename`.
    fn record_typed_instance(&mut self, value: &Value, schema: &CompiledSchema, depth: usize) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.record_typed_instance(item, schema, depth);
                }
            }
            Value::Object(map) => {
                if let Some(type_name) = map.get("__typename").and_then(Value::as_str) {
                    if schema.object(type_name).is_some() {
                        self.record_instance(type_name, value, schema, depth);
                    }
                }
            }
            _ => {}
        }
    }

    fn harvest_scalars(&mut self, key: &str, value: &Value) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    self.harvest_scalars(k, v);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.harvest_scalars(key, item);
                }
            }
            other => {
                if let Some(scalar) = ScalarValue::from_json(other) {
                    self.scalars.entry(key.to_string()).or_default().insert(scalar);
                }
            }
        }
    }

    /// Appends an instance unless an identical one is already stored.
    pub fn add_instance(&mut self, object_name: &str, instance: Instance) {
        let entries = self.objects.entry(object_name.to_string()).or_default();
        if !entries.contains(&instance) {
            debug!(object = %object_name, "Recorded object instance");
            entries.push(instance);
        }
    }

    pub fn is_object_in_bucket(&self, name: &str) -> bool {
        self.objects.get(name).is_some_and(|entries| !entries.is_empty())
    }

    pub fn instances(&self, name: &str) -> &[Instance] {
        self.objects.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().filter(|(_, v)| !v.is_empty()).map(|(k, _)| k.as_str())
    }

    pub fn get_random_instance<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Option<&Instance> {
        self.objects.get(name)?.choose(rng)
    }

    /// Picks random instances until one has a non-null value for `field`.
    pub fn get_field_value<R: Rng + ?Sized>(&self, object_name: &str, field: &str, rng: &mut R) -> Option<Value> {
        let entries = self.objects.get(object_name)?;
        if !entries.iter().any(|i| i.get(field).is_some_and(|v| !v.is_null())) {
            return None;
        }
        for _ in 0..MAX_FIELD_LOOKUP_ATTEMPTS {
            let instance = entries.choose(rng)?;
            if let Some(value) = instance.get(field).filter(|v| !v.is_null()) {
                return Some(value.clone());
            }
        }
        None
    }

    /// Resolves an input name against an object's fields: the literal name
    /// first, then the name with the object's own name stripped (`userId`
    /// against `User` tries `id`), then the instance identifier.
    pub fn get_closest_value<R: Rng + ?Sized>(&self, input_name: &str, object_name: &str, rng: &mut R) -> Option<Value> {
        self.get_closest_field(input_name, object_name, rng).map(|used| used.value)
    }

    /// Same lookup as [`ObjectsBucket::get_closest_value`], keeping the name
    /// of the field the value was read from.
    pub fn get_closest_field<R: Rng + ?Sized>(
        &self,
        input_name: &str,
        object_name: &str,
        rng: &mut R,
    ) -> Option<UsedValue> {
        let used = |field: &str, value: Value| UsedValue {
            field: field.to_string(),
            value,
        };
        if let Some(value) = self.get_field_value(object_name, input_name, rng) {
            return Some(used(input_name, value));
        }

        let stripped = input_name
            .to_lowercase()
            .replace(&object_name.to_lowercase(), "")
            .replace(['_', ' '], "");
        if !stripped.is_empty() {
            let entries = self.objects.get(object_name)?;
            let matching_field = entries
                .iter()
                .flat_map(|i| i.keys())
                .find(|k| k.to_lowercase().replace('_', "") == stripped)
                .cloned();
            if let Some(field) = matching_field {
                if let Some(value) = self.get_field_value(object_name, &field, rng) {
                    return Some(used(&field, value));
                }
            }
        }

        self.get_field_value(object_name, "id", rng).map(|value| used("id", value))
    }

    pub fn scalar_values(&self, field: &str) -> Option<&BTreeSet<ScalarValue>> {
        self.scalars.get(field)
    }

    /// A random harvested value for the given field name.
    pub fn get_random_scalar<R: Rng + ?Sized>(&self, field: &str, rng: &mut R) -> Option<&ScalarValue> {
        let values = self.scalars.get(field)?;
        let candidates: Vec<&ScalarValue> = values.iter().collect();
        candidates.choose(rng).copied()
    }

    /// A random harvested value stored under any field whose name satisfies
    /// `predicate`.
    pub fn get_random_scalar_where<R, P>(&self, predicate: P, rng: &mut R) -> Option<&ScalarValue>
    where
        R: Rng + ?Sized,
        P: Fn(&str) -> bool,
    {
        let candidates: Vec<&ScalarValue> = self
            .scalars
            .iter()
            .filter(|(k, _)| predicate(k))
            .flat_map(|(_, v)| v.iter())
            .collect();
        candidates.choose(rng).copied()
    }

    /// Drops the first instance of `object_name` whose `used.field` equals
    /// `used.value`. Returns whether an instance was removed.
    pub fn remove_instance(&mut self, object_name: &str, used: &UsedValue) -> bool {
        let Some(entries) = self.objects.get_mut(object_name) else {
            return false;
        };
        match entries.iter().position(|instance| instance.get(&used.field) == Some(&used.value)) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.scalars.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.objects.values().all(Vec::is_empty) && self.scalars.is_empty()
    }

    /// Total stored object instances.
    pub fn instance_count(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    pub async fn save(&self, path: &Path) -> Result<(), FuzzError> {
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, FuzzError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaSources;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn schema() -> CompiledSchema {
        SchemaSources {
            queries: r#"
getPost:
  inputs: {}
  output: {kind: OBJECT, name: Post, type: Post}
"#
            .into(),
            mutations: r#"
createUser:
  inputs: {}
  output: {kind: OBJECT, name: User, type: User}
"#
            .into(),
            objects: r#"
User:
  fields:
    - {name: id, kind: SCALAR, type: ID, inputs: {}}
    - {name: name, kind: SCALAR, type: String, inputs: {}}
Post:
  fields:
    - {name: id, kind: SCALAR, type: ID, inputs: {}}
    - {name: author, kind: OBJECT, type: User, inputs: {}}
"#
            .into(),
            ..Default::default()
        }
        .parse()
        .unwrap()
    }

    #[test]
    fn test_put_records_operation_output() {
        let mut bucket = ObjectsBucket::new();
        bucket.put(&json!({"createUser": {"id": "u1", "name": "Ann"}}), &schema());
        assert!(bucket.is_object_in_bucket("User"));
        assert_eq!(bucket.instances("User").len(), 1);
        assert!(bucket.scalar_values("name").unwrap().contains(&ScalarValue::string("Ann")));
    }

    #[test]
    fn test_put_records_nested_objects() {
        let mut bucket = ObjectsBucket::new();
        bucket.put(
            &json!({"getPost": {"id": "p1", "author": {"id": "u9", "name": "Bo"}}}),
            &schema(),
        );
        assert!(bucket.is_object_in_bucket("Post"));
        assert_eq!(bucket.instances("User")[0]["id"], json!("u9"));
    }

    #[test]
    fn test_put_ignores_unknown_keys_but_harvests_scalars() {
        let mut bucket = ObjectsBucket::new();
        bucket.put(&json!({"somethingElse": {"token": "abc", "count": 3}}), &schema());
        assert_eq!(bucket.instance_count(), 0);
        assert!(bucket.scalar_values("token").is_some());
        assert!(bucket.scalar_values("count").unwrap().contains(&ScalarValue::from_json(&json!(3)).unwrap()));
    }

    #[test]
    fn test_duplicate_instances_are_stored_once() {
        let mut bucket = ObjectsBucket::new();
        let data = json!({"createUser": {"id": "u1", "name": "Ann"}});
        bucket.put(&data, &schema());
        bucket.put(&data, &schema());
        assert_eq!(bucket.instances("User").len(), 1);
    }

    #[test]
    fn test_field_value_skips_null_fields() {
        let mut bucket = ObjectsBucket::new();
        bucket.add_instance("User", json!({"id": "u1", "email": null}).as_object().unwrap().clone());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(bucket.get_field_value("User", "id", &mut rng), Some(json!("u1")));
        assert_eq!(bucket.get_field_value("User", "email", &mut rng), None);
        assert_eq!(bucket.get_field_value("Post", "id", &mut rng), None);
    }

    #[test]
    fn test_closest_value_strips_object_name() {
        let mut bucket = ObjectsBucket::new();
        bucket.add_instance("Person", json!({"id": 4, "name": "Cy"}).as_object().unwrap().clone());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(bucket.get_closest_value("personName", "Person", &mut rng), Some(json!("Cy")));
        assert_eq!(bucket.get_closest_value("person_id", "Person", &mut rng), Some(json!(4)));
        // Unrelated names fall back to the identifier
        assert_eq!(bucket.get_closest_value("owner", "Person", &mut rng), Some(json!(4)));
    }

    #[test]
    fn test_lookups_are_deterministic_for_a_seed() {
        let mut bucket = ObjectsBucket::new();
        for i in 0..10 {
            bucket.add_instance("User", json!({"id": format!("u{i}")}).as_object().unwrap().clone());
        }
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            bucket.get_field_value("User", "id", &mut rng)
        };
        assert_eq!(pick(42), pick(42));
    }

    #[test]
    fn test_remove_instance_only_drops_consumed_one() {
        let mut bucket = ObjectsBucket::new();
        for post in [
            json!({"id": 1, "version": 3}),
            json!({"id": 2, "version": 1}),
            json!({"id": 3, "parentId": 1}),
        ] {
            bucket.add_instance("Post", post.as_object().unwrap().clone());
        }
        let used = UsedValue {
            field: "id".into(),
            value: json!(1),
        };

        assert!(bucket.remove_instance("Post", &used));
        let ids: Vec<&Value> = bucket.instances("Post").iter().map(|p| &p["id"]).collect();
        assert_eq!(ids, vec![&json!(2), &json!(3)]);

        assert!(!bucket.remove_instance("Post", &used));
        assert!(!bucket.remove_instance("User", &used));
        assert_eq!(bucket.instance_count(), 2);
    }

    #[test]
    fn test_closest_field_reports_source_field() {
        let mut bucket = ObjectsBucket::new();
        bucket.add_instance("Person", json!({"id": 4, "name": "Cy"}).as_object().unwrap().clone());
        let mut rng = StdRng::seed_from_u64(1);
        let used = bucket.get_closest_field("personName", "Person", &mut rng).unwrap();
        assert_eq!(used, UsedValue { field: "name".into(), value: json!("Cy") });
        let used = bucket.get_closest_field("owner", "Person", &mut rng).unwrap();
        assert_eq!(used.field, "id");
    }

    #[tokio::test]
    async fn test_save_and_load_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects_bucket.json");
        let mut bucket = ObjectsBucket::new();
        bucket.put(&json!({"createUser": {"id": "u1", "name": "Ann"}}), &schema());
        bucket.save(&path).await.unwrap();

        let loaded = ObjectsBucket::load(&path).await.unwrap();
        assert_eq!(loaded.instances("User"), bucket.instances("User"));
        assert!(!path.with_extension("json.tmp").exists());
    }
}
