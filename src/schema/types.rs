use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use super::ordered::deserialize_ordered_inputs;

/// Raw `kind` tag of a type descriptor in the compiled files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Enum,
    Union,
    Interface,
    InputObject,
    List,
    NonNull,
}

/// A GraphQL type reference with `LIST`/`NON_NULL` wrappers unfolded into a
/// recursive enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Scalar(String),
    Object(String),
    Enum(String),
    Union(String),
    Interface(String),
    InputObject(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeRef::Scalar(_) => TypeKind::Scalar,
            TypeRef::Object(_) => TypeKind::Object,
            TypeRef::Enum(_) => TypeKind::Enum,
            TypeRef::Union(_) => TypeKind::Union,
            TypeRef::Interface(_) => TypeKind::Interface,
            TypeRef::InputObject(_) => TypeKind::InputObject,
            TypeRef::NonNull(_) => TypeKind::NonNull,
            TypeRef::List(_) => TypeKind::List,
        }
    }

    /// Unwraps every `NON_NULL`/`LIST` layer.
    pub fn base(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.base(),
            other => other,
        }
    }

    pub fn base_name(&self) -> &str {
        match self.base() {
            TypeRef::Scalar(name)
            | TypeRef::Object(name)
            | TypeRef::Enum(name)
            | TypeRef::Union(name)
            | TypeRef::Interface(name)
            | TypeRef::InputObject(name) => name,
            TypeRef::NonNull(_) | TypeRef::List(_) => unreachable!("base() never returns a wrapper"),
        }
    }

    /// Scalars and enums need no sub-selection.
    pub fn is_simple_scalar(&self) -> bool {
        matches!(self.base(), TypeRef::Scalar(_) | TypeRef::Enum(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => inner.is_list(),
            _ => false,
        }
    }

    fn from_parts(kind: TypeKind, name: Option<String>, of_type: Option<RawTypeRef>) -> Result<Self, String> {
        let wrap = |of_type: Option<RawTypeRef>| -> Result<Box<TypeRef>, String> {
            let inner = of_type.ok_or_else(|| format!("{kind:?} descriptor without ofType"))?;
            Ok(Box::new(TypeRef::try_from(inner)?))
        };
        let leaf = |name: Option<String>| name.ok_or_else(|| format!("{kind:?} descriptor without a type name"));

        Ok(match kind {
            TypeKind::NonNull => TypeRef::NonNull(wrap(of_type)?),
            TypeKind::List => TypeRef::List(wrap(of_type)?),
            TypeKind::Scalar => TypeRef::Scalar(leaf(name)?),
            TypeKind::Object => TypeRef::Object(leaf(name)?),
            TypeKind::Enum => TypeRef::Enum(leaf(name)?),
            TypeKind::Union => TypeRef::Union(leaf(name)?),
            TypeKind::Interface => TypeRef::Interface(leaf(name)?),
            TypeKind::InputObject => TypeRef::InputObject(leaf(name)?),
        })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            _ => f.write_str(self.base_name()),
        }
    }
}

/// Descriptor as written in the compiled files: `{kind, name, type, ofType}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTypeRef {
    kind: TypeKind,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    type_name: Option<String>,
    #[serde(default, rename = "ofType")]
    of_type: Option<Box<RawTypeRef>>,
}

impl TryFrom<RawTypeRef> for TypeRef {
    type Error = String;

    fn try_from(raw: RawTypeRef) -> Result<Self, Self::Error> {
        let name = raw.type_name.or(raw.name);
        TypeRef::from_parts(raw.kind, name, raw.of_type.map(|b| *b))
    }
}

impl<'de> Deserialize<'de> for TypeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTypeRef::deserialize(deserializer)?;
        TypeRef::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// An argument of an operation or field, or a field of an input object. The
/// descriptor's `name` is the argument name, so only `type` names the type.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawInputValue {
    #[serde(default)]
    description: Option<String>,
    kind: TypeKind,
    #[serde(default, rename = "type")]
    type_name: Option<String>,
    #[serde(default, rename = "ofType")]
    of_type: Option<RawTypeRef>,
    #[serde(default, rename = "defaultValue")]
    default_value: Option<serde_json::Value>,
}

impl RawInputValue {
    pub(crate) fn into_input(self, name: String) -> Result<InputValue, String> {
        let ty = TypeRef::from_parts(self.kind, self.type_name, self.of_type)
            .map_err(|e| format!("input '{name}': {e}"))?;
        Ok(InputValue {
            name,
            description: self.description,
            ty,
            default_value: self.default_value,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MutationType {
    Create,
    Update,
    Delete,
    Unknown,
}

static CREATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)create|add|insert").expect("valid regex"));
static UPDATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)update|modify|edit").expect("valid regex"));
static DELETE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)delete|remove|erase").expect("valid regex"));

impl MutationType {
    /// Infers the mutation type from its name, then from its description.
    pub fn infer(name: &str, description: Option<&str>) -> MutationType {
        let classify = |text: &str| {
            if CREATE_RE.is_match(text) {
                Some(MutationType::Create)
            } else if UPDATE_RE.is_match(text) {
                Some(MutationType::Update)
            } else if DELETE_RE.is_match(text) {
                Some(MutationType::Delete)
            } else {
                None
            }
        };
        classify(name)
            .or_else(|| description.and_then(classify))
            .unwrap_or(MutationType::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationType::Create => "CREATE",
            MutationType::Update => "UPDATE",
            MutationType::Delete => "DELETE",
            MutationType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the producer used when the compiler could not match a dependency.
pub const UNKNOWN_PRODUCER: &str = "UNKNOWN";

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A Query or Mutation entry point.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(skip, default = "default_kind")]
    pub kind: OperationKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_ordered_inputs")]
    pub inputs: Vec<InputValue>,
    pub output: TypeRef,
    #[serde(default, rename = "hardDependsOn", deserialize_with = "null_as_empty")]
    pub hard_depends_on: BTreeMap<String, String>,
    #[serde(default, rename = "softDependsOn", deserialize_with = "null_as_empty")]
    pub soft_depends_on: BTreeMap<String, String>,
    #[serde(default, rename = "mutationType")]
    pub mutation_type: Option<MutationType>,
}

fn default_kind() -> OperationKind {
    OperationKind::Query
}

impl Operation {
    pub fn input(&self, name: &str) -> Option<&InputValue> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawField")]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub inputs: Vec<InputValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawField {
    name: String,
    kind: TypeKind,
    #[serde(default, rename = "type")]
    type_name: Option<String>,
    #[serde(default, rename = "ofType")]
    of_type: Option<RawTypeRef>,
    #[serde(default, deserialize_with = "deserialize_ordered_inputs")]
    inputs: Vec<InputValue>,
}

impl TryFrom<RawField> for Field {
    type Error = String;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        let ty = TypeRef::from_parts(raw.kind, raw.type_name, raw.of_type)
            .map_err(|e| format!("field '{}': {e}", raw.name))?;
        Ok(Field {
            name: raw.name,
            ty,
            inputs: raw.inputs,
        })
    }
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            inputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectType {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, rename = "associatedQueries", deserialize_with = "null_as_empty_list")]
    pub associated_queries: Vec<String>,
    #[serde(
        default,
        rename = "associatedMutations",
        alias = "associatedMutatations",
        deserialize_with = "null_as_empty_list"
    )]
    pub associated_mutations: Vec<String>,
}

impl ObjectType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputObject {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "inputFields", deserialize_with = "deserialize_ordered_inputs")]
    pub input_fields: Vec<InputValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumValue {
    pub name: String,
    #[serde(default, rename = "isDeprecated")]
    pub is_deprecated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumType {
    #[serde(default, rename = "enumValues")]
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PossibleType {
    pub kind: TypeKind,
    #[serde(default)]
    pub name: Option<String>,
}

/// Shared shape of union and interface entries.
#[derive(Debug, Clone, Deserialize)]
pub struct AbstractType {
    #[serde(default, rename = "possibleTypes")]
    pub possible_types: Vec<PossibleType>,
}

impl AbstractType {
    /// Names of concrete object types this union/interface may resolve to.
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.possible_types
            .iter()
            .filter(|p| p.kind == TypeKind::Object)
            .filter_map(|p| p.name.as_deref())
    }
}
