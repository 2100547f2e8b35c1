use serde::de::{MapAccess, Visitor};
use serde::Deserializer;
use std::fmt;

use super::types::{InputValue, RawInputValue};

/// Deserializes an `inputName -> descriptor` mapping into a list that keeps
/// the declared order. `null` yields an empty list.
pub(crate) fn deserialize_ordered_inputs<'de, D>(deserializer: D) -> Result<Vec<InputValue>, D::Error>
where
    D: Deserializer<'de>,
{
    struct InputsVisitor;

    impl<'de> Visitor<'de> for InputsVisitor {
        type Value = Vec<InputValue>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of input names to type descriptors")
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_some<D2: Deserializer<'de>>(self, deserializer: D2) -> Result<Self::Value, D2::Error> {
            deserializer.deserialize_map(InputsVisitor)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut inputs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, raw)) = map.next_entry::<String, RawInputValue>()? {
                inputs.push(raw.into_input(name).map_err(serde::de::Error::custom)?);
            }
            Ok(inputs)
        }
    }

    deserializer.deserialize_option(InputsVisitor)
}
