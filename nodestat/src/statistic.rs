use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A materialized statistic: the values of its type's Related and Contains
/// properties, in schema order. Only the materializer builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistic {
    entity_type: String,
    values: Vec<(String, Value)>,
}

impl Statistic {
    pub(crate) fn new(entity_type: impl Into<String>, values: Vec<(String, Value)>) -> Self {
        Self {
            entity_type: entity_type.into(),
            values,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// `(property, value)` pairs in schema order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<(String, Value)> {
        self.values
    }

    /// Property values as a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}

struct OrderedValues<'a>(&'a [(String, Value)]);

impl Serialize for OrderedValues<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

impl Serialize for Statistic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Statistic", 2)?;
        state.serialize_field("type", &self.entity_type)?;
        state.serialize_field("properties", &OrderedValues(&self.values))?;
        state.end()
    }
}
