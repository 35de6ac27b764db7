//! Schema-validated record values.
//!
//! Every assignment to a [`TypedRecord`] is checked against its
//! [`RecordSchema`]. Sequence attributes are stored as [`TypedSeq`], which
//! keeps the element type and re-checks it on push, insert and index-set,
//! so a sequence cannot drift away from its declaration after the initial
//! assignment.

use crate::schema::{AttrType, RecordSchema, SchemaRegistry};
use crate::SchemaError;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A value held by a typed record attribute.
///
/// `List` is the input form for sequence attributes; once assigned it is
/// stored as `Sequence`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    Record(TypedRecord),
    List(Vec<Value>),
    Sequence(TypedSeq),
}

impl Value {
    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::String(_) => "string".to_string(),
            Value::Integer(_) => "integer".to_string(),
            Value::Boolean(_) => "boolean".to_string(),
            Value::Record(r) => format!("record<{}>", r.schema_name()),
            Value::List(_) => "list".to_string(),
            Value::Sequence(s) => format!("sequence<{}>", s.elem_type()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&TypedRecord> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&TypedSeq> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<TypedRecord> for Value {
    fn from(r: TypedRecord) -> Self {
        Value::Record(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Checks `value` against `ty`, normalizing lists into typed sequences.
fn coerce(record: &str, attribute: &str, ty: &AttrType, value: Value) -> Result<Value, SchemaError> {
    match (ty, value) {
        (AttrType::String, v @ Value::String(_)) => Ok(v),
        (AttrType::Integer, v @ Value::Integer(_)) => Ok(v),
        (AttrType::Boolean, v @ Value::Boolean(_)) => Ok(v),
        (AttrType::Enum(allowed), Value::String(s)) => {
            if allowed.contains(&s.as_str()) {
                Ok(Value::String(s))
            } else {
                Err(SchemaError::InvalidEnumValue {
                    record: record.to_string(),
                    attribute: attribute.to_string(),
                    value: s,
                    allowed: allowed.iter().map(|v| v.to_string()).collect(),
                })
            }
        }
        (AttrType::Record(name), Value::Record(r)) if r.schema_name() == *name => {
            Ok(Value::Record(r))
        }
        (AttrType::Sequence(elem), Value::List(items)) => {
            TypedSeq::from_items(record, attribute, (**elem).clone(), items).map(Value::Sequence)
        }
        (AttrType::Sequence(elem), Value::Sequence(seq)) if seq.elem == **elem => {
            // Re-home the container so later errors name this attribute.
            TypedSeq::from_items(record, attribute, seq.elem, seq.items).map(Value::Sequence)
        }
        (ty, v) => Err(SchemaError::TypeMismatch {
            record: record.to_string(),
            attribute: attribute.to_string(),
            expected: ty.to_string(),
            actual: v.type_name(),
        }),
    }
}

/// Sequence container bound to a declared element type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedSeq {
    record: String,
    attribute: String,
    elem: AttrType,
    items: Vec<Value>,
}

impl TypedSeq {
    /// Creates an empty sequence of `elem` owned by `record.attribute`.
    pub fn new(record: impl Into<String>, attribute: impl Into<String>, elem: AttrType) -> Self {
        Self {
            record: record.into(),
            attribute: attribute.into(),
            elem,
            items: Vec::new(),
        }
    }

    fn from_items(
        record: &str,
        attribute: &str,
        elem: AttrType,
        items: Vec<Value>,
    ) -> Result<Self, SchemaError> {
        let mut seq = Self::new(record, attribute, elem);
        for item in items {
            seq.push(item)?;
        }
        Ok(seq)
    }

    fn check(&self, value: Value) -> Result<Value, SchemaError> {
        coerce(&self.record, &self.attribute, &self.elem, value)
    }

    pub fn elem_type(&self) -> &AttrType {
        &self.elem
    }

    /// Appends an element after validating its type.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), SchemaError> {
        let value = self.check(value.into())?;
        self.items.push(value);
        Ok(())
    }

    /// Inserts an element at `index` after validating its type.
    pub fn insert(&mut self, index: usize, value: impl Into<Value>) -> Result<(), SchemaError> {
        if index > self.items.len() {
            return Err(self.out_of_bounds(index));
        }
        let value = self.check(value.into())?;
        self.items.insert(index, value);
        Ok(())
    }

    /// Replaces the element at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<Value, SchemaError> {
        if index >= self.items.len() {
            return Err(self.out_of_bounds(index));
        }
        let value = self.check(value.into())?;
        Ok(std::mem::replace(&mut self.items[index], value))
    }

    pub fn remove(&mut self, index: usize) -> Option<Value> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    fn out_of_bounds(&self, index: usize) -> SchemaError {
        SchemaError::IndexOutOfBounds {
            record: self.record.clone(),
            attribute: self.attribute.clone(),
            index,
            len: self.items.len(),
        }
    }
}

impl Serialize for TypedSeq {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

/// A record whose attributes are checked against a closed schema.
#[derive(Debug, Clone)]
pub struct TypedRecord {
    schema: Arc<RecordSchema>,
    values: BTreeMap<&'static str, Value>,
}

impl TypedRecord {
    /// Creates an empty record of the given schema.
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema.name()
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Assigns an attribute.
    ///
    /// Fails with `InvalidAttribute` for undeclared names and with a type
    /// error if the value does not match the declaration.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), SchemaError> {
        let spec = self.schema.require_attr(name)?;
        let value = coerce(self.schema.name(), spec.name, &spec.ty, value.into())?;
        let key = spec.name;
        self.values.insert(key, value);
        Ok(())
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, SchemaError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Assigns an attribute only when a value is present.
    pub fn set_opt<V: Into<Value>>(&mut self, name: &str, value: Option<V>) -> Result<(), SchemaError> {
        match value {
            Some(v) => self.set(name, v),
            None => {
                self.schema.require_attr(name)?;
                Ok(())
            }
        }
    }

    /// Returns an attribute value. Undeclared and unset names yield `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Returns a mutable handle to a sequence attribute.
    ///
    /// A declared but unset sequence attribute is initialized empty.
    pub fn sequence_mut(&mut self, name: &str) -> Result<&mut TypedSeq, SchemaError> {
        let spec = self.schema.require_attr(name)?;
        let elem = match &spec.ty {
            AttrType::Sequence(elem) => (**elem).clone(),
            other => {
                return Err(SchemaError::TypeMismatch {
                    record: self.schema.name().to_string(),
                    attribute: spec.name.to_string(),
                    expected: other.to_string(),
                    actual: "sequence".to_string(),
                })
            }
        };
        let record = self.schema.name();
        let key = spec.name;
        let slot = self
            .values
            .entry(key)
            .or_insert_with(|| Value::Sequence(TypedSeq::new(record, key, elem)));
        match slot {
            Value::Sequence(seq) => Ok(seq),
            // coerce() only ever stores sequences under sequence attributes
            other => Err(SchemaError::TypeMismatch {
                record: record.to_string(),
                attribute: key.to_string(),
                expected: "sequence".to_string(),
                actual: other.type_name(),
            }),
        }
    }

    /// Removes an attribute value.
    pub fn unset(&mut self, name: &str) -> Result<Option<Value>, SchemaError> {
        let key = self.schema.require_attr(name)?.name;
        Ok(self.values.remove(key))
    }

    /// Checks that every required attribute is set, recursing into nested
    /// records.
    pub fn validate_complete(&self) -> Result<(), SchemaError> {
        for spec in self.schema.attrs() {
            match self.values.get(spec.name) {
                None if spec.required => {
                    return Err(SchemaError::MissingAttribute {
                        record: self.schema.name().to_string(),
                        attribute: spec.name.to_string(),
                    })
                }
                Some(Value::Record(r)) => r.validate_complete()?,
                Some(Value::Sequence(seq)) => {
                    for item in seq.iter() {
                        if let Value::Record(r) = item {
                            r.validate_complete()?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for TypedRecord {
    fn eq(&self, other: &Self) -> bool {
        self.schema_name() == other.schema_name() && self.values == other.values
    }
}

impl Serialize for TypedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Conversion of a strongly-typed entity into its schema-validated form.
pub trait ToRecord {
    fn to_record(&self, schemas: &SchemaRegistry) -> Result<TypedRecord, SchemaError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::names;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builtin().unwrap()
    }

    fn handle(reg: &SchemaRegistry) -> TypedRecord {
        reg.new_record(names::RESOURCE_HANDLE)
            .unwrap()
            .with("vimConnectionId", "vim-1")
            .unwrap()
            .with("resourceId", "srv-1")
            .unwrap()
    }

    #[test]
    fn test_wrong_type_fails_at_assignment() {
        let reg = registry();
        let mut rec = reg.new_record(names::RESOURCE_HANDLE).unwrap();
        let err = rec.set("resourceId", 42i64).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
        assert!(rec.get("resourceId").is_none());
    }

    #[test]
    fn test_undeclared_attribute_fails() {
        let reg = registry();
        let mut rec = reg.new_record(names::RESOURCE_HANDLE).unwrap();
        assert_eq!(
            rec.set("tenant", "t1").unwrap_err(),
            SchemaError::InvalidAttribute {
                record: "ResourceHandle".to_string(),
                attribute: "tenant".to_string(),
            }
        );
    }

    #[test]
    fn test_enum_restricts_values() {
        let reg = registry();
        let mut rec = reg.new_record(names::VNF_INSTANCE).unwrap();
        rec.set("instantiationState", "INSTANTIATED").unwrap();
        let err = rec.set("instantiationState", "HALF_INSTANTIATED").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidEnumValue { .. }));
        assert_eq!(rec.get_str("instantiationState"), Some("INSTANTIATED"));
    }

    #[test]
    fn test_nested_record_type_checked() {
        let reg = registry();
        let mut vnfc = reg.new_record(names::VNFC_RESOURCE_INFO).unwrap();
        vnfc.set("computeResource", handle(&reg)).unwrap();

        let wrong = reg.new_record(names::EXT_CP_INFO).unwrap();
        assert!(matches!(
            vnfc.set("computeResource", wrong),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_sequence_revalidates_on_mutation() {
        let reg = registry();
        let mut cp = reg.new_record(names::EXT_CP_INFO).unwrap();
        cp.set("addresses", vec![Value::from("10.0.0.1")]).unwrap();

        let seq = cp.sequence_mut("addresses").unwrap();
        seq.push("10.0.0.2").unwrap();
        assert!(matches!(seq.push(7i64), Err(SchemaError::TypeMismatch { .. })));
        assert!(matches!(
            seq.insert(0, true),
            Err(SchemaError::TypeMismatch { .. })
        ));
        assert!(matches!(seq.set(1, 3i64), Err(SchemaError::TypeMismatch { .. })));
        assert_eq!(seq.set(1, "10.0.0.3").unwrap(), Value::from("10.0.0.2"));
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_sequence_initial_assignment_checked() {
        let reg = registry();
        let mut cp = reg.new_record(names::EXT_CP_INFO).unwrap();
        let err = cp
            .set("addresses", vec![Value::from("10.0.0.1"), Value::from(1i64)])
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_sequence_of_records() {
        let reg = registry();
        let mut info = reg.new_record(names::INSTANTIATED_VNF_INFO).unwrap();
        let vnfc = reg
            .new_record(names::VNFC_RESOURCE_INFO)
            .unwrap()
            .with("id", "vnfc-1")
            .unwrap()
            .with("vduId", "vdu-1")
            .unwrap()
            .with("computeResource", handle(&reg))
            .unwrap();

        let seq = info.sequence_mut("vnfcResourceInfo").unwrap();
        seq.push(vnfc).unwrap();
        assert!(matches!(
            seq.push(handle(&reg)),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_sequence_mut_on_scalar_rejected() {
        let reg = registry();
        let mut rec = reg.new_record(names::RESOURCE_HANDLE).unwrap();
        assert!(rec.sequence_mut("resourceId").is_err());
        assert!(rec.sequence_mut("nope").is_err());
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let mut seq = TypedSeq::new("R", "a", AttrType::String);
        assert!(matches!(
            seq.insert(1, "x"),
            Err(SchemaError::IndexOutOfBounds { index: 1, len: 0, .. })
        ));
        assert!(seq.remove(0).is_none());
    }

    #[test]
    fn test_validate_complete_recurses() {
        let reg = registry();
        let partial = reg
            .new_record(names::RESOURCE_HANDLE)
            .unwrap()
            .with("resourceId", "srv-1")
            .unwrap();
        let vnfc = reg
            .new_record(names::VNFC_RESOURCE_INFO)
            .unwrap()
            .with("id", "vnfc-1")
            .unwrap()
            .with("vduId", "vdu-1")
            .unwrap()
            .with("computeResource", partial)
            .unwrap();
        assert_eq!(
            vnfc.validate_complete().unwrap_err(),
            SchemaError::MissingAttribute {
                record: "ResourceHandle".to_string(),
                attribute: "vimConnectionId".to_string(),
            }
        );
    }

    #[test]
    fn test_serialize_record() {
        let reg = registry();
        let json = serde_json::to_value(handle(&reg)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"resourceId": "srv-1", "vimConnectionId": "vim-1"})
        );
    }
}
