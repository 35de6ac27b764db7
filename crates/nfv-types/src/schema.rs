//! Declared attribute schemas for typed records.
//!
//! A [`RecordSchema`] is the closed set of attributes a record type may
//! carry. Schemas are built explicitly with [`RecordSchemaBuilder`] and
//! collected into a [`SchemaRegistry`], which is owned by whoever needs it
//! (typically the harness context) rather than cached globally.

use crate::instance::{InstantiationState, VnfState};
use crate::record::TypedRecord;
use crate::SchemaError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type of a declared attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrType {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Boolean flag.
    Boolean,
    /// String restricted to a closed set of values.
    Enum(&'static [&'static str]),
    /// Nested typed record of the named schema.
    Record(&'static str),
    /// Homogeneous sequence; every element is validated on every mutation.
    Sequence(Box<AttrType>),
}

impl AttrType {
    /// Shorthand for a sequence of `elem`.
    pub fn seq(elem: AttrType) -> Self {
        AttrType::Sequence(Box::new(elem))
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::String => write!(f, "string"),
            AttrType::Integer => write!(f, "integer"),
            AttrType::Boolean => write!(f, "boolean"),
            AttrType::Enum(values) => write!(f, "enum{:?}", values),
            AttrType::Record(name) => write!(f, "record<{}>", name),
            AttrType::Sequence(elem) => write!(f, "sequence<{}>", elem),
        }
    }
}

/// A single declared attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub ty: AttrType,
    pub required: bool,
}

/// Closed attribute set for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    name: &'static str,
    attrs: Vec<AttrSpec>,
}

impl RecordSchema {
    /// Starts building a schema for the named record type.
    pub fn builder(name: &'static str) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name,
            attrs: Vec::new(),
        }
    }

    /// Returns the record type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the declared attributes in declaration order.
    pub fn attrs(&self) -> &[AttrSpec] {
        &self.attrs
    }

    /// Looks up a declared attribute.
    pub fn attr(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Looks up a declared attribute, failing with `InvalidAttribute`.
    pub fn require_attr(&self, name: &str) -> Result<&AttrSpec, SchemaError> {
        self.attr(name).ok_or_else(|| SchemaError::InvalidAttribute {
            record: self.name.to_string(),
            attribute: name.to_string(),
        })
    }
}

/// Builder for [`RecordSchema`].
///
/// Declaring the same attribute twice keeps the last declaration.
#[derive(Debug)]
pub struct RecordSchemaBuilder {
    name: &'static str,
    attrs: Vec<AttrSpec>,
}

impl RecordSchemaBuilder {
    /// Declares a required attribute.
    pub fn required(self, name: &'static str, ty: AttrType) -> Self {
        self.attr(name, ty, true)
    }

    /// Declares an optional attribute.
    pub fn optional(self, name: &'static str, ty: AttrType) -> Self {
        self.attr(name, ty, false)
    }

    fn attr(mut self, name: &'static str, ty: AttrType, required: bool) -> Self {
        self.attrs.retain(|a| a.name != name);
        self.attrs.push(AttrSpec { name, ty, required });
        self
    }

    pub fn build(self) -> RecordSchema {
        RecordSchema {
            name: self.name,
            attrs: self.attrs,
        }
    }
}

/// Record type names of the built-in schemas.
pub mod names {
    pub const RESOURCE_HANDLE: &str = "ResourceHandle";
    pub const VNFC_RESOURCE_INFO: &str = "VnfcResourceInfo";
    pub const EXT_CP_INFO: &str = "ExtCpInfo";
    pub const INSTANTIATED_VNF_INFO: &str = "InstantiatedVnfInfo";
    pub const VNF_INSTANCE: &str = "VnfInstance";
    pub const NS_INSTANCE: &str = "NsInstance";
}

/// Set of known record schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, Arc<RecordSchema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the lifecycle record schemas.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_schemas(builtin_schemas())
    }

    /// Builds a closed registry from `schemas`.
    ///
    /// Fails on a repeated record type or on a nested reference to a type
    /// that is not in the set.
    pub fn from_schemas(
        schemas: impl IntoIterator<Item = RecordSchema>,
    ) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema)?;
        }
        registry.check_references()?;
        Ok(registry)
    }

    /// Adds a schema. Record types cannot be redefined once registered.
    pub fn register(&mut self, schema: RecordSchema) -> Result<(), SchemaError> {
        if self.schemas.contains_key(schema.name()) {
            return Err(SchemaError::DuplicateRecordType(schema.name().to_string()));
        }
        self.schemas.insert(schema.name(), Arc::new(schema));
        Ok(())
    }

    /// Returns the schema for a record type.
    pub fn get(&self, name: &str) -> Result<Arc<RecordSchema>, SchemaError> {
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownRecordType(name.to_string()))
    }

    /// Creates an empty record of the named type.
    pub fn new_record(&self, name: &str) -> Result<TypedRecord, SchemaError> {
        self.get(name).map(TypedRecord::new)
    }

    /// Returns true if a schema with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Checks that every nested record reference names a registered schema.
    pub fn check_references(&self) -> Result<(), SchemaError> {
        fn referenced(ty: &AttrType) -> Option<&'static str> {
            match ty {
                AttrType::Record(name) => Some(name),
                AttrType::Sequence(elem) => referenced(elem),
                _ => None,
            }
        }

        for schema in self.schemas.values() {
            for attr in schema.attrs() {
                if let Some(name) = referenced(&attr.ty) {
                    if !self.contains(name) {
                        return Err(SchemaError::UnknownRecordType(name.to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}

fn builtin_schemas() -> Vec<RecordSchema> {
    use names::*;

    vec![
        RecordSchema::builder(RESOURCE_HANDLE)
            .required("vimConnectionId", AttrType::String)
            .required("resourceId", AttrType::String)
            .optional("vimLevelResourceType", AttrType::String)
            .build(),
        RecordSchema::builder(VNFC_RESOURCE_INFO)
            .required("id", AttrType::String)
            .required("vduId", AttrType::String)
            .required("computeResource", AttrType::Record(RESOURCE_HANDLE))
            .build(),
        RecordSchema::builder(EXT_CP_INFO)
            .required("id", AttrType::String)
            .required("cpdId", AttrType::String)
            .required("addresses", AttrType::seq(AttrType::String))
            .optional("macAddress", AttrType::String)
            .build(),
        RecordSchema::builder(INSTANTIATED_VNF_INFO)
            .required("flavourId", AttrType::String)
            .required("vnfState", AttrType::Enum(VnfState::NAMES))
            .required(
                "vnfcResourceInfo",
                AttrType::seq(AttrType::Record(VNFC_RESOURCE_INFO)),
            )
            .required("extCpInfo", AttrType::seq(AttrType::Record(EXT_CP_INFO)))
            .build(),
        RecordSchema::builder(VNF_INSTANCE)
            .required("id", AttrType::String)
            .required("vnfdId", AttrType::String)
            .optional("vnfInstanceName", AttrType::String)
            .required(
                "instantiationState",
                AttrType::Enum(InstantiationState::NAMES),
            )
            .optional(
                "instantiatedVnfInfo",
                AttrType::Record(INSTANTIATED_VNF_INFO),
            )
            .build(),
        RecordSchema::builder(NS_INSTANCE)
            .required("id", AttrType::String)
            .required("nsdId", AttrType::String)
            .optional("nsInstanceName", AttrType::String)
            .required("nsState", AttrType::Enum(InstantiationState::NAMES))
            .optional("flavourId", AttrType::String)
            .optional("vnfInstance", AttrType::seq(AttrType::Record(VNF_INSTANCE)))
            .build(),
    ]
}
