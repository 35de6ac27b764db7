//! VNF and NS instance records.
//!
//! Field names follow the ETSI NFV-SOL 003/005 JSON representation so the
//! records deserialize directly from VNFM/NFVO responses.

use crate::record::{ToRecord, TypedRecord, Value};
use crate::schema::{names, SchemaRegistry};
use crate::{ParseError, SchemaError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Instantiation state of a VNF or NS instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstantiationState {
    Instantiated,
    NotInstantiated,
}

impl InstantiationState {
    /// Wire names, in declaration order.
    pub const NAMES: &'static [&'static str] = &["INSTANTIATED", "NOT_INSTANTIATED"];

    pub const fn as_str(&self) -> &'static str {
        match self {
            InstantiationState::Instantiated => "INSTANTIATED",
            InstantiationState::NotInstantiated => "NOT_INSTANTIATED",
        }
    }
}

impl fmt::Display for InstantiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstantiationState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSTANTIATED" => Ok(InstantiationState::Instantiated),
            "NOT_INSTANTIATED" => Ok(InstantiationState::NotInstantiated),
            _ => Err(ParseError::InvalidInstantiationState(s.to_string())),
        }
    }
}

/// Operational state of an instantiated VNF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VnfState {
    #[default]
    Started,
    Stopped,
}

impl VnfState {
    pub const NAMES: &'static [&'static str] = &["STARTED", "STOPPED"];

    pub const fn as_str(&self) -> &'static str {
        match self {
            VnfState::Started => "STARTED",
            VnfState::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for VnfState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VnfState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTED" => Ok(VnfState::Started),
            "STOPPED" => Ok(VnfState::Stopped),
            _ => Err(ParseError::InvalidVnfState(s.to_string())),
        }
    }
}

/// Reference to a resource managed by a VIM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHandle {
    pub vim_connection_id: String,
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vim_level_resource_type: Option<String>,
}

impl ResourceHandle {
    pub fn new(vim_connection_id: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            vim_connection_id: vim_connection_id.into(),
            resource_id: resource_id.into(),
            vim_level_resource_type: None,
        }
    }
}

/// One deployed compute unit (VNFC) of a VNF instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnfcResourceInfo {
    pub id: String,
    /// VDU this unit implements.
    pub vdu_id: String,
    pub compute_resource: ResourceHandle,
}

/// One external network attachment of a VNF instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtCpInfo {
    pub id: String,
    /// Connection point descriptor id.
    pub cpd_id: String,
    #[serde(default)]
    pub addresses: Vec<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// Detail present only while a VNF is instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantiatedVnfInfo {
    pub flavour_id: String,
    #[serde(default)]
    pub vnf_state: VnfState,
    #[serde(default)]
    pub vnfc_resource_info: Vec<VnfcResourceInfo>,
    #[serde(default)]
    pub ext_cp_info: Vec<ExtCpInfo>,
}

/// Instantiation of an instance: either absent, or present with its detail.
///
/// Carrying the detail inside the `Instantiated` variant makes it
/// impossible to hold instantiated info for a non-instantiated instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instantiation<T> {
    NotInstantiated,
    Instantiated(T),
}

impl<T> Instantiation<T> {
    pub fn state(&self) -> InstantiationState {
        match self {
            Instantiation::NotInstantiated => InstantiationState::NotInstantiated,
            Instantiation::Instantiated(_) => InstantiationState::Instantiated,
        }
    }

    pub fn info(&self) -> Option<&T> {
        match self {
            Instantiation::NotInstantiated => None,
            Instantiation::Instantiated(info) => Some(info),
        }
    }

    fn from_parts(id: &str, state: InstantiationState, info: Option<T>) -> Result<Self, ParseError> {
        match (state, info) {
            (InstantiationState::Instantiated, Some(info)) => Ok(Instantiation::Instantiated(info)),
            (InstantiationState::NotInstantiated, None) => Ok(Instantiation::NotInstantiated),
            (state, _) => Err(ParseError::InstantiationMismatch {
                id: id.to_string(),
                state: state.to_string(),
            }),
        }
    }
}

/// A VNF instance as reported by a VNFM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VnfInstanceDoc", into = "VnfInstanceDoc")]
pub struct VnfInstance {
    pub id: String,
    pub vnfd_id: String,
    pub vnf_instance_name: Option<String>,
    pub instantiation: Instantiation<InstantiatedVnfInfo>,
}

impl VnfInstance {
    /// Creates a record for a freshly created, not yet instantiated VNF.
    pub fn not_instantiated(id: impl Into<String>, vnfd_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vnfd_id: vnfd_id.into(),
            vnf_instance_name: None,
            instantiation: Instantiation::NotInstantiated,
        }
    }

    pub fn instantiated(
        id: impl Into<String>,
        vnfd_id: impl Into<String>,
        info: InstantiatedVnfInfo,
    ) -> Self {
        Self {
            id: id.into(),
            vnfd_id: vnfd_id.into(),
            vnf_instance_name: None,
            instantiation: Instantiation::Instantiated(info),
        }
    }

    pub fn instantiation_state(&self) -> InstantiationState {
        self.instantiation.state()
    }

    pub fn instantiated_info(&self) -> Option<&InstantiatedVnfInfo> {
        self.instantiation.info()
    }

    pub fn is_instantiated(&self) -> bool {
        self.instantiated_info().is_some()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VnfInstanceDoc {
    id: String,
    vnfd_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vnf_instance_name: Option<String>,
    instantiation_state: InstantiationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instantiated_vnf_info: Option<InstantiatedVnfInfo>,
}

impl TryFrom<VnfInstanceDoc> for VnfInstance {
    type Error = ParseError;

    fn try_from(doc: VnfInstanceDoc) -> Result<Self, Self::Error> {
        let instantiation =
            Instantiation::from_parts(&doc.id, doc.instantiation_state, doc.instantiated_vnf_info)?;
        Ok(Self {
            id: doc.id,
            vnfd_id: doc.vnfd_id,
            vnf_instance_name: doc.vnf_instance_name,
            instantiation,
        })
    }
}

impl From<VnfInstance> for VnfInstanceDoc {
    fn from(vnf: VnfInstance) -> Self {
        let instantiation_state = vnf.instantiation_state();
        let instantiated_vnf_info = match vnf.instantiation {
            Instantiation::Instantiated(info) => Some(info),
            Instantiation::NotInstantiated => None,
        };
        Self {
            id: vnf.id,
            vnfd_id: vnf.vnfd_id,
            vnf_instance_name: vnf.vnf_instance_name,
            instantiation_state,
            instantiated_vnf_info,
        }
    }
}

/// Detail present only while an NS is instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiatedNsInfo {
    pub flavour_id: String,
    pub vnf_instance: Vec<VnfInstance>,
}

/// A network service instance as reported by an NFVO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NsInstanceDoc", into = "NsInstanceDoc")]
pub struct NsInstance {
    pub id: String,
    pub nsd_id: String,
    pub ns_instance_name: Option<String>,
    pub instantiation: Instantiation<InstantiatedNsInfo>,
}

impl NsInstance {
    pub fn instantiation_state(&self) -> InstantiationState {
        self.instantiation.state()
    }

    /// Member VNF instances; empty while not instantiated.
    pub fn vnf_instances(&self) -> &[VnfInstance] {
        self.instantiation
            .info()
            .map(|info| info.vnf_instance.as_slice())
            .unwrap_or(&[])
    }
}

// SOL005 keeps the instantiated detail flat on the NS record, keyed by the
// presence of flavourId.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NsInstanceDoc {
    id: String,
    nsd_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ns_instance_name: Option<String>,
    ns_state: InstantiationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flavour_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    vnf_instance: Vec<VnfInstance>,
}

impl TryFrom<NsInstanceDoc> for NsInstance {
    type Error = ParseError;

    fn try_from(doc: NsInstanceDoc) -> Result<Self, Self::Error> {
        let vnf_instance = doc.vnf_instance;
        let info = doc.flavour_id.map(|flavour_id| InstantiatedNsInfo {
            flavour_id,
            vnf_instance,
        });
        let instantiation = Instantiation::from_parts(&doc.id, doc.ns_state, info)?;
        Ok(Self {
            id: doc.id,
            nsd_id: doc.nsd_id,
            ns_instance_name: doc.ns_instance_name,
            instantiation,
        })
    }
}

impl From<NsInstance> for NsInstanceDoc {
    fn from(ns: NsInstance) -> Self {
        let ns_state = ns.instantiation_state();
        let (flavour_id, vnf_instance) = match ns.instantiation {
            Instantiation::Instantiated(info) => (Some(info.flavour_id), info.vnf_instance),
            Instantiation::NotInstantiated => (None, Vec::new()),
        };
        Self {
            id: ns.id,
            nsd_id: ns.nsd_id,
            ns_instance_name: ns.ns_instance_name,
            ns_state,
            flavour_id,
            vnf_instance,
        }
    }
}

impl ToRecord for ResourceHandle {
    fn to_record(&self, schemas: &SchemaRegistry) -> Result<TypedRecord, SchemaError> {
        let mut rec = schemas.new_record(names::RESOURCE_HANDLE)?;
        rec.set("vimConnectionId", self.vim_connection_id.as_str())?;
        rec.set("resourceId", self.resource_id.as_str())?;
        rec.set_opt("vimLevelResourceType", self.vim_level_resource_type.as_deref())?;
        Ok(rec)
    }
}

impl ToRecord for VnfcResourceInfo {
    fn to_record(&self, schemas: &SchemaRegistry) -> Result<TypedRecord, SchemaError> {
        schemas
            .new_record(names::VNFC_RESOURCE_INFO)?
            .with("id", self.id.as_str())?
            .with("vduId", self.vdu_id.as_str())?
            .with("computeResource", self.compute_resource.to_record(schemas)?)
    }
}

impl ToRecord for ExtCpInfo {
    fn to_record(&self, schemas: &SchemaRegistry) -> Result<TypedRecord, SchemaError> {
        let addresses: Vec<Value> = self
            .addresses
            .iter()
            .map(|a| Value::String(a.to_string()))
            .collect();
        let mut rec = schemas
            .new_record(names::EXT_CP_INFO)?
            .with("id", self.id.as_str())?
            .with("cpdId", self.cpd_id.as_str())?
            .with("addresses", addresses)?;
        rec.set_opt("macAddress", self.mac_address.as_deref())?;
        Ok(rec)
    }
}

impl ToRecord for InstantiatedVnfInfo {
    fn to_record(&self, schemas: &SchemaRegistry) -> Result<TypedRecord, SchemaError> {
        let mut rec = schemas
            .new_record(names::INSTANTIATED_VNF_INFO)?
            .with("flavourId", self.flavour_id.as_str())?
            .with("vnfState", self.vnf_state.as_str())?;

        let vnfcs = rec.sequence_mut("vnfcResourceInfo")?;
        for vnfc in &self.vnfc_resource_info {
            vnfcs.push(vnfc.to_record(schemas)?)?;
        }
        let cps = rec.sequence_mut("extCpInfo")?;
        for cp in &self.ext_cp_info {
            cps.push(cp.to_record(schemas)?)?;
        }
        Ok(rec)
    }
}

impl ToRecord for VnfInstance {
    fn to_record(&self, schemas: &SchemaRegistry) -> Result<TypedRecord, SchemaError> {
        let mut rec = schemas
            .new_record(names::VNF_INSTANCE)?
            .with("id", self.id.as_str())?
            .with("vnfdId", self.vnfd_id.as_str())?
            .with("instantiationState", self.instantiation_state().as_str())?;
        rec.set_opt("vnfInstanceName", self.vnf_instance_name.as_deref())?;
        if let Some(info) = self.instantiated_info() {
            rec.set("instantiatedVnfInfo", info.to_record(schemas)?)?;
        }
        Ok(rec)
    }
}

impl ToRecord for NsInstance {
    fn to_record(&self, schemas: &SchemaRegistry) -> Result<TypedRecord, SchemaError> {
        let mut rec = schemas
            .new_record(names::NS_INSTANCE)?
            .with("id", self.id.as_str())?
            .with("nsdId", self.nsd_id.as_str())?
            .with("nsState", self.instantiation_state().as_str())?;
        rec.set_opt("nsInstanceName", self.ns_instance_name.as_deref())?;
        if let Some(info) = self.instantiation.info() {
            rec.set("flavourId", info.flavour_id.as_str())?;
            let members = rec.sequence_mut("vnfInstance")?;
            for vnf in &info.vnf_instance {
                members.push(vnf.to_record(schemas)?)?;
            }
        }
        Ok(rec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_info() -> InstantiatedVnfInfo {
        InstantiatedVnfInfo {
            flavour_id: "simple".to_string(),
            vnf_state: VnfState::Started,
            vnfc_resource_info: vec![VnfcResourceInfo {
                id: "vnfc-0".to_string(),
                vdu_id: "VDU1".to_string(),
                compute_resource: ResourceHandle::new("vim-1", "server-0"),
            }],
            ext_cp_info: vec![ExtCpInfo {
                id: "cp-0".to_string(),
                cpd_id: "CP1".to_string(),
                addresses: vec!["192.0.2.10".parse().unwrap()],
                mac_address: Some("fa:16:3e:00:00:01".to_string()),
            }],
        }
    }

    #[test]
    fn test_instantiation_state_parse() {
        assert_eq!(
            "INSTANTIATED".parse::<InstantiationState>().unwrap(),
            InstantiationState::Instantiated
        );
        assert!("instantiated".parse::<InstantiationState>().is_err());
        assert_eq!(InstantiationState::NotInstantiated.to_string(), "NOT_INSTANTIATED");
    }

    #[test]
    fn test_vnf_state_parse() {
        assert_eq!("STOPPED".parse::<VnfState>().unwrap(), VnfState::Stopped);
        assert_eq!(
            "PAUSED".parse::<VnfState>().unwrap_err(),
            ParseError::InvalidVnfState("PAUSED".to_string())
        );
    }

    #[test]
    fn test_deserialize_instantiated_vnf() {
        let doc = json!({
            "id": "vnf-1",
            "vnfdId": "vnfd-1",
            "instantiationState": "INSTANTIATED",
            "instantiatedVnfInfo": {
                "flavourId": "simple",
                "vnfState": "STARTED",
                "vnfcResourceInfo": [{
                    "id": "vnfc-0",
                    "vduId": "VDU1",
                    "computeResource": {"vimConnectionId": "vim-1", "resourceId": "server-0"}
                }],
                "extCpInfo": [{
                    "id": "cp-0",
                    "cpdId": "CP1",
                    "addresses": ["192.0.2.10"],
                    "macAddress": "fa:16:3e:00:00:01"
                }]
            }
        });
        let vnf: VnfInstance = serde_json::from_value(doc).unwrap();
        assert_eq!(vnf.instantiation_state(), InstantiationState::Instantiated);
        assert_eq!(vnf.instantiated_info(), Some(&sample_info()));
    }

    #[test]
    fn test_info_without_instantiated_state_rejected() {
        let doc = json!({
            "id": "vnf-1",
            "vnfdId": "vnfd-1",
            "instantiationState": "NOT_INSTANTIATED",
            "instantiatedVnfInfo": {"flavourId": "simple"}
        });
        let err = serde_json::from_value::<VnfInstance>(doc).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_instantiated_without_info_rejected() {
        let doc = json!({
            "id": "vnf-1",
            "vnfdId": "vnfd-1",
            "instantiationState": "INSTANTIATED"
        });
        assert!(serde_json::from_value::<VnfInstance>(doc).is_err());
    }

    #[test]
    fn test_not_instantiated_serializes_without_info() {
        let vnf = VnfInstance::not_instantiated("vnf-1", "vnfd-1");
        let json = serde_json::to_value(&vnf).unwrap();
        assert_eq!(
            json,
            json!({"id": "vnf-1", "vnfdId": "vnfd-1", "instantiationState": "NOT_INSTANTIATED"})
        );
    }

    #[test]
    fn test_ns_instance_members() {
        let doc = json!({
            "id": "ns-1",
            "nsdId": "nsd-1",
            "nsState": "INSTANTIATED",
            "flavourId": "default",
            "vnfInstance": [{
                "id": "vnf-1",
                "vnfdId": "vnfd-1",
                "instantiationState": "NOT_INSTANTIATED"
            }]
        });
        let ns: NsInstance = serde_json::from_value(doc).unwrap();
        assert_eq!(ns.vnf_instances().len(), 1);

        let doc = json!({"id": "ns-2", "nsdId": "nsd-1", "nsState": "NOT_INSTANTIATED"});
        let ns: NsInstance = serde_json::from_value(doc).unwrap();
        assert!(ns.vnf_instances().is_empty());
    }

    #[test]
    fn test_vnf_to_record_is_complete() {
        let schemas = SchemaRegistry::builtin().unwrap();
        let vnf = VnfInstance::instantiated("vnf-1", "vnfd-1", sample_info());
        let rec = vnf.to_record(&schemas).unwrap();
        rec.validate_complete().unwrap();

        let info = rec.get("instantiatedVnfInfo").and_then(Value::as_record).unwrap();
        assert_eq!(info.get_str("vnfState"), Some("STARTED"));
        assert_eq!(info.get("vnfcResourceInfo").and_then(Value::as_seq).unwrap().len(), 1);
    }

    #[test]
    fn test_not_instantiated_record_has_no_info() {
        let schemas = SchemaRegistry::builtin().unwrap();
        let rec = VnfInstance::not_instantiated("vnf-1", "vnfd-1")
            .to_record(&schemas)
            .unwrap();
        assert!(rec.get("instantiatedVnfInfo").is_none());
        rec.validate_complete().unwrap();
    }
}
