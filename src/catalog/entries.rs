//! Static catalog entries.
//!
//! Every kind the client can reconcile is registered here. Field order in an
//! entry is the order in which field deltas are reported.

use std::str::FromStr;

use serde::Serialize;

use crate::api::HttpMethod;
use crate::error::CatalogError;

/// Apstra resource kinds known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum ResourceKind {
    /// Fabric blueprint.
    Blueprint,
    /// IPv4 address pool.
    IpPool,
    /// IPv6 address pool.
    Ipv6Pool,
    /// ASN pool.
    AsnPool,
    /// VLAN pool.
    VlanPool,
    /// VNI pool.
    VniPool,
    /// External router.
    ExternalRouter,
    /// Logical device design element.
    LogicalDevice,
    /// Interface map design element.
    InterfaceMap,
    /// Rack type design element.
    RackType,
    /// Template design element.
    Template,
}

/// How a field is compared between desired and current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Plain JSON equality.
    Scalar,
    /// List compared as a set: order and duplicates are ignored.
    Set,
    /// List compared element by element, in order.
    Sequence,
}

/// How list elements of a field look on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    /// Elements are sent and received as-is.
    Plain,
    /// Elements are CIDR strings, wrapped as `{"network": ...}` on the wire.
    Networks,
    /// Elements are `{first, last}` ranges; server-side extras are dropped.
    Ranges,
}

/// A comparable field of a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Attribute name, as used in requests and API payloads.
    pub name: &'static str,
    /// Equality rule.
    pub comparison: Comparison,
    /// Wire representation of list elements.
    pub shape: WireShape,
}

/// Catalog entry for one resource kind.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Collection path, relative to the API root.
    pub path: &'static str,
    /// Attribute holding the user-chosen identity.
    pub identity_field: &'static str,
    /// Comparable fields, in reporting order.
    pub fields: &'static [FieldSpec],
    /// Verb used for in-place updates.
    pub update_method: HttpMethod,
}

impl FieldSpec {
    const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            comparison: Comparison::Scalar,
            shape: WireShape::Plain,
        }
    }

    const fn set(name: &'static str, shape: WireShape) -> Self {
        Self {
            name,
            comparison: Comparison::Set,
            shape,
        }
    }

    const fn sequence(name: &'static str) -> Self {
        Self {
            name,
            comparison: Comparison::Sequence,
            shape: WireShape::Plain,
        }
    }
}

const SUBNET_POOL_FIELDS: &[FieldSpec] = &[
    FieldSpec::set("subnets", WireShape::Networks),
    FieldSpec::set("tags", WireShape::Plain),
];

const RANGE_POOL_FIELDS: &[FieldSpec] = &[
    FieldSpec::set("ranges", WireShape::Ranges),
    FieldSpec::set("tags", WireShape::Plain),
];

/// Entries are laid out in `ResourceKind` declaration order.
static ENTRIES: [CatalogEntry; 11] = [
    CatalogEntry {
        kind: ResourceKind::Blueprint,
        path: "blueprints",
        identity_field: "label",
        fields: &[
            FieldSpec::scalar("design"),
            FieldSpec::scalar("init_type"),
            FieldSpec::scalar("template_id"),
        ],
        update_method: HttpMethod::Patch,
    },
    CatalogEntry {
        kind: ResourceKind::IpPool,
        path: "resources/ip-pools",
        identity_field: "display_name",
        fields: SUBNET_POOL_FIELDS,
        update_method: HttpMethod::Put,
    },
    CatalogEntry {
        kind: ResourceKind::Ipv6Pool,
        path: "resources/ipv6-pools",
        identity_field: "display_name",
        fields: SUBNET_POOL_FIELDS,
        update_method: HttpMethod::Put,
    },
    CatalogEntry {
        kind: ResourceKind::AsnPool,
        path: "resources/asn-pools",
        identity_field: "display_name",
        fields: RANGE_POOL_FIELDS,
        update_method: HttpMethod::Put,
    },
    CatalogEntry {
        kind: ResourceKind::VlanPool,
        path: "resources/vlan-pools",
        identity_field: "display_name",
        fields: RANGE_POOL_FIELDS,
        update_method: HttpMethod::Put,
    },
    CatalogEntry {
        kind: ResourceKind::VniPool,
        path: "resources/vni-pools",
        identity_field: "display_name",
        fields: RANGE_POOL_FIELDS,
        update_method: HttpMethod::Put,
    },
    CatalogEntry {
        kind: ResourceKind::ExternalRouter,
        path: "resources/external-routers",
        identity_field: "display_name",
        fields: &[
            FieldSpec::scalar("address"),
            FieldSpec::scalar("ipv6_address"),
            FieldSpec::scalar("asn"),
        ],
        update_method: HttpMethod::Put,
    },
    CatalogEntry {
        kind: ResourceKind::LogicalDevice,
        path: "design/logical-devices",
        identity_field: "display_name",
        fields: &[FieldSpec::sequence("panels")],
        update_method: HttpMethod::Put,
    },
    CatalogEntry {
        kind: ResourceKind::InterfaceMap,
        path: "design/interface-maps",
        identity_field: "label",
        fields: &[
            FieldSpec::scalar("device_profile_id"),
            FieldSpec::scalar("logical_device_id"),
            FieldSpec::sequence("interfaces"),
        ],
        update_method: HttpMethod::Put,
    },
    CatalogEntry {
        kind: ResourceKind::RackType,
        path: "design/rack-types",
        identity_field: "id",
        fields: &[
            FieldSpec::scalar("description"),
            FieldSpec::sequence("leafs"),
            FieldSpec::sequence("access_switches"),
            FieldSpec::sequence("logical_devices"),
            FieldSpec::sequence("servers"),
        ],
        update_method: HttpMethod::Put,
    },
    CatalogEntry {
        kind: ResourceKind::Template,
        path: "design/templates",
        identity_field: "display_name",
        fields: &[
            FieldSpec::scalar("type"),
            FieldSpec::scalar("spine"),
            FieldSpec::sequence("rack_types"),
            FieldSpec::scalar("rack_type_counts"),
            FieldSpec::scalar("asn_allocation_policy"),
            FieldSpec::scalar("dhcp_service_intent"),
            FieldSpec::scalar("external_routing_policy"),
            FieldSpec::scalar("fabric_addressing_policy"),
            FieldSpec::scalar("virtual_network_policy"),
        ],
        update_method: HttpMethod::Put,
    },
];

impl ResourceKind {
    /// All registered kinds, in catalog order.
    pub const ALL: [Self; 11] = [
        Self::Blueprint,
        Self::IpPool,
        Self::Ipv6Pool,
        Self::AsnPool,
        Self::VlanPool,
        Self::VniPool,
        Self::ExternalRouter,
        Self::LogicalDevice,
        Self::InterfaceMap,
        Self::RackType,
        Self::Template,
    ];

    /// Returns the API name of this kind (the collection name).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blueprint => "blueprints",
            Self::IpPool => "ip-pools",
            Self::Ipv6Pool => "ipv6-pools",
            Self::AsnPool => "asn-pools",
            Self::VlanPool => "vlan-pools",
            Self::VniPool => "vni-pools",
            Self::ExternalRouter => "external-routers",
            Self::LogicalDevice => "logical-devices",
            Self::InterfaceMap => "interface-maps",
            Self::RackType => "rack-types",
            Self::Template => "templates",
        }
    }
}

impl FromStr for ResourceKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let plural = if normalized.ends_with('s') {
            normalized.clone()
        } else {
            format!("{normalized}s")
        };

        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == plural)
            .ok_or_else(|| CatalogError::UnknownKind {
                kind: s.to_string(),
            })
    }
}

impl From<ResourceKind> for &'static str {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str()
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CatalogEntry {
    /// Returns the field spec with the given name, if it is comparable.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Path of a single object of this kind.
    #[must_use]
    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{id}", self.path)
    }
}

/// Returns the catalog entry for a kind.
#[must_use]
pub fn entry(kind: ResourceKind) -> &'static CatalogEntry {
    &ENTRIES[kind as usize]
}

/// Looks up the catalog entry for a kind string.
///
/// Accepts the API collection name (`ip-pools`) as well as the singular form
/// (`ip-pool`).
///
/// # Errors
///
/// Returns `UnknownKind` if the string matches no registered entry.
pub fn lookup(kind: &str) -> Result<&'static CatalogEntry, CatalogError> {
    kind.parse::<ResourceKind>().map(entry)
}

/// Returns every catalog entry.
#[must_use]
pub fn entries() -> &'static [CatalogEntry] {
    &ENTRIES
}
