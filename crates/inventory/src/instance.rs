use core::str::FromStr;

use serde::{Deserialize, Serialize};

use handreceipt_core::{InstanceId, LocationId, UnitId};

use crate::search::SearchQuery;

/// Group name given to records that arrive without one.
pub const UNKNOWN_GROUP: &str = "unknown";

/// Item record as delivered by the external inventory system.
///
/// Every field is optional; `ItemInstance::normalize` decides the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInstanceRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub id_number: Option<String>,
    pub report_required: Option<bool>,
    pub allocation: Option<RawAllocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAllocation {
    pub location: Option<RawNamedRef>,
    pub unit: Option<RawNamedRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawNamedRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Options applied while normalizing raw records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub unknown_group: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            unknown_group: UNKNOWN_GROUP.to_string(),
        }
    }
}

/// Identity part of an allocation: which location and unit an instance sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllocationKey {
    pub location: Option<LocationId>,
    pub unit: Option<UnitId>,
}

impl AllocationKey {
    pub fn new(location: Option<LocationId>, unit: Option<UnitId>) -> Self {
        Self { location, unit }
    }

    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.unit.is_none()
    }

    /// Whether this allocation satisfies a (possibly partial) home hint.
    ///
    /// Every id present in the hint must match; an empty hint matches nothing.
    pub fn matches_hint(&self, hint: &AllocationKey) -> bool {
        if hint.is_empty() {
            return false;
        }
        hint.location.is_none_or(|l| self.location == Some(l))
            && hint.unit.is_none_or(|u| self.unit == Some(u))
    }
}

/// The (location, unit) pair an instance is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub key: AllocationKey,
    pub location_name: String,
    pub unit_name: String,
}

impl Allocation {
    pub fn new(key: AllocationKey, location_name: impl Into<String>, unit_name: impl Into<String>) -> Self {
        Self {
            key,
            location_name: location_name.into(),
            unit_name: unit_name.into(),
        }
    }

    /// "location / unit", skipping blank parts.
    pub fn display_name(&self) -> String {
        [self.location_name.as_str(), self.unit_name.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    fn from_raw(raw: &RawAllocation) -> Option<Self> {
        let (location, location_name) = split_ref::<LocationId>(raw.location.as_ref());
        let (unit, unit_name) = split_ref::<UnitId>(raw.unit.as_ref());
        let key = AllocationKey { location, unit };
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key,
            location_name,
            unit_name,
        })
    }
}

fn split_ref<I: FromStr>(raw: Option<&RawNamedRef>) -> (Option<I>, String) {
    let Some(raw) = raw else {
        return (None, String::new());
    };
    let id = raw.id.as_deref().and_then(|s| s.parse::<I>().ok());
    let name = raw.name.as_deref().map(str::trim).unwrap_or_default().to_string();
    (id, name)
}

/// Identifies one fungible supply pool: ordinary instances sharing group name
/// and allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolKey {
    pub group: String,
    pub allocation: Option<AllocationKey>,
}

impl PoolKey {
    pub fn new(group: impl Into<String>, allocation: Option<AllocationKey>) -> Self {
        Self {
            group: group.into(),
            allocation,
        }
    }
}

impl core::fmt::Display for PoolKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.allocation {
            Some(a) => write!(
                f,
                "{} @ {}/{}",
                self.group,
                a.location.map(|l| l.to_string()).unwrap_or_else(|| "-".into()),
                a.unit.map(|u| u.to_string()).unwrap_or_else(|| "-".into()),
            ),
            None => write!(f, "{} @ unallocated", self.group),
        }
    }
}

/// One inventory unit, normalized and read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInstance {
    id: InstanceId,
    group: String,
    serial: Option<String>,
    report_required: bool,
    allocation: Option<Allocation>,
}

impl ItemInstance {
    /// An ordinary, unallocated instance of `group`.
    pub fn new(id: InstanceId, group: impl Into<String>) -> Self {
        let group = group.into().trim().to_string();
        Self {
            id,
            group: if group.is_empty() { UNKNOWN_GROUP.to_string() } else { group },
            serial: None,
            report_required: false,
            allocation: None,
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        let serial = serial.into().trim().to_string();
        self.serial = (!serial.is_empty()).then_some(serial);
        self
    }

    pub fn with_report_required(mut self, report_required: bool) -> Self {
        self.report_required = report_required;
        self
    }

    pub fn with_allocation(mut self, allocation: Allocation) -> Self {
        self.allocation = (!allocation.key.is_empty()).then_some(allocation);
        self
    }

    /// Normalization constructor for provider records.
    ///
    /// Missing or blank values degrade to defaults. Returns `None` only when the
    /// record carries no parsable identity.
    pub fn normalize(raw: &RawInstanceRecord, options: &NormalizeOptions) -> Option<Self> {
        let id = raw.id.as_deref()?.parse::<InstanceId>().ok()?;

        let group = raw.name.as_deref().map(str::trim).unwrap_or_default();
        let group = if group.is_empty() {
            options.unknown_group.clone()
        } else {
            group.to_string()
        };

        let serial = raw
            .id_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Some(Self {
            id,
            group,
            serial,
            report_required: raw.report_required.unwrap_or(false),
            allocation: raw.allocation.as_ref().and_then(Allocation::from_raw),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub fn is_report_required(&self) -> bool {
        self.report_required
    }

    pub fn allocation(&self) -> Option<&Allocation> {
        self.allocation.as_ref()
    }

    pub fn allocation_key(&self) -> Option<AllocationKey> {
        self.allocation.as_ref().map(|a| a.key)
    }

    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(self.group.clone(), self.allocation_key())
    }

    /// Matches group name, serial, or allocation name (location, unit, or
    /// the combined "location / unit" label).
    pub fn matches(&self, query: &SearchQuery) -> bool {
        if query.matches(&self.group) {
            return true;
        }
        if self.serial.as_deref().is_some_and(|s| query.matches(s)) {
            return true;
        }
        self.allocation.as_ref().is_some_and(|a| {
            query.matches(&a.location_name)
                || query.matches(&a.unit_name)
                || query.matches(&a.display_name())
        })
    }
}
