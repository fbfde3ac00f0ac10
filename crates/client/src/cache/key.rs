use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use crate::{error::Result, http::query_pairs};

/// Group of cache entries that a mutation invalidates together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Categories,
    Journals,
    Summary,
    Profile,
    ApiKeys,
}

/// Kind of query a key addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    Categories,
    Category,
    JournalList,
    JournalInfinite,
    Journal,
    Summary,
    Profile,
    ApiKeys,
}

impl Family {
    pub fn path(self) -> &'static str {
        match self {
            Self::Categories => "finance/categories",
            Self::Category => "finance/categories/detail",
            Self::JournalList => "finance/journals/list",
            Self::JournalInfinite => "finance/journals/infinite",
            Self::Journal => "finance/journals/detail",
            Self::Summary => "finance/summary",
            Self::Profile => "auth/user",
            Self::ApiKeys => "users/api-keys",
        }
    }

    pub fn resource(self) -> Resource {
        match self {
            Self::Categories | Self::Category => Resource::Categories,
            Self::JournalList | Self::JournalInfinite | Self::Journal => Resource::Journals,
            Self::Summary => Resource::Summary,
            Self::Profile => Resource::Profile,
            Self::ApiKeys => Resource::ApiKeys,
        }
    }
}

/// Canonical cache key: a family plus its parameters, sorted by name.
///
/// Two keys built from the same parameters are equal no matter in which
/// order the parameters were supplied, and unset parameters are left out.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    family: Family,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            params: BTreeMap::new(),
        }
    }

    /// Builds a key from any serializable parameter struct; fields that
    /// serialize to `null` are skipped.
    pub fn with_params<P: Serialize + ?Sized>(family: Family, params: &P) -> Result<Self> {
        let params = query_pairs(serde_json::to_value(params)?)?
            .into_iter()
            .collect();
        Ok(Self { family, params })
    }

    #[must_use]
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn resource(&self) -> Resource {
        self.family.resource()
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family.path())?;
        for (index, (name, value)) in self.params.iter().enumerate() {
            let separator = if index == 0 { '?' } else { '&' };
            write!(f, "{separator}{name}={value}")?;
        }
        Ok(())
    }
}
