//! Two-store routing policy
//!
//! DMI keeps identity/profile data in the operational store and bulk intake
//! data in the analytical store. [`DatabaseRouter`] is the single place that
//! decides which store owns a domain; the storage layer consults it explicitly
//! for reads, writes, cross-record relations and migrations.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Domain tag owned by the analytical store.
pub const DATA_DOMAIN: &str = "data";

/// Physical data stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "store_alias"))]
pub enum Store {
    /// Identity, session and profile data (connection alias `default`).
    #[serde(rename = "default")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "default"))]
    Operational,
    /// Intake and analytics data (connection alias `msdat`).
    #[serde(rename = "msdat")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "msdat"))]
    Analytical,
}

impl Store {
    pub const ALL: [Store; 2] = [Store::Operational, Store::Analytical];

    /// Connection alias used in configuration and logs
    pub fn alias(&self) -> &'static str {
        match self {
            Store::Operational => "default",
            Store::Analytical => "msdat",
        }
    }
}

impl FromStr for Store {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" | "operational" => Ok(Store::Operational),
            "msdat" | "analytical" => Ok(Store::Analytical),
            _ => Err(anyhow::anyhow!("Invalid store alias: {}", s)),
        }
    }
}

impl Display for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.alias())
    }
}

/// Static domain-to-store policy.
///
/// Routing is a pure lookup: every domain in `analytical_domains` lives in the
/// analytical store, everything else in the operational store. Reads and writes
/// for a domain always resolve to the same store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRouter {
    analytical_domains: BTreeSet<String>,
}

impl Default for DatabaseRouter {
    fn default() -> Self {
        Self::new([DATA_DOMAIN])
    }
}

impl DatabaseRouter {
    pub fn new<I, S>(analytical_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            analytical_domains: analytical_domains
                .into_iter()
                .map(|d| d.into().trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn analytical_domains(&self) -> impl Iterator<Item = &str> {
        self.analytical_domains.iter().map(String::as_str)
    }

    fn owner(&self, domain: &str) -> Store {
        if self.analytical_domains.contains(&domain.trim().to_lowercase()) {
            Store::Analytical
        } else {
            Store::Operational
        }
    }

    /// Store that serves reads for `domain`
    pub fn route_for_read(&self, domain: &str) -> Store {
        self.owner(domain)
    }

    /// Store that receives writes for `domain`
    pub fn route_for_write(&self, domain: &str) -> Store {
        self.owner(domain)
    }

    /// Whether records living in stores `a` and `b` may reference each other.
    ///
    /// Takes connection aliases as recorded on loaded records. Relations are
    /// allowed inside one store and between the two known stores; any alias
    /// outside that set is rejected.
    pub fn allow_relation(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        a.parse::<Store>().is_ok() && b.parse::<Store>().is_ok()
    }

    /// Whether migrations for `domain` may run against `store`.
    ///
    /// Each domain's schema lives in exactly one store.
    pub fn allow_migrate(&self, store: Store, domain: &str) -> bool {
        store == self.owner(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_domain_routes_to_analytical() {
        let router = DatabaseRouter::default();
        assert_eq!(router.route_for_write("data"), Store::Analytical);
        assert_eq!(router.route_for_read("data"), Store::Analytical);
    }

    #[test]
    fn test_other_domains_route_to_operational() {
        let router = DatabaseRouter::default();
        for domain in ["users", "auth", "sessions", "dmi", ""] {
            assert_eq!(router.route_for_write(domain), Store::Operational);
        }
    }

    #[test]
    fn test_reads_and_writes_agree_for_every_domain() {
        let router = DatabaseRouter::new(["data", "survey"]);
        for domain in ["data", "survey", "users", "DATA", " data ", "contenttypes"] {
            assert_eq!(router.route_for_read(domain), router.route_for_write(domain));
        }
    }

    #[test]
    fn test_domain_matching_ignores_case_and_whitespace() {
        let router = DatabaseRouter::default();
        assert_eq!(router.route_for_write(" Data "), Store::Analytical);
    }

    #[test]
    fn test_allow_relation() {
        let router = DatabaseRouter::default();
        assert!(router.allow_relation("default", "default"));
        assert!(router.allow_relation("msdat", "msdat"));
        assert!(router.allow_relation("default", "msdat"));
        assert!(router.allow_relation("legacy", "legacy"));
        assert!(!router.allow_relation("default", "legacy"));
        assert!(!router.allow_relation("reporting", "msdat"));
    }

    #[test]
    fn test_allow_migrate_is_a_hard_partition() {
        let router = DatabaseRouter::default();
        assert!(router.allow_migrate(Store::Analytical, "data"));
        assert!(!router.allow_migrate(Store::Operational, "data"));
        assert!(router.allow_migrate(Store::Operational, "users"));
        assert!(!router.allow_migrate(Store::Analytical, "users"));

        for domain in ["data", "users", "auth"] {
            let owners: Vec<Store> = Store::ALL
                .into_iter()
                .filter(|s| router.allow_migrate(*s, domain))
                .collect();
            assert_eq!(owners.len(), 1, "domain {} must have one owner", domain);
        }
    }

    #[test]
    fn test_store_alias_round_trip() {
        assert_eq!("default".parse::<Store>().unwrap(), Store::Operational);
        assert_eq!("MSDAT".parse::<Store>().unwrap(), Store::Analytical);
        assert!("reporting".parse::<Store>().is_err());
        assert_eq!(Store::Analytical.to_string(), "msdat");
    }
}
