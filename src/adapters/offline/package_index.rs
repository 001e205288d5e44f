//! Offline `PackageIndex` seeded from a fixed alias table.

use std::collections::{BTreeMap, BTreeSet};

use super::aliases::{KNOWN_ALIASES, KNOWN_PACKAGES};
use crate::ports::package_index::{IndexHit, PackageIndex};

/// Package index answering from an in-memory table.
///
/// `lookup` returns the providers recorded for the module followed by every
/// known package name, leaving similarity ranking to the resolver.
#[derive(Debug, Clone, Default)]
pub struct OfflinePackageIndex {
    providers: BTreeMap<String, BTreeSet<String>>,
    packages: BTreeSet<String>,
}

impl OfflinePackageIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates an index seeded with the built-in alias table.
    #[must_use]
    pub fn with_known_aliases() -> Self {
        let mut index = Self::empty();
        for (module, package) in KNOWN_ALIASES {
            index.add_alias(module, package);
        }
        for package in KNOWN_PACKAGES {
            index.add_package(package);
        }
        index
    }

    /// Records that `package` provides `module`.
    pub fn add_alias(&mut self, module: &str, package: &str) {
        self.providers.entry(module.to_string()).or_default().insert(package.to_string());
        self.packages.insert(package.to_string());
    }

    /// Records a published package name.
    pub fn add_package(&mut self, package: &str) {
        self.packages.insert(package.to_string());
    }
}

impl PackageIndex for OfflinePackageIndex {
    fn lookup(
        &self,
        module: &str,
    ) -> Result<Vec<IndexHit>, Box<dyn std::error::Error + Send + Sync>> {
        let providers = self.providers.get(module);
        let mut hits: Vec<IndexHit> = providers
            .into_iter()
            .flatten()
            .map(|package| IndexHit { package: package.clone(), provides: true })
            .collect();
        hits.extend(
            self.packages
                .iter()
                .filter(|p| !providers.is_some_and(|set| set.contains(*p)))
                .map(|package| IndexHit { package: package.clone(), provides: false }),
        );
        Ok(hits)
    }

    fn exists(&self, package: &str) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.packages.iter().any(|p| p.eq_ignore_ascii_case(package)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_alias_is_a_provider() {
        let index = OfflinePackageIndex::with_known_aliases();
        let hits = index.lookup("PIL").unwrap();
        assert_eq!(hits[0], IndexHit { package: "Pillow".into(), provides: true });
        assert!(hits[1..].iter().all(|h| !h.provides));
    }

    #[test]
    fn unknown_module_only_lists_known_packages() {
        let index = OfflinePackageIndex::with_known_aliases();
        let hits = index.lookup("foobarx").unwrap();
        assert!(hits.iter().all(|h| !h.provides));
        assert!(hits.iter().any(|h| h.package == "requests"));
    }

    #[test]
    fn exists_ignores_case() {
        let index = OfflinePackageIndex::with_known_aliases();
        assert!(index.exists("pyyaml").unwrap());
        assert!(!index.exists("not-a-package").unwrap());
    }

    #[test]
    fn empty_index_knows_nothing() {
        let index = OfflinePackageIndex::empty();
        assert!(index.lookup("yaml").unwrap().is_empty());
    }
}
