//! Package index port for discovering distributable packages.

/// A package the index knows about in relation to a queried module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHit {
    /// Published package name.
    pub package: String,
    /// `true` when the index knows this package provides the module,
    /// rather than merely having a similar name.
    pub provides: bool,
}

/// Looks up packages on a package index.
pub trait PackageIndex {
    /// Returns packages related to `module`: known providers and packages
    /// whose names resemble it.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be queried (network, timeout).
    fn lookup(
        &self,
        module: &str,
    ) -> Result<Vec<IndexHit>, Box<dyn std::error::Error + Send + Sync>>;

    /// Returns whether `package` is published on the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be queried.
    fn exists(&self, package: &str) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}
