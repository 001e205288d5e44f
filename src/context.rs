//! Service context bundling all port trait objects.

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::package_index::LivePackageIndex;
use crate::adapters::live::prompt::TerminalPrompter;
use crate::adapters::offline::OfflinePackageIndex;
use crate::config::InspectConfig;
use crate::ports::{FileSystem, PackageIndex, Prompter};

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations.
pub struct ServiceContext {
    /// Filesystem for the codebase, declarations and context file.
    pub fs: Box<dyn FileSystem>,
    /// Package index for candidate lookups.
    pub index: Box<dyn PackageIndex>,
    /// Operator prompts; `None` when running without interaction.
    pub prompter: Option<Box<dyn Prompter>>,
}

impl ServiceContext {
    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(
        fs: Box<dyn FileSystem>,
        index: Box<dyn PackageIndex>,
        prompter: Option<Box<dyn Prompter>>,
    ) -> Self {
        Self { fs, index, prompter }
    }

    /// Creates a live context for `config`: the real filesystem, the online
    /// package index (or the built-in one when lookups are disabled) and a
    /// terminal prompter when interaction is allowed.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn live(config: &InspectConfig) -> Result<Self, String> {
        let index: Box<dyn PackageIndex> = if config.index.enabled {
            Box::new(LivePackageIndex::new(&config.index.url, config.index.timeout)?)
        } else {
            Box::new(OfflinePackageIndex::with_known_aliases())
        };
        let prompter: Option<Box<dyn Prompter>> = if config.interactive {
            Some(Box::new(TerminalPrompter::stdio()))
        } else {
            None
        };
        Ok(Self::new(Box::new(LiveFileSystem), index, prompter))
    }
}
