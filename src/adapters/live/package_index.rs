//! Live adapter for the `PackageIndex` port using the PyPI JSON API.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::runtime::Runtime;

use crate::ports::package_index::{IndexHit, PackageIndex};

/// Default PyPI JSON API root.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

/// Live package index that probes PyPI for project pages.
///
/// Each probe is a blocking request bounded by the configured timeout.
/// Results are memoized for the lifetime of the adapter.
pub struct LivePackageIndex {
    client: Client,
    runtime: Runtime,
    base_url: String,
    timeout: Duration,
    cache: RefCell<HashMap<String, Option<String>>>,
}

impl LivePackageIndex {
    /// Creates a client for the index rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or async runtime cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to start runtime for index lookups: {e}"))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("packages-inspector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            runtime,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            cache: RefCell::new(HashMap::new()),
        })
    }

    /// Returns the canonical project name if `name` is published.
    fn probe(
        &self,
        name: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(cached.clone());
        }

        let url = format!("{}/{name}/json", self.base_url);
        let found = self.runtime.block_on(self.fetch(&url))?;

        tracing::debug!(name, ?found, "index probe");
        self.cache.borrow_mut().insert(name.to_string(), found.clone());
        Ok(found)
    }

    /// Requests one project page; `None` when the index has no such project.
    async fn fetch(
        &self,
        url: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| format!("timed out after {}s querying {url}", self.timeout.as_secs()))?
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(format!("index returned {} for {url}", status.as_u16()).into());
        }

        let body = response.text().await.map_err(|e| format!("reading {url} failed: {e}"))?;
        let name =
            project_name(&body).map_err(|e| format!("unreadable index response for {url}: {e}"))?;
        Ok(Some(name))
    }
}

/// Extracts the canonical project name from a project page body.
fn project_name(body: &str) -> Result<String, serde_json::Error> {
    let page: ProjectPage = serde_json::from_str(body)?;
    Ok(page.info.name)
}

/// Subset of a PyPI project page.
#[derive(Deserialize)]
struct ProjectPage {
    info: ProjectInfo,
}

#[derive(Deserialize)]
struct ProjectInfo {
    name: String,
}

/// Candidate project names worth probing for a module name.
pub(crate) fn name_variants(module: &str) -> Vec<String> {
    let dashed = module.replace('_', "-");
    let mut variants = vec![
        module.to_string(),
        dashed.clone(),
        format!("python-{dashed}"),
        format!("py-{dashed}"),
        format!("py{module}"),
        format!("{dashed}-python"),
    ];
    let mut seen = std::collections::HashSet::new();
    variants.retain(|v| seen.insert(v.to_lowercase()));
    variants
}

impl PackageIndex for LivePackageIndex {
    fn lookup(
        &self,
        module: &str,
    ) -> Result<Vec<IndexHit>, Box<dyn std::error::Error + Send + Sync>> {
        let mut hits: Vec<IndexHit> = Vec::new();
        let mut first_error = None;
        let mut any_answered = false;

        for variant in name_variants(module) {
            match self.probe(&variant) {
                Ok(Some(package)) => {
                    any_answered = true;
                    if !hits.iter().any(|h| h.package.eq_ignore_ascii_case(&package)) {
                        hits.push(IndexHit { package, provides: false });
                    }
                }
                Ok(None) => any_answered = true,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) if !any_answered => Err(e),
            _ => Ok(hits),
        }
    }

    fn exists(&self, package: &str) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.probe(package)?.is_some())
    }
}
