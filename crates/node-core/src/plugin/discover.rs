//! Built-in discover plugin

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::ManagerContext;
use crate::plugin::{Discover, Load};
use crate::repository::Repository;
use crate::{Error, Result};

/// One repository per configured location.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDiscover;

impl Discover for DefaultDiscover {
    fn name(&self) -> &str {
        "DefaultDiscover"
    }

    fn discover(
        &self,
        ctx: &ManagerContext,
        loader: Arc<dyn Load>,
    ) -> Result<BTreeMap<String, Repository>> {
        let mut repos = BTreeMap::new();
        for location in &ctx.config.repositories {
            let repo = Repository::new(ctx, location, Arc::clone(&loader))?;
            let name = repo.name().to_string();
            if let Some(existing) = repos.get(&name).map(|r: &Repository| r.context().location.clone()) {
                return Err(Error::configuration(format!(
                    "repository name '{}' is used by both {} and {}",
                    name, existing, location
                )));
            }
            tracing::info!(repo = %name, location = %location, loader = loader.name(), "Discovered repository");
            repos.insert(name, repo);
        }
        Ok(repos)
    }
}
