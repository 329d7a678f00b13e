use super::resources::ResourceProvisioner;
use async_trait::async_trait;
use context::TestContext;
use errors::FixtureResult;
use fixture_core::{DirectoryClient, ResourceRequirement, StateEntry, TestStatus};
use std::sync::Arc;
use tracing::{debug, info};

pub const LDAP_RESOURCE_KIND: &str = "ldap";

/// Adds directory entries: the requirement key is the distinguished name and
/// its attributes become the entry's attributes.
///
/// Entries that already exist are left untouched, and added entries stay in
/// the directory after the suite.
#[derive(Debug, Default)]
pub struct LdapObjectProvisioner;

#[async_trait]
impl ResourceProvisioner for LdapObjectProvisioner {
    fn kind(&self) -> &str {
        LDAP_RESOURCE_KIND
    }

    async fn provision(&self, requirement: &ResourceRequirement, context: &TestContext) -> FixtureResult<Option<StateEntry>> {
        let directory = context.require::<Arc<dyn DirectoryClient>>()?;
        let dn = requirement.key.as_str();
        if directory.entry_exists(dn).await? {
            debug!(dn, "directory entry already present");
        } else {
            directory.add_entry(dn, &requirement.attributes).await?;
            info!(dn, "added directory entry");
        }
        Ok(None)
    }

    async fn release(&self, _requirement: &ResourceRequirement, _status: TestStatus) -> FixtureResult<()> {
        Ok(())
    }
}
