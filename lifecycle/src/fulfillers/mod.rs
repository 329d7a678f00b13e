//! Built-in fulfillers, in registry order:
//!
//! 1. [`ImmutableTablesFulfiller`] (suite)
//! 2. [`CommandFulfiller::suite`] (suite)
//! 3. [`ProvisionedResourcesFulfiller`] (suite)
//! 4. [`MutableTablesFulfiller`] (test)
//! 5. [`CommandFulfiller::test`] (test)
//! 6. [`ResourcesFulfiller::test`] (test, unconditional)
//! 7. [`ResourcesFulfiller::suite`] (suite, unconditional)

pub mod commands;
pub mod ldap;
pub mod resources;
pub mod tables;

pub use commands::{CommandFulfiller, PendingTeardown};
pub use ldap::{LDAP_RESOURCE_KIND, LdapObjectProvisioner};
pub use resources::{
    ProvisionedResources, ProvisionedResourcesFulfiller, ResourceProvisioner, ResourceProvisioners,
    ResourcesFulfiller, ResourcesState, SUITE_RESOURCES
};
pub use tables::{ImmutableTablesFulfiller, MutableTablesFulfiller};

use crate::fulfiller::RequirementFulfiller;
use std::sync::Arc;

pub fn builtin_fulfillers() -> Vec<Arc<dyn RequirementFulfiller>> {
    vec![
        Arc::new(ImmutableTablesFulfiller),
        Arc::new(CommandFulfiller::suite()),
        Arc::new(ProvisionedResourcesFulfiller),
        Arc::new(MutableTablesFulfiller),
        Arc::new(CommandFulfiller::test()),
        Arc::new(ResourcesFulfiller::test()),
        Arc::new(ResourcesFulfiller::suite())
    ]
}
