//! # Fixture Lifecycle
//!
//! Turns the requirements of a test suite into live fixtures and tears them
//! down again.
//!
//! - [`RequirementFulfiller`]: the contract every fulfiller implements
//! - [`dispatch`]: ordered fulfillment with reverse-order unwinding
//! - [`fulfillers`]: built-in table, command and resource fulfillers
//! - [`PluginRegistry`]: explicit registration of fulfillers, modules,
//!   table manager factories and table definitions
//! - [`Orchestrator`]: suite and test entry points
//! - [`host::ThreadedHost`]: blocking adapter for thread-per-test hosts
//!
//! # Example
//!
//! ```rust,no_run
//! use config::Configuration;
//! use fixture_core::{Requirement, TableHandle};
//! use lifecycle::{Orchestrator, PluginRegistry, TestMethod, TestOutcome};
//!
//! # async fn run() -> errors::FixtureResult<()> {
//! let orchestrator = Orchestrator::new(Configuration::new(), PluginRegistry::builtin());
//! let test = TestMethod::new("select_nation")
//!     .requires(Requirement::immutable_table(TableHandle::table("nation")));
//!
//! orchestrator.on_suite_start(std::slice::from_ref(&test)).await?;
//! let scope = orchestrator.on_test_start(&test).await?;
//! // run the test body against scope.context()
//! orchestrator.on_test_finished(&test, scope, TestOutcome::Success).await?;
//! orchestrator.on_suite_finish().await
//! # }
//! ```

pub mod command;
pub mod dispatch;
pub mod fulfiller;
pub mod fulfillers;
pub mod host;
pub mod orchestrator;
pub mod plugin;
pub mod test_method;

pub use command::{CommandExecutor, LocalCommandExecutor};
pub use dispatch::{FulfillmentScope, do_cleanup, do_fulfillment};
pub use fulfiller::{FulfillerScope, RequirementFulfiller};
pub use orchestrator::{Orchestrator, SuiteBindings, TABLES_PATH_KEY, TestScope};
pub use plugin::{Builtins, Plugin, PluginRegistry, SuiteModule, TestModule};
pub use test_method::{FnHook, TestHook, TestMethod, TestMethodInfo, TestOutcome};
