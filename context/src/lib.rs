//! Context stack for fixture fulfillment.
//!
//! Fulfillment results are carried to test code through layered context
//! frames:
//!
//! 1. The suite base frame holds suite-wide bindings (configuration,
//!    table manager dispatcher, backend clients)
//! 2. Every successful suite fulfiller pushes a frame with its states
//! 3. A test derives a child of the top suite frame and pushes one frame per
//!    successful test fulfiller on its own stack
//!
//! Lookups walk from the top frame towards the base. Frames run their close
//! callbacks exactly once, on explicit close or when the last handle drops.
//!
//! # Example
//!
//! ```rust
//! use context::{Dependencies, TestContext, TestContextStack};
//! use fixture_core::StateEntry;
//!
//! let mut deps = Dependencies::new();
//! deps.bind(42_u32);
//! let base = TestContext::new(deps);
//!
//! let mut stack = TestContextStack::with_base(base.clone());
//! let child = base.create_child_context(vec![StateEntry::named("answer", "yes")]).unwrap();
//! stack.push(child);
//!
//! let top = stack.peek().unwrap();
//! assert_eq!(*top.get::<u32>().unwrap(), 42);
//! assert_eq!(*top.get_named::<&str>("answer").unwrap(), "yes");
//! ```

mod dependencies;
pub mod holder;
mod stack;
mod test_context;

pub use dependencies::Dependencies;
pub use holder::current_test_context;
pub use stack::TestContextStack;
pub use test_context::TestContext;
