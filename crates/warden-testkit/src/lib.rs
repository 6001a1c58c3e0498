//! # Warden Testkit
//!
//! Testing utilities for Warden.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Recording store**: A store wrapper that journals every call and can
//!   be told to fail saves
//! - **Golden scenarios**: Known grant/revoke sequences with the expected
//!   permission sets and save counts after every step
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Scenarios
//!
//! ```rust
//! use warden_testkit::scenarios::{all_scenarios, verify_all_scenarios};
//!
//! for (name, passed, detail) in verify_all_scenarios() {
//!     assert!(passed, "{}: {}", name, detail);
//! }
//! # assert!(!all_scenarios().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use warden_testkit::generators::ReconcileStep;
//! use warden_testkit::fixtures::TestFixture;
//!
//! proptest! {
//!     #[test]
//!     fn steps_never_fail(steps in prop::collection::vec(any::<ReconcileStep>(), 0..16)) {
//!         let fixture = TestFixture::new();
//!         let mut entity = fixture.entity("prop");
//!         for step in &steps {
//!             step.apply(&fixture.reconciler, &mut entity).unwrap();
//!         }
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use warden_core::{Permission, UserId};
//! use warden_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let mut entity = fixture.entity("basemap");
//! fixture
//!     .reconciler
//!     .grant_user(Some(&mut entity), &UserId(1), [Permission::Read])
//!     .unwrap();
//! assert_eq!(fixture.store.saves(), (1, 1));
//! ```

pub mod fixtures;
pub mod generators;
pub mod recording;
pub mod scenarios;

pub use fixtures::{init_tracing, TestFixture};
pub use generators::{Action, ReconcileStep};
pub use recording::{RecordingStore, StoreCall};
pub use scenarios::{all_scenarios, verify_all_scenarios, Scenario, Step};
