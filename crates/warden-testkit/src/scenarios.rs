//! Golden reconciliation scenarios.
//!
//! Each scenario is a fixed list of grant/revoke steps together with the
//! permission set the principal must hold afterwards and the number of saves
//! the step must issue. Every backend has to replay them identically.

use serde::Serialize;

use warden_core::{GroupId, Permission, PermissionSet, Principal, SecuredEntity, UserId};
use warden_store::{EntityStore, PermissionCollectionStore};

use crate::fixtures::TestFixture;
use crate::generators::ReconcileStep;

use warden_core::Permission::{Admin, Create, Delete, Read, Write};

/// One step of a golden scenario and what it must produce.
#[derive(Debug, Clone)]
pub struct Step {
    pub step: ReconcileStep,
    /// Permissions the principal holds afterwards. `None` means no
    /// collection is attached.
    pub expected: Option<&'static [Permission]>,
    pub collection_saves: usize,
    pub entity_saves: usize,
}

/// A named golden scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Human-readable name for the scenario.
    pub name: &'static str,
    pub steps: Vec<Step>,
}

/// Where a replay diverged from the scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub step: usize,
    pub expected: String,
    pub actual: String,
}

fn step(
    step: ReconcileStep,
    expected: Option<&'static [Permission]>,
    collection_saves: usize,
    entity_saves: usize,
) -> Step {
    Step {
        step,
        expected,
        collection_saves,
        entity_saves,
    }
}

/// Get all golden scenarios.
pub fn all_scenarios() -> Vec<Scenario> {
    let user = UserId(42);
    let group = GroupId(7);

    vec![
        Scenario {
            name: "grant, extend, revoke, repeat revoke",
            steps: vec![
                step(ReconcileStep::grant(user, &[Read, Write]), Some(&[Read, Write]), 1, 1),
                step(
                    ReconcileStep::grant(user, &[Write, Delete]),
                    Some(&[Read, Write, Delete]),
                    1,
                    0,
                ),
                step(ReconcileStep::revoke(user, &[Write]), Some(&[Read, Delete]), 1, 0),
                step(ReconcileStep::revoke(user, &[Write]), Some(&[Read, Delete]), 0, 0),
            ],
        },
        Scenario {
            name: "duplicate grant is free",
            steps: vec![
                step(ReconcileStep::grant(group, &[Admin]), Some(&[Admin]), 1, 1),
                step(ReconcileStep::grant(group, &[Admin]), Some(&[Admin]), 0, 0),
            ],
        },
        Scenario {
            name: "revoke without collection",
            steps: vec![step(ReconcileStep::revoke(user, &[Read]), None, 0, 0)],
        },
        Scenario {
            name: "empty input is ignored",
            steps: vec![
                step(ReconcileStep::grant(user, &[]), None, 0, 0),
                step(ReconcileStep::grant(user, &[Create]), Some(&[Create]), 1, 1),
                step(ReconcileStep::revoke(user, &[]), Some(&[Create]), 0, 0),
            ],
        },
        Scenario {
            name: "revoke to empty keeps collection",
            steps: vec![
                step(ReconcileStep::grant(group, &[Read]), Some(&[Read]), 1, 1),
                step(ReconcileStep::revoke(group, &[Read, Admin]), Some(&[]), 1, 0),
                step(ReconcileStep::grant(group, &[Write]), Some(&[Write]), 1, 0),
            ],
        },
        Scenario {
            name: "user and group scopes are separate",
            steps: vec![
                step(ReconcileStep::grant(UserId(7), &[Read]), Some(&[Read]), 1, 1),
                step(ReconcileStep::grant(GroupId(7), &[Write]), Some(&[Write]), 1, 1),
                step(ReconcileStep::revoke(GroupId(7), &[Read]), Some(&[Write]), 0, 0),
            ],
        },
    ]
}

impl Scenario {
    /// Replay this scenario against `backend`.
    pub fn replay<S>(&self, backend: S) -> Result<(), Divergence>
    where
        S: PermissionCollectionStore + EntityStore,
    {
        let fixture = TestFixture::with_backend(backend);
        let mut entity = fixture.entity(self.name);

        for (index, expected) in self.steps.iter().enumerate() {
            let diverged = |expected: String, actual: String| Divergence {
                step: index,
                expected,
                actual,
            };

            let before = fixture.store.saves();
            let outcome = expected
                .step
                .apply(&fixture.reconciler, &mut entity)
                .map_err(|e| diverged("success".into(), e.to_string()))?;
            let after = fixture.store.saves();

            let saves = (after.0 - before.0, after.1 - before.1);
            let wanted = (expected.collection_saves, expected.entity_saves);
            if saves != wanted || saves != (outcome.collection_saves(), outcome.entity_saves()) {
                return Err(diverged(
                    format!("saves {:?}", wanted),
                    format!("saves {:?}, outcome {:?}", saves, outcome),
                ));
            }

            let held = held(&entity, expected.step.principal);
            let wanted = expected
                .expected
                .map(|permissions| permissions.iter().copied().collect::<PermissionSet>());
            if held != wanted {
                return Err(diverged(format!("{:?}", wanted), format!("{:?}", held)));
            }
        }

        Ok(())
    }
}

fn held(entity: &SecuredEntity, principal: Principal) -> Option<PermissionSet> {
    entity
        .permissions_of(principal)
        .map(|collection| collection.permissions().clone())
}

/// Replay every golden scenario against a fresh [`MemoryStore`](warden_store::MemoryStore).
///
/// Returns `(name, passed, detail)` per scenario, where `detail` is the
/// divergence as JSON when the scenario failed.
pub fn verify_all_scenarios() -> Vec<(String, bool, String)> {
    all_scenarios()
        .iter()
        .map(|scenario| match scenario.replay(warden_store::MemoryStore::new()) {
            Ok(()) => (scenario.name.to_string(), true, String::new()),
            Err(divergence) => (
                scenario.name.to_string(),
                false,
                serde_json::to_string(&divergence).unwrap_or_else(|e| e.to_string()),
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_store::{MemoryStore, SqliteStore};

    #[test]
    fn test_scenarios_pass_on_memory_store() {
        for (name, passed, detail) in verify_all_scenarios() {
            assert!(passed, "Scenario '{}' diverged: {}", name, detail);
        }
    }

    #[test]
    fn test_scenarios_pass_on_sqlite() {
        for scenario in all_scenarios() {
            let store = SqliteStore::open_memory().unwrap();
            assert_eq!(scenario.replay(store), Ok(()), "Scenario '{}'", scenario.name);
        }
    }

    #[test]
    fn test_scenarios_pass_on_file_backed_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        for (index, scenario) in all_scenarios().iter().enumerate() {
            let path = dir.path().join(format!("scenario-{}.db", index));
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(scenario.replay(store), Ok(()), "Scenario '{}'", scenario.name);
        }
    }

    #[test]
    fn test_wrong_expectation_reports_divergence() {
        let scenario = Scenario {
            name: "wrong",
            steps: vec![step(ReconcileStep::grant(UserId(1), &[Read]), Some(&[Write]), 1, 1)],
        };

        let divergence = scenario.replay(MemoryStore::new()).unwrap_err();
        assert_eq!(divergence.step, 0);
    }
}
