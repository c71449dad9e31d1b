//! core::verify
//!
//! Pure (no-Git) invariant checks over a [`RepoState`]. The one invariant
//! that needs the working tree (history-branch/main-branch diff parity)
//! lives on [`crate::engine::Engine::get_bad_states`], which extends this
//! module's checks with that one.

use thiserror::Error;

use crate::core::model::RepoState;

/// One violated invariant, as returned by `get_bad_states`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadState {
    pub commit_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("bad gitgud state: {0}")]
pub struct BadGitGudState(pub String);

/// Collect every graph-level invariant violation in `state`. An empty
/// result does not by itself mean the state is good — callers also need
/// the working-tree check in `Engine::check_state`.
pub fn get_bad_states(state: &RepoState) -> Vec<BadState> {
    let mut bad = Vec::new();

    // Invariant 1: parent/child reciprocity.
    for (id, commit) in &state.commits {
        if let Some(parent_id) = &commit.parent_id {
            match state.commits.get(parent_id) {
                Some(parent) => {
                    if !parent.children.iter().any(|c| c == id) {
                        bad.push(BadState {
                            commit_id: Some(id.clone()),
                            message: format!(
                                "parent {parent_id} does not list {id} as a child"
                            ),
                        });
                    }
                }
                None => bad.push(BadState {
                    commit_id: Some(id.clone()),
                    message: format!("parent_id {parent_id} does not exist"),
                }),
            }
        }
        for child_id in &commit.children {
            match state.commits.get(child_id) {
                Some(child) => {
                    if child.parent_id.as_deref() != Some(id.as_str()) {
                        bad.push(BadState {
                            commit_id: Some(id.clone()),
                            message: format!(
                                "child {child_id} does not point back to {id} as parent"
                            ),
                        });
                    }
                }
                None => bad.push(BadState {
                    commit_id: Some(id.clone()),
                    message: format!("child {child_id} does not exist"),
                }),
            }
        }
    }

    // Invariant 2 / get_roots: exactly one root reachable from every node.
    let roots = state.get_roots();
    if roots.len() != 1 {
        bad.push(BadState {
            commit_id: None,
            message: format!("expected exactly one root, found {}: {:?}", roots.len(), roots),
        });
    } else if roots[0] != state.root_id {
        bad.push(BadState {
            commit_id: None,
            message: format!(
                "computed root {} does not match recorded root_id {}",
                roots[0], state.root_id
            ),
        });
    }

    // Invariant 3: head_id references an existing node.
    if !state.commits.contains_key(&state.head_id) {
        bad.push(BadState {
            commit_id: Some(state.head_id.clone()),
            message: "head_id does not reference an existing commit".to_string(),
        });
    }

    // Invariant 5: remote nodes are always uploaded, never needs_evolve, no PR.
    for (id, commit) in &state.commits {
        if commit.remote {
            if !commit.uploaded {
                bad.push(BadState {
                    commit_id: Some(id.clone()),
                    message: "remote node is not marked uploaded".to_string(),
                });
            }
            if commit.needs_evolve {
                bad.push(BadState {
                    commit_id: Some(id.clone()),
                    message: "remote node is marked needs_evolve".to_string(),
                });
            }
            if commit.pull_request.is_some() {
                bad.push(BadState {
                    commit_id: Some(id.clone()),
                    message: "remote node has a pull request attached".to_string(),
                });
            }
        }
    }

    // Invariant 7 / universal invariant 5: the queue is empty whenever there's
    // no active conflict.
    if state.merge_conflict_state.is_none() && !state.pending_operations.is_empty() {
        bad.push(BadState {
            commit_id: None,
            message: "pending_operations is non-empty with no merge_conflict_state".to_string(),
        });
    }

    bad
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::test_commit;
    use std::path::PathBuf;

    fn good_state() -> RepoState {
        let mut root = test_commit("c1", None, "1111111111111111111111111111111111111111");
        root.children = vec!["c2".into()];
        let c2 = test_commit("c2", Some("c1"), "2222222222222222222222222222222222222222");
        let mut state = RepoState::new(PathBuf::from("/tmp/r"), "master".into(), root);
        state.commits.insert("c2".into(), c2);
        state.head_id = "c2".into();
        state
    }

    #[test]
    fn well_formed_state_has_no_bad_states() {
        assert!(get_bad_states(&good_state()).is_empty());
    }

    #[test]
    fn missing_reciprocal_child_is_flagged() {
        let mut state = good_state();
        state.get_commit_mut("c1").unwrap().children.clear();
        let bad = get_bad_states(&state);
        assert!(bad.iter().any(|b| b.message.contains("does not list")));
    }

    #[test]
    fn dangling_head_is_flagged() {
        let mut state = good_state();
        state.head_id = "ghost".into();
        let bad = get_bad_states(&state);
        assert!(bad.iter().any(|b| b.message.contains("head_id")));
    }

    #[test]
    fn remote_node_without_uploaded_is_flagged() {
        let mut state = good_state();
        state.get_commit_mut("c2").unwrap().remote = true;
        let bad = get_bad_states(&state);
        assert!(bad.iter().any(|b| b.message.contains("not marked uploaded")));
    }

    #[test]
    fn pending_ops_without_conflict_is_flagged() {
        let mut state = good_state();
        state
            .pending_operations
            .push_back(crate::core::model::PendingOperation::Evolve {
                base_id: "c1".into(),
                target_id: "c2".into(),
            });
        let bad = get_bad_states(&state);
        assert!(bad.iter().any(|b| b.message.contains("pending_operations")));
    }
}
