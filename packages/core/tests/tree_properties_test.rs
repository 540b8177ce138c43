//! Tree Property Tests
//!
//! Random sequences of creates, updates, moves, deletes, undos and redos are
//! applied through a `TaskSession`. After every step the stored tree must be
//! acyclic, every path must match its parent's, depths stay bounded and
//! sibling orders stay unique. Rejected edits must leave the store untouched.
//!
//! Redo must bring back exactly the tree that the matching undo started
//! from. Recreated tasks get new ids, so trees are compared by title (titles
//! are unique within a run).

use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tasktree_core::db::InMemoryTaskStore;
use tasktree_core::{
    Task, TaskInput, TaskPatch, TaskService, TaskSession, TaskStatus, TreeConfig, DEFAULT_ROOT_ID,
};

const STATUSES: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Completed];

#[derive(Debug, Clone)]
enum Step {
    Create { parent: Index },
    Update { task: Index, status: Index, order: Option<u8> },
    Move { task: Index, target: Index },
    Delete { task: Index },
    Undo,
    Redo,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => any::<Index>().prop_map(|parent| Step::Create { parent }),
        2 => (any::<Index>(), any::<Index>(), proptest::option::of(0u8..4))
            .prop_map(|(task, status, order)| Step::Update { task, status, order }),
        4 => (any::<Index>(), any::<Index>()).prop_map(|(task, target)| Step::Move { task, target }),
        1 => any::<Index>().prop_map(|task| Step::Delete { task }),
        2 => Just(Step::Undo),
        2 => Just(Step::Redo),
    ]
}

fn assert_tree_invariants(tasks: &[Task], max_depth: usize) {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut orders: HashSet<(Option<&str>, i64)> = HashSet::new();

    for task in tasks {
        assert!(task.path.len() <= max_depth, "depth bound broken: {:?}", task.path);
        assert!(
            orders.insert((task.parent_id.as_deref(), task.order)),
            "duplicate sibling order {} under {:?}",
            task.order,
            task.parent_id
        );

        if task.id == DEFAULT_ROOT_ID {
            assert_eq!(task.path, vec![DEFAULT_ROOT_ID.to_string()]);
            continue;
        }

        let parent_id = task.parent_id.as_deref().expect("non-root task without parent");
        let parent = by_id.get(parent_id).expect("parent must exist");
        let mut expected = parent.path.clone();
        expected.push(task.id.clone());
        assert_eq!(task.path, expected, "path out of sync with parent");

        // walking up must reach the root without revisiting anything
        let mut seen = HashSet::new();
        let mut cursor = Some(task.id.as_str());
        while let Some(id) = cursor {
            assert!(seen.insert(id), "cycle through {}", id);
            cursor = by_id.get(id).and_then(|t| t.parent_id.as_deref());
        }
        assert!(seen.contains(DEFAULT_ROOT_ID));
    }
}

/// Id-independent view of one task
#[derive(Debug, PartialEq)]
struct Shape {
    title: String,
    status: TaskStatus,
    parent: Option<String>,
    path: Vec<String>,
    order: i64,
}

/// Every task with ids replaced by titles, sorted by title
fn shapes(tasks: &[Task]) -> Vec<Shape> {
    let titles: HashMap<&str, &str> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.title.as_str()))
        .collect();
    let title_of = |id: &str| titles.get(id).map(|t| t.to_string()).unwrap_or_default();

    let mut shapes: Vec<Shape> = tasks
        .iter()
        .map(|t| Shape {
            title: t.title.clone(),
            status: t.status,
            parent: t.parent_id.as_deref().map(title_of),
            path: t.path.iter().map(|id| title_of(id)).collect(),
            order: t.order,
        })
        .collect();
    shapes.sort_by(|a, b| a.title.cmp(&b.title));
    shapes
}

fn pick<'a>(tasks: &'a [Task], index: &Index, include_root: bool) -> Option<&'a Task> {
    let candidates: Vec<&Task> = tasks
        .iter()
        .filter(|t| include_root || t.id != DEFAULT_ROOT_ID)
        .collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[index.index(candidates.len())])
    }
}

async fn run_steps(steps: Vec<Step>) {
    let store = Arc::new(InMemoryTaskStore::new());
    let config = TreeConfig::default();
    let max_depth = config.max_depth;
    let service = TaskService::new(store.clone(), config);
    service.ensure_root().await.unwrap();
    let session = TaskSession::new(service);
    // trees the pending redos must restore, next redo last
    let mut redo_targets: Vec<Vec<Shape>> = Vec::new();

    for (n, step) in steps.iter().enumerate() {
        let before = store.snapshot().unwrap();

        // Some(committed) for edits, None for undo/redo and skipped picks
        let committed = match step {
            Step::Create { parent } => {
                let parent = pick(&before, parent, true).unwrap();
                let input = TaskInput::new(format!("task {}", n)).with_parent(&parent.id);
                Some(session.create(input).await.is_ok())
            }
            Step::Update {
                task,
                status,
                order,
            } => match pick(&before, task, false) {
                Some(task) => {
                    let mut patch = TaskPatch::new().with_status(*status.get(&STATUSES));
                    if let Some(order) = order {
                        patch = patch.with_order(i64::from(*order));
                    }
                    Some(session.update(&task.id, patch).await.is_ok())
                }
                None => None,
            },
            Step::Move { task, target } => match pick(&before, task, false) {
                Some(task) => {
                    let target = pick(&before, target, true).unwrap();
                    Some(session.move_task(&task.id, &target.id, None).await.is_ok())
                }
                None => None,
            },
            Step::Delete { task } => match pick(&before, task, false) {
                Some(task) => Some(session.delete(&task.id).await.is_ok()),
                None => None,
            },
            Step::Undo => {
                // a single session's linear history always has a valid inverse
                if session.undo().await.expect("undo failed").is_some() {
                    redo_targets.push(shapes(&before));
                }
                None
            }
            Step::Redo => {
                let redone = session.redo().await.expect("redo failed");
                match (redone, redo_targets.pop()) {
                    (Some(_), Some(expected)) => {
                        let restored = shapes(&store.snapshot().unwrap());
                        assert_eq!(restored, expected, "redo did not restore the tree");
                    }
                    (None, None) => {}
                    (redone, expected) => panic!(
                        "history out of step: redone {:?}, expected tree present: {}",
                        redone,
                        expected.is_some()
                    ),
                }
                None
            }
        };

        let after = store.snapshot().unwrap();
        match committed {
            Some(false) => {
                assert_eq!(after, before, "rejected step {:?} changed the store", step);
            }
            // a recorded edit drops the redo list; moving onto the current
            // position records nothing and leaves it alone
            Some(true) => {
                if !session.can_redo().await {
                    redo_targets.clear();
                }
            }
            None => {}
        }
        assert_tree_invariants(&after, max_depth);
        assert_eq!(session.can_redo().await, !redo_targets.is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_edits_keep_tree_consistent(steps in prop::collection::vec(step_strategy(), 1..40)) {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(run_steps(steps));
    }
}
