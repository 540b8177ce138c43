//! Client Tree Cache
//!
//! In-memory mirror of the forest a client is looking at (the sentinel's
//! children and everything below them). It is never authoritative: the session
//! reconciles it after each successful mutation and reloads it wholesale when
//! in doubt.
//!
//! Tasks are located by walking their materialized `path` from the top level
//! down, never by scanning the whole forest.

use crate::models::{Task, TaskTree};

/// Nested, order-sorted copy of the visible task forest
#[derive(Debug, Clone, Default)]
pub struct TaskTreeCache {
    root_id: String,
    roots: Vec<TaskTree>,
}

impl TaskTreeCache {
    pub fn new(root_id: impl Into<String>) -> Self {
        Self {
            root_id: root_id.into(),
            roots: Vec::new(),
        }
    }

    /// Top-level trees, sorted by `order`
    pub fn roots(&self) -> &[TaskTree] {
        &self.roots
    }

    /// Number of cached tasks
    pub fn len(&self) -> usize {
        self.roots.iter().map(TaskTree::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Replace the whole forest
    pub fn replace_all(&mut self, mut trees: Vec<TaskTree>) {
        trees.sort_by_key(|t| t.task.order);
        self.roots = trees;
    }

    pub fn find(&self, path: &[String]) -> Option<&TaskTree> {
        let (first, rest) = self.relative(path).split_first()?;
        let mut node = self.roots.iter().find(|t| &t.task.id == first)?;
        for id in rest {
            node = node.children.iter().find(|t| &t.task.id == id)?;
        }
        Some(node)
    }

    pub fn find_mut(&mut self, path: &[String]) -> Option<&mut TaskTree> {
        let relative = strip_root(&self.root_id, path);
        find_in(&mut self.roots, relative)
    }

    /// Insert a new task under the parent named by its path
    ///
    /// Returns `false` when the parent isn't cached (nothing to show it in).
    pub fn insert(&mut self, task: Task) -> bool {
        self.attach(TaskTree::leaf(task))
    }

    /// Replace the fields of a cached task, keeping its children
    pub fn update(&mut self, task: Task) -> bool {
        let path = task.path.clone();
        match self.find_mut(&path) {
            Some(node) => {
                let reordered = node.task.order != task.order;
                node.task = task;
                if reordered {
                    self.resort_siblings(&path);
                }
                true
            }
            None => false,
        }
    }

    /// Move the subtree found at `old_path` to `task.path`
    ///
    /// Descendant paths are rewritten under the new location. A subtree that
    /// wasn't cached is attached as a leaf.
    pub fn relocate(&mut self, old_path: &[String], task: Task) -> bool {
        let mut subtree = self
            .remove(old_path)
            .unwrap_or_else(|| TaskTree::leaf(task.clone()));
        subtree.task = task;
        rebase_children(&mut subtree);
        self.attach(subtree)
    }

    /// Remove a task and its subtree
    pub fn remove(&mut self, path: &[String]) -> Option<TaskTree> {
        let relative = strip_root(&self.root_id, path);
        let (id, parent) = relative.split_last()?;
        let siblings = if parent.is_empty() {
            &mut self.roots
        } else {
            &mut find_in(&mut self.roots, parent)?.children
        };
        let index = siblings.iter().position(|t| &t.task.id == id)?;
        Some(siblings.remove(index))
    }

    /// Depth-first iterator over every cached task
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.roots.iter().flat_map(TaskTree::iter)
    }

    fn relative<'p>(&self, path: &'p [String]) -> &'p [String] {
        strip_root(&self.root_id, path)
    }

    fn siblings_mut(&mut self, parent_path: &[String]) -> Option<&mut Vec<TaskTree>> {
        let relative = strip_root(&self.root_id, parent_path);
        if relative.is_empty() {
            Some(&mut self.roots)
        } else {
            find_in(&mut self.roots, relative).map(|node| &mut node.children)
        }
    }

    fn attach(&mut self, tree: TaskTree) -> bool {
        let Some((_, parent_path)) = tree.task.path.split_last() else {
            return false;
        };
        let parent_path = parent_path.to_vec();
        let Some(siblings) = self.siblings_mut(&parent_path) else {
            return false;
        };
        siblings.retain(|t| t.task.id != tree.task.id);
        let index = siblings
            .iter()
            .position(|t| t.task.order > tree.task.order)
            .unwrap_or(siblings.len());
        siblings.insert(index, tree);
        true
    }

    fn resort_siblings(&mut self, path: &[String]) {
        if let Some((_, parent_path)) = path.split_last() {
            if let Some(siblings) = self.siblings_mut(parent_path) {
                siblings.sort_by_key(|t| t.task.order);
            }
        }
    }
}

fn strip_root<'p>(root_id: &str, path: &'p [String]) -> &'p [String] {
    match path.split_first() {
        Some((first, rest)) if first == root_id => rest,
        _ => path,
    }
}

fn find_in<'a>(level: &'a mut [TaskTree], ids: &[String]) -> Option<&'a mut TaskTree> {
    let (first, rest) = ids.split_first()?;
    let node = level.iter_mut().find(|t| &t.task.id == first)?;
    if rest.is_empty() {
        Some(node)
    } else {
        find_in(&mut node.children, rest)
    }
}

fn rebase_children(tree: &mut TaskTree) {
    let parent_path = tree.task.path.clone();
    for child in tree.children.iter_mut() {
        let mut path = parent_path.clone();
        path.push(child.task.id.clone());
        child.task.path = path;
        rebase_children(child);
    }
}
