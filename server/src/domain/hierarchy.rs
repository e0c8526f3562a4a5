//! Parent/child structure of the tasks in one list
//!
//! Nodes live in an arena indexed by task id. Walks are iterative, track
//! visited nodes and stop at a depth cap, so a malformed parent chain can
//! neither loop forever nor overflow the stack.

use std::collections::{HashMap, HashSet};

use crate::core::constants::MAX_TASK_DEPTH;
use crate::data::types::TaskEdgeRow;

use super::error::{DomainError, DomainResult};

#[derive(Debug)]
struct Node {
    id: i64,
    children: Vec<usize>,
}

/// Arena of task nodes built from parent edges
#[derive(Debug, Default)]
pub struct TaskForest {
    nodes: Vec<Node>,
    index: HashMap<i64, usize>,
}

impl TaskForest {
    pub fn from_edges(edges: &[TaskEdgeRow]) -> Self {
        let mut forest = Self {
            nodes: Vec::with_capacity(edges.len()),
            index: HashMap::with_capacity(edges.len()),
        };
        for edge in edges {
            forest.slot(edge.id);
        }
        for edge in edges {
            let Some(parent) = edge.parent_task_id else {
                continue;
            };
            // Parents outside the edge set (inactive or foreign) are ignored
            let (Some(&p), Some(&c)) = (forest.index.get(&parent), forest.index.get(&edge.id))
            else {
                continue;
            };
            forest.nodes[p].children.push(c);
        }
        forest
    }

    fn slot(&mut self, id: i64) -> usize {
        if let Some(&i) = self.index.get(&id) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(Node {
            id,
            children: Vec::new(),
        });
        self.index.insert(id, i);
        i
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    /// `root` followed by every transitive descendant, depth-first.
    ///
    /// A root that is not in the forest yields just itself.
    pub fn subtree(&self, root: i64) -> DomainResult<Vec<i64>> {
        let Some(&start) = self.index.get(&root) else {
            return Ok(vec![root]);
        };

        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(start, 0usize)];
        while let Some((i, depth)) = stack.pop() {
            if !visited.insert(i) {
                tracing::warn!(task_id = self.nodes[i].id, "Task hierarchy contains a cycle");
                continue;
            }
            if depth > MAX_TASK_DEPTH {
                return Err(DomainError::Internal(format!(
                    "Task hierarchy under {root} exceeds depth {MAX_TASK_DEPTH}"
                )));
            }
            out.push(self.nodes[i].id);
            for &child in self.nodes[i].children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        Ok(out)
    }

    /// Whether `candidate` sits in the subtree rooted at `ancestor` (inclusive)
    pub fn is_in_subtree(&self, ancestor: i64, candidate: i64) -> DomainResult<bool> {
        Ok(self.subtree(ancestor)?.contains(&candidate))
    }
}
