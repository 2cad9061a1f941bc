//! Reachable record-type graph for annotation-mode header discovery.

use std::collections::{HashSet, VecDeque};

use crate::spec::{SpecFieldDescriptor, SpecRecordType};

/// One record type and its own declared fields.
#[derive(Debug, Clone, Copy)]
pub struct SpecTypeEntry {
    pub record_type: &'static SpecRecordType,
    pub fields: &'static [SpecFieldDescriptor],
}

/// Every record type reachable from a root through base chains and
/// nested-record fields, each listed once in discovery order.
#[derive(Debug, Clone, Default)]
pub struct SpecTypeGraph {
    /// Type path of the root the graph was resolved from.
    pub root_path: &'static str,
    pub entries: Vec<SpecTypeEntry>,
}

impl SpecTypeGraph {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, type_path: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.record_type.type_path == type_path)
    }

    /// All declared fields across the graph.
    pub fn iter_fields(&self) -> impl Iterator<Item = &'static SpecFieldDescriptor> + '_ {
        self.entries.iter().flat_map(|entry| entry.fields.iter())
    }
}

/// Resolve the type graph reachable from `root`.
///
/// The root's base chain is collected first, then nested-record fields are
/// expanded breadth first (including each nested type's base chain). A type
/// already visited is never expanded again, so self references and longer
/// cycles terminate. Types without declared fields contribute no entry.
pub fn resolve_type_graph(root: &'static SpecRecordType) -> SpecTypeGraph {
    let mut graph = SpecTypeGraph {
        root_path: root.type_path,
        entries: Vec::new(),
    };
    let mut set_visited: HashSet<&'static str> = HashSet::new();
    let mut l_pending: VecDeque<&'static SpecRecordType> = VecDeque::from([root]);

    while let Some(record_type) = l_pending.pop_front() {
        let mut current = Some(record_type);
        while let Some(t) = current {
            if !set_visited.insert(t.type_path) {
                break;
            }
            if !t.fields.is_empty() {
                graph.entries.push(SpecTypeEntry {
                    record_type: t,
                    fields: t.fields,
                });
            }
            for nested in t.fields.iter().filter_map(SpecFieldDescriptor::nested_type) {
                if !set_visited.contains(nested.type_path) {
                    l_pending.push_back(nested);
                }
            }
            current = t.base_type();
        }
    }

    tracing::debug!(
        root = root.type_path,
        n_types = graph.len(),
        "resolved record type graph"
    );
    graph
}
