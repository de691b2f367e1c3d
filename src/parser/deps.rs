// Dependency graph analysis for the YAML front-end

//! # Job Dependency Analysis
//!
//! The front-end validates the `needs:` relation of a workflow before any
//! net construction happens: every referenced job must exist and the
//! relation must be acyclic. Cycle detection runs an **iterative**
//! depth-first search with an explicit discovery stack - a back edge to a
//! node still on the stack closes a cycle, and the stack segment from that
//! node onward is the witness reported to the user.
//!
//! The same module produces the stable topological order the parser emits
//! steps in: Kahn's algorithm, always picking the earliest-declared ready
//! job, so the resulting `IntentSpec` satisfies the "dependencies
//! reference earlier steps" invariant while staying as close as possible
//! to the author's declaration order.

use std::collections::{HashMap, HashSet};

/// Dependency multigraph over job ids, preserving declaration order
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Job ids in declaration order
    order: Vec<String>,
    /// job -> jobs it depends on, in `needs:` order
    deps: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Register a job and its dependency list, in declaration order
    pub fn add_job<S: Into<String>>(&mut self, id: S, deps: Vec<String>) {
        let id = id.into();
        self.order.push(id.clone());
        self.deps.insert(id, deps);
    }

    /// Job ids in declaration order
    pub fn jobs(&self) -> &[String] {
        &self.order
    }

    /// Dependencies of a job, empty for unknown ids
    pub fn deps_of(&self, id: &str) -> &[String] {
        self.deps.get(id).map(|d| d.as_slice()).unwrap_or(&[])
    }

    /// First dependency reference that does not name a known job
    ///
    /// Returns `(job, missing_reference)`.
    pub fn first_missing_reference(&self) -> Option<(&str, &str)> {
        let known: HashSet<&str> = self.order.iter().map(|s| s.as_str()).collect();
        for job in &self.order {
            for dep in self.deps_of(job) {
                if !known.contains(dep.as_str()) {
                    return Some((job.as_str(), dep.as_str()));
                }
            }
        }
        None
    }

    /// Find a dependency cycle, if any
    ///
    /// Iterative DFS keeping an explicit discovery stack. When a child
    /// edge points at a node currently on the stack, the stack suffix
    /// starting at that node is a cycle; its members are returned in
    /// stack order. Unknown references are skipped - they are reported
    /// separately by [`first_missing_reference`](Self::first_missing_reference).
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: HashMap<&str, Color> = self
            .order
            .iter()
            .map(|id| (id.as_str(), Color::White))
            .collect();

        for root in &self.order {
            if color[root.as_str()] != Color::White {
                continue;
            }

            // Discovery stack: (node, index of the next dependency to try).
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            color.insert(root.as_str(), Color::Gray);

            while let Some(&(node, next)) = stack.last() {
                let deps = self.deps_of(node);
                if next >= deps.len() {
                    // Fully explored; retire from the stack.
                    color.insert(node, Color::Black);
                    stack.pop();
                    continue;
                }
                stack.last_mut().expect("stack non-empty").1 += 1;

                let dep = deps[next].as_str();
                match color.get(dep) {
                    None => continue, // dangling reference, reported elsewhere
                    Some(Color::Black) => continue,
                    Some(Color::White) => {
                        color.insert(dep, Color::Gray);
                        stack.push((dep, 0));
                    }
                    Some(Color::Gray) => {
                        // Back edge: everything from `dep` up the stack is
                        // on the cycle.
                        let start = stack
                            .iter()
                            .position(|&(n, _)| n == dep)
                            .expect("gray node is on the stack");
                        let cycle = stack[start..]
                            .iter()
                            .map(|&(n, _)| n.to_string())
                            .collect();
                        return Some(cycle);
                    }
                }
            }
        }
        None
    }

    /// Stable topological order: Kahn's algorithm, earliest-declared first
    ///
    /// Precondition: no missing references and no cycles; both are checked
    /// by the parser before this runs. On a cyclic input the leftover
    /// nodes are simply omitted, which the parser treats as a logic error.
    pub fn topological_order(&self) -> Vec<String> {
        let mut indegree: HashMap<&str, usize> = self
            .order
            .iter()
            .map(|id| (id.as_str(), self.deps_of(id).len()))
            .collect();

        // dependency -> dependents, for indegree updates
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for job in &self.order {
            for dep in self.deps_of(job) {
                dependents.entry(dep.as_str()).or_default().push(job.as_str());
            }
        }

        let mut out = Vec::with_capacity(self.order.len());
        let mut done: HashSet<&str> = HashSet::new();
        while out.len() < self.order.len() {
            // Earliest-declared ready job.
            let ready = self
                .order
                .iter()
                .map(|id| id.as_str())
                .find(|id| !done.contains(id) && indegree[id] == 0);
            let Some(next) = ready else {
                break; // cyclic remainder
            };
            done.insert(next);
            out.push(next.to_string());
            for &dependent in dependents.get(next).map(|d| d.as_slice()).unwrap_or(&[]) {
                if let Some(d) = indegree.get_mut(dependent) {
                    *d = d.saturating_sub(1);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (id, deps) in edges {
            g.add_job(*id, deps.iter().map(|d| d.to_string()).collect());
        }
        g
    }

    #[test]
    fn test_acyclic_graph_has_no_cycle() {
        let g = graph(&[
            ("lint", &[]),
            ("test", &["lint"]),
            ("build", &["lint", "test"]),
            ("deploy", &["build"]),
        ]);
        assert!(g.find_cycle().is_none());
        assert!(g.first_missing_reference().is_none());
    }

    #[test]
    fn test_three_node_cycle_is_witnessed() {
        // a -> c -> b -> a, as a rotation starting from the DFS root.
        let g = graph(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"])]);
        let cycle = g.find_cycle().expect("cycle expected");
        assert_eq!(cycle.len(), 3);
        let set: std::collections::HashSet<&str> = cycle.iter().map(|s| s.as_str()).collect();
        assert_eq!(set, ["a", "b", "c"].into_iter().collect());
        // Consecutive members are connected (each depends on the next).
        for pair in cycle.windows(2) {
            assert!(g.deps_of(&pair[0]).contains(&pair[1]));
        }
    }

    #[test]
    fn test_self_cycle() {
        let g = graph(&[("a", &["a"])]);
        assert_eq!(g.find_cycle(), Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_missing_reference_detected() {
        let g = graph(&[("a", &[]), ("b", &["ghost"])]);
        assert_eq!(g.first_missing_reference(), Some(("b", "ghost")));
    }

    #[test]
    fn test_topological_order_is_stable() {
        // "build" is declared before its dependency "test"; topo order
        // must move it after, leaving everything else in declaration order.
        let g = graph(&[
            ("lint", &[]),
            ("build", &["test"]),
            ("test", &["lint"]),
            ("docs", &[]),
        ]);
        assert_eq!(g.topological_order(), vec!["lint", "test", "build", "docs"]);
    }
}
