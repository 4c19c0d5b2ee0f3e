//! Dependency ordering.
//!
//! One graph per dependency kind, edges pointing from a configuration to
//! what it depends on. Cycles are found once with Tarjan's algorithm; every
//! ordering query on a configuration inside a cycle fails.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use indexmap::IndexSet;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::solution::{ConfId, Workspace};
use crate::generator::errors::GraphError;

/// Edge kinds, each flattened independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Link-time dependencies
    Direct,
    /// Consumed for metadata only
    ForceUsing,
    /// Build-order gating without a link
    BuildOnly,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 3] = [
        DependencyKind::Direct,
        DependencyKind::ForceUsing,
        DependencyKind::BuildOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Direct => "direct",
            DependencyKind::ForceUsing => "force-using",
            DependencyKind::BuildOnly => "build-only",
        }
    }

    fn index(&self) -> usize {
        match self {
            DependencyKind::Direct => 0,
            DependencyKind::ForceUsing => 1,
            DependencyKind::BuildOnly => 2,
        }
    }

    fn edges<'a>(&self, ws: &'a Workspace, conf: ConfId) -> &'a [ConfId] {
        let c = ws.conf(conf);
        match self {
            DependencyKind::Direct => &c.dependencies,
            DependencyKind::ForceUsing => &c.force_using,
            DependencyKind::BuildOnly => &c.build_only,
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct KindGraph {
    graph: DiGraph<ConfId, ()>,
    nodes: HashMap<ConfId, NodeIndex>,
    /// Configurations on a cycle (including self-loops)
    cyclic: HashSet<ConfId>,
}

impl KindGraph {
    fn build(ws: &Workspace, kind: DependencyKind) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for conf in ws.configurations() {
            nodes.insert(conf.id, graph.add_node(conf.id));
        }
        for conf in ws.configurations() {
            let from = nodes[&conf.id];
            for dep in kind.edges(ws, conf.id) {
                if let Some(&to) = nodes.get(dep) {
                    if !graph.contains_edge(from, to) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        let mut cyclic = HashSet::new();
        for component in tarjan_scc(&graph) {
            let looped = component.len() == 1 && graph.contains_edge(component[0], component[0]);
            if component.len() > 1 || looped {
                cyclic.extend(component.iter().map(|&n| graph[n]));
            }
        }

        KindGraph {
            graph,
            nodes,
            cyclic,
        }
    }

    /// Shortest path `start -> ... -> start`.
    fn cycle_through(&self, start: ConfId) -> Vec<ConfId> {
        let origin = self.nodes[&start];
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([origin]);
        let mut seen = HashSet::from([origin]);

        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors(node) {
                if next == origin {
                    let mut interior = Vec::new();
                    let mut cur = node;
                    while cur != origin {
                        interior.push(self.graph[cur]);
                        cur = parent[&cur];
                    }
                    interior.reverse();

                    let mut path = Vec::with_capacity(interior.len() + 2);
                    path.push(start);
                    path.extend(interior);
                    path.push(start);
                    return path;
                }
                if seen.insert(next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        vec![start, start]
    }
}

/// Flattens configuration dependencies in dependency-first order.
#[derive(Debug)]
pub struct DependencyOrderer<'a> {
    ws: &'a Workspace,
    graphs: [KindGraph; 3],
}

impl<'a> DependencyOrderer<'a> {
    pub fn new(ws: &'a Workspace) -> Self {
        DependencyOrderer {
            ws,
            graphs: DependencyKind::ALL.map(|kind| KindGraph::build(ws, kind)),
        }
    }

    fn graph(&self, kind: DependencyKind) -> &KindGraph {
        &self.graphs[kind.index()]
    }

    /// Error describing the cycle through `conf`, if any.
    fn cycle_error(&self, conf: ConfId, kind: DependencyKind) -> Option<GraphError> {
        let graph = self.graph(kind);
        if !graph.cyclic.contains(&conf) {
            return None;
        }
        if kind.edges(self.ws, conf).contains(&conf) {
            return Some(GraphError::SelfDependency {
                configuration: self.ws.conf_label(conf),
            });
        }
        let path = graph
            .cycle_through(conf)
            .into_iter()
            .map(|c| self.ws.conf_label(c))
            .collect();
        Some(GraphError::CyclicDependency {
            configuration: self.ws.conf_label(conf),
            kind: kind.as_str(),
            path,
        })
    }

    /// Fail on the first cyclic configuration of any kind, in declaration order.
    pub fn check_cycles(&self) -> Result<(), GraphError> {
        for kind in DependencyKind::ALL {
            for conf in self.ws.configurations() {
                if let Some(err) = self.cycle_error(conf.id, kind) {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Dependencies of `conf` of one kind, each after its own dependencies.
    ///
    /// With `transitive` false only the immediate dependencies are returned.
    /// Configurations outside the FASTBuild graph and `conf` itself are
    /// skipped but still traversed.
    pub fn ordered(
        &self,
        conf: ConfId,
        kind: DependencyKind,
        transitive: bool,
    ) -> Result<Vec<ConfId>, GraphError> {
        if let Some(err) = self.cycle_error(conf, kind) {
            return Err(err);
        }

        let mut out: IndexSet<ConfId> = IndexSet::new();
        let mut visited: HashSet<ConfId> = HashSet::new();
        for &dep in kind.edges(self.ws, conf) {
            if transitive {
                self.visit(conf, dep, kind, &mut visited, &mut out);
            } else if self.participates(conf, dep) {
                out.insert(dep);
            }
        }
        Ok(out.into_iter().collect())
    }

    fn participates(&self, root: ConfId, dep: ConfId) -> bool {
        dep != root && self.ws.conf(dep).fastbuild
    }

    fn visit(
        &self,
        root: ConfId,
        dep: ConfId,
        kind: DependencyKind,
        visited: &mut HashSet<ConfId>,
        out: &mut IndexSet<ConfId>,
    ) {
        if !visited.insert(dep) {
            return;
        }
        for &child in kind.edges(self.ws, dep) {
            self.visit(root, child, kind, visited, out);
        }
        if self.participates(root, dep) {
            out.insert(dep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::Target;

    fn chain(names: &[&str]) -> (Workspace, Vec<ConfId>) {
        let mut ws = Workspace::new("/ws");
        let ids = names
            .iter()
            .map(|name| {
                let p = ws.add_project(*name, format!("/ws/{}", name));
                ws.add_configuration(p, "Debug", Target::default()).id
            })
            .collect();
        (ws, ids)
    }

    #[test]
    fn test_transitive_order_puts_dependencies_first() {
        let (mut ws, ids) = chain(&["App", "Engine", "Core", "Math"]);
        let (app, engine, core, math) = (ids[0], ids[1], ids[2], ids[3]);
        ws.conf_mut(app).dependencies = vec![engine, math];
        ws.conf_mut(engine).dependencies = vec![core];
        ws.conf_mut(core).dependencies = vec![math];

        let orderer = DependencyOrderer::new(&ws);
        assert_eq!(
            orderer.ordered(app, DependencyKind::Direct, true).unwrap(),
            vec![math, core, engine]
        );
        assert_eq!(
            orderer.ordered(app, DependencyKind::Direct, false).unwrap(),
            vec![engine, math]
        );
    }

    #[test]
    fn test_non_fastbuild_configurations_are_traversed_not_listed() {
        let (mut ws, ids) = chain(&["App", "Tool", "Core"]);
        ws.conf_mut(ids[0]).dependencies = vec![ids[1]];
        ws.conf_mut(ids[1]).dependencies = vec![ids[2]];
        ws.conf_mut(ids[1]).fastbuild = false;

        let orderer = DependencyOrderer::new(&ws);
        assert_eq!(
            orderer.ordered(ids[0], DependencyKind::Direct, true).unwrap(),
            vec![ids[2]]
        );
    }

    #[test]
    fn test_kinds_are_independent() {
        let (mut ws, ids) = chain(&["App", "Codegen", "Core"]);
        ws.conf_mut(ids[0]).build_only = vec![ids[1]];
        ws.conf_mut(ids[0]).dependencies = vec![ids[2]];
        ws.conf_mut(ids[2]).build_only = vec![ids[0]];

        let orderer = DependencyOrderer::new(&ws);
        assert_eq!(
            orderer.ordered(ids[0], DependencyKind::BuildOnly, true).unwrap(),
            vec![ids[1]]
        );
        assert!(orderer.ordered(ids[0], DependencyKind::ForceUsing, true).unwrap().is_empty());
        assert!(orderer.check_cycles().is_ok());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let (mut ws, ids) = chain(&["X", "Y"]);
        ws.conf_mut(ids[0]).dependencies = vec![ids[1]];
        ws.conf_mut(ids[1]).dependencies = vec![ids[0]];

        let orderer = DependencyOrderer::new(&ws);
        let err = orderer.check_cycles().unwrap_err();
        match &err {
            GraphError::CyclicDependency { configuration, path, kind } => {
                assert_eq!(configuration, "X|Debug|win64");
                assert_eq!(*kind, "direct");
                assert_eq!(
                    path,
                    &vec![
                        "X|Debug|win64".to_string(),
                        "Y|Debug|win64".to_string(),
                        "X|Debug|win64".to_string()
                    ]
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(orderer.ordered(ids[1], DependencyKind::Direct, true).is_err());
    }

    #[test]
    fn test_build_only_cycle_is_rejected() {
        let (mut ws, ids) = chain(&["A", "B", "C"]);
        ws.conf_mut(ids[0]).build_only = vec![ids[1]];
        ws.conf_mut(ids[1]).build_only = vec![ids[2]];
        ws.conf_mut(ids[2]).build_only = vec![ids[0]];

        let orderer = DependencyOrderer::new(&ws);
        let err = orderer.ordered(ids[2], DependencyKind::BuildOnly, true).unwrap_err();
        assert!(err.to_string().contains("cyclic build-only dependency"));
        assert!(err.to_string().contains("C|Debug|win64"));
    }

    #[test]
    fn test_self_dependency() {
        let (mut ws, ids) = chain(&["Loop"]);
        ws.conf_mut(ids[0]).dependencies = vec![ids[0]];

        let orderer = DependencyOrderer::new(&ws);
        assert!(matches!(
            orderer.check_cycles(),
            Err(GraphError::SelfDependency { .. })
        ));
    }
}
