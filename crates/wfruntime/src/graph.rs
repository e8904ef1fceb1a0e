//! Static checks over a workflow graph, run before (or instead of) executing it.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use wfcore::{NodeConfig, Workflow};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphReport {
    /// Nodes the executor would start from, in node order
    pub triggers: Vec<String>,
    /// Cycles are legal; revisited nodes are skipped at run time
    pub has_cycle: bool,
    /// Edges whose source or target does not exist
    pub dangling_edges: Vec<String>,
    /// Nodes no trigger can reach, so they never run
    pub unreachable_nodes: Vec<String>,
    pub config_errors: Vec<ConfigIssue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigIssue {
    pub node_id: String,
    pub message: String,
}

impl GraphReport {
    /// True when executing would at least get past trigger discovery and
    /// no node is known to fail on its configuration.
    pub fn is_runnable(&self) -> bool {
        !self.triggers.is_empty() && self.config_errors.is_empty()
    }
}

pub fn analyze(workflow: &Workflow) -> GraphReport {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut node_to_index: HashMap<&str, NodeIndex> = HashMap::new();

    for node in &workflow.nodes {
        node_to_index
            .entry(node.id.as_str())
            .or_insert_with(|| graph.add_node(node.id.as_str()));
    }

    let mut dangling_edges = Vec::new();
    for edge in &workflow.edges {
        match (
            node_to_index.get(edge.source.as_str()),
            node_to_index.get(edge.target.as_str()),
        ) {
            (Some(&from), Some(&to)) => {
                graph.add_edge(from, to, ());
            }
            _ => dangling_edges.push(edge.id.clone()),
        }
    }

    let triggers: Vec<String> = workflow
        .trigger_nodes()
        .into_iter()
        .map(|n| n.id.clone())
        .collect();

    let mut reachable: HashSet<NodeIndex> = HashSet::new();
    if let Some(&first) = triggers.first().and_then(|id| node_to_index.get(id.as_str())) {
        let mut dfs = Dfs::new(&graph, first);
        for id in &triggers {
            if let Some(&start) = node_to_index.get(id.as_str()) {
                dfs.move_to(start);
                while let Some(idx) = dfs.next(&graph) {
                    reachable.insert(idx);
                }
            }
        }
    }

    let unreachable_nodes = workflow
        .nodes
        .iter()
        .filter(|n| {
            node_to_index
                .get(n.id.as_str())
                .is_some_and(|idx| !reachable.contains(idx))
        })
        .map(|n| n.id.clone())
        .collect();

    let config_errors = workflow
        .nodes
        .iter()
        .filter_map(|n| {
            NodeConfig::parse(n.node_type, &n.data.config)
                .err()
                .map(|e| ConfigIssue {
                    node_id: n.id.clone(),
                    message: e.to_string(),
                })
        })
        .collect();

    GraphReport {
        triggers,
        has_cycle: is_cyclic_directed(&graph),
        dangling_edges,
        unreachable_nodes,
        config_errors,
    }
}
