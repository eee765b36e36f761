//! Dependency graph over a project's parts.
//!
//! Nodes are parts (weighted by declaration index); edges run from a
//! dependency to its dependent. The graph orders parts into waves: every part
//! in a wave only depends on parts in earlier waves. Within a wave parts keep
//! their declaration order.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::config::ConfigError;
use crate::project::Project;

pub struct PartGraph {
  graph: DiGraph<usize, ()>,
  nodes: Vec<NodeIndex>,
  names: Vec<String>,
}

impl PartGraph {
  /// Build the graph for `project`.
  ///
  /// # Errors
  ///
  /// `DependencyCycle` with the cycle path if the parts' `after` lists form a
  /// cycle, including a part depending on itself.
  pub fn new(project: &Project) -> Result<Self, ConfigError> {
    let mut graph = DiGraph::new();
    let names: Vec<String> = project.parts().iter().map(|p| p.name().to_string()).collect();
    let nodes: Vec<NodeIndex> = (0..names.len()).map(|idx| graph.add_node(idx)).collect();

    for (idx, part) in project.parts().iter().enumerate() {
      for dep in part.after() {
        let dep_idx = project.index_of(dep).ok_or_else(|| ConfigError::UnknownDependency {
          part: part.name().to_string(),
          dependency: dep.clone(),
        })?;
        graph.add_edge(nodes[dep_idx], nodes[idx], ());
      }
    }

    let dag = Self { graph, nodes, names };
    dag.verify_acyclic()?;
    Ok(dag)
  }

  fn verify_acyclic(&self) -> Result<(), ConfigError> {
    if toposort(&self.graph, None).is_ok() {
      return Ok(());
    }
    let cycle = self.find_cycle().into_iter().map(|idx| self.names[idx].clone()).collect();
    Err(ConfigError::DependencyCycle { cycle })
  }

  /// A cycle as declaration indices, first element repeated at the end.
  /// Follows `after` edges starting from the earliest declared part involved.
  fn find_cycle(&self) -> Vec<usize> {
    let cyclic = tarjan_scc(&self.graph)
      .into_iter()
      .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
      .min_by_key(|scc| scc.iter().map(|n| self.graph[*n]).min());
    let Some(scc) = cyclic else {
      return Vec::new();
    };

    let members: HashSet<NodeIndex> = scc.iter().copied().collect();
    let Some(&start) = scc.iter().min_by_key(|n| self.graph[**n]) else {
      return Vec::new();
    };
    if self.graph.contains_edge(start, start) {
      return vec![self.graph[start], self.graph[start]];
    }

    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
      for dep in self.sorted_neighbors(node, Direction::Incoming) {
        if !members.contains(&dep) {
          continue;
        }
        if dep == start {
          let mut chain = vec![node];
          let mut current = node;
          while current != start {
            match parent.get(&current) {
              Some(&p) => current = p,
              None => break,
            }
            chain.push(current);
          }
          chain.reverse();
          chain.push(start);
          return chain.into_iter().map(|n| self.graph[n]).collect();
        }
        if let std::collections::hash_map::Entry::Vacant(e) = parent.entry(dep) {
          e.insert(node);
          queue.push_back(dep);
        }
      }
    }

    scc.iter().map(|n| self.graph[*n]).collect()
  }

  fn sorted_neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
    let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
    neighbors.sort_by_key(|n| self.graph[*n]);
    neighbors.dedup();
    neighbors
  }

  /// Direct dependencies of the part at `idx`, in declaration order.
  pub fn dependencies(&self, idx: usize) -> Vec<usize> {
    self
      .sorted_neighbors(self.nodes[idx], Direction::Incoming)
      .into_iter()
      .map(|n| self.graph[n])
      .collect()
  }

  /// All parts, organized into waves.
  pub fn waves(&self) -> Vec<Vec<usize>> {
    self.waves_of(&(0..self.nodes.len()).collect())
  }

  /// `members` organized into waves, considering only edges between members.
  pub fn waves_of(&self, members: &BTreeSet<usize>) -> Vec<Vec<usize>> {
    // Kahn's algorithm, one level at a time
    let mut in_degree: HashMap<usize, usize> = members
      .iter()
      .map(|&idx| {
        let deps = self.dependencies(idx).into_iter().filter(|d| members.contains(d)).count();
        (idx, deps)
      })
      .collect();

    let mut remaining = members.clone();
    let mut waves = Vec::new();
    while !remaining.is_empty() {
      let ready: Vec<usize> = remaining.iter().copied().filter(|idx| in_degree[idx] == 0).collect();
      if ready.is_empty() {
        break;
      }

      for idx in &ready {
        remaining.remove(idx);
        for dependent in self.sorted_neighbors(self.nodes[*idx], Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&self.graph[dependent]) {
            *deg = deg.saturating_sub(1);
          }
        }
      }
      waves.push(ready);
    }
    waves
  }
}
