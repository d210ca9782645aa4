//! Package-level initialization order.
//!
//! Every package-level variable and constant declaration is a node of a
//! dependency graph; an n:1 declaration `a, b = f()` is a single node.
//! References made through package-level functions count as references of
//! the initializer that names the function. Nodes are emitted dependencies
//! first, visiting roots and dependencies in declaration order. A cycle is
//! cut before its earliest-declared member.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::errors::TypeError;
use crate::objects::{DeclInfoKey, ObjKey};

use super::checker::Checker;
use super::resolver::DeclInfo;
use super::type_info::Initializer;

// =========================================================================
// Part 1: Ordering
// =========================================================================

/// The result of ordering a dependency graph.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct GraphOrder {
    /// Every node exactly once.
    pub order: Vec<usize>,
    /// The strongly connected components that had to be cut, each sorted.
    pub cycles: Vec<Vec<usize>>,
}

/// Orders the nodes `0..deps.len()`, where node indices follow declaration
/// order and `deps[n]` lists the nodes `n` depends on.
pub(crate) fn order_graph(deps: &[Vec<usize>]) -> GraphOrder {
    let nodes: Vec<usize> = (0..deps.len()).collect();
    let mut result = GraphOrder::default();
    order_nodes(&nodes, deps, &mut result, true);
    result
}

/// Orders the subgraph induced by `nodes`, which must be sorted.
fn order_nodes(nodes: &[usize], deps: &[Vec<usize>], out: &mut GraphOrder, report: bool) {
    let sccs = Tarjan::run(nodes, deps);
    let mut comp_of: HashMap<usize, usize> = HashMap::new();
    for (c, members) in sccs.iter().enumerate() {
        for &m in members {
            comp_of.insert(m, c);
        }
    }

    let mut done = vec![false; sccs.len()];
    let mut walk = ComponentWalk {
        deps,
        sccs: &sccs,
        comp_of: &comp_of,
        done: &mut done,
        out,
        report,
    };
    for &n in nodes {
        walk.visit(comp_of[&n]);
    }
}

struct ComponentWalk<'g> {
    deps: &'g [Vec<usize>],
    sccs: &'g [Vec<usize>],
    comp_of: &'g HashMap<usize, usize>,
    done: &'g mut [bool],
    out: &'g mut GraphOrder,
    report: bool,
}

impl<'g> ComponentWalk<'g> {
    fn visit(&mut self, c: usize) {
        if self.done[c] {
            return;
        }
        self.done[c] = true;

        let sccs = self.sccs;
        let members = &sccs[c];
        let mut outside: Vec<usize> = members
            .iter()
            .flat_map(|&m| self.deps[m].iter().copied())
            .filter(|d| self.comp_of.get(d).map_or(false, |&dc| dc != c))
            .collect();
        outside.sort_unstable();
        outside.dedup();
        for d in outside {
            self.visit(self.comp_of[&d]);
        }

        let self_loop = members.len() == 1 && self.deps[members[0]].contains(&members[0]);
        if members.len() == 1 && !self_loop {
            self.out.order.push(members[0]);
            return;
        }
        if self.report {
            self.out.cycles.push(members.clone());
        }
        // the earliest member reads zero values of the rest
        self.out.order.push(members[0]);
        let rest = members[1..].to_vec();
        order_nodes(&rest, self.deps, self.out, false);
    }
}

/// Strongly connected components of the subgraph induced by a node set.
struct Tarjan<'g> {
    deps: &'g [Vec<usize>],
    allowed: IndexSet<usize>,
    index: HashMap<usize, usize>,
    low: HashMap<usize, usize>,
    stack: Vec<usize>,
    on_stack: IndexSet<usize>,
    sccs: Vec<Vec<usize>>,
}

impl<'g> Tarjan<'g> {
    /// Returns the components, each sorted, in no particular order.
    fn run(nodes: &[usize], deps: &'g [Vec<usize>]) -> Vec<Vec<usize>> {
        let mut t = Tarjan {
            deps,
            allowed: nodes.iter().copied().collect(),
            index: HashMap::new(),
            low: HashMap::new(),
            stack: Vec::new(),
            on_stack: IndexSet::new(),
            sccs: Vec::new(),
        };
        for &n in nodes {
            if !t.index.contains_key(&n) {
                t.connect(n);
            }
        }
        t.sccs
    }

    fn connect(&mut self, v: usize) {
        let i = self.index.len();
        self.index.insert(v, i);
        self.low.insert(v, i);
        self.stack.push(v);
        self.on_stack.insert(v);

        let deps = self.deps;
        for &w in &deps[v] {
            if !self.allowed.contains(&w) {
                continue;
            }
            if !self.index.contains_key(&w) {
                self.connect(w);
                let lw = self.low[&w];
                let lv = self.low.entry(v).or_insert(lw);
                *lv = (*lv).min(lw);
            } else if self.on_stack.contains(&w) {
                let iw = self.index[&w];
                let lv = self.low.entry(v).or_insert(iw);
                *lv = (*lv).min(iw);
            }
        }

        if self.low[&v] == self.index[&v] {
            let mut scc = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack.swap_remove(&w);
                scc.push(w);
                if w == v {
                    break;
                }
            }
            scc.sort_unstable();
            self.sccs.push(scc);
        }
    }
}

// =========================================================================
// Part 2: Package graph
// =========================================================================

impl<'a> Checker<'a> {
    /// Computes the initialization order of the package-level variables
    /// and records it in the type info.
    pub(crate) fn init_order(&mut self) {
        let func_refs = self.func_references();

        // one node per variable or constant declaration
        let mut nodes: IndexMap<DeclInfoKey, Vec<ObjKey>> = IndexMap::new();
        for (&okey, &dkey) in &self.obj_map {
            if matches!(self.tc_objs.decls[dkey], DeclInfo::Var(_) | DeclInfo::Const(_)) {
                nodes.entry(dkey).or_default().push(okey);
            }
        }
        let node_of: HashMap<ObjKey, usize> = nodes
            .iter()
            .enumerate()
            .flat_map(|(i, (_, objs))| objs.iter().map(move |&o| (o, i)))
            .collect();

        let deps: Vec<Vec<usize>> = nodes
            .keys()
            .map(|&dkey| {
                let mut out: Vec<usize> = Vec::new();
                for d in self.tc_objs.decls[dkey].deps().into_iter().flatten() {
                    match func_refs.get(d) {
                        Some(refs) => out.extend(refs.iter().filter_map(|r| node_of.get(r).copied())),
                        None => out.extend(node_of.get(d).copied()),
                    }
                }
                out.sort_unstable();
                out.dedup();
                out
            })
            .collect();

        let graph = order_graph(&deps);

        if self.config.report_init_cycles {
            for cycle in &graph.cycles {
                self.report_cycle(cycle.iter().flat_map(|&n| nodes[n].iter().copied()).collect());
            }
        }

        let mut inits = Vec::new();
        for &n in &graph.order {
            let Some((&dkey, objs)) = nodes.get_index(n) else {
                continue;
            };
            let DeclInfo::Var(var) = &self.tc_objs.decls[dkey] else {
                continue;
            };
            let Some(init) = &var.init else {
                continue;
            };
            let lhs = var.lhs.clone().unwrap_or_else(|| objs.clone());
            inits.push(Initializer {
                lhs,
                rhs: (**init).clone(),
            });
        }
        debug!(
            initializers = inits.len(),
            cycles = graph.cycles.len(),
            "initialization order computed"
        );
        self.result.init_order = inits;
    }

    /// The package-level variables and constants each package-level
    /// function or method reaches through the functions it references.
    fn func_references(&self) -> HashMap<ObjKey, IndexSet<ObjKey>> {
        let mut direct: HashMap<ObjKey, (IndexSet<ObjKey>, Vec<ObjKey>)> = HashMap::new();
        for (&okey, &dkey) in &self.obj_map {
            let DeclInfo::Func(f) = &self.tc_objs.decls[dkey] else {
                continue;
            };
            let (vars, funcs): (Vec<ObjKey>, Vec<ObjKey>) = f
                .deps
                .iter()
                .copied()
                .partition(|d| !self.tc_objs.lobjs[*d].entity_type().is_func());
            direct.insert(okey, (vars.into_iter().collect(), funcs));
        }

        let mut refs: HashMap<ObjKey, IndexSet<ObjKey>> =
            direct.iter().map(|(&f, (vars, _))| (f, vars.clone())).collect();
        loop {
            let mut changed = false;
            for (f, (_, callees)) in &direct {
                let mut add: Vec<ObjKey> = Vec::new();
                for g in callees {
                    if let Some(r) = refs.get(g) {
                        add.extend(r.iter().copied());
                    }
                }
                if let Some(set) = refs.get_mut(f) {
                    for v in add {
                        changed |= set.insert(v);
                    }
                }
            }
            if !changed {
                break;
            }
        }
        refs
    }

    fn report_cycle(&mut self, cycle: Vec<ObjKey>) {
        let Some(&first) = cycle.first() else {
            return;
        };
        let mut msg = format!("initialization cycle for {}", self.tc_objs.lobjs[first].name());
        for &o in &cycle {
            msg.push_str(&format!("\n\t{} refers to", self.tc_objs.lobjs[o].name()));
        }
        msg.push_str(&format!("\n\t{}", self.tc_objs.lobjs[first].name()));
        let span = self.obj_span(first);
        self.error(TypeError::InitCycle, span, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn position(order: &[usize], n: usize) -> usize {
        order.iter().position(|&m| m == n).unwrap()
    }

    #[test]
    fn test_chain_emits_dependencies_first() {
        // a = 0; x = y; y = z; z = 0
        let deps = vec![vec![], vec![2], vec![3], vec![]];
        let g = order_graph(&deps);
        assert_eq!(g.order, vec![0, 3, 2, 1]);
        assert!(g.cycles.is_empty());
    }

    #[test]
    fn test_dependencies_visited_in_declaration_order() {
        // d = c + b; a = 0; b = 0; c = 0
        let deps = vec![vec![3, 2], vec![], vec![], vec![]];
        let mut sorted = deps.clone();
        sorted.iter_mut().for_each(|d| d.sort_unstable());
        let g = order_graph(&sorted);
        assert_eq!(g.order, vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_cycle_cut_before_earliest_member() {
        // p = 0; x = y; y = x
        let deps = vec![vec![], vec![2], vec![1]];
        let g = order_graph(&deps);
        assert_eq!(g.order, vec![0, 1, 2]);
        assert_eq!(g.cycles, vec![vec![1, 2]]);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let deps = vec![vec![0]];
        let g = order_graph(&deps);
        assert_eq!(g.order, vec![0]);
        assert_eq!(g.cycles, vec![vec![0]]);
    }

    #[test]
    fn test_three_cycle_orders_remainder() {
        // 0 -> 2 -> 1 -> 0
        let deps = vec![vec![2], vec![0], vec![1]];
        let g = order_graph(&deps);
        assert_eq!(g.order[0], 0);
        // with 0 removed, 2 depends on 1
        assert_eq!(&g.order[1..], &[1, 2]);
        assert_eq!(g.cycles.len(), 1);
    }

    fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
        (1usize..24).prop_flat_map(|n| {
            proptest::collection::vec(proptest::collection::vec(any::<prop::sample::Index>(), 0..4), n).prop_map(
                move |raw| {
                    raw.into_iter()
                        .enumerate()
                        .map(|(i, picks)| {
                            // only edges to other nodes of a fixed total order
                            let mut d: Vec<usize> = picks
                                .into_iter()
                                .filter_map(|p| (i > 0).then(|| p.index(i)))
                                .collect();
                            d.sort_unstable();
                            d.dedup();
                            d
                        })
                        .collect()
                },
            )
        })
    }

    fn graph() -> impl Strategy<Value = Vec<Vec<usize>>> {
        (1usize..24).prop_flat_map(|n| {
            proptest::collection::vec(proptest::collection::vec(0..n, 0..4), n).prop_map(|mut deps| {
                deps.iter_mut().for_each(|d| {
                    d.sort_unstable();
                    d.dedup();
                });
                deps
            })
        })
    }

    proptest! {
        #[test]
        fn prop_acyclic_order_is_topological(deps in dag()) {
            let g = order_graph(&deps);
            prop_assert!(g.cycles.is_empty());
            for (n, ds) in deps.iter().enumerate() {
                for &d in ds {
                    prop_assert!(position(&g.order, d) < position(&g.order, n));
                }
            }
        }

        #[test]
        fn prop_order_is_permutation(deps in graph()) {
            let g = order_graph(&deps);
            let mut seen = g.order.clone();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..deps.len()).collect::<Vec<_>>());
        }

        #[test]
        fn prop_order_is_deterministic(deps in graph()) {
            prop_assert_eq!(order_graph(&deps), order_graph(&deps));
        }

        #[test]
        fn prop_edges_outside_cycles_respected(deps in graph()) {
            let g = order_graph(&deps);
            let cyclic: IndexSet<usize> = g.cycles.iter().flatten().copied().collect();
            for (n, ds) in deps.iter().enumerate() {
                for &d in ds {
                    if !(cyclic.contains(&n) && cyclic.contains(&d)) {
                        prop_assert!(position(&g.order, d) < position(&g.order, n));
                    }
                }
            }
        }
    }
}
