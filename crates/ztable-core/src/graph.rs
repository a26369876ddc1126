//! Formula dependency ordering
//!
//! A formula depends on another formula cell when one of the names it
//! references covers that cell. Edges are built from addresses, not slot
//! names, so an extra alias pointing at an output still creates a dependency.
//! Kahn's algorithm yields the write order or the cells caught in a cycle.

use crate::address::CellAddress;
use crate::formula::Expr;
use crate::names::NameRegistry;
use crate::FormulaError;
use std::collections::VecDeque;

/// A formula cell awaiting ordering
#[derive(Clone, Copy, Debug)]
pub struct FormulaNode<'a> {
    pub slot: &'a str,
    pub cell: CellAddress,
    pub expr: &'a Expr,
}

/// Check every reference and return node indices in dependency order
///
/// Independent formulas keep their input order.
pub fn formula_order(
    nodes: &[FormulaNode<'_>],
    names: &NameRegistry,
) -> Result<Vec<usize>, FormulaError> {
    // dependents[i] = formulas that read node i
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0usize; nodes.len()];

    for (i, node) in nodes.iter().enumerate() {
        let mut deps: Vec<usize> = Vec::new();
        for name in node.expr.references() {
            let named = names.get(name).ok_or_else(|| FormulaError::UndefinedName {
                slot: node.slot.to_string(),
                cell: node.cell,
                name: name.to_string(),
            })?;
            deps.extend(
                nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, other)| named.range.contains(other.cell))
                    .map(|(j, _)| j),
            );
        }
        deps.sort_unstable();
        deps.dedup();

        in_degree[i] = deps.len();
        for dep in deps {
            dependents[dep].push(i);
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &next in &dependents[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != nodes.len() {
        let slots = (0..nodes.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| nodes[i].slot.to_string())
            .collect();
        return Err(FormulaError::Cycle { slots });
    }

    Ok(order)
}
