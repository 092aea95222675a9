//! Status propagation.
//!
//! A change at one node (a set, a connect, a disconnect) has to reach every
//! transitive subscriber, recompute the eager ones, and do each of those
//! things at most once — even when the graph contains diamonds or cycles.
//!
//! # How a pass works
//!
//! 1. **Mark.** Breadth-first sweep over subscriber edges from the origin.
//!    Every reached node folds the incoming status into its own: the new
//!    status is the worst of the incoming status (at least stale) and the
//!    statuses of all its upstream dependencies, excluding the origin
//!    itself so a half-settled origin cannot poison the pass. The sweep
//!    records whether any edge leads back to the origin.
//!
//! 2. **Order.** The marked set is sorted into dependency order (upstream
//!    before downstream) so every eager node recomputes after its inputs
//!    have settled. Members of a cycle have no such order; they keep their
//!    discovery order, which matches the direction the change is flowing.
//!
//! 3. **Update.** Walk the ordered set with a `live` set, seeded with the
//!    origin, of nodes whose change is actually flowing this pass. Eager
//!    stale nodes recompute; if the recompute produced nothing new the node
//!    does not join the live set and the change dies out along that branch.
//!    A node with no live upstream gets its pre-sweep status back — the
//!    mark was speculative and the change it announced never arrived.
//!    Nodes that go live also retrigger re-resolution for path subscribers
//!    that route through their value.
//!
//! 4. **Cycle epilogue.** If an edge led back to a still-unsettled origin,
//!    the origin gets one extra fold-and-recompute, which is what lets a
//!    pair of mutually dependent signals converge in a single pass.

use std::collections::{HashMap, HashSet, VecDeque};

use super::signal::Signal;
use super::status::Status;

/// Run one propagation pass from `origin`.
///
/// `refresh_origin` means the origin's own status is in question too
/// (connect, disconnect): fold and recompute it before fanning out. A set
/// passes `false`; the caller has just stored the value and the origin is
/// authoritative.
pub(crate) fn propagate(origin: &Signal, incoming: Status, refresh_origin: bool) {
    tracing::trace!(
        signal = %origin.name(),
        status = incoming.label(),
        refresh = refresh_origin,
        "propagation pass"
    );

    if refresh_origin {
        fold_status(origin, incoming, origin);
    }

    // Phase 1: mark. Pre-sweep statuses are kept so nodes the change never
    // reaches can be settled back during the update walk.
    let mut visited: HashSet<u64> = HashSet::new();
    visited.insert(origin.id());
    let mut looped_back = false;
    let mut marked: Vec<Signal> = Vec::new();
    let mut prior: HashMap<u64, Status> = HashMap::new();
    let mut queue: VecDeque<Signal> = origin.downstream_snapshot().into();
    while let Some(node) = queue.pop_front() {
        if node.id() == origin.id() {
            looped_back = true;
            continue;
        }
        if !visited.insert(node.id()) {
            continue;
        }
        prior.insert(node.id(), node.status());
        fold_status(&node, incoming, origin);
        for next in node.downstream_snapshot() {
            if next.id() == origin.id() {
                looped_back = true;
            } else if !visited.contains(&next.id()) {
                queue.push_back(next);
            }
        }
        marked.push(node);
    }

    // Refresh the origin before anyone downstream runs. If an eager
    // origin's recompute produced nothing new, no value changed: the
    // origin stays out of the live set and the walk below settles every
    // marked node back to its pre-sweep status.
    let mut origin_live = true;
    if refresh_origin {
        if origin.is_active() && origin.status() == Status::Stale {
            origin_live = guarded_update(origin);
        }
        if origin_live {
            run_reconnects(origin);
        }
    }

    // Phase 2: order, then update.
    let order = dependency_order(&marked);

    let mut live: HashSet<u64> = HashSet::new();
    if origin_live {
        live.insert(origin.id());
    }

    for node in &order {
        let upstream = node.upstream_snapshot();
        if !upstream.iter().any(|u| live.contains(&u.id())) {
            // The change died out before this branch. The stale mark was
            // speculative; give the node its pre-sweep status back, still
            // folded with whatever its upstream carry now.
            let mut settled = prior.get(&node.id()).copied().unwrap_or(Status::Ok);
            for u in &upstream {
                settled = settled.combine(u.status());
            }
            node.set_status_raw(settled);
            continue;
        }
        let mut goes_live = true;
        if node.is_active() && node.status() == Status::Stale {
            goes_live = guarded_update(node);
        }
        if goes_live {
            live.insert(node.id());
            run_reconnects(node);
        }
    }

    // Phase 3: cycle epilogue.
    if looped_back && origin.status() != Status::Ok {
        fold_status(origin, incoming, origin);
        if origin.is_active() && origin.status() == Status::Stale {
            guarded_update(origin);
        }
    }
}

/// Fold `incoming` (at least stale) with the statuses of `node`'s upstream
/// dependencies, excluding `origin`, and store the result.
fn fold_status(node: &Signal, incoming: Status, origin: &Signal) {
    let mut folded = incoming.combine(Status::Stale);
    for upstream in node.upstream_snapshot() {
        if upstream.id() == origin.id() {
            continue;
        }
        folded = folded.combine(upstream.status());
    }
    node.set_status_raw(folded);
}

/// Recompute `node`, reporting whether its update counter advanced.
///
/// Recompute failures do not abort the pass: a node whose inputs are not
/// ready simply stays behind, and its own status already says so.
fn guarded_update(node: &Signal) -> bool {
    let before = node.update_count();
    if let Err(err) = node.update_value() {
        if err.is_not_ready() {
            tracing::debug!(signal = %node.name(), error = %err, "recompute deferred");
        } else {
            tracing::warn!(signal = %node.name(), error = %err, "recompute failed");
        }
    }
    node.update_count() != before
}

/// Reconnect every subscriber that resolved a path through this node's
/// value; a new value may route their dependencies somewhere else.
pub(crate) fn run_reconnects(node: &Signal) {
    for sub in node.reconnect_snapshot() {
        let _ = sub.connect_with(false);
    }
}

/// Order `marked` so that upstream nodes come before their subscribers,
/// considering only edges internal to the set. Cycle members never reach
/// in-degree zero and are appended in their discovery order.
fn dependency_order(marked: &[Signal]) -> Vec<Signal> {
    let index: HashMap<u64, usize> = marked
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id(), i))
        .collect();

    let mut indegree = vec![0usize; marked.len()];
    for (i, node) in marked.iter().enumerate() {
        let mut seen = HashSet::new();
        for upstream in node.upstream_snapshot() {
            if index.contains_key(&upstream.id()) && seen.insert(upstream.id()) {
                indegree[i] += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();
    let mut placed = vec![false; marked.len()];
    let mut order = Vec::with_capacity(marked.len());

    while let Some(i) = queue.pop_front() {
        placed[i] = true;
        order.push(marked[i].clone());
        for down in marked[i].downstream_snapshot() {
            if let Some(&j) = index.get(&down.id()) {
                if !placed[j] && indegree[j] > 0 {
                    indegree[j] -= 1;
                    if indegree[j] == 0 {
                        queue.push_back(j);
                    }
                }
            }
        }
    }

    for (i, node) in marked.iter().enumerate() {
        if !placed[i] {
            order.push(node.clone());
        }
    }
    order
}
