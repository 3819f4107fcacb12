use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::DpId;
use crate::network::TopologySnapshot;

#[derive(Debug)]
struct State {
    cost: u32,
    switch: DpId,
    path: Vec<DpId>,
}

impl Eq for State {}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.switch == other.switch
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for a min-heap; equal costs fall back to the
        // lower switch id so ties resolve the same way every run.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.switch.cmp(&self.switch))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Hop-count shortest path from `src` to `dst` over the snapshot's link
/// graph, returned as the ordered switch sequence including both endpoints.
/// Among equal-length paths the one running through lower switch ids wins;
/// repeated calls on the same snapshot agree. `None` when either switch is
/// unknown or the graph does not connect them.
pub fn shortest_path(snapshot: &TopologySnapshot, src: DpId, dst: DpId) -> Option<Vec<DpId>> {
    if !snapshot.contains(src) || !snapshot.contains(dst) {
        return None;
    }
    if src == dst {
        return Some(vec![src]);
    }

    let mut best: HashMap<DpId, u32> = HashMap::new();
    let mut heap = BinaryHeap::new();

    best.insert(src, 0);
    heap.push(State {
        cost: 0,
        switch: src,
        path: vec![src],
    });

    while let Some(State { cost, switch, path }) = heap.pop() {
        if switch == dst {
            return Some(path);
        }
        // Skip if a cheaper way here was already found.
        if cost > *best.get(&switch).unwrap_or(&u32::MAX) {
            continue;
        }

        for next in snapshot.neighbors(switch) {
            let next_cost = cost + 1;
            if next_cost < *best.get(&next).unwrap_or(&u32::MAX) {
                best.insert(next, next_cost);
                let mut next_path = path.clone();
                next_path.push(next);
                heap.push(State {
                    cost: next_cost,
                    switch: next,
                    path: next_path,
                });
            }
        }
    }

    None
}
