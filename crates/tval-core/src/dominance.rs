use crate::block::BlockId;
use crate::function::FunctionBody;
use std::collections::{HashMap, HashSet};

/// Immediate dominators of the blocks reachable from a body's entry.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: BlockId,
    idom: HashMap<BlockId, BlockId>,
    reachable: HashSet<BlockId>,
}

impl DominatorTree {
    pub fn build(body: &FunctionBody) -> Self {
        let entry = body.entry_block;
        let order = Self::reverse_postorder(body, entry);
        let reachable: HashSet<BlockId> = order.iter().copied().collect();

        let mut preds: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        for &block in &order {
            if let Some(data) = body.get_block(block) {
                for succ in data.successors() {
                    if reachable.contains(&succ) {
                        preds.entry(succ).or_default().push(block);
                    }
                }
            }
        }

        let mut doms: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
        doms.insert(entry, HashSet::from([entry]));
        for &block in order.iter().skip(1) {
            doms.insert(block, reachable.clone());
        }

        let mut changed = true;
        while changed {
            changed = false;
            for &block in order.iter().skip(1) {
                let mut new_dom: Option<HashSet<BlockId>> = None;
                for pred in preds.get(&block).into_iter().flatten() {
                    let pred_dom = &doms[pred];
                    new_dom = Some(match new_dom {
                        Some(acc) => acc.intersection(pred_dom).copied().collect(),
                        None => pred_dom.clone(),
                    });
                }
                let mut new_dom = new_dom.unwrap_or_default();
                new_dom.insert(block);
                if doms[&block] != new_dom {
                    doms.insert(block, new_dom);
                    changed = true;
                }
            }
        }

        // The immediate dominator is the strict dominator with the most dominators of its own.
        let mut idom = HashMap::new();
        for &block in order.iter().skip(1) {
            let candidate = doms[&block]
                .iter()
                .copied()
                .filter(|&d| d != block)
                .max_by_key(|d| doms[d].len());
            if let Some(parent) = candidate {
                idom.insert(block, parent);
            }
        }

        Self {
            entry,
            idom,
            reachable,
        }
    }

    fn reverse_postorder(body: &FunctionBody, entry: BlockId) -> Vec<BlockId> {
        let mut visited = HashSet::new();
        let mut postorder = Vec::new();
        let mut stack = vec![(entry, false)];
        while let Some((block, expanded)) = stack.pop() {
            if expanded {
                postorder.push(block);
                continue;
            }
            if !visited.insert(block) {
                continue;
            }
            let Some(data) = body.get_block(block) else {
                continue;
            };
            stack.push((block, true));
            for succ in data.successors().into_iter().rev() {
                if !visited.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }
        postorder.reverse();
        postorder
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.reachable.contains(&block)
    }

    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        self.idom.get(&block).copied()
    }

    /// Whether every path from the entry to `dominated` passes through `dominator`.
    pub fn dominates(&self, dominator: BlockId, dominated: BlockId) -> bool {
        let mut current = dominated;
        loop {
            if current == dominator {
                return true;
            }
            match self.idom.get(&current) {
                Some(&parent) => current = parent,
                None => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleBuilder;
    use crate::types::Type;

    #[test]
    fn test_diamond_join_is_dominated_only_by_entry() {
        let mut mb = ModuleBuilder::new("m");
        let mut fb = mb.function("diamond", vec![Type::Bool], None);
        let c = fb.param(0);
        let left = fb.create_block();
        let right = fb.create_block();
        let join = fb.create_block();
        let orphan = fb.create_block();
        fb.entry_block().branch(c, left, vec![], right, vec![]);
        fb.switch_to_block(left).unwrap().jump(join, vec![]);
        fb.switch_to_block(right).unwrap().jump(join, vec![]);
        fb.switch_to_block(join).unwrap().ret(None);
        fb.switch_to_block(orphan).unwrap().ret(None);

        let body = fb.current_function().body.clone().unwrap();
        let tree = DominatorTree::build(&body);
        let entry = tree.entry();
        assert_eq!(tree.idom(join), Some(entry));
        assert_eq!(tree.idom(left), Some(entry));
        assert!(tree.dominates(entry, join));
        assert!(!tree.dominates(left, join));
        assert!(tree.dominates(left, left));
        assert!(!tree.is_reachable(orphan));
        assert!(!tree.dominates(entry, orphan));
    }
}
