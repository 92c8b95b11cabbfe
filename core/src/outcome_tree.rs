// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The frontier of alternative-outcome hypotheses the search engine is trying to refute.

use crate::assertion::Assertion;
use crate::model::CandidateIndex;
use std::collections::{HashSet, VecDeque};

/// A hypothesised alternative election outcome: some set `head` of candidates is viable
/// instead of the reported winners, with `tail` recording (in reverse elimination order)
/// which candidates are hypothesised eliminated last before that happens.
///
/// `best_ancestor` is stored as an owned copy rather than a reference, per the source's own
/// by-value ancestor field: its lifetime is that of the node holding it, never shared.
#[derive(Clone, Debug)]
pub struct OutcomeNode {
    pub head : HashSet<CandidateIndex>,
    pub tail : Vec<CandidateIndex>,
    pub estimate : Option<f64>,
    pub best_assertion : Option<Assertion>,
    pub best_ancestor : Option<Box<OutcomeNode>>,
    pub expandable : bool,
}

impl OutcomeNode {
    pub fn new_head_only(head:HashSet<CandidateIndex>) -> Self {
        OutcomeNode{ head, tail:vec![], estimate:None, best_assertion:None, best_ancestor:None, expandable:true }
    }

    pub fn is_terminal(&self, num_candidates:usize) -> bool {
        self.head.len()+self.tail.len()==num_candidates
    }

    /// `d` is a descendant of `self` when their heads match and `d`'s tail extends `self`'s
    /// tail at the front (more eliminations hypothesised, same suffix).
    pub fn is_descendant_of(&self, ancestor:&OutcomeNode) -> bool {
        self.head==ancestor.head
            && self.tail.len()>ancestor.tail.len()
            && self.tail[self.tail.len()-ancestor.tail.len()..]==ancestor.tail[..]
    }

    /// Record a candidate ancestor refutation encountered while building a child from this
    /// node: the parent is the new best ancestor for its children when it has a finite
    /// estimate strictly cheaper than whatever ancestor was already being carried forward.
    pub fn best_ancestor_for_child(&self) -> Option<Box<OutcomeNode>> {
        let parent_is_better = match (&self.estimate, self.best_ancestor.as_ref().and_then(|a|a.estimate)) {
            (Some(_),None) => true,
            (Some(p),Some(a)) => *p<a,
            _ => false,
        };
        if parent_is_better {
            Some(Box::new(OutcomeNode{
                head:self.head.clone(), tail:self.tail.clone(), estimate:self.estimate,
                best_assertion:self.best_assertion.clone(), best_ancestor:None, expandable:self.expandable,
            }))
        } else {
            self.best_ancestor.clone()
        }
    }
}

/// Ordered list of outcome nodes, kept sorted by decreasing estimate with infeasible (⊥)
/// nodes first and non-expandable (terminal) nodes sunk to the tail, as required so that
/// `pop_front` always yields the highest-estimate expandable node.
#[derive(Default)]
pub struct Frontier {
    nodes : VecDeque<OutcomeNode>,
}

impl Frontier {
    pub fn new() -> Self { Frontier{ nodes: VecDeque::new() } }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn iter(&self) -> impl Iterator<Item=&OutcomeNode> { self.nodes.iter() }

    pub fn insert(&mut self, node:OutcomeNode) {
        if !node.expandable {
            self.nodes.push_back(node);
            return;
        }
        match node.estimate {
            None => self.nodes.push_front(node),
            Some(estimate) => {
                let pos = self.nodes.iter().position(|n| n.expandable && n.estimate.map_or(false,|e|e<=estimate));
                match pos {
                    Some(i) => self.nodes.insert(i,node),
                    None => {
                        // insert after the last expandable node (before the terminal tail)
                        let last_expandable = self.nodes.iter().rposition(|n|n.expandable);
                        match last_expandable {
                            Some(i) => self.nodes.insert(i+1,node),
                            None => self.nodes.push_front(node),
                        }
                    }
                }
            }
        }
    }

    pub fn pop_front(&mut self) -> Option<OutcomeNode> { self.nodes.pop_front() }

    pub fn descendants_of<'a>(&'a self, ancestor:&'a OutcomeNode) -> impl Iterator<Item=&'a OutcomeNode> {
        self.nodes.iter().filter(move |n|n.is_descendant_of(ancestor))
    }

    /// Remove every currently-expandable entry that is a descendant of `ancestor`.
    pub fn remove_expandable_descendants_of(&mut self, ancestor:&OutcomeNode) {
        self.nodes.retain(|n| !(n.expandable && n.is_descendant_of(ancestor)));
    }

    /// Highest (worst) estimate currently on the frontier, `None` if any node is ⊥ or the
    /// frontier is empty.
    pub fn max_estimate(&self) -> Option<f64> {
        if self.nodes.iter().any(|n|n.expandable && n.estimate.is_none()) { return None; }
        self.nodes.iter().filter(|n|n.expandable).filter_map(|n|n.estimate)
            .fold(None,|acc,e| Some(acc.map_or(e,|a:f64|a.max(e))))
    }

    pub fn into_vec(self) -> Vec<OutcomeNode> { self.nodes.into_iter().collect() }
}

/// Convert `node.best_ancestor` back into a full frontier node, drop every currently
/// expandable descendant of it, and insert the reconstructed ancestor.
pub fn replace_with_ancestor(frontier:&mut Frontier, node:&OutcomeNode) {
    if let Some(ancestor) = node.best_ancestor.clone() {
        frontier.remove_expandable_descendants_of(&ancestor);
        frontier.insert(*ancestor);
    }
}

pub fn unmentioned(num_candidates:usize, head:&HashSet<CandidateIndex>, tail:&[CandidateIndex]) -> Vec<CandidateIndex> {
    let mentioned : HashSet<CandidateIndex> = head.iter().cloned().chain(tail.iter().cloned()).collect();
    (0..num_candidates as u32).map(CandidateIndex).filter(|c|!mentioned.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(head:&[u32], tail:&[u32], estimate:Option<f64>, expandable:bool) -> OutcomeNode {
        OutcomeNode{
            head: head.iter().map(|&c|CandidateIndex(c)).collect(),
            tail: tail.iter().map(|&c|CandidateIndex(c)).collect(),
            estimate, best_assertion:None, best_ancestor:None, expandable,
        }
    }

    #[test]
    fn insert_keeps_descending_order_with_infinite_first() {
        let mut frontier = Frontier::new();
        frontier.insert(node(&[0],&[],Some(10.0),true));
        frontier.insert(node(&[1],&[],Some(20.0),true));
        frontier.insert(node(&[2],&[],None,true));
        let ests : Vec<_> = frontier.iter().map(|n|n.estimate).collect();
        assert_eq!(ests,vec![None,Some(20.0),Some(10.0)]);
    }

    #[test]
    fn terminal_nodes_sink_to_tail() {
        let mut frontier = Frontier::new();
        frontier.insert(node(&[0],&[],Some(10.0),true));
        frontier.insert(node(&[1],&[],Some(999.0),false));
        frontier.insert(node(&[2],&[],Some(5.0),true));
        let last = frontier.iter().last().unwrap();
        assert!(!last.expandable);
    }

    #[test]
    fn descendant_requires_matching_head_and_suffix() {
        let ancestor = node(&[0],&[1],Some(1.0),true);
        let descendant = node(&[0],&[2,1],Some(1.0),true);
        let not_descendant = node(&[0],&[2,3],Some(1.0),true);
        assert!(descendant.is_descendant_of(&ancestor));
        assert!(!not_descendant.is_descendant_of(&ancestor));
    }
}
