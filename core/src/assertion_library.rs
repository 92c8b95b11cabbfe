// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Enumerates candidate assertions for a frontier node and picks the cheapest.
//!
//! Mirrors `FindBestAudit` in the original C++: the node's shape (empty tail vs. a partial
//! elimination order) determines which assertion families are even applicable.

use crate::assertion::{Assertion, AssertionKind};
use crate::asn_oracle::AsnOracle;
use crate::model::{CandidateIndex, Contest};
use crate::neb_matrix::NebMatrix;
use crate::outcome_tree::{unmentioned, OutcomeNode};
use std::collections::HashSet;

fn better(current:Option<Assertion>, candidate:Assertion) -> Option<Assertion> {
    match current {
        None => Some(candidate),
        Some(best) => if candidate.cheaper_than(&best) { Some(candidate) } else { Some(best) },
    }
}

/// `tail[0]`'s tally against a single `opponent`, under the elimination profile where
/// `unmentioned` candidates have been removed: a straight `IRV` tally comparison, falling
/// back to the `NEB` relation from `tail[0]` to `opponent` when the tally comparison is not
/// statistically feasible. Takes the cheaper of (a) the tally-based claim and (b) NEB.
fn find_best_irv_or_neb(contest:&Contest, oracle:&impl AsnOracle, nebs:&NebMatrix, tail0:CandidateIndex, opponent:CandidateIndex, eliminated:&[CandidateIndex], tallies:&[crate::model::BallotPaperCount]) -> Assertion {
    let tally_cmp = {
        let kind = AssertionKind::Irv{ winner:tail0, loser:opponent, eliminated: eliminated.to_vec() };
        let exhausted = contest.total_votes() - tallies.iter().cloned().sum();
        let (asn,margin) = oracle.asn_cdiff(tallies[tail0.0 as usize], tallies[opponent.0 as usize], 0.0, exhausted);
        Assertion{ kind, asn, margin }
    };
    match nebs.get(tail0,opponent) {
        Some(neb) if neb.cheaper_than(&tally_cmp) => neb.clone(),
        _ => tally_cmp,
    }
}

/// `find_best_assertion(node)`: the minimum-ASN assertion refuting the hypothesis `node`
/// represents, or `None` if nothing applicable was found (callers treat an infeasible
/// result the same as "no assertion found" for pruning purposes).
///
/// `winners` and `initial_viables` (the per-candidate `VIABLE(u, ∅)` assertions computed
/// once at frontier construction time) are only consulted when `node.tail` is empty.
pub fn find_best_assertion(contest:&Contest, oracle:&impl AsnOracle, nebs:&NebMatrix, node:&OutcomeNode, winners:&HashSet<CandidateIndex>, initial_viables:&std::collections::HashMap<CandidateIndex,Assertion>) -> Option<Assertion> {
    let n = contest.num_candidates();
    if node.tail.is_empty() {
        find_best_assertion_empty_tail(contest,oracle,nebs,node,winners,initial_viables)
    } else {
        find_best_assertion_nonempty_tail(contest,oracle,nebs,node,n)
    }
}

fn find_best_assertion_empty_tail(contest:&Contest, oracle:&impl AsnOracle, nebs:&NebMatrix, node:&OutcomeNode, winners:&HashSet<CandidateIndex>, initial_viables:&std::collections::HashMap<CandidateIndex,Assertion>) -> Option<Assertion> {
    let mut best : Option<Assertion> = None;
    let complement : Vec<CandidateIndex> = contest.candidate_indices().filter(|c|!node.head.contains(c)).collect();
    let complement_set : HashSet<CandidateIndex> = complement.iter().cloned().collect();
    let (tallies,exhausted) = contest.tallies_with_eliminated(&complement_set);
    // (1) every reported winner hypothesised absent from the alternative viable set.
    for &c in node.head.iter().filter(|c|winners.contains(c)) {
        let (asn,margin) = oracle.asn_nonviable(&tallies,exhausted,tallies[c.0 as usize],contest.threshold_fr);
        let kind = AssertionKind::Nonviable{ loser:c, eliminated: complement.clone() };
        best = better(best,Assertion{kind,asn,margin});
    }
    // (2) any candidate outside head that is statistically viable on the unmodified election.
    for u in contest.candidate_indices().filter(|c|!node.head.contains(c)) {
        if let Some(assertion) = initial_viables.get(&u) {
            best = better(best,assertion.clone());
        }
    }
    // (3) NEB from a candidate outside head to one inside it.
    for u in contest.candidate_indices().filter(|c|!node.head.contains(c)) {
        for &c in &node.head {
            if let Some(neb) = nebs.get(u,c) {
                best = better(best,neb.clone());
            }
        }
    }
    best
}

fn find_best_assertion_nonempty_tail(contest:&Contest, oracle:&impl AsnOracle, nebs:&NebMatrix, node:&OutcomeNode, n:usize) -> Option<Assertion> {
    let tail0 = node.tail[0];
    let unmentioned_set = unmentioned(n,&node.head,&node.tail);
    let unmentioned_keys : HashSet<CandidateIndex> = unmentioned_set.iter().cloned().collect();
    let (tallies,exhausted) = contest.tallies_with_eliminated(&unmentioned_keys);
    let mut best : Option<Assertion> = None;

    let (asn,margin) = oracle.asn_viable(&tallies,exhausted,tallies[tail0.0 as usize],contest.threshold_fr);
    best = better(best,Assertion{ kind: AssertionKind::Viable{ winner:tail0, eliminated: unmentioned_set.clone() }, asn, margin });

    for &opponent in node.tail[1..].iter().chain(node.head.iter()) {
        let candidate = find_best_irv_or_neb(contest,oracle,nebs,tail0,opponent,&unmentioned_set,&tallies);
        best = better(best,candidate);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ballot, BallotPaperCount, Candidate};
    use crate::asn_oracle::OneOnDilutedMargin;

    fn simple_contest() -> Contest {
        Contest{
            id:"c".into(),
            candidates: vec![
                Candidate{external_id:"A".into(),total_votes:BallotPaperCount(80)},
                Candidate{external_id:"B".into(),total_votes:BallotPaperCount(20)},
            ],
            winners: vec![CandidateIndex(0)],
            eliminations: vec![CandidateIndex(1)],
            ballots: vec![
                Ballot{n:BallotPaperCount(80),prefs:vec![CandidateIndex(0)]},
                Ballot{n:BallotPaperCount(20),prefs:vec![CandidateIndex(1)]},
            ],
            threshold_fr: 0.15,
            delegates: vec![],
        }
    }

    #[test]
    fn empty_tail_produces_nonviable_for_reported_winner_in_head() {
        let contest = simple_contest();
        let oracle = OneOnDilutedMargin{ total_auditable_ballots: BallotPaperCount(100) };
        let mut head = HashSet::new();
        head.insert(CandidateIndex(0));
        let node = OutcomeNode::new_head_only(head);
        let winners : HashSet<CandidateIndex> = contest.winners.iter().cloned().collect();
        let best = find_best_assertion(&contest,&oracle,&NebMatrix::build(&contest,&oracle),&node,&winners,&std::collections::HashMap::new()).unwrap();
        assert!(matches!(best.kind, AssertionKind::Nonviable{loser,..} if loser==CandidateIndex(0)));
    }
}
