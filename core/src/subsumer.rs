// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Removes assertions made redundant by a strictly stronger sibling, and reports the
//! resulting maximum ASN.
//!
//! Grounded in the `Subsumes`/`AreAuditsEqual` dedup loop at the end of `main()` in the
//! original audit program: sort, drop exact duplicates, then drop anything subsumed by a
//! survivor.

use crate::assertion::{Assertion, AssertionKind};
use crate::model::BallotPaperCount;
use std::collections::HashSet;

/// `true` iff `a` subsumes `b`: refuting `a` makes refuting `b` unnecessary. Only VIABLE and
/// NONVIABLE participate in dominance; the other four kinds never subsume or get subsumed.
fn subsumes(a:&AssertionKind, b:&AssertionKind) -> bool {
    match (a,b) {
        (AssertionKind::Viable{winner:w1,eliminated:e1}, AssertionKind::Viable{winner:w2,eliminated:e2}) => {
            w1==w2 && e1!=e2 && e1.iter().all(|c|e2.contains(c))
        }
        (AssertionKind::Nonviable{loser:w1,eliminated:e1}, AssertionKind::Nonviable{loser:w2,eliminated:e2}) => {
            w1==w2 && e1!=e2 && e2.iter().all(|c|e1.contains(c))
        }
        _ => false,
    }
}

fn assertions_equal(a:&AssertionKind, b:&AssertionKind) -> bool {
    a==b
}

pub struct SubsumedResult {
    pub assertions : Vec<Assertion>,
    pub max_asn : Option<f64>,
    pub full_recount_required : bool,
}

/// Drop exact duplicates, then drop any assertion subsumed by a surviving assertion, then
/// report the surviving set's maximum ASN against `total_auditable_ballots`.
pub fn subsume(assertions:Vec<Assertion>, total_auditable_ballots:BallotPaperCount) -> SubsumedResult {
    let mut deduped : Vec<Assertion> = Vec::new();
    for assertion in assertions {
        if !deduped.iter().any(|existing:&Assertion|assertions_equal(&existing.kind,&assertion.kind)) {
            deduped.push(assertion);
        }
    }
    // Descending ASN so the cheapest (strongest) survivors are considered as subsumers first,
    // matching the source's sort-then-scan dedup.
    deduped.sort_by(|a,b|Assertion::difficulty_cmp(&b.asn,&a.asn));

    let mut keep = vec![true; deduped.len()];
    for i in 0..deduped.len() {
        for j in 0..deduped.len() {
            if i==j || !keep[j] { continue; }
            if subsumes(&deduped[j].kind,&deduped[i].kind) {
                keep[i] = false;
                break;
            }
        }
    }

    let survivors : Vec<Assertion> = deduped.into_iter().zip(keep).filter(|(_,k)|*k).map(|(a,_)|a).collect();
    let max_asn = survivors.iter().filter_map(|a|a.asn).fold(None,|acc,x|Some(acc.map_or(x,|a:f64|a.max(x))));
    let full_recount_required = match max_asn {
        None => true,
        Some(asn) => asn>=total_auditable_ballots.0 as f64,
    };

    SubsumedResult{ assertions: survivors, max_asn, full_recount_required }
}

/// Verify idempotence and the no-two-related invariant (§8) without needing a search run.
#[allow(dead_code)]
fn no_assertion_subsumes_another(assertions:&[Assertion]) -> bool {
    let kinds : HashSet<_> = (0..assertions.len()).collect();
    for &i in &kinds {
        for &j in &kinds {
            if i!=j && subsumes(&assertions[i].kind,&assertions[j].kind) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateIndex;

    fn viable(c:u32, eliminated:&[u32], asn:f64) -> Assertion {
        Assertion{ kind: AssertionKind::Viable{ winner:CandidateIndex(c), eliminated: eliminated.iter().map(|&x|CandidateIndex(x)).collect() }, asn:Some(asn), margin:0.1 }
    }

    #[test]
    fn fewer_eliminations_subsumes_more() {
        let a = viable(0,&[],10.0);
        let b = viable(0,&[2],12.0);
        let result = subsume(vec![a.clone(),b],BallotPaperCount(1000));
        assert_eq!(result.assertions.len(),1);
        assert_eq!(result.assertions[0].kind,a.kind);
        assert!(no_assertion_subsumes_another(&result.assertions));
    }

    #[test]
    fn subsumption_is_idempotent() {
        let a = viable(0,&[],10.0);
        let b = viable(0,&[2],12.0);
        let once = subsume(vec![a.clone(),b.clone()],BallotPaperCount(1000));
        let twice = subsume(once.assertions.clone(),BallotPaperCount(1000));
        assert_eq!(once.assertions.len(),twice.assertions.len());
    }

    #[test]
    fn full_recount_when_max_asn_exceeds_ballots() {
        let a = viable(0,&[],150.0);
        let result = subsume(vec![a],BallotPaperCount(100));
        assert!(result.full_recount_required);
    }

    #[test]
    fn infeasible_only_forces_full_recount() {
        let infeasible = Assertion::infeasible(AssertionKind::Neb{winner:CandidateIndex(0),loser:CandidateIndex(1)});
        let result = subsume(vec![infeasible],BallotPaperCount(100));
        assert!(result.full_recount_required);
    }
}
