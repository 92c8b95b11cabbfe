// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The six assertion kinds a contest's audit can rely on, and the difficulty they carry.

use crate::model::CandidateIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One of the six statistical claims this crate can make about an election.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssertionKind {
    /// `winner`'s tally, with `eliminated` removed, exceeds the viability threshold.
    Viable{ winner:CandidateIndex, eliminated:Vec<CandidateIndex> },
    /// `loser`'s tally, with `eliminated` removed, fails to reach the viability threshold.
    Nonviable{ loser:CandidateIndex, eliminated:Vec<CandidateIndex> },
    /// With `eliminated` removed, `winner`'s tally strictly exceeds `loser`'s.
    Irv{ winner:CandidateIndex, loser:CandidateIndex, eliminated:Vec<CandidateIndex> },
    /// `winner`'s first-preference count strictly exceeds the count of ballots ranking
    /// `loser` before `winner`: `loser` can never be eliminated before `winner`.
    Neb{ winner:CandidateIndex, loser:CandidateIndex },
    /// `winner` holds at least `threshold_fraction` of the qualified vote.
    Qsmaj{ winner:CandidateIndex, threshold_fraction:f64, eliminated:Vec<CandidateIndex> },
    /// `winner`'s tally minus `loser`'s exceeds `d` times the qualified vote.
    Cdiff{ winner:CandidateIndex, loser:CandidateIndex, d:f64, eliminated:Vec<CandidateIndex> },
}

impl AssertionKind {
    pub fn winner(&self) -> Option<CandidateIndex> {
        match self {
            AssertionKind::Viable{winner,..} => Some(*winner),
            AssertionKind::Nonviable{..} => None,
            AssertionKind::Irv{winner,..} => Some(*winner),
            AssertionKind::Neb{winner,..} => Some(*winner),
            AssertionKind::Qsmaj{winner,..} => Some(*winner),
            AssertionKind::Cdiff{winner,..} => Some(*winner),
        }
    }
    pub fn eliminated(&self) -> Option<&[CandidateIndex]> {
        match self {
            AssertionKind::Viable{eliminated,..} => Some(eliminated),
            AssertionKind::Nonviable{eliminated,..} => Some(eliminated),
            AssertionKind::Irv{eliminated,..} => Some(eliminated),
            AssertionKind::Neb{..} => None,
            AssertionKind::Qsmaj{eliminated,..} => Some(eliminated),
            AssertionKind::Cdiff{eliminated,..} => Some(eliminated),
        }
    }
}

/// A candidate assertion paired with its statistical difficulty. `asn` is `None` when
/// the hypothesis cannot be statistically established with the current oracle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub kind : AssertionKind,
    pub asn : Option<f64>,
    pub margin : f64,
}

impl Assertion {
    pub fn infeasible(kind:AssertionKind) -> Self { Assertion{ kind, asn:None, margin:0.0 } }

    pub fn is_feasible(&self) -> bool { self.asn.is_some() }

    /// Ordering used throughout the search: smaller ASN is "better" (cheaper to satisfy);
    /// `None` (⊥) is always worse than any finite value.
    pub fn difficulty_cmp(a:&Option<f64>, b:&Option<f64>) -> Ordering {
        match (a,b) {
            (None,None) => Ordering::Equal,
            (None,Some(_)) => Ordering::Greater,
            (Some(_),None) => Ordering::Less,
            (Some(x),Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        }
    }

    /// True if `self` is strictly cheaper than `other` (⊥ is never cheaper than anything).
    pub fn cheaper_than(&self, other:&Assertion) -> bool {
        Self::difficulty_cmp(&self.asn,&other.asn) == Ordering::Less
    }
}

/// `true` if `a` is strictly less than or equal to `b`, treating `None` as +infinity.
pub fn asn_leq(a:&Option<f64>, b:f64) -> bool {
    match a {
        None => false,
        Some(x) => *x<=b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infeasible_is_never_cheaper() {
        let infeasible = Assertion::infeasible(AssertionKind::Neb{winner:CandidateIndex(0),loser:CandidateIndex(1)});
        let feasible = Assertion{ kind: AssertionKind::Neb{winner:CandidateIndex(0),loser:CandidateIndex(1)}, asn:Some(10.0), margin:0.1 };
        assert!(feasible.cheaper_than(&infeasible));
        assert!(!infeasible.cheaper_than(&feasible));
    }

    #[test]
    fn equal_ballpark_asn_is_not_cheaper_than_itself() {
        let a = Assertion{ kind: AssertionKind::Neb{winner:CandidateIndex(0),loser:CandidateIndex(1)}, asn:Some(10.0), margin:0.1 };
        let b = a.clone();
        assert!(!a.cheaper_than(&b));
    }
}
