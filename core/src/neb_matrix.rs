// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Precomputed "never eliminated before" relation between every ordered pair of candidates.
//!
//! Grounded in `ComputeNEBTally`/the NEB assertion construction loop in `irvaudit.cpp`: a
//! single pass over the ballots computes, for each candidate `i`, the tally of ballots on
//! which some other candidate `j` is ranked strictly before `i` (or `i` does not appear at
//! all). That is enough to decide, for every ordered pair, whether `i` can never be
//! eliminated before `j`.

use crate::assertion::{Assertion, AssertionKind};
use crate::asn_oracle::AsnOracle;
use crate::model::{BallotPaperCount, CandidateIndex, Contest};

/// `nebs[i][j]` is `Some(assertion)` iff `i` can never be eliminated before `j`; the
/// assertion's `winner` is `i`; `loser` is `j`.
pub struct NebMatrix {
    pub nebs : Vec<Vec<Option<Assertion>>>,
}

impl NebMatrix {
    /// Build the matrix for `contest` using `oracle` for the ASN of each candidate assertion.
    /// One linear pass over the ballots per *winner* candidate computes, for every other
    /// candidate, the "appears before" tally in O(n·L) total rather than O(n²·L): for each
    /// ballot we walk the ranking once, and for every candidate ranked before `i` we bump
    /// that candidate's "appears before i" tally.
    pub fn build(contest:&Contest, oracle:&impl AsnOracle) -> NebMatrix {
        let n = contest.num_candidates();
        let mut nebs = vec![vec![None;n];n];
        let total = oracle.total_auditable_ballots();
        for i in contest.candidate_indices() {
            let mut tally_before_i = vec![BallotPaperCount(0);n];
            for ballot in &contest.ballots {
                for &c in &ballot.prefs {
                    if c==i { break; }
                    tally_before_i[c.0 as usize] += ballot.n;
                }
                // If i never appears on this ballot, every candidate ranked on it already
                // counted above; candidates not ranked at all on this ballot count too, since
                // a ballot silent on both i and j still ranks j before i vacuously.
                if !ballot.prefs.contains(&i) {
                    for j in contest.candidate_indices() {
                        if j!=i && !ballot.prefs.contains(&j) {
                            tally_before_i[j.0 as usize] += ballot.n;
                        }
                    }
                }
            }
            for j in contest.candidate_indices() {
                if j==i { continue; }
                let tally_j_before_i = tally_before_i[j.0 as usize];
                let total_votes_i = contest.candidates[i.0 as usize].total_votes;
                if total_votes_i.0 > tally_j_before_i.0 {
                    let neither = total - total_votes_i - tally_j_before_i;
                    let margin = 2.0*((total_votes_i.0 as f64 + 0.5*neither.0 as f64)/total.0 as f64) - 1.0;
                    let asn = oracle.estimate_sample_size(margin);
                    nebs[i.0 as usize][j.0 as usize] = Some(Assertion{
                        kind: AssertionKind::Neb{ winner:i, loser:j },
                        asn,
                        margin,
                    });
                }
            }
        }
        NebMatrix{ nebs }
    }

    pub fn get(&self, winner:CandidateIndex, loser:CandidateIndex) -> Option<&Assertion> {
        self.nebs[winner.0 as usize][loser.0 as usize].as_ref()
    }

    pub fn has_neb(&self, winner:CandidateIndex, loser:CandidateIndex) -> bool {
        self.get(winner,loser).is_some()
    }
}
