// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The election data model: candidates, contests and ballots.
//!
//! Many of these are wrappers around integers, used to prevent e.g. adding a number of votes to a candidate index.
//! Rust allows zero cost abstractions for such wrappers, so there is little reason not to use them.

use std::collections::HashSet;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::RlaError;

/// A number representing a count of pieces of paper.
#[derive(Copy,Clone,Eq, PartialEq,Serialize,Deserialize,Ord, PartialOrd,Default)]
pub struct BallotPaperCount(pub usize);

impl AddAssign for BallotPaperCount {
    fn add_assign(&mut self, rhs: Self) { self.0+=rhs.0; }
}
impl SubAssign for BallotPaperCount {
    fn sub_assign(&mut self, rhs: Self) { self.0-=rhs.0; }
}
impl Sub for BallotPaperCount {
    type Output = BallotPaperCount;
    fn sub(self, rhs: Self) -> Self::Output { BallotPaperCount(self.0.saturating_sub(rhs.0)) }
}
impl Add for BallotPaperCount {
    type Output = BallotPaperCount;
    fn add(self, rhs: Self) -> Self::Output { BallotPaperCount(self.0+rhs.0) }
}
// type alias really, don't want long display
impl fmt::Display for BallotPaperCount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
impl fmt::Debug for BallotPaperCount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
impl FromStr for BallotPaperCount {
    type Err = <usize as FromStr>::Err;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(BallotPaperCount(s.parse()?)) }
}
impl Sum for BallotPaperCount {
    fn sum<I: Iterator<Item=Self>>(iter: I) -> Self { BallotPaperCount(usize::sum(iter.map(|b|b.0))) }
}

/// A candidate, referred to by its dense internal index, 0 being first.
#[derive(Clone, Copy, PartialEq, Eq, Hash,Serialize,Deserialize,PartialOrd,Ord)]
pub struct CandidateIndex(pub u32);
impl fmt::Display for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
impl fmt::Debug for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#{}", self.0) }
}
impl FromStr for CandidateIndex {
    type Err = <u32 as FromStr>::Err;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(CandidateIndex(u32::from_str(s)?)) }
}

/// A candidate as reported by the ballot data: a stable external id plus the first-preference tally
/// on the full (unmodified) ballot set.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct Candidate {
    pub external_id : String,
    pub total_votes : BallotPaperCount,
}

/// An ordered sequence of distinct candidate preferences. May be truncated (not rank every candidate).
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct Ballot {
    /// The number of voters who voted this way.
    pub n : BallotPaperCount,
    /// prefs[0] is the first preferenced candidate.
    pub prefs : Vec<CandidateIndex>,
}

impl Ballot {
    /// The highest preferenced candidate amongst a set of continuing (not yet eliminated) candidates.
    pub fn top_preference(&self,continuing:&HashSet<CandidateIndex>) -> Option<CandidateIndex> {
        self.prefs.iter().find(|c|continuing.contains(c)).copied()
    }

    /// True if `before` appears strictly before `after` on this ballot (and `before` appears at all).
    /// Used for the NEB "appears-before" tally: a ballot that never mentions `after` counts towards
    /// `before`'s NEB tally too, as long as `before` is ranked.
    pub fn ranks_before(&self,before:CandidateIndex,after:CandidateIndex) -> bool {
        for &c in &self.prefs {
            if c==before { return true; }
            if c==after { return false; }
        }
        false
    }
}

/// A collection of candidates together with the reported outcome of the contest.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct Contest {
    pub id : String,
    pub candidates : Vec<Candidate>,
    /// The reportedly-viable candidates (order irrelevant).
    pub winners : Vec<CandidateIndex>,
    /// The reported elimination order of the non-viable candidates. Required for IRV mode.
    pub eliminations : Vec<CandidateIndex>,
    pub ballots : Vec<Ballot>,
    /// Viability threshold, a fraction of the qualified vote in (0,1).
    pub threshold_fr : f64,
    /// Delegate counts this contest is dividing up, if any (used at `level >= 1`).
    pub delegates : Vec<u32>,
}

impl Contest {
    pub fn num_candidates(&self) -> usize { self.candidates.len() }

    pub fn candidate_indices(&self) -> impl Iterator<Item=CandidateIndex> {
        (0..self.candidates.len() as u32).map(CandidateIndex)
    }

    pub fn total_votes(&self) -> BallotPaperCount {
        self.ballots.iter().map(|b|b.n).sum()
    }

    /// Tallies of first preferences amongst ballots, treating candidates in `eliminated` as removed.
    /// Returns (tallies indexed by full candidate index, count of ballots exhausted by the removal).
    pub fn tallies_with_eliminated(&self,eliminated:&HashSet<CandidateIndex>) -> (Vec<BallotPaperCount>,BallotPaperCount) {
        let mut tallies = vec![BallotPaperCount(0);self.num_candidates()];
        let mut exhausted = BallotPaperCount(0);
        let continuing : HashSet<CandidateIndex> = self.candidate_indices().filter(|c|!eliminated.contains(c)).collect();
        for ballot in &self.ballots {
            match ballot.top_preference(&continuing) {
                Some(c) => tallies[c.0 as usize]+=ballot.n,
                None => exhausted+=ballot.n,
            }
        }
        (tallies,exhausted)
    }

    /// Validate the invariants the constructors of this crate rely on, returning a typed error
    /// rather than panicking (the core is exception-free in spirit).
    pub fn validate(&self) -> Result<(),RlaError> {
        if self.candidates.is_empty() { return Err(RlaError::InvalidNumberOfCandidates); }
        for ballot in &self.ballots {
            let mut seen = HashSet::new();
            for &c in &ballot.prefs {
                if c.0 as usize>=self.candidates.len() { return Err(RlaError::InvalidCandidateIndex(c)); }
                if !seen.insert(c) { return Err(RlaError::DuplicateCandidateInBallot(c)); }
            }
        }
        if !(0.0<self.threshold_fr && self.threshold_fr<1.0) { return Err(RlaError::InvalidThreshold(self.threshold_fr)); }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(prefs:&[u32]) -> Ballot {
        Ballot{ n:BallotPaperCount(1), prefs: prefs.iter().map(|&c|CandidateIndex(c)).collect() }
    }

    #[test]
    fn ranks_before_handles_truncation() {
        let b = ballot(&[0,2]);
        assert!(b.ranks_before(CandidateIndex(0),CandidateIndex(2)));
        assert!(!b.ranks_before(CandidateIndex(2),CandidateIndex(0)));
        // candidate 1 never appears: a ballot ranking 0 then 2 still ranks 0 before 1.
        assert!(b.ranks_before(CandidateIndex(0),CandidateIndex(1)));
        assert!(!b.ranks_before(CandidateIndex(1),CandidateIndex(0)));
    }

    #[test]
    fn tallies_with_eliminated_reassigns_to_next_preference() {
        let contest = Contest {
            id:"c".into(),
            candidates: vec![Candidate{external_id:"A".into(),total_votes:BallotPaperCount(0)};3],
            winners: vec![],
            eliminations: vec![],
            ballots: vec![
                Ballot{n:BallotPaperCount(10),prefs:vec![CandidateIndex(0),CandidateIndex(1)]},
                Ballot{n:BallotPaperCount(5),prefs:vec![CandidateIndex(1)]},
            ],
            threshold_fr: 0.15,
            delegates: vec![],
        };
        let mut eliminated = HashSet::new();
        eliminated.insert(CandidateIndex(0));
        let (tallies,exhausted) = contest.tallies_with_eliminated(&eliminated);
        assert_eq!(tallies[1],BallotPaperCount(15));
        assert_eq!(exhausted,BallotPaperCount(0));
    }
}
