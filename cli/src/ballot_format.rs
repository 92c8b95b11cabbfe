// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Parses the comma-separated ballot format and the small JSON outcome file, turning both
//! into `primary_rla::model::Contest` values the core crate can audit.

use anyhow::{anyhow, Context};
use primary_rla::model::{Ballot, BallotPaperCount, Candidate, CandidateIndex, Contest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct RawContest {
    id : String,
    candidate_names : Vec<String>,
    name_to_index : HashMap<String,CandidateIndex>,
    votes : HashMap<Vec<CandidateIndex>,usize>,
}

/// The reported outcome for one contest: which candidates were declared viable, and the
/// elimination order of the rest. Required to run the IRV search; a plurality-only contest
/// can supply an empty `eliminations`. `delegates` lists the delegate counts this contest is
/// dividing up; leave it empty for a contest with no delegate-quota structure, which makes
/// `--level` a no-op for that contest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportedOutcome {
    pub winners : Vec<CandidateIndex>,
    #[serde(default)]
    pub eliminations : Vec<CandidateIndex>,
    #[serde(default)]
    pub delegates : Vec<u32>,
}

/// Read the ballot file: a header giving the contest count, one `Contest,<id>,<n>,<names...>`
/// line per contest, then one `<contest_id>,<ballot_id>,<prefs...>` line per ballot.
/// Returns the parsed contests (without outcome/threshold data) and the total number of
/// distinct ballot identifiers seen across all contests, i.e. `total_auditable_ballots`.
pub fn read_ballots<P: AsRef<Path>>(path:P) -> anyhow::Result<(Vec<RawContest>,usize)> {
    parse_ballots(BufReader::new(File::open(path)?))
}

fn parse_ballots(reader:impl BufRead) -> anyhow::Result<(Vec<RawContest>,usize)> {
    let mut lines = reader.lines();
    let num_contests : usize = lines.next().ok_or_else(||anyhow!("ballot file is empty"))??.trim().parse()
        .context("first line must be the number of contests")?;
    let mut contests = Vec::with_capacity(num_contests);
    for i in 0..num_contests {
        let line = lines.next().ok_or_else(||anyhow!("missing contest header line {}",i+1))??;
        let fields : Vec<&str> = line.split(',').collect();
        if fields.len()<3 || fields[0]!="Contest" { return Err(anyhow!("contest header {} malformed: {line}",i+1)); }
        let id = fields[1].to_string();
        let num_candidates : usize = fields[2].parse().context("candidate count must be an integer")?;
        if fields.len()<3+num_candidates { return Err(anyhow!("contest {id} header is missing candidate names")); }
        let candidate_names : Vec<String> = fields[3..3+num_candidates].iter().map(|s|s.to_string()).collect();
        let name_to_index = candidate_names.iter().enumerate().map(|(n,name)|(name.clone(),CandidateIndex(n as u32))).collect();
        contests.push(RawContest{ id, candidate_names, name_to_index, votes: HashMap::new() });
    }
    let mut ballot_ids = std::collections::HashSet::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let mut fields = line.split(',');
        let contest_id = fields.next().ok_or_else(||anyhow!("ballot line missing contest id: {line}"))?;
        let ballot_id = fields.next().ok_or_else(||anyhow!("ballot line missing ballot id: {line}"))?;
        ballot_ids.insert(ballot_id.to_string());
        let contest = contests.iter_mut().find(|c|c.id==contest_id)
            .ok_or_else(||anyhow!("ballot references unknown contest {contest_id}"))?;
        let remaining : Vec<&str> = fields.collect();
        let prefs : Vec<CandidateIndex> = if remaining.len()==1 && remaining[0].is_empty() { vec![] } else {
            remaining.iter().map(|&name|{
                contest.name_to_index.get(name).copied().ok_or_else(||anyhow!("unknown candidate {name} in contest {contest_id}"))
            }).collect::<anyhow::Result<Vec<_>>>()?
        };
        *contest.votes.entry(prefs).or_insert(0) += 1;
    }
    Ok((contests,ballot_ids.len()))
}

impl RawContest {
    /// Combine the parsed ballots with the reported outcome and contest-wide parameters to
    /// produce the `Contest` the core crate operates on.
    pub fn into_contest(self, outcome:&ReportedOutcome, threshold_fr:f64, delegates:Vec<u32>) -> Contest {
        let candidates = self.candidate_names.iter().map(|name|{
            let index = self.name_to_index[name];
            let total_votes : usize = self.votes.iter().filter(|(prefs,_)|prefs.first()==Some(&index)).map(|(_,n)|*n).sum();
            Candidate{ external_id: name.clone(), total_votes: BallotPaperCount(total_votes) }
        }).collect();
        let ballots = self.votes.into_iter().map(|(prefs,n)|Ballot{ n: BallotPaperCount(n), prefs }).collect();
        Contest{
            id: self.id,
            candidates,
            winners: outcome.winners.clone(),
            eliminations: outcome.eliminations.clone(),
            ballots,
            threshold_fr,
            delegates,
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn candidate_names(&self) -> &[String] { &self.candidate_names }
}

/// Read the outcome file (JSON: `{"<contest id>": {"winners": [...], "eliminations": [...]}}`).
pub fn read_outcomes<P: AsRef<Path>>(path:P) -> anyhow::Result<HashMap<String,ReportedOutcome>> {
    let file = File::open(&path).with_context(||format!("opening outcome file {:?}",path.as_ref()))?;
    let outcomes : HashMap<String,ReportedOutcome> = serde_json::from_reader(file)?;
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_simple_ballot_file() {
        let content = "1\nContest,C1,2,A,B\nC1,b1,A,B\nC1,b2,B\nC1,b3,A\n";
        let (contests,total) = parse_ballots(Cursor::new(content.as_bytes())).unwrap();
        assert_eq!(total,3);
        assert_eq!(contests.len(),1);
        assert_eq!(contests[0].id(),"C1");
    }

    #[test]
    fn into_contest_computes_first_preference_tallies() {
        let content = "1\nContest,C1,2,A,B\nC1,b1,A,B\nC1,b2,B\nC1,b3,A\n";
        let (mut contests,_) = parse_ballots(Cursor::new(content.as_bytes())).unwrap();
        let raw = contests.remove(0);
        let outcome = ReportedOutcome{ winners: vec![CandidateIndex(0)], eliminations: vec![CandidateIndex(1)], delegates: vec![] };
        let contest = raw.into_contest(&outcome,0.15,vec![]);
        assert_eq!(contest.candidates[0].total_votes, BallotPaperCount(2));
        assert_eq!(contest.candidates[1].total_votes, BallotPaperCount(1));
    }
}
