// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Renders the already-computed per-contest audits into the report's JSON shape. The core
//! crate never sees this format; it only returns typed `Assertion`s.

use primary_rla::assertion::AssertionKind;
use primary_rla::coordinator::ContestAudit;
use primary_rla::model::{BallotPaperCount, CandidateIndex};
use serde_json::{json, Value};

fn candidate_name(names:&[String], c:CandidateIndex) -> &str {
    names.get(c.0 as usize).map(|s|s.as_str()).unwrap_or("?")
}

fn assertion_type(kind:&AssertionKind) -> &'static str {
    match kind {
        AssertionKind::Viable{..} => "VIABLE",
        AssertionKind::Nonviable{..} => "NONVIABLE",
        AssertionKind::Irv{..} => "IRV_ELIMINATION",
        AssertionKind::Neb{..} => "NEB",
        AssertionKind::Qsmaj{..} => "QSMAJ",
        AssertionKind::Cdiff{..} => "CDIFF",
    }
}

fn assertion_to_json(kind:&AssertionKind, names:&[String]) -> Value {
    let (winner,loser,eliminated) = match kind {
        AssertionKind::Viable{winner,eliminated} => (Some(*winner),None,eliminated.as_slice()),
        AssertionKind::Nonviable{loser,eliminated} => (None,Some(*loser),eliminated.as_slice()),
        AssertionKind::Irv{winner,loser,eliminated} => (Some(*winner),Some(*loser),eliminated.as_slice()),
        AssertionKind::Neb{winner,loser} => (Some(*winner),Some(*loser),&[][..]),
        AssertionKind::Qsmaj{winner,eliminated,..} => (Some(*winner),None,eliminated.as_slice()),
        AssertionKind::Cdiff{winner,loser,eliminated,..} => (Some(*winner),Some(*loser),eliminated.as_slice()),
    };
    json!({
        "winner": winner.map(|c|candidate_name(names,c)),
        "loser": loser.map(|c|candidate_name(names,c)),
        "already_eliminated": eliminated.iter().map(|&c|candidate_name(names,c)).collect::<Vec<_>>(),
        "assertion_type": assertion_type(kind),
    })
}

/// `names_per_contest[i]` must list contest `i`'s candidate external ids in index order.
pub fn build_report(audits:&[ContestAudit], names_per_contest:&[Vec<String>], total_auditable_ballots:BallotPaperCount, risk_limit:f64) -> Value {
    let mut per_contest = Vec::new();
    let mut overall_max_asn : Option<f64> = None;

    for (audit,names) in audits.iter().zip(names_per_contest.iter()) {
        if let ContestAudit::Audit{contest_id,assertions,max_asn,..} = audit {
            let max_asn_pc = (100.0*max_asn/total_auditable_ballots.0 as f64).ceil();
            per_contest.push(json!({
                "contest": contest_id,
                "Expected Polls (#)": max_asn,
                "Expected Polls (%)": max_asn_pc,
                "assertions": assertions.iter().map(|a|assertion_to_json(&a.kind,names)).collect::<Vec<_>>(),
            }));
            overall_max_asn = Some(overall_max_asn.map_or(*max_asn,|m:f64|m.max(*max_asn)));
        }
    }

    match overall_max_asn {
        None => json!({ "audits": [] }),
        Some(overall) => json!({
            "Overall Expected Polls (#)": overall,
            "Ballots involved in audit (#)": total_auditable_ballots.0,
            "parameters": { "risk_limit": risk_limit },
            "audits": per_contest,
        }),
    }
}
