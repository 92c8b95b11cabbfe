// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Generates a minimal set of statistical assertions that, if each is verified by a
//! risk-limiting audit, together prove a reported multi-winner viability-threshold
//! election outcome (plurality or IRV) without a full hand recount.
//!
//! The entry point is [`Coordinator::audit_contest`], which runs [`search_engine::search`]
//! followed by [`subsumer::subsume`] for a single [`model::Contest`].

pub mod model;
pub mod asn_oracle;
pub mod assertion;
pub mod neb_matrix;
pub mod outcome_tree;
pub mod assertion_library;
pub mod search_engine;
pub mod subsumer;
pub mod coordinator;

use model::CandidateIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A programming-invariant violation or a per-contest infeasibility. Audit-infeasible
/// contests are caught by the coordinator and turned into a full-recount recommendation
/// rather than propagated; the remaining variants are genuine caller errors.
#[derive(Error, Clone, Debug, Serialize, Deserialize)]
pub enum RlaError {
    #[error("contest has no candidates")]
    InvalidNumberOfCandidates,
    #[error("ballot refers to candidate index {0} which does not exist in this contest")]
    InvalidCandidateIndex(CandidateIndex),
    #[error("ballot ranks candidate {0} more than once")]
    DuplicateCandidateInBallot(CandidateIndex),
    #[error("viability threshold {0} is not a fraction strictly between 0 and 1")]
    InvalidThreshold(f64),
    #[error("an outcome node was constructed with an empty head and empty tail")]
    EmptyHead,
    #[error("audit infeasible for contest {contest}: {reason}")]
    AuditInfeasible{ contest:String, reason:String },
}

/// Parameters governing one invocation of the search, shared by every contest processed
/// in a run. Constructed by the CLI from command line flags and embedded verbatim in the
/// JSON `"parameters"` object of the audit report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Parameters {
    /// Viability threshold as a fraction of the qualified vote, e.g. 0.15.
    pub threshold_fr : f64,
    /// Allowed gap between the frontier's maximum estimate and the lower bound, expressed
    /// as an absolute ballot count (already multiplied by `total_auditable_ballots` by the
    /// caller). Zero means "run to exhaustion".
    pub allowed_gap : f64,
    /// 0 = viability only, 1 = also QSMAJ, 2 = also CDIFF.
    pub level : u8,
    /// Whether to use the dive-and-bound heuristic described in `search_engine`.
    pub diving : bool,
    /// Simulated measurement error rate used only for the reported expected-polls figure.
    pub error_rate : f64,
    /// The statistical risk limit, e.g. 0.05 for a 5% risk limit.
    pub risk_limit : f64,
    /// Number of repetitions used when simulating measurement error.
    pub reps : u32,
    pub total_auditable_ballots : model::BallotPaperCount,
    pub audit : asn_oracle::Audit,
}

impl Parameters {
    pub fn maxsize(&self, num_candidates : usize) -> usize {
        let by_threshold = if self.threshold_fr>0.0 { (1.0/self.threshold_fr).floor() as usize } else { num_candidates };
        num_candidates.min(by_threshold.max(1))
    }
}
