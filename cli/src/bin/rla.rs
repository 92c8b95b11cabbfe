// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::Parser;
use primary_rla::asn_oracle::{Audit, OneOnDilutedMargin};
use primary_rla::coordinator::audit_all;
use primary_rla::model::BallotPaperCount;
use primary_rla::Parameters;
use primary_rla_cli::ballot_format::{read_ballots, read_outcomes};
use primary_rla_cli::json_output::build_report;

/// Generates a minimal statistical assertion set that a risk-limiting audit can use to
/// confirm a reported multi-winner viability-threshold election outcome.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct CliOptions {
    /// CSV file of contests and ranked ballots
    #[arg(long)]
    rep_ballots : PathBuf,
    /// JSON file of reported winners/eliminations per contest
    #[arg(long)]
    rep_outcome : PathBuf,
    /// Allowed gap, as a fraction of total auditable ballots, before the search stops early
    #[arg(long, default_value_t = 0.0)]
    agap : f64,
    /// Viability threshold as a fraction of the qualified vote
    #[arg(long, default_value_t = 0.15)]
    threshold_pc : f64,
    /// Simulated measurement error rate used only for the reported expected-polls figure
    #[arg(long, default_value_t = 0.0)]
    error_rate : f64,
    /// Risk limit
    #[arg(long = "r", default_value_t = 0.05)]
    risk_limit : f64,
    /// Repetitions used when simulating measurement error
    #[arg(long, default_value_t = 1)]
    reps : u32,
    /// 0 = viability only, 1 = also QSMAJ, 2 = also CDIFF. Has no effect on a contest whose
    /// reported outcome does not supply a non-empty `delegates` list.
    #[arg(long, default_value_t = 0)]
    level : u8,
    /// Use the plurality-only variant (out of scope for this crate)
    #[arg(long)]
    plurality : bool,
    /// Print per-node search progress to the log
    #[arg(long)]
    alglog : bool,
    /// File to write the JSON report to
    #[arg(long)]
    json : PathBuf,
    /// Restrict the run to these contest ids
    #[arg(long, num_args = 0.., value_name = "ID")]
    contests : Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = CliOptions::parse();
    let mut logger = env_logger::Builder::from_default_env();
    if args.alglog { logger.filter_level(log::LevelFilter::Debug); }
    logger.init();
    if args.plurality {
        bail!("the plurality-only variant is outside this crate's scope; use a generic comparison audit tool instead");
    }

    let (raw_contests,total_auditable_ballots) = read_ballots(&args.rep_ballots)?;
    let outcomes = read_outcomes(&args.rep_outcome)?;

    let selected : Vec<_> = if args.contests.is_empty() {
        raw_contests
    } else {
        raw_contests.into_iter().filter(|c|args.contests.contains(&c.id().to_string())).collect()
    };

    let total_auditable_ballots = BallotPaperCount(total_auditable_ballots);
    let allowed_gap = args.agap*total_auditable_ballots.0 as f64;

    let mut contests = Vec::new();
    let mut names_per_contest = Vec::new();
    let mut params_per_contest = Vec::new();
    for raw in selected {
        let outcome = outcomes.get(raw.id()).ok_or_else(||anyhow!("no reported outcome for contest {}",raw.id()))?.clone();
        let candidate_names = raw.candidate_names().to_vec();
        let delegates = outcome.delegates.clone();
        let contest = raw.into_contest(&outcome,args.threshold_pc,delegates);
        let params = Parameters{
            threshold_fr: args.threshold_pc,
            allowed_gap,
            level: args.level,
            diving: true,
            error_rate: args.error_rate,
            risk_limit: args.risk_limit,
            reps: args.reps,
            total_auditable_ballots,
            audit: Audit::OneOnMargin(OneOnDilutedMargin{ total_auditable_ballots }),
        };
        contests.push(contest);
        names_per_contest.push(candidate_names);
        params_per_contest.push(params);
    }

    let results = audit_all(&contests,&params_per_contest,0);
    let mut audits = Vec::new();
    for (contest,result) in contests.iter().zip(results) {
        match result {
            Ok(audit) => audits.push(audit),
            Err(e) => {
                log::warn!("contest {} failed validation: {e}; treating as full recount",contest.id);
                audits.push(primary_rla::coordinator::ContestAudit::FullRecount{ contest_id: contest.id.clone(), reason: e.to_string() });
            }
        }
    }

    let report = build_report(&audits,&names_per_contest,total_auditable_ballots,args.risk_limit);
    serde_json::to_writer_pretty(File::create(&args.json)?,&report)?;

    let full_recounts : Vec<&str> = audits.iter().filter_map(|a|match a {
        primary_rla::coordinator::ContestAudit::FullRecount{contest_id,..} => Some(contest_id.as_str()),
        _ => None,
    }).collect();
    if full_recounts.is_empty() {
        println!("All {} contests can be audited without a full recount.",audits.len());
    } else {
        println!("{} of {} contests require a full recount: {}",full_recounts.len(),audits.len(),full_recounts.join(", "));
    }

    Ok(())
}
