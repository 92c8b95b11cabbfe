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

use clap::Parser;
use serde_json::Value;

/// Reads the JSON report produced by `rla` and prints a human readable summary.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct CliOptions {
    /// The JSON report from `rla`
    input_file : PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = CliOptions::parse();
    let report : Value = serde_json::from_reader(File::open(&args.input_file)?)?;

    let audits = report["audits"].as_array().cloned().unwrap_or_default();
    if audits.is_empty() {
        println!("No contest could be audited; every contest requires a full recount.");
        return Ok(());
    }

    for contest in &audits {
        let id = contest["contest"].as_str().unwrap_or("?");
        let polls = contest["Expected Polls (#)"].as_f64().unwrap_or(0.0);
        let polls_pc = contest["Expected Polls (%)"].as_f64().unwrap_or(0.0);
        println!("Contest {id}: expected {polls} ballot polls ({polls_pc}% of auditable ballots)");
        for assertion in contest["assertions"].as_array().cloned().unwrap_or_default() {
            let winner = assertion["winner"].as_str().unwrap_or("-");
            let loser = assertion["loser"].as_str().unwrap_or("-");
            let kind = assertion["assertion_type"].as_str().unwrap_or("?");
            let eliminated : Vec<String> = assertion["already_eliminated"].as_array().cloned().unwrap_or_default()
                .iter().filter_map(|v|v.as_str()).map(str::to_string).collect();
            match kind {
                "NEB" => println!("  {winner} NEB {loser}"),
                "IRV_ELIMINATION" => println!("  {winner} > {loser} once {eliminated:?} eliminated"),
                "VIABLE" => println!("  {winner} viable once {eliminated:?} eliminated"),
                "NONVIABLE" => println!("  {loser} not viable once {eliminated:?} eliminated"),
                other => println!("  {winner} vs {loser} ({other}) once {eliminated:?} eliminated"),
            }
        }
    }

    if let Some(overall) = report["Overall Expected Polls (#)"].as_f64() {
        println!("Overall expected polls: {overall}");
    }
    Ok(())
}
