//! `kitsmith sequence`: run the full kit sequence.

use kitsmith_core::{SequenceState, Status};
use kitsmith_workflow::ReferenceKit;

use super::Context;

pub async fn run(
    ctx: &Context,
    kit: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ctx.session()?;
    match kit {
        Some(list) => {
            let kit = ReferenceKit::parse_list(&list);
            println!("Starting sequence with kit: {kit}");
            session.set_kit(kit.items().to_vec());
        }
        None => println!("Reference kit is not set, reading it from the reference chest."),
    }

    let report = session.run_sequence().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for outcome in &report.items {
            let mark = match outcome.status {
                Status::Success => "ok",
                Status::Partial => "partial",
                Status::Failure => "failed",
            };
            println!("  [{mark}] {} ({}): {}", outcome.item, outcome.stage, outcome.message);
        }
    }

    if report.state == SequenceState::Failed {
        return Err(report.to_string().into());
    }
    println!("{report}");
    Ok(())
}
