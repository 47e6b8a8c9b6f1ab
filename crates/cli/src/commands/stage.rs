//! `kitsmith scan|reference|place|acquire|fill|dispose|finalize`: run one
//! stage standalone.

use kitsmith_workflow::Session;

use super::Context;

pub enum Step {
    Scan,
    Reference,
    Place,
    Acquire(String),
    Fill,
    Dispose,
    Finalize,
}

pub async fn run(ctx: &Context, step: Step) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ctx.session()?;
    let report = run_step(&mut session, step).await;

    if report.is_failure() {
        return Err(report.to_string().into());
    }
    println!("{report}");
    Ok(())
}

async fn run_step(session: &mut Session, step: Step) -> kitsmith_core::StageReport {
    match step {
        Step::Scan => session.scan().await,
        Step::Reference => session.read_reference().await,
        Step::Place => session.place_containers().await,
        Step::Acquire(item) => session.acquire(&item).await,
        Step::Fill => session.fill().await,
        Step::Dispose => session.dispose_working_source().await,
        Step::Finalize => session.finalize().await,
    }
}
