use crate::infra::{default_rubric_config, InMemoryDealflowRepository};
use clap::Args;
use std::sync::Arc;

use dealflow::error::AppError;
use dealflow::workflows::evaluation::{
    DeterministicScoreModel, EvaluateOutcome, EvaluationOrchestrator, StatusFeed, SubmissionDraft,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Startup name used for the demo submission
    #[arg(long, default_value = "Acme Analytics")]
    pub(crate) startup_name: String,
    /// Problem statement used for the demo submission
    #[arg(
        long,
        default_value = "Seed-stage investors drown in unstructured pitch decks"
    )]
    pub(crate) problem_statement: String,
    /// Optional industry tag carried onto the materialized company
    #[arg(long)]
    pub(crate) industry: Option<String>,
}

/// End-to-end offline run: intake, claim, deterministic scoring, company
/// materialization, and the status events a subscriber would observe.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryDealflowRepository::default());
    let feed = Arc::new(StatusFeed::default());
    let mut events = feed.subscribe();
    let service = EvaluationOrchestrator::new(
        repository,
        feed,
        Arc::new(DeterministicScoreModel),
        default_rubric_config(),
    );

    let draft = SubmissionDraft {
        startup_name: args.startup_name,
        founder_name: "Demo Founder".to_string(),
        contact_email: "founder@example.com".to_string(),
        problem_statement: args.problem_statement,
        solution: "Automated rubric scoring with analyst review".to_string(),
        market: "Early-stage venture workflows".to_string(),
        team: "Two founders, one prior exit".to_string(),
        traction: "Pilot with three funds".to_string(),
        industry: args.industry,
        deck_reference: None,
        auto_analyze: false,
    };

    let record = service.submit(draft)?;
    println!("submission accepted");
    println!("  id:      {}", record.submission_id.0);
    println!("  startup: {}", record.draft.startup_name);
    println!("  status:  {}", record.status.label());
    println!();

    let outcome = service.evaluate(&record.submission_id).await?;
    while let Ok(event) = events.try_recv() {
        println!(
            "status event: {} -> {}",
            event.previous.label(),
            event.status.label()
        );
    }
    println!();

    match outcome {
        EvaluateOutcome::Completed(evaluation) => {
            let card = &evaluation.scorecard;
            println!("evaluation {} ({})", evaluation.evaluation_id.0, evaluation.model);
            println!("  existence: {:>2}", card.existence_score);
            println!("  market:    {:>2}", card.market_score);
            println!("  solution:  {:>2}", card.solution_score);
            println!("  team:      {:>2}", card.team_score);
            println!("  traction:  {:>2}", card.traction_score);
            if let Some(average) = card.overall_average {
                println!("  overall:   {average:.1}");
            }
            println!("  summary:   {}", card.analysis_summary);
        }
        EvaluateOutcome::Busy(status) => {
            println!("evaluation already {}", status.label());
        }
    }

    let completed = service.get(&record.submission_id)?;
    if let Some(company_id) = &completed.company_id {
        let company = service.company(company_id)?;
        println!();
        println!("company materialized");
        println!("  id:       {}", company.company_id.0);
        println!("  name:     {}", company.name);
        println!("  industry: {}", company.industry);
        println!("  score:    {:.1}", company.overall_score);
    }

    Ok(())
}
