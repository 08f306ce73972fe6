use canteen_planner::{
    config::{database, planner},
    core::{
        export::{export_month, render_statement},
        regenerate::{RegenerateOutcome, regenerate},
        settings::set_daily_budget_range,
        workdays::{MonthRange, YearMonth},
    },
    errors::Result,
};
use chrono::Utc;
use dotenvy::dotenv;
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Month range from `PLAN_START`/`PLAN_END`; defaults to next month.
fn requested_range() -> Result<MonthRange> {
    let start = match env::var("PLAN_START") {
        Ok(text) => YearMonth::parse(&text)?,
        Err(_) => YearMonth::of(Utc::now().date_naive()).next(),
    };
    let end = match env::var("PLAN_END") {
        Ok(text) => YearMonth::parse(&text)?,
        Err(_) => start,
    };
    MonthRange::new(start, end)
}

fn force_requested() -> bool {
    env::var("PLAN_FORCE").is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Load the planner configuration
    let config = planner::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;
    let range = requested_range()?;

    // 4. Initialize database
    let db = database::create_connection().await?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. Seed the catalog and apply the budget range
    planner::seed_catalog(&db, &config)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {e}"))?;
    if let Some(budget) = config.budget_range()? {
        set_daily_budget_range(&db, budget).await?;
    }

    // 6. Generate and store plans
    let creator = env::var("PLAN_CREATOR").ok();
    let calendar = config.calendar();
    let outcome = regenerate(&db, &calendar, range, creator.as_deref(), force_requested())
        .await
        .inspect_err(|e| error!("Plan generation failed: {e}"))?;

    match outcome {
        RegenerateOutcome::Conflict { months } => {
            warn!(
                months = ?months,
                "Months already have plans; set PLAN_FORCE=1 to replace them"
            );
        }
        RegenerateOutcome::Generated {
            plans, warnings, ..
        } => {
            info!(plans = plans.len(), "Plans generated");
            for warning in &warnings {
                warn!("{warning}");
            }
            // 7. Print each month's statement
            for month in range.months() {
                match export_month(&db, month, config.export.precision).await {
                    Ok(statement) => println!("{}", render_statement(&statement)),
                    Err(e) => warn!("{e}"),
                }
            }
        }
    }

    Ok(())
}
