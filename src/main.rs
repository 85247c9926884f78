use std::process::ExitCode;

use taxi_summary::job::TaxiSummaryJob;
use taxi_summary::settings::JobConfig;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let outcome = async {
        let config = JobConfig::from_env()?;
        TaxiSummaryJob::new(config)?.run().await
    }
    .await;

    match outcome {
        Ok(report) => {
            println!("Summarized {} trips", report.trip_rows);
            for path in &report.written {
                println!("  {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Job failed: {}", e);
            eprintln!("taxi-summary: {}", e);
            ExitCode::FAILURE
        }
    }
}
