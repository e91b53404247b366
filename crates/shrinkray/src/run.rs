//! One full optimization run: connect, process with progress, report.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use shrinkray_core::{Config, Coordinator, RunEvent, RunResult, S3Store};
use tokio_util::sync::CancellationToken;

/// Run the pipeline against S3 and print the results.
///
/// Per-image failures do not fail the run; only configuration and
/// enumeration errors are returned.
pub async fn execute(config: Config) -> anyhow::Result<()> {
    let store = S3Store::connect(&config.store).await;
    tracing::debug!(
        "Connected: s3://{} -> s3://{}",
        config.store.source_bucket,
        config.store.destination_bucket
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let progress = create_progress_bar();
    let coordinator = {
        let progress = progress.clone();
        Coordinator::new(config, Arc::new(store)).with_progress(move |event| match event {
            RunEvent::Enumerated(total) => progress.set_length(total as u64),
            RunEvent::Finished(outcome) => {
                progress.inc(1);
                if !outcome.is_success() {
                    progress.set_message(format!("last failure: {}", outcome.key()));
                }
            }
        })
    };

    let result = coordinator.run_with_cancel(cancel).await;
    progress.finish_and_clear();
    let result = result?;

    eprint!("{}", format_summary(&result));
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.failed_count() == 0 && result.is_complete() {
        tracing::info!("All images processed successfully");
    }
    Ok(())
}

/// Cancel the run on Ctrl-C. In-flight images still finish.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight images");
            cancel.cancel();
        }
    });
}

/// Create a progress bar; its length is set once enumeration completes.
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Render the human-readable summary table.
fn format_summary(result: &RunResult) -> String {
    let elapsed = result.elapsed_ms as f64 / 1000.0;
    let rate = if elapsed > 0.0 {
        result.processed() as f64 / elapsed
    } else {
        0.0
    };

    let mut out = String::new();
    out.push('\n');
    out.push_str("  ====================================\n");
    out.push_str("               Summary\n");
    out.push_str("  ====================================\n");
    out.push_str(&format!("    Enumerated:   {:>8}\n", result.enumerated));
    out.push_str(&format!("    Succeeded:    {:>8}\n", result.succeeded_count()));
    if result.failed_count() > 0 {
        out.push_str(&format!("    Failed:       {:>8}\n", result.failed_count()));
    }
    if result.interrupted {
        out.push_str(&format!("    Not started:  {:>8}\n", result.cancelled));
    }
    out.push_str("  ------------------------------------\n");
    out.push_str(&format!("    Duration:     {:>7.1}s\n", elapsed));
    out.push_str(&format!("    Rate:         {:>7.1} img/sec\n", rate));
    out.push_str("  ====================================\n");

    for failure in &result.failed {
        out.push_str(&format!(
            "    ✗ {} ({}): {}\n",
            failure.key, failure.stage, failure.reason
        ));
    }
    out
}
