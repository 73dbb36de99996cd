use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::cli::AnalyzeArgs;
use crate::ingest;
use crate::report;

pub fn run(opts: AnalyzeArgs) -> anyhow::Result<()> {
    let path = Path::new(&opts.input);
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("claims.csv");

    let t0 = std::time::Instant::now();
    let data = ingest::load_and_normalize(name, &bytes)?;
    tracing::info!(
        "Normalized {} claims ({} skipped) from {} in {:.1}s",
        data.claims.len(),
        data.skipped_rows,
        path.display(),
        t0.elapsed().as_secs_f64()
    );

    let report = report::build(&data, opts.top);
    tracing::info!(
        "Denial rate {} over {} claims, lost revenue ${:.2}",
        report
            .summary
            .denial_rate
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "n/a".to_string()),
        report.summary.total_claims,
        report.summary.lost_revenue
    );

    let json = serde_json::to_string_pretty(&report).context("serialize report")?;
    match &opts.output {
        Some(output) => {
            fs::write(output, json).with_context(|| format!("write {output}"))?;
            tracing::info!("Report written to {}", output);
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("claims.csv");
        let output = dir.path().join("report.json");
        fs::write(
            &input,
            "CPT,Payer,Balance,Denial Reason\n\
             99213,Acme,$100.00,no prior auth on file\n\
             99213,Acme,$50.00,\n",
        )
        .unwrap();

        run(AnalyzeArgs {
            input: input.display().to_string(),
            top: 10,
            output: Some(output.display().to_string()),
        })
        .unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(report["summary"]["total_claims"], 2);
        assert_eq!(report["summary"]["denied_claims"], 1);
        assert_eq!(report["summary"]["lost_revenue"], 100.0);
    }

    #[test]
    fn missing_input_is_an_error() {
        let err = run(AnalyzeArgs {
            input: "/nonexistent/claims.csv".to_string(),
            top: 10,
            output: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("read"));
    }
}
