use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{
    self, DatasetSummary, DenialRollup, Heatmap, MonthBucket, RootCauseBucket,
};
use crate::classify;
use crate::ingest::NormalizedClaims;

/// A ranked rollup truncated for display, plus how many buckets existed
/// before truncation.
#[derive(Debug, Clone, Serialize)]
pub struct RollupTable {
    pub total_buckets: usize,
    pub rows: Vec<DenialRollup>,
}

/// Everything the dashboard needs, in one serializable document.
#[derive(Debug, Serialize)]
pub struct DenialReport {
    pub summary: DatasetSummary,
    pub column_map: BTreeMap<&'static str, Option<String>>,
    pub skipped_rows: u64,
    pub by_cpt: RollupTable,
    pub by_payer: RollupTable,
    pub by_provider: RollupTable,
    pub heatmap: Heatmap,
    pub monthly_trend: Vec<MonthBucket>,
    pub root_causes: Vec<RootCauseBucket>,
    pub recommendations: Vec<&'static str>,
}

pub fn build(data: &NormalizedClaims, top: usize) -> DenialReport {
    let claims = &data.claims;
    DenialReport {
        summary: aggregate::summarize(claims),
        column_map: data.schema.mapping.clone(),
        skipped_rows: data.skipped_rows,
        by_cpt: truncate(aggregate::rollup_by(claims, |c| &c.cpt), top),
        by_payer: truncate(aggregate::rollup_by(claims, |c| &c.payer), top),
        by_provider: truncate(aggregate::rollup_by(claims, |c| &c.provider), top),
        heatmap: aggregate::heatmap(claims, top),
        monthly_trend: aggregate::monthly_trend(claims),
        root_causes: aggregate::root_causes(claims),
        recommendations: classify::RECOMMENDATIONS.to_vec(),
    }
}

fn truncate(mut rows: Vec<DenialRollup>, top: usize) -> RollupTable {
    let total_buckets = rows.len();
    rows.truncate(top.max(1));
    RollupTable { total_buckets, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RootCause;
    use crate::ingest;

    #[test]
    fn builds_a_report_from_a_small_export() {
        // CPT 99213, 10 claims, 3 denied for "no prior auth on file".
        let mut csv = String::from("CPT,Payer,Provider,Balance,Denial Reason\n");
        for i in 0..10 {
            let reason = if i < 3 { "no prior auth on file" } else { "" };
            csv.push_str(&format!("99213,Acme,Dr Smith,$100.00,{reason}\n"));
        }

        let data = ingest::load_and_normalize("claims.csv", csv.as_bytes()).unwrap();
        let report = build(&data, 10);

        assert_eq!(report.summary.total_claims, 10);
        assert_eq!(report.summary.denied_claims, 3);
        assert_eq!(report.summary.denial_rate, Some(0.3));
        assert_eq!(report.by_cpt.rows[0].key, "99213");
        assert_eq!(report.by_cpt.rows[0].denial_rate, Some(0.3));

        assert_eq!(report.root_causes.len(), 1);
        assert_eq!(report.root_causes[0].cause, RootCause::PriorAuthorization);
        assert_eq!(report.root_causes[0].denied_claims, 3);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn ranked_tables_are_truncated_but_counted() {
        let mut csv = String::from("CPT,Denial Reason\n");
        for i in 0..25 {
            csv.push_str(&format!("992{i:02},no auth\n"));
        }
        let data = ingest::load_and_normalize("claims.csv", csv.as_bytes()).unwrap();
        let report = build(&data, 5);

        assert_eq!(report.by_cpt.total_buckets, 25);
        assert_eq!(report.by_cpt.rows.len(), 5);
        assert_eq!(report.heatmap.cpt_codes.len(), 5);
    }

    #[test]
    fn report_serializes_null_rates_not_zero() {
        let mut csv = String::from("CPT,Payer,Denial Reason\n");
        csv.push_str("99213,Acme,no auth\n");
        csv.push_str("99214,Blue,\n");
        let data = ingest::load_and_normalize("claims.csv", csv.as_bytes()).unwrap();
        let report = build(&data, 10);

        let json = serde_json::to_value(&report).unwrap();
        // 99213 never appears under Blue: that heatmap cell must be null.
        let rates = json["heatmap"]["rates"].as_array().unwrap();
        let codes = json["heatmap"]["cpt_codes"].as_array().unwrap();
        let payers = json["heatmap"]["payers"].as_array().unwrap();
        let row = codes
            .iter()
            .position(|c| c.as_str() == Some("99213"))
            .unwrap();
        let col = payers
            .iter()
            .position(|p| p.as_str() == Some("Blue"))
            .unwrap();
        assert!(rates[row][col].is_null());
    }
}
