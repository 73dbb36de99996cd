use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::classify::{self, RootCause};
use crate::ingest::ClaimRecord;

/// One bucket of a CPT/payer/provider rollup.
#[derive(Debug, Clone, Serialize)]
pub struct DenialRollup {
    pub key: String,
    pub total_claims: u64,
    pub denied_claims: u64,
    pub denial_rate: Option<f64>,
    pub lost_revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub total_claims: u64,
    pub denied_claims: u64,
    pub denial_rate: Option<f64>,
    pub lost_revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Heatmap {
    pub cpt_codes: Vec<String>,
    pub payers: Vec<String>,
    /// Row-major: `rates[cpt][payer]`, `null` where the pair has no claims.
    pub rates: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthBucket {
    pub month: String,
    pub total_claims: u64,
    pub denied_claims: u64,
    pub denial_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RootCauseBucket {
    pub cause: RootCause,
    pub label: &'static str,
    pub denied_claims: u64,
    pub lost_revenue: f64,
    pub remediation: &'static str,
}

fn denial_rate(denied: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(denied as f64 / total as f64)
    }
}

/// Group claims by an arbitrary key and compute denial stats per bucket.
/// Ordering is deterministic: denial rate descending, ties broken by denied
/// count descending, then key ascending.
pub fn rollup_by<'a, F>(claims: &'a [ClaimRecord], key_fn: F) -> Vec<DenialRollup>
where
    F: Fn(&'a ClaimRecord) -> &'a str,
{
    let mut buckets: BTreeMap<&str, (u64, u64, f64)> = BTreeMap::new();
    for claim in claims {
        let entry = buckets.entry(key_fn(claim)).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if claim.denied {
            entry.1 += 1;
            entry.2 += claim.billed;
        }
    }

    let mut out: Vec<DenialRollup> = buckets
        .into_iter()
        .map(|(key, (total, denied, lost))| DenialRollup {
            key: key.to_string(),
            total_claims: total,
            denied_claims: denied,
            denial_rate: denial_rate(denied, total),
            lost_revenue: lost,
        })
        .collect();

    out.sort_by(|a, b| {
        b.denial_rate
            .partial_cmp(&a.denial_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.denied_claims.cmp(&a.denied_claims))
            .then_with(|| a.key.cmp(&b.key))
    });
    out
}

pub fn summarize(claims: &[ClaimRecord]) -> DatasetSummary {
    let total = claims.len() as u64;
    let denied = claims.iter().filter(|c| c.denied).count() as u64;
    let lost = claims
        .iter()
        .filter(|c| c.denied)
        .map(|c| c.billed)
        .sum::<f64>();
    DatasetSummary {
        total_claims: total,
        denied_claims: denied,
        denial_rate: denial_rate(denied, total),
        lost_revenue: lost,
    }
}

/// CPT x payer denial-rate matrix, axes capped at the top `max_axis` keys
/// by denied count so wide datasets stay renderable.
pub fn heatmap(claims: &[ClaimRecord], max_axis: usize) -> Heatmap {
    let cpt_codes = top_keys_by_denials(claims, |c| &c.cpt, max_axis);
    let payers = top_keys_by_denials(claims, |c| &c.payer, max_axis);

    let mut cells: HashMap<(&str, &str), (u64, u64)> = HashMap::new();
    for claim in claims {
        let entry = cells
            .entry((claim.cpt.as_str(), claim.payer.as_str()))
            .or_insert((0, 0));
        entry.0 += 1;
        if claim.denied {
            entry.1 += 1;
        }
    }

    let rates = cpt_codes
        .iter()
        .map(|code| {
            payers
                .iter()
                .map(|payer| {
                    cells
                        .get(&(code.as_str(), payer.as_str()))
                        .and_then(|&(total, denied)| denial_rate(denied, total))
                })
                .collect()
        })
        .collect();

    Heatmap {
        cpt_codes,
        payers,
        rates,
    }
}

fn top_keys_by_denials<'a, F>(claims: &'a [ClaimRecord], key_fn: F, limit: usize) -> Vec<String>
where
    F: Fn(&'a ClaimRecord) -> &'a str,
{
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for claim in claims {
        let count = counts.entry(key_fn(claim)).or_insert(0);
        if claim.denied {
            *count += 1;
        }
    }
    let mut counts: Vec<(&str, u64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    counts.truncate(limit);
    counts.into_iter().map(|(key, _)| key.to_string()).collect()
}

/// Denials per month of the denial date. Claims without a parseable date
/// are excluded from the trend only.
pub fn monthly_trend(claims: &[ClaimRecord]) -> Vec<MonthBucket> {
    let mut buckets: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for claim in claims {
        let Some(date) = claim.denial_date else {
            continue;
        };
        let entry = buckets
            .entry(date.format("%Y-%m").to_string())
            .or_insert((0, 0));
        entry.0 += 1;
        if claim.denied {
            entry.1 += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(month, (total, denied))| MonthBucket {
            month,
            total_claims: total,
            denied_claims: denied,
            denial_rate: denial_rate(denied, total),
        })
        .collect()
}

/// Distribution of denied claims over the root-cause taxonomy, ordered by
/// denied count descending then label. Categories with no claims are
/// omitted.
pub fn root_causes(claims: &[ClaimRecord]) -> Vec<RootCauseBucket> {
    let mut buckets: BTreeMap<RootCause, (u64, f64)> = BTreeMap::new();
    for claim in claims.iter().filter(|c| c.denied) {
        let cause = claim
            .denial_reason
            .as_deref()
            .map(classify::classify)
            .unwrap_or(RootCause::Unclassified);
        let entry = buckets.entry(cause).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += claim.billed;
    }

    let mut out: Vec<RootCauseBucket> = buckets
        .into_iter()
        .map(|(cause, (denied, lost))| RootCauseBucket {
            cause,
            label: cause.label(),
            denied_claims: denied,
            lost_revenue: lost,
            remediation: cause.remediation(),
        })
        .collect();
    out.sort_by(|a, b| {
        b.denied_claims
            .cmp(&a.denied_claims)
            .then_with(|| a.label.cmp(b.label))
    });
    out
}
