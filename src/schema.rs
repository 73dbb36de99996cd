use std::collections::{BTreeMap, HashMap};

use crate::error::IngestError;

/// Minimum normalized-Levenshtein similarity for a header to claim an alias.
const FUZZY_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CptCode,
    Payer,
    Provider,
    BilledAmount,
    PaidAmount,
    DenialReason,
    DeniedFlag,
    DenialDate,
}

pub const ALL_FIELDS: [Field; 8] = [
    Field::CptCode,
    Field::Payer,
    Field::Provider,
    Field::BilledAmount,
    Field::PaidAmount,
    Field::DenialReason,
    Field::DeniedFlag,
    Field::DenialDate,
];

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::CptCode => "cpt_code",
            Field::Payer => "payer",
            Field::Provider => "provider",
            Field::BilledAmount => "billed_amount",
            Field::PaidAmount => "paid_amount",
            Field::DenialReason => "denial_reason",
            Field::DeniedFlag => "denied_flag",
            Field::DenialDate => "denial_date",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::CptCode => &[
                "cpt",
                "cpt_code",
                "procedure",
                "procedure_code",
                "proc_code",
                "hcpcs",
                "hcpcs_code",
            ],
            Field::Payer => &[
                "payer",
                "payer_name",
                "insurance",
                "insurance_company",
                "plan",
            ],
            Field::Provider => &[
                "provider",
                "provider_name",
                "physician",
                "physician_name",
                "doctor",
                "rendering_provider",
            ],
            Field::BilledAmount => &[
                "balance",
                "billed",
                "billed_amount",
                "charge",
                "charge_amount",
                "amt_due",
                "outstanding",
                "due",
            ],
            Field::PaidAmount => &[
                "payment",
                "paid",
                "payment_amount",
                "amount_paid",
                "paid_amount",
            ],
            Field::DenialReason => &[
                "denial",
                "denial_reason",
                "reason",
                "denial_code",
                "remark",
            ],
            Field::DeniedFlag => &[
                "denied",
                "is_denied",
                "denial_flag",
                "status",
                "claim_status",
            ],
            Field::DenialDate => &["denial_date", "denied_date", "date_of_denial", "denial_dt"],
        }
    }
}

/// Outcome of header resolution: column index per canonical field, plus the
/// detected mapping (canonical field -> source header) for diagnostics.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    indices: HashMap<Field, usize>,
    pub mapping: BTreeMap<&'static str, Option<String>>,
}

impl ResolvedSchema {
    pub fn column(&self, field: Field) -> Option<usize> {
        self.indices.get(&field).copied()
    }
}

/// Normalize a raw header the way messy billing exports need: trim, drop `#`
/// and embedded newlines, collapse whitespace to `_`, lowercase.
pub fn clean_header(raw: &str) -> String {
    raw.trim()
        .replace(['#', '\n', '\r'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Map raw headers onto the canonical schema. Fields resolve in a fixed
/// order and each source column is claimed at most once, so resolution is
/// deterministic for any header set.
pub fn resolve(headers: &[String]) -> Result<ResolvedSchema, IngestError> {
    let cleaned: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();

    let mut indices: HashMap<Field, usize> = HashMap::new();
    let mut mapping: BTreeMap<&'static str, Option<String>> = BTreeMap::new();
    let mut claimed = vec![false; headers.len()];

    for field in ALL_FIELDS {
        let mut best: Option<(usize, f64)> = None;
        for (i, header) in cleaned.iter().enumerate() {
            if claimed[i] || header.is_empty() {
                continue;
            }
            let score = alias_score(field, header);
            if score < FUZZY_THRESHOLD {
                continue;
            }
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        match best {
            Some((i, _)) => {
                claimed[i] = true;
                indices.insert(field, i);
                mapping.insert(field.name(), Some(headers[i].trim().to_string()));
            }
            None => {
                mapping.insert(field.name(), None);
            }
        }
    }

    let mut missing = Vec::new();
    if !indices.contains_key(&Field::CptCode) {
        missing.push(Field::CptCode.name().to_string());
    }
    let flag_derivable = indices.contains_key(&Field::DeniedFlag)
        || indices.contains_key(&Field::DenialReason)
        || indices.contains_key(&Field::PaidAmount);
    if !flag_derivable {
        missing.push("denied_flag (or denial_reason / paid_amount)".to_string());
    }
    if !missing.is_empty() {
        return Err(IngestError::Schema { missing });
    }

    Ok(ResolvedSchema { indices, mapping })
}

fn alias_score(field: Field, header: &str) -> f64 {
    field
        .aliases()
        .iter()
        .map(|alias| strsim::normalized_levenshtein(header, alias))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_header_strips_noise() {
        assert_eq!(clean_header("  CPT Code # "), "cpt_code");
        assert_eq!(clean_header("Denial  Reason"), "denial_reason");
        assert_eq!(clean_header("payer"), "payer");
    }

    #[test]
    fn resolves_exact_aliases() {
        let schema = resolve(&headers(&[
            "CPT Code",
            "Insurance Company",
            "Physician Name",
            "Balance",
            "Denial Reason",
        ]))
        .unwrap();
        assert_eq!(schema.column(Field::CptCode), Some(0));
        assert_eq!(schema.column(Field::Payer), Some(1));
        assert_eq!(schema.column(Field::Provider), Some(2));
        assert_eq!(schema.column(Field::BilledAmount), Some(3));
        assert_eq!(schema.column(Field::DenialReason), Some(4));
        assert_eq!(schema.column(Field::PaidAmount), None);
    }

    #[test]
    fn resolves_fuzzy_aliases() {
        // Close-but-not-exact headers, as real exports produce.
        let schema = resolve(&headers(&["Proc. Code", "Insurance Co", "Denial Reasons"])).unwrap();
        assert_eq!(schema.column(Field::CptCode), Some(0));
        assert_eq!(schema.column(Field::Payer), Some(1));
        assert_eq!(schema.column(Field::DenialReason), Some(2));
    }

    #[test]
    fn each_column_claimed_once() {
        let schema = resolve(&headers(&["CPT", "Procedure Code", "Denied"])).unwrap();
        assert_eq!(schema.column(Field::CptCode), Some(0));
        assert_eq!(
            schema.mapping.get("cpt_code"),
            Some(&Some("CPT".to_string()))
        );
    }

    #[test]
    fn missing_cpt_is_a_schema_error() {
        let err = resolve(&headers(&["Member ID", "Denial Reason"])).unwrap_err();
        match err {
            IngestError::Schema { missing } => {
                assert_eq!(missing, vec!["cpt_code".to_string()]);
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn missing_flag_source_is_a_schema_error() {
        let err = resolve(&headers(&["CPT", "Provider"])).unwrap_err();
        match err {
            IngestError::Schema { missing } => {
                assert_eq!(missing.len(), 1);
                assert!(missing[0].starts_with("denied_flag"));
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_fields_reported_as_absent() {
        let schema = resolve(&headers(&["CPT", "Denial Reason"])).unwrap();
        assert_eq!(schema.mapping.get("payer"), Some(&None));
        assert_eq!(schema.mapping.get("provider"), Some(&None));
    }
}
