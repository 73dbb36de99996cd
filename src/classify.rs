use serde::Serialize;

/// Fixed root-cause taxonomy for denied claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RootCause {
    ModifierIssue,
    CoverageMismatch,
    BundlingEdit,
    MissingDocumentation,
    PriorAuthorization,
    Credentialing,
    Unclassified,
}

impl RootCause {
    pub fn label(self) -> &'static str {
        match self {
            RootCause::ModifierIssue => "Modifier issue",
            RootCause::CoverageMismatch => "LCD/NCD mismatch",
            RootCause::BundlingEdit => "Bundling edit (NCCI)",
            RootCause::MissingDocumentation => "Missing documentation",
            RootCause::PriorAuthorization => "Prior authorization",
            RootCause::Credentialing => "Credentialing",
            RootCause::Unclassified => "Unclassified",
        }
    }

    pub fn remediation(self) -> &'static str {
        match self {
            RootCause::ModifierIssue => "Add the correct CPT modifiers before resubmission.",
            RootCause::CoverageMismatch => "Validate coverage policies (LCD/NCD) before billing.",
            RootCause::BundlingEdit => "Run claims through a coding scrubber to catch NCCI edits.",
            RootCause::MissingDocumentation => {
                "Improve provider documentation and attach the requested records."
            }
            RootCause::PriorAuthorization => {
                "Verify payer prior-authorization requirements up front."
            }
            RootCause::Credentialing => {
                "Verify provider enrollment and credentialing with the payer."
            }
            RootCause::Unclassified => "Review the payer remark codes manually.",
        }
    }
}

struct Rule {
    cause: RootCause,
    /// Case-insensitive substrings of the denial-reason text.
    keywords: &'static [&'static str],
    /// CARC-style codes, matched as whole tokens ("CO-197", "197").
    codes: &'static [&'static str],
}

/// Ordered rule table; the first matching rule wins.
const RULES: &[Rule] = &[
    Rule {
        cause: RootCause::ModifierIssue,
        keywords: &["modifier"],
        codes: &["4"],
    },
    Rule {
        cause: RootCause::CoverageMismatch,
        keywords: &["lcd", "ncd", "coverage determination", "non-covered", "not covered"],
        codes: &["50", "167"],
    },
    Rule {
        cause: RootCause::BundlingEdit,
        keywords: &["bundl", "ncci", "inclusive"],
        codes: &["97", "236"],
    },
    Rule {
        cause: RootCause::MissingDocumentation,
        keywords: &["documentation", "missing", "records not received"],
        codes: &["226", "252"],
    },
    Rule {
        cause: RootCause::PriorAuthorization,
        keywords: &["auth", "precert", "pre-cert"],
        codes: &["197", "198"],
    },
    Rule {
        cause: RootCause::Credentialing,
        keywords: &["credential", "enrollment", "not certified"],
        codes: &["b7"],
    },
];

/// Classify one denial-reason string. Deterministic: same input, same
/// category, always.
pub fn classify(reason: &str) -> RootCause {
    let lowered = reason.to_ascii_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    for rule in RULES {
        if rule.keywords.iter().any(|kw| lowered.contains(kw)) {
            return rule.cause;
        }
        if rule.codes.iter().any(|code| tokens.contains(code)) {
            return rule.cause;
        }
    }
    RootCause::Unclassified
}

/// Denial-prevention guidance shipped with every report.
pub const RECOMMENDATIONS: &[&str] = &[
    "Ensure correct CPT modifiers are applied.",
    "Validate claims against payer LCD/NCD policies before submission.",
    "Use coding scrubber tools to catch bundling edits (NCCI).",
    "Improve provider documentation.",
    "Confirm prior authorization requirements.",
    "Verify provider credentialing and enrollment with each payer.",
    "Educate front desk on capturing complete patient and insurance info.",
    "Establish payer-specific denial appeal templates.",
];
