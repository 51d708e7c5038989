//! Column contract for asset inventories
//!
//! One descriptor shared by the validator and the prompt builder, so column
//! names appear in exactly one place.

/// Placeholder written into optional columns the source file lacks
pub const NOT_SPECIFIED: &str = "Not Specified";

/// Column value recorded for a record whose model call failed
pub const ASSESSMENT_FAILED: &str = "Assessment Failed";

/// Name of the column appended to the validated table
pub const ASSESSMENT_COLUMN: &str = "AI Risk Assessment";

pub const ASSET: &str = "Asset";
pub const ASSET_CATEGORY: &str = "Asset Category";
pub const THREAT_EVENT: &str = "Threat Event";
pub const THREAT_SOURCE: &str = "Threat Source";
pub const THREAT_DESCRIPTION: &str = "Threat Description";
pub const RELEVANCE: &str = "Relevance";
pub const VULNERABILITY: &str = "Vulnerability";
pub const RISK_OWNER: &str = "Risk Owner";
pub const RISK_TREATMENT_REQUIRED: &str = "Risk Treatment Required";

pub const ASSET_VALUE: &str = "Asset Value";
pub const EXISTING_CONTROL: &str = "Threat Source Characteristics Existing Control";
pub const LIKELIHOOD_OF_ATTACK: &str = "Likelihood of Attack";
pub const LIKELIHOOD_ATTACK_SUCCESS: &str = "Likelihood Initiated Attack Success";
pub const LEVEL_OF_THREAT_IMPACT: &str = "Level of Threat Impact";
pub const LEVEL_OF_RISK: &str = "Level of Risk";
pub const RISK_APPETITE: &str = "Risk Appetite";

/// The inventory contract in use
pub const ASSET_SCHEMA: ColumnSchema = ColumnSchema {
    name: "asset-risk-inventory",
    required: &[
        ASSET,
        ASSET_CATEGORY,
        THREAT_EVENT,
        THREAT_SOURCE,
        THREAT_DESCRIPTION,
        RELEVANCE,
        VULNERABILITY,
        RISK_OWNER,
        RISK_TREATMENT_REQUIRED,
    ],
    optional: &[
        OptionalColumn { name: ASSET_VALUE, default: NOT_SPECIFIED },
        OptionalColumn { name: EXISTING_CONTROL, default: NOT_SPECIFIED },
        OptionalColumn { name: LIKELIHOOD_OF_ATTACK, default: NOT_SPECIFIED },
        OptionalColumn { name: LIKELIHOOD_ATTACK_SUCCESS, default: NOT_SPECIFIED },
        OptionalColumn { name: LEVEL_OF_THREAT_IMPACT, default: NOT_SPECIFIED },
        OptionalColumn { name: LEVEL_OF_RISK, default: NOT_SPECIFIED },
        OptionalColumn { name: RISK_APPETITE, default: NOT_SPECIFIED },
    ],
    prompt_fields: &[
        PromptField { label: "Asset", column: ASSET },
        PromptField { label: "Category", column: ASSET_CATEGORY },
        PromptField { label: "Threat Event", column: THREAT_EVENT },
        PromptField { label: "Threat Source", column: THREAT_SOURCE },
        PromptField { label: "Vulnerability", column: VULNERABILITY },
        PromptField { label: "Asset Value", column: ASSET_VALUE },
        PromptField { label: "Existing Controls", column: EXISTING_CONTROL },
        PromptField { label: "Likelihood of Attack", column: LIKELIHOOD_OF_ATTACK },
    ],
};

/// Describes which columns an inventory must, or may, carry
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: &'static str,
    /// Must be present in the source; never backfilled
    pub required: &'static [&'static str],
    /// Backfilled with `default` when absent
    pub optional: &'static [OptionalColumn],
    /// Ordered fields rendered into the assessment prompt
    pub prompt_fields: &'static [PromptField],
}

#[derive(Debug, Clone, Copy)]
pub struct OptionalColumn {
    pub name: &'static str,
    pub default: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct PromptField {
    /// Text shown before the value in the prompt
    pub label: &'static str,
    pub column: &'static str,
}

impl ColumnSchema {
    pub fn is_required(&self, column: &str) -> bool {
        self.required.contains(&column)
    }

    pub fn is_optional(&self, column: &str) -> bool {
        self.optional.iter().any(|c| c.name == column)
    }

    /// Every column the schema knows about, required first
    pub fn known_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required
            .iter()
            .copied()
            .chain(self.optional.iter().map(|c| c.name))
    }
}

impl std::fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} required, {} optional)",
            self.name,
            self.required.len(),
            self.optional.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_and_optional_are_disjoint() {
        for col in ASSET_SCHEMA.required {
            assert!(!ASSET_SCHEMA.is_optional(col), "{} is listed twice", col);
        }
    }

    #[test]
    fn test_every_prompt_field_is_known() {
        // The prompt builder can only rely on columns the validator guarantees
        for field in ASSET_SCHEMA.prompt_fields {
            assert!(
                ASSET_SCHEMA.is_required(field.column) || ASSET_SCHEMA.is_optional(field.column),
                "prompt field {} is not in the schema",
                field.column
            );
        }
    }

    #[test]
    fn test_known_columns_order() {
        let cols: Vec<_> = ASSET_SCHEMA.known_columns().collect();
        assert_eq!(cols.len(), 16);
        assert_eq!(cols[0], ASSET);
        assert_eq!(cols[9], ASSET_VALUE);
        assert_eq!(cols[15], RISK_APPETITE);
    }

    #[test]
    fn test_optional_defaults_are_sentinel() {
        assert!(ASSET_SCHEMA.optional.iter().all(|c| c.default == NOT_SPECIFIED));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ASSET_SCHEMA.to_string(),
            "asset-risk-inventory (9 required, 7 optional)"
        );
    }
}
