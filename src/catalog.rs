//! Declarative rule catalog: the three analyzer rule tiers.
//!
//! The catalog is built once at startup, from the built-in lists or from
//! the `rules` section of the harness configuration, and is read-only
//! afterwards. Rule identifiers compare ASCII-case-insensitively.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::config::RuleOverrides;
use crate::errors::{MetaError, Result};

/// Rules whose error-severity findings fail the run.
pub const DEFAULT_REQUIRED: &[&str] = &[
    "PSAvoidDefaultValueForMandatoryParameter",
    "PSAvoidDefaultValueSwitchParameter",
    "PSAvoidInvokingEmptyMembers",
    "PSAvoidNullOrEmptyHelpMessageAttribute",
    "PSAvoidUsingCmdletAliases",
    "PSAvoidUsingComputerNameHardcoded",
    "PSAvoidUsingDeprecatedManifestFields",
    "PSAvoidUsingEmptyCatchBlock",
    "PSAvoidUsingInvokeExpression",
    "PSAvoidUsingPositionalParameters",
    "PSAvoidShouldContinueWithoutForce",
    "PSAvoidUsingWMICmdlet",
    "PSAvoidUsingWriteHost",
    "PSDSCReturnCorrectTypesForDSCFunctions",
    "PSDSCStandardDSCFunctionsInResource",
    "PSDSCUseIdenticalMandatoryParametersForDSC",
    "PSDSCUseIdenticalParametersForDSC",
    "PSMisleadingBacktick",
    "PSMissingModuleManifestField",
    "PSPossibleIncorrectComparisonWithNull",
    "PSProvideCommentHelp",
    "PSReservedCmdletChar",
    "PSReservedParams",
    "PSUseApprovedVerbs",
    "PSUseCmdletCorrectly",
    "PSUseOutputTypeCorrectly",
];

/// Rules reported as warnings unless the flagged-rules suite is opted in.
pub const DEFAULT_FLAGGED: &[&str] = &[
    "PSAvoidGlobalVars",
    "PSAvoidUsingConvertToSecureStringWithPlainText",
    "PSAvoidUsingPlainTextForPassword",
    "PSAvoidUsingUsernameAndPasswordParams",
    "PSDSCUseVerboseMessageInDSCResource",
    "PSShouldProcess",
    "PSUseDeclaredVarsMoreThanAssignments",
    "PSUsePSCredentialType",
];

/// Rules that are always advisory.
pub const DEFAULT_IGNORED: &[&str] = &[
    "PSDSCDscExamplesPresent",
    "PSDSCDscTestsPresent",
    "PSUseBOMForUnicodeEncodedFile",
    "PSUseShouldProcessForStateChangingFunctions",
    "PSUseSingularNouns",
    "PSUseToExportFieldsInManifest",
    "PSUseUTF8EncodingForHelpFile",
];

/// Which tier a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Required,
    Flagged,
    Ignored,
    /// Not in any tier; treated as recently added.
    Unknown,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Required => "required",
            Tier::Flagged => "flagged",
            Tier::Ignored => "ignored",
            Tier::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// The three disjoint rule tiers plus the recently-added exclusion list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCatalog {
    // lowercase key -> original spelling
    required: BTreeMap<String, String>,
    flagged: BTreeMap<String, String>,
    ignored: BTreeMap<String, String>,
    recently_added: BTreeMap<String, String>,
}

impl Default for RuleCatalog {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self::new(
            &owned(DEFAULT_REQUIRED),
            &owned(DEFAULT_FLAGGED),
            &owned(DEFAULT_IGNORED),
            &[],
        )
        .unwrap_or_else(|_| unreachable!("built-in tiers are disjoint"))
    }
}

fn index(rules: &[String]) -> BTreeMap<String, String> {
    rules
        .iter()
        .map(|r| (r.trim().to_ascii_lowercase(), r.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

impl RuleCatalog {
    /// Build a catalog from explicit tier lists.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Config`] if a rule appears in more than one tier,
    /// or if a recently-added rule is not part of the required tier.
    pub fn new(
        required: &[String],
        flagged: &[String],
        ignored: &[String],
        recently_added: &[String],
    ) -> Result<Self> {
        let catalog = Self {
            required: index(required),
            flagged: index(flagged),
            ignored: index(ignored),
            recently_added: index(recently_added),
        };
        catalog.check_disjoint()?;
        if let Some(rule) = catalog
            .recently_added
            .iter()
            .find(|(k, _)| !catalog.required.contains_key(*k))
            .map(|(_, v)| v)
        {
            return Err(MetaError::Config {
                message: format!("recently added rule '{rule}' is not in the required tier"),
            });
        }
        Ok(catalog)
    }

    /// Build the catalog from configuration overrides on top of the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`RuleCatalog::new`].
    pub fn from_overrides(overrides: &RuleOverrides) -> Result<Self> {
        let pick = |custom: &Option<Vec<String>>, builtin: &[&str]| -> Vec<String> {
            custom
                .clone()
                .unwrap_or_else(|| builtin.iter().map(|s| s.to_string()).collect())
        };
        Self::new(
            &pick(&overrides.required, DEFAULT_REQUIRED),
            &pick(&overrides.flagged, DEFAULT_FLAGGED),
            &pick(&overrides.ignored, DEFAULT_IGNORED),
            &overrides.recently_added.clone().unwrap_or_default(),
        )
    }

    fn check_disjoint(&self) -> Result<()> {
        let tiers = [
            ("required", &self.required),
            ("flagged", &self.flagged),
            ("ignored", &self.ignored),
        ];
        for (i, (a_name, a)) in tiers.iter().enumerate() {
            for (b_name, b) in tiers.iter().skip(i + 1) {
                if let Some(rule) = a.iter().find(|(k, _)| b.contains_key(*k)).map(|(_, v)| v) {
                    return Err(MetaError::Config {
                        message: format!(
                            "rule '{rule}' is in both the {a_name} and {b_name} tiers"
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Tier of `rule`; rules in no tier are [`Tier::Unknown`].
    #[must_use]
    pub fn tier(&self, rule: &str) -> Tier {
        let key = rule.trim().to_ascii_lowercase();
        if self.required.contains_key(&key) {
            Tier::Required
        } else if self.flagged.contains_key(&key) {
            Tier::Flagged
        } else if self.ignored.contains_key(&key) {
            Tier::Ignored
        } else {
            Tier::Unknown
        }
    }

    /// Returns `true` if `rule` is excluded from hard failure as recently added.
    #[must_use]
    pub fn is_recently_added(&self, rule: &str) -> bool {
        self.recently_added
            .contains_key(&rule.trim().to_ascii_lowercase())
    }

    /// Rules of the required tier, in sorted order.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.required.values().map(String::as_str)
    }

    /// Rules of the flagged tier, in sorted order.
    pub fn flagged(&self) -> impl Iterator<Item = &str> {
        self.flagged.values().map(String::as_str)
    }

    /// Rules of the ignored tier, in sorted order.
    pub fn ignored(&self) -> impl Iterator<Item = &str> {
        self.ignored.values().map(String::as_str)
    }

    /// Required rules currently excluded from hard failure.
    pub fn recently_added(&self) -> impl Iterator<Item = &str> {
        self.recently_added.values().map(String::as_str)
    }
}
