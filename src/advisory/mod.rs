//! Advisory Vault - Advisory Documents
//!
//! Immutable model of a CSAF-style advisory: a vendor → product → version
//! tree plus vulnerabilities that reference versions by product id.
//!
//! ```text
//! product_tree
//!   └─ vendor "Acme"
//!        └─ product_name "Widget"
//!             └─ product_version "1.0"  { name: "Widget 1.0", product_id: "W-1" }
//! vulnerabilities[]
//!   └─ product_status { known_affected: ["W-1"] }, remediations[]
//! ```

mod parse;
mod query;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// Severity used when the document has no `aggregate_severity`
pub const NO_AGGREGATE_SEVERITY: &str = "No aggregate severity";

/// Description used when the document has no summary note
pub const NO_DESCRIPTION: &str = "No description";

/// Parsed advisory. Built once by [`AdvisoryDocument::parse`]; read-only after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryDocument {
    title: String,
    description: String,
    severity: String,
    vendors: Vec<Vendor>,
    vulnerabilities: Vec<Vulnerability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vendor {
    pub name: String,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub name: String,
    pub versions: Vec<Version>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    /// Full product name, e.g. "Widget 1.0"
    pub full_name: String,
    /// `product_id`, unique across the document
    pub identifier: String,
    /// Version label from the branch name
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vulnerability {
    pub id: String,
    pub cvss_score: Option<f64>,
    /// One entry per product id
    pub product_status: BTreeMap<String, StatusKind>,
    pub remediations: Vec<RemediationStrategy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationStrategy {
    pub details: String,
    pub url: Option<String>,
    pub product_ids: BTreeSet<String>,
}

impl RemediationStrategy {
    pub fn applies_to(&self, product_id: &str) -> bool {
        self.product_ids.contains(product_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Fixed,
    KnownAffected,
    KnownNotAffected,
    UnderInvestigation,
}

impl StatusKind {
    /// CSAF `product_status` key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::KnownAffected => "known_affected",
            Self::KnownNotAffected => "known_not_affected",
            Self::UnderInvestigation => "under_investigation",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One (version, vulnerability) pair that has a status entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductInformation {
    pub full_name: String,
    pub version: String,
    pub identifier: String,
    pub vulnerability_id: String,
    pub status: StatusKind,
    pub cvss_score: Option<f64>,
    pub remediations: Vec<RemediationStrategy>,
}

impl AdvisoryDocument {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> &str {
        &self.severity
    }

    pub fn has_aggregate_severity(&self) -> bool {
        self.severity != NO_AGGREGATE_SEVERITY
    }

    pub fn vendors(&self) -> &[Vendor] {
        &self.vendors
    }

    pub fn vulnerabilities(&self) -> &[Vulnerability] {
        &self.vulnerabilities
    }
}
