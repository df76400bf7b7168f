//! Recursive-descent parser from CSAF JSON into the immutable model

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Deserialize;

use super::{
    AdvisoryDocument, Product, RemediationStrategy, StatusKind, Vendor, Version, Vulnerability,
    NO_AGGREGATE_SEVERITY, NO_DESCRIPTION,
};
use crate::error::{VaultError, VaultResult};

const CATEGORY_VENDOR: &str = "vendor";
const CATEGORY_PRODUCT_VERSION: &str = "product_version";
const NOTE_SUMMARY: &str = "summary";

// ---------------------------------------------------------------------------
// Wire shapes. Everything optional so that missing fields surface as
// MalformedDocument with a node path rather than a serde message.
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawAdvisory {
    document: Option<RawMeta>,
    product_tree: Option<RawProductTree>,
    #[serde(default)]
    vulnerabilities: Vec<RawVulnerability>,
}

#[derive(Deserialize)]
struct RawMeta {
    title: Option<String>,
    aggregate_severity: Option<RawSeverity>,
    #[serde(default)]
    notes: Vec<RawNote>,
}

#[derive(Deserialize)]
struct RawSeverity {
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawNote {
    category: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawProductTree {
    #[serde(default)]
    branches: Vec<RawBranch>,
}

#[derive(Deserialize)]
struct RawBranch {
    category: Option<String>,
    name: Option<String>,
    #[serde(default)]
    branches: Vec<RawBranch>,
    product: Option<RawFullProductName>,
}

#[derive(Deserialize)]
struct RawFullProductName {
    name: Option<String>,
    product_id: Option<String>,
}

#[derive(Deserialize)]
struct RawVulnerability {
    cve: Option<String>,
    #[serde(default)]
    ids: Vec<RawId>,
    title: Option<String>,
    #[serde(default)]
    scores: Vec<RawScore>,
    product_status: Option<RawProductStatus>,
    #[serde(default)]
    remediations: Vec<RawRemediation>,
}

#[derive(Deserialize)]
struct RawId {
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawScore {
    cvss_v3: Option<RawCvss>,
    cvss_v2: Option<RawCvss>,
}

#[derive(Deserialize)]
struct RawCvss {
    #[serde(rename = "baseScore")]
    base_score: Option<f64>,
}

#[derive(Deserialize, Default)]
struct RawProductStatus {
    #[serde(default)]
    fixed: Vec<String>,
    #[serde(default)]
    known_affected: Vec<String>,
    #[serde(default)]
    known_not_affected: Vec<String>,
    #[serde(default)]
    under_investigation: Vec<String>,
}

#[derive(Deserialize)]
struct RawRemediation {
    details: Option<String>,
    url: Option<String>,
    #[serde(default)]
    product_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

impl AdvisoryDocument {
    /// Parse a UTF-8 JSON advisory
    pub fn parse(bytes: &[u8]) -> VaultResult<Self> {
        let raw: RawAdvisory = serde_json::from_slice(bytes)
            .map_err(|e| VaultError::malformed("$", e.to_string()))?;
        build(raw)
    }

    /// Parse an already decoded JSON value
    pub fn from_value(value: serde_json::Value) -> VaultResult<Self> {
        let raw: RawAdvisory = serde_json::from_value(value)
            .map_err(|e| VaultError::malformed("$", e.to_string()))?;
        build(raw)
    }
}

fn build(raw: RawAdvisory) -> VaultResult<AdvisoryDocument> {
    let meta = raw
        .document
        .ok_or_else(|| VaultError::malformed("document", "missing document section"))?;

    let title = meta
        .title
        .ok_or_else(|| VaultError::malformed("document.title", "advisory has no title"))?;

    let severity = meta
        .aggregate_severity
        .and_then(|s| s.text)
        .unwrap_or_else(|| NO_AGGREGATE_SEVERITY.to_string());

    let description = meta
        .notes
        .into_iter()
        .find(|n| n.category.as_deref() == Some(NOTE_SUMMARY))
        .and_then(|n| n.text)
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let mut seen_ids = HashSet::new();
    let vendors = raw
        .product_tree
        .map(|tree| tree.branches)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, branch)| {
            parse_vendor(branch, &format!("product_tree.branches[{}]", i), &mut seen_ids)
        })
        .collect::<VaultResult<Vec<_>>>()?;

    let vulnerabilities = raw
        .vulnerabilities
        .into_iter()
        .enumerate()
        .map(|(i, v)| parse_vulnerability(v, &format!("vulnerabilities[{}]", i)))
        .collect::<VaultResult<Vec<_>>>()?;

    tracing::debug!(
        vendors = vendors.len(),
        vulnerabilities = vulnerabilities.len(),
        "parsed advisory document"
    );

    Ok(AdvisoryDocument {
        title,
        description,
        severity,
        vendors,
        vulnerabilities,
    })
}

// ---------------------------------------------------------------------------
// Product tree
// ---------------------------------------------------------------------------

fn parse_vendor(
    branch: &RawBranch,
    ctx: &str,
    seen_ids: &mut HashSet<String>,
) -> VaultResult<Vendor> {
    if branch.category.as_deref() != Some(CATEGORY_VENDOR) {
        return Err(VaultError::malformed(
            ctx,
            "top-level branch must have category 'vendor'",
        ));
    }
    let name = required_name(branch, ctx)?;

    let products = branch
        .branches
        .iter()
        .enumerate()
        .map(|(i, child)| parse_product(child, &format!("{}.branches[{}]", ctx, i), seen_ids))
        .collect::<VaultResult<Vec<_>>>()?;

    Ok(Vendor { name, products })
}

fn parse_product(
    branch: &RawBranch,
    ctx: &str,
    seen_ids: &mut HashSet<String>,
) -> VaultResult<Product> {
    let name = required_name(branch, ctx)?;
    let mut versions = Vec::new();
    collect_versions(branch, ctx, seen_ids, &mut versions)?;
    Ok(Product { name, versions })
}

fn collect_versions(
    branch: &RawBranch,
    ctx: &str,
    seen_ids: &mut HashSet<String>,
    out: &mut Vec<Version>,
) -> VaultResult<()> {
    if branch.category.as_deref() == Some(CATEGORY_PRODUCT_VERSION) {
        if !branch.branches.is_empty() {
            return Err(VaultError::malformed(
                ctx,
                "product_version branches cannot contain further branches",
            ));
        }
        out.push(leaf_version(branch, ctx, seen_ids)?);
        return Ok(());
    }

    if !branch.branches.is_empty() {
        for (i, child) in branch.branches.iter().enumerate() {
            collect_versions(child, &format!("{}.branches[{}]", ctx, i), seen_ids, out)?;
        }
        return Ok(());
    }

    if branch.product.is_some() {
        out.push(leaf_version(branch, ctx, seen_ids)?);
        return Ok(());
    }

    Err(VaultError::malformed(
        ctx,
        "branch has neither nested branches nor a product",
    ))
}

fn leaf_version(
    branch: &RawBranch,
    ctx: &str,
    seen_ids: &mut HashSet<String>,
) -> VaultResult<Version> {
    let version = required_name(branch, ctx)?;
    let product = branch
        .product
        .as_ref()
        .ok_or_else(|| VaultError::malformed(ctx, "version leaf has no product"))?;

    let product_ctx = format!("{}.product", ctx);
    let full_name = product
        .name
        .clone()
        .ok_or_else(|| VaultError::malformed(&product_ctx, "product has no name"))?;
    let identifier = product
        .product_id
        .clone()
        .ok_or_else(|| VaultError::malformed(&product_ctx, "product has no product_id"))?;

    if !seen_ids.insert(identifier.clone()) {
        return Err(VaultError::malformed(
            product_ctx,
            format!("duplicate product_id '{}'", identifier),
        ));
    }

    Ok(Version {
        full_name,
        identifier,
        version,
    })
}

fn required_name(branch: &RawBranch, ctx: &str) -> VaultResult<String> {
    branch
        .name
        .clone()
        .ok_or_else(|| VaultError::malformed(ctx, "branch has no name"))
}

// ---------------------------------------------------------------------------
// Vulnerabilities
// ---------------------------------------------------------------------------

fn parse_vulnerability(raw: RawVulnerability, ctx: &str) -> VaultResult<Vulnerability> {
    let id = raw
        .cve
        .or_else(|| raw.ids.into_iter().find_map(|i| i.text))
        .or(raw.title)
        .ok_or_else(|| VaultError::malformed(ctx, "vulnerability has no cve, ids or title"))?;

    let cvss_score = raw
        .scores
        .iter()
        .find_map(|s| s.cvss_v3.as_ref().and_then(|c| c.base_score))
        .or_else(|| {
            raw.scores
                .iter()
                .find_map(|s| s.cvss_v2.as_ref().and_then(|c| c.base_score))
        });

    let product_status = invert_status(
        raw.product_status.unwrap_or_default(),
        &format!("{}.product_status", ctx),
    )?;

    let remediations = raw
        .remediations
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let details = r.details.ok_or_else(|| {
                VaultError::malformed(
                    format!("{}.remediations[{}]", ctx, i),
                    "remediation has no details",
                )
            })?;
            Ok(RemediationStrategy {
                details,
                url: r.url,
                product_ids: r.product_ids.into_iter().collect::<BTreeSet<_>>(),
            })
        })
        .collect::<VaultResult<Vec<_>>>()?;

    Ok(Vulnerability {
        id,
        cvss_score,
        product_status,
        remediations,
    })
}

/// Groups keyed by status → one entry per product id
fn invert_status(
    raw: RawProductStatus,
    ctx: &str,
) -> VaultResult<BTreeMap<String, StatusKind>> {
    let groups = [
        (StatusKind::Fixed, raw.fixed),
        (StatusKind::KnownAffected, raw.known_affected),
        (StatusKind::KnownNotAffected, raw.known_not_affected),
        (StatusKind::UnderInvestigation, raw.under_investigation),
    ];

    let mut status = BTreeMap::new();
    for (kind, ids) in groups {
        for id in ids {
            match status.get(&id) {
                Some(existing) if *existing != kind => {
                    return Err(VaultError::malformed(
                        ctx,
                        format!(
                            "product '{}' is both {} and {}",
                            id, existing, kind
                        ),
                    ));
                }
                Some(_) => {}
                None => {
                    status.insert(id, kind);
                }
            }
        }
    }
    Ok(status)
}
