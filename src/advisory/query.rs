//! Read-only per-product queries over a parsed advisory

use super::{AdvisoryDocument, ProductInformation, Version};

impl AdvisoryDocument {
    /// Every version in tree order
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.vendors
            .iter()
            .flat_map(|vendor| vendor.products.iter())
            .flat_map(|product| product.versions.iter())
    }

    pub fn find_version(&self, product_id: &str) -> Option<&Version> {
        self.versions().find(|v| v.identifier == product_id)
    }

    /// All product ids in tree order
    pub fn product_ids(&self) -> Vec<&str> {
        self.versions().map(|v| v.identifier.as_str()).collect()
    }

    /// One record per vulnerability that has a status entry for `product_id`.
    /// Empty when the id is unknown or unreferenced.
    pub fn get_product_information(&self, product_id: &str) -> Vec<ProductInformation> {
        match self.find_version(product_id) {
            Some(version) => self.records_for(version),
            None => Vec::new(),
        }
    }

    /// [`get_product_information`](Self::get_product_information) for every
    /// version, ordered by version then vulnerability
    pub fn get_all_product_information(&self) -> Vec<ProductInformation> {
        self.versions()
            .flat_map(|version| self.records_for(version))
            .collect()
    }

    fn records_for(&self, version: &Version) -> Vec<ProductInformation> {
        let id = version.identifier.as_str();
        self.vulnerabilities
            .iter()
            .filter_map(|vuln| {
                let status = *vuln.product_status.get(id)?;
                Some(ProductInformation {
                    full_name: version.full_name.clone(),
                    version: version.version.clone(),
                    identifier: version.identifier.clone(),
                    vulnerability_id: vuln.id.clone(),
                    status,
                    cvss_score: vuln.cvss_score,
                    remediations: vuln
                        .remediations
                        .iter()
                        .filter(|r| r.applies_to(id))
                        .cloned()
                        .collect(),
                })
            })
            .collect()
    }
}
