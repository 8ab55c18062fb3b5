//! Reference data the workflow validates against.
//!
//! A [`CatalogSnapshot`] is loaded once by the hosting service and passed
//! explicitly into every operation that needs it. Workflow code never reaches
//! for a global registry, so tests can hand each case its own snapshot.

use serde::{Deserialize, Serialize};

/// Generic reference entry used for reject reasons and other flat lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefItem {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Branch {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub city: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryMethod {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub base_cost: f64,
    pub sla_days: u32,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VendorType {
    Embossing,
    Courier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vendor {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub vendor_type: VendorType,
    pub sla_days: u32,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub currency: String,
    pub term_months: u32,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tariff {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub product_id: u32,
    pub issue_fee: f64,
    pub monthly_fee: f64,
    pub annual_fee: f64,
    pub active: bool,
}

/// Immutable bundle of reference data for one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub branches: Vec<Branch>,
    pub channels: Vec<Channel>,
    pub delivery_methods: Vec<DeliveryMethod>,
    pub vendors: Vec<Vendor>,
    pub products: Vec<Product>,
    pub tariffs: Vec<Tariff>,
    pub reject_reasons: Vec<RefItem>,
}

impl CatalogSnapshot {
    pub fn branch(&self, id: u32) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    pub fn channel(&self, id: u32) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn delivery_method(&self, id: u32) -> Option<&DeliveryMethod> {
        self.delivery_methods.iter().find(|d| d.id == id)
    }

    pub fn vendor(&self, id: u32) -> Option<&Vendor> {
        self.vendors.iter().find(|v| v.id == id)
    }

    pub fn product(&self, id: u32) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn tariff(&self, id: u32) -> Option<&Tariff> {
        self.tariffs.iter().find(|t| t.id == id)
    }

    pub fn reject_reason(&self, id: u32) -> Option<&RefItem> {
        self.reject_reasons.iter().find(|r| r.id == id)
    }

    /// An entry must exist and be active to be referenced by new records.
    pub fn has_active_branch(&self, id: u32) -> bool {
        self.branch(id).map(|b| b.active).unwrap_or(false)
    }

    pub fn has_active_channel(&self, id: u32) -> bool {
        self.channel(id).map(|c| c.active).unwrap_or(false)
    }

    pub fn has_active_delivery_method(&self, id: u32) -> bool {
        self.delivery_method(id).map(|d| d.active).unwrap_or(false)
    }

    pub fn has_active_product(&self, id: u32) -> bool {
        self.product(id).map(|p| p.active).unwrap_or(false)
    }

    /// A tariff is usable only when it is active and belongs to the product.
    pub fn has_active_tariff_for(&self, tariff_id: u32, product_id: u32) -> bool {
        self.tariff(tariff_id)
            .map(|t| t.active && t.product_id == product_id)
            .unwrap_or(false)
    }

    pub fn has_active_reject_reason(&self, id: u32) -> bool {
        self.reject_reason(id).map(|r| r.active).unwrap_or(false)
    }

    pub fn has_active_vendor(&self, id: u32, vendor_type: VendorType) -> bool {
        self.vendor(id)
            .map(|v| v.active && v.vendor_type == vendor_type)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            branches: vec![Branch {
                id: 1,
                code: "HQ".to_string(),
                name: "Head Office".to_string(),
                city: "Metropolis".to_string(),
                active: true,
            }],
            channels: vec![Channel {
                id: 4,
                code: "BRANCH".to_string(),
                name: "Branch walk-in".to_string(),
                active: true,
            }],
            delivery_methods: vec![DeliveryMethod {
                id: 1,
                code: "PICKUP".to_string(),
                name: "Branch pickup".to_string(),
                base_cost: 0.0,
                sla_days: 1,
                active: false,
            }],
            vendors: vec![Vendor {
                id: 7,
                code: "EMB-1".to_string(),
                name: "Embosser One".to_string(),
                vendor_type: VendorType::Embossing,
                sla_days: 5,
                active: true,
            }],
            products: vec![Product {
                id: 2,
                code: "DEBIT".to_string(),
                name: "Debit Classic".to_string(),
                currency: "USD".to_string(),
                term_months: 48,
                active: true,
            }],
            tariffs: vec![Tariff {
                id: 3,
                code: "STD".to_string(),
                name: "Standard".to_string(),
                product_id: 2,
                issue_fee: 10.0,
                monthly_fee: 1.5,
                annual_fee: 0.0,
                active: true,
            }],
            reject_reasons: vec![RefItem {
                id: 9,
                code: "DOCS".to_string(),
                name: "Incomplete documents".to_string(),
                active: true,
            }],
        }
    }

    #[test]
    fn inactive_entries_do_not_count_as_available() {
        let catalog = snapshot();
        assert!(catalog.has_active_branch(1));
        assert!(!catalog.has_active_delivery_method(1));
        assert!(!catalog.has_active_branch(99));
    }

    #[test]
    fn tariff_must_belong_to_product() {
        let catalog = snapshot();
        assert!(catalog.has_active_tariff_for(3, 2));
        assert!(!catalog.has_active_tariff_for(3, 5));
    }

    #[test]
    fn vendor_lookup_checks_type() {
        let catalog = snapshot();
        assert!(catalog.has_active_vendor(7, VendorType::Embossing));
        assert!(!catalog.has_active_vendor(7, VendorType::Courier));
    }
}
