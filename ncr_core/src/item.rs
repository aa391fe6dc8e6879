//! # Non-Conforming Items
//!
//! Line items of the NCR and the transient draft the item dialog edits
//! before an item is appended to the list.
//!
//! The "problem source" column of the paper form is assembled from a guided
//! selection of [`ProblemOrigin`]s plus whatever cost-related source the
//! user typed by hand.
//!
//! ## Example
//!
//! ```rust
//! use ncr_core::item::{compose_problem_source, ProblemOrigin};
//!
//! let origins = vec![ProblemOrigin::Transport {
//!     carrier: "Kerry".to_string(),
//!     cause: "กล่องบุบ".to_string(),
//! }];
//! assert_eq!(
//!     compose_problem_source(&origins, "หักค่าขนส่ง"),
//!     "ขนส่ง (Kerry): กล่องบุบ / หักค่าขนส่ง"
//! );
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Disposition of an item. Only returns are raised from this form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    #[default]
    Return,
}

impl Decision {
    pub fn display_name(&self) -> &'static str {
        match self {
            Decision::Return => "Return",
        }
    }
}

/// Who pays for the non-conformance, if anyone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostResponsibility {
    pub charged: bool,
    pub amount: f64,
    pub responsible: String,
}

impl CostResponsibility {
    /// "ผู้รับผิดชอบค่าใช้จ่าย: X 120.00 บาท", or `None` when not charged
    pub fn describe(&self) -> Option<String> {
        if !self.charged {
            return None;
        }
        let who = self.responsible.trim();
        let who = if who.is_empty() { "-" } else { who };
        Some(format!("ผู้รับผิดชอบค่าใช้จ่าย: {} {:.2} บาท", who, self.amount))
    }
}

/// One branch of the guided "where did the problem come from" selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProblemOrigin {
    Customer { detail: String },
    DestinationCustomer { name: String, detail: String },
    Accounting { detail: String },
    Keying { staff: String, detail: String },
    Warehouse { branch: String, cause: String },
    Transport { carrier: String, cause: String },
    Other { text: String },
}

impl ProblemOrigin {
    /// Clause written into the problem-source column.
    ///
    /// Empty qualifiers are dropped, so `Customer { detail: "" }` is just
    /// "ลูกค้า".
    pub fn describe(&self) -> String {
        fn clause(head: &str, qualifier: &str, body: &str) -> String {
            let mut out = head.to_string();
            let qualifier = qualifier.trim();
            if !qualifier.is_empty() {
                out.push_str(&format!(" ({})", qualifier));
            }
            let body = body.trim();
            if !body.is_empty() {
                out.push_str(": ");
                out.push_str(body);
            }
            out
        }

        match self {
            ProblemOrigin::Customer { detail } => clause("ลูกค้า", "", detail),
            ProblemOrigin::DestinationCustomer { name, detail } => clause("ลูกค้าปลายทาง", name, detail),
            ProblemOrigin::Accounting { detail } => clause("บัญชี", "", detail),
            ProblemOrigin::Keying { staff, detail } => clause("คีย์ข้อมูล", staff, detail),
            ProblemOrigin::Warehouse { branch, cause } => clause("คลังสินค้า", branch, cause),
            ProblemOrigin::Transport { carrier, cause } => clause("ขนส่ง", carrier, cause),
            ProblemOrigin::Other { text } => text.trim().to_string(),
        }
    }
}

/// Join origin clauses with ", " and append the manual source after " / ".
pub fn compose_problem_source(origins: &[ProblemOrigin], manual: &str) -> String {
    let guided = origins
        .iter()
        .map(ProblemOrigin::describe)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let manual = manual.trim();

    match (guided.is_empty(), manual.is_empty()) {
        (true, _) => manual.to_string(),
        (false, true) => guided,
        (false, false) => format!("{} / {}", guided, manual),
    }
}

/// One non-conforming line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NcrItem {
    pub id: Uuid,
    /// Origin branch
    pub branch: String,
    pub ref_no: String,
    pub ref_no_2: Option<String>,
    pub product_code: String,
    pub product_name: String,
    pub customer: String,
    pub destination_customer: Option<String>,
    pub quantity: f64,
    pub unit: String,
    pub price_per_unit: f64,
    /// Total billed price
    pub price_bill: f64,
    pub expiry_date: Option<NaiveDate>,
    pub cost: CostResponsibility,
    pub problem_source: String,
    pub decision: Decision,
    pub return_route: String,
}

impl NcrItem {
    /// Reference numbers stacked one per line
    pub fn references(&self) -> String {
        match self.ref_no_2.as_deref().map(str::trim) {
            Some(second) if !second.is_empty() => format!("{}\n{}", self.ref_no, second),
            _ => self.ref_no.clone(),
        }
    }

    /// Product code and name stacked one per line
    pub fn product_label(&self) -> String {
        if self.product_name.trim().is_empty() {
            self.product_code.clone()
        } else {
            format!("{}\n{}", self.product_code, self.product_name)
        }
    }

    /// Customer, with the destination customer when it differs
    pub fn customer_label(&self) -> String {
        match self.destination_customer.as_deref().map(str::trim) {
            Some(dest) if !dest.is_empty() => format!("{}\n→ {}", self.customer, dest),
            _ => self.customer.clone(),
        }
    }

    /// Text of the analysis column: problem source, cost line, return route
    pub fn analysis(&self) -> String {
        let mut lines = Vec::new();
        if !self.problem_source.trim().is_empty() {
            lines.push(format!("ปัญหาเกิดจาก: {}", self.problem_source.trim()));
        }
        if let Some(cost) = self.cost.describe() {
            lines.push(cost);
        }
        lines.push(format!("{}: {}", self.decision.display_name(), self.return_route));
        lines.join("\n")
    }
}

/// Transient input state of the item dialog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDraft {
    pub branch: String,
    pub ref_no: String,
    pub ref_no_2: String,
    pub product_code: String,
    pub product_name: String,
    pub customer: String,
    pub destination_customer: String,
    pub quantity: f64,
    pub unit: String,
    pub price_per_unit: f64,
    pub price_bill: f64,
    pub expiry_date: Option<NaiveDate>,
    pub cost: CostResponsibility,
    pub origins: Vec<ProblemOrigin>,
    /// Cost-related problem source typed by hand
    pub manual_problem_source: String,
    pub return_route: String,
}

impl ItemDraft {
    /// Names of mandatory fields that are still blank
    pub fn missing_fields(&self) -> Vec<String> {
        [
            ("product_code", &self.product_code),
            ("branch", &self.branch),
            ("return_route", &self.return_route),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect()
    }

    /// Build the item. Callers check [`ItemDraft::missing_fields`] first.
    pub fn build(&self, id: Uuid) -> NcrItem {
        fn optional(s: &str) -> Option<String> {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }

        NcrItem {
            id,
            branch: self.branch.trim().to_string(),
            ref_no: self.ref_no.trim().to_string(),
            ref_no_2: optional(&self.ref_no_2),
            product_code: self.product_code.trim().to_string(),
            product_name: self.product_name.trim().to_string(),
            customer: self.customer.trim().to_string(),
            destination_customer: optional(&self.destination_customer),
            quantity: self.quantity,
            unit: self.unit.trim().to_string(),
            price_per_unit: self.price_per_unit,
            price_bill: self.price_bill,
            expiry_date: self.expiry_date,
            cost: self.cost.clone(),
            problem_source: compose_problem_source(&self.origins, &self.manual_problem_source),
            decision: Decision::Return,
            return_route: self.return_route.trim().to_string(),
        }
    }

    /// Load an existing item back for editing.
    ///
    /// The guided selection cannot be recovered from the composed string,
    /// so the whole problem source becomes the manual text.
    pub fn from_item(item: &NcrItem) -> Self {
        ItemDraft {
            branch: item.branch.clone(),
            ref_no: item.ref_no.clone(),
            ref_no_2: item.ref_no_2.clone().unwrap_or_default(),
            product_code: item.product_code.clone(),
            product_name: item.product_name.clone(),
            customer: item.customer.clone(),
            destination_customer: item.destination_customer.clone().unwrap_or_default(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            price_per_unit: item.price_per_unit,
            price_bill: item.price_bill,
            expiry_date: item.expiry_date,
            cost: item.cost.clone(),
            origins: Vec::new(),
            manual_problem_source: item.problem_source.clone(),
            return_route: item.return_route.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ItemDraft {
        ItemDraft {
            branch: "นครสวรรค์".to_string(),
            product_code: "P001".to_string(),
            product_name: "น้ำดื่ม 600ml".to_string(),
            customer: "ร้านสมชาย".to_string(),
            quantity: 5.0,
            unit: "กล่อง".to_string(),
            price_bill: 500.0,
            return_route: "นครสวรรค์".to_string(),
            ..ItemDraft::default()
        }
    }

    #[test]
    fn test_origin_clauses() {
        assert_eq!(ProblemOrigin::Customer { detail: "".into() }.describe(), "ลูกค้า");
        assert_eq!(
            ProblemOrigin::Warehouse { branch: "ลำปาง".into(), cause: "หยิบผิด".into() }.describe(),
            "คลังสินค้า (ลำปาง): หยิบผิด"
        );
        assert_eq!(ProblemOrigin::Other { text: "  ฝนตก ".into() }.describe(), "ฝนตก");
    }

    #[test]
    fn test_compose_problem_source() {
        let origins = vec![
            ProblemOrigin::Customer { detail: "แจ้งยกเลิก".into() },
            ProblemOrigin::Other { text: "".into() },
            ProblemOrigin::Keying { staff: "Nok".into(), detail: "".into() },
        ];
        assert_eq!(compose_problem_source(&origins, ""), "ลูกค้า: แจ้งยกเลิก, คีย์ข้อมูล (Nok)");
        assert_eq!(compose_problem_source(&[], " ค่าปรับ "), "ค่าปรับ");
        assert_eq!(compose_problem_source(&[], ""), "");
    }

    #[test]
    fn test_missing_fields() {
        assert!(draft().missing_fields().is_empty());

        let mut d = draft();
        d.product_code = "  ".to_string();
        d.return_route.clear();
        assert_eq!(d.missing_fields(), vec!["product_code", "return_route"]);
    }

    #[test]
    fn test_build_forces_return_and_trims() {
        let mut d = draft();
        d.ref_no_2 = "   ".to_string();
        d.destination_customer = "ร้านปลายทาง".to_string();
        let item = d.build(Uuid::new_v4());
        assert_eq!(item.decision, Decision::Return);
        assert!(item.ref_no_2.is_none());
        assert_eq!(item.destination_customer.as_deref(), Some("ร้านปลายทาง"));
        assert_eq!(item.customer_label(), "ร้านสมชาย\n→ ร้านปลายทาง");
    }

    #[test]
    fn test_edit_roundtrip_keeps_source_as_manual_text() {
        let mut d = draft();
        d.origins = vec![ProblemOrigin::Accounting { detail: "ราคาผิด".into() }];
        let item = d.build(Uuid::new_v4());

        let back = ItemDraft::from_item(&item);
        assert!(back.origins.is_empty());
        assert_eq!(back.manual_problem_source, "บัญชี: ราคาผิด");
        assert_eq!(back.build(item.id), item);
    }

    #[test]
    fn test_analysis_lines() {
        let mut d = draft();
        d.manual_problem_source = "ขนส่งทำตก".to_string();
        d.cost = CostResponsibility {
            charged: true,
            amount: 120.0,
            responsible: "Kerry".to_string(),
        };
        let item = d.build(Uuid::new_v4());
        let analysis = item.analysis();
        assert_eq!(analysis.lines().count(), 3);
        assert!(analysis.contains("Kerry 120.00 บาท"));
        assert!(analysis.ends_with("Return: นครสวรรค์"));
    }
}
