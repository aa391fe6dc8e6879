//! # Persisted Records
//!
//! What a save hands to the store: one [`NcrRecord`] per item, all sharing
//! the document number, and for each of them a [`ReturnRecord`] mirrored
//! into the operations workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{NcrError, NcrResult};
use crate::form::FormData;
use crate::item::NcrItem;

/// Prefix a store may use to signal that numbering failed
pub const DOCUMENT_NUMBER_ERROR_PREFIX: &str = "ERROR";

/// Accept a document number from the store, rejecting blank or error values.
pub fn check_document_number(raw: &str) -> NcrResult<String> {
    let number = raw.trim();
    if number.is_empty() {
        return Err(NcrError::NumberAllocation {
            reason: "store returned an empty document number".to_string(),
        });
    }
    if number.to_ascii_uppercase().starts_with(DOCUMENT_NUMBER_ERROR_PREFIX) {
        return Err(NcrError::NumberAllocation {
            reason: number.to_string(),
        });
    }
    Ok(number.to_string())
}

/// NCR status derived from the QA disposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NcrStatus {
    Open,
    Closed,
}

impl NcrStatus {
    pub fn from_form(form: &FormData) -> Self {
        if form.is_closed() {
            NcrStatus::Closed
        } else {
            NcrStatus::Open
        }
    }
}

/// One item plus the form it was reported on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NcrRecord {
    pub document_number: String,
    pub status: NcrStatus,
    pub item: NcrItem,
    pub form: FormData,
    pub created_at: DateTime<Utc>,
}

impl NcrRecord {
    pub fn new(document_number: impl Into<String>, item: &NcrItem, form: &FormData) -> Self {
        NcrRecord {
            document_number: document_number.into(),
            status: NcrStatus::from_form(form),
            item: item.clone(),
            form: form.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Status of a return in the operations workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnStatus {
    /// Initial status of every mirrored record
    Pending,
    InTransit,
    Received,
    Completed,
}

impl ReturnStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            ReturnStatus::Pending => "รอดำเนินการ",
            ReturnStatus::InTransit => "กำลังขนส่ง",
            ReturnStatus::Received => "รับสินค้าแล้ว",
            ReturnStatus::Completed => "เสร็จสิ้น",
        }
    }
}

/// Flattened copy of an NCR record for the operations team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub id: Uuid,
    pub ncr_document_number: String,
    pub branch: String,
    pub product_code: String,
    pub product_name: String,
    pub customer: String,
    pub destination_customer: Option<String>,
    pub quantity: f64,
    pub unit: String,
    pub price_bill: f64,
    pub return_route: String,
    pub problem_source: String,
    pub problem: Option<String>,
    pub root_cause: Option<String>,
    pub founder: String,
    pub status: ReturnStatus,
    pub created_at: DateTime<Utc>,
}

impl ReturnRecord {
    /// Project a persisted NCR record
    pub fn mirror(record: &NcrRecord) -> Self {
        let item = &record.item;
        let form = &record.form;
        ReturnRecord {
            id: Uuid::new_v4(),
            ncr_document_number: record.document_number.clone(),
            branch: item.branch.clone(),
            product_code: item.product_code.clone(),
            product_name: item.product_name.clone(),
            customer: item.customer.clone(),
            destination_customer: item.destination_customer.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            price_bill: item.price_bill,
            return_route: item.return_route.clone(),
            problem_source: item.problem_source.clone(),
            problem: form.problem_label(),
            root_cause: form.root_cause.map(|c| c.display_name().to_string()),
            founder: form.founder.clone(),
            status: ReturnStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{ProblemType, QaDisposition, RootCause};
    use crate::item::ItemDraft;

    fn item() -> NcrItem {
        ItemDraft {
            branch: "นครสวรรค์".into(),
            product_code: "P001".into(),
            quantity: 5.0,
            unit: "กล่อง".into(),
            price_bill: 500.0,
            return_route: "นครสวรรค์".into(),
            ..ItemDraft::default()
        }
        .build(Uuid::new_v4())
    }

    #[test]
    fn test_document_number_sentinels() {
        assert_eq!(check_document_number(" NCR-2024-001 ").unwrap(), "NCR-2024-001");
        assert!(check_document_number("").is_err());
        assert!(check_document_number("ERROR: quota").is_err());
        assert!(check_document_number("error").is_err());
    }

    #[test]
    fn test_status_follows_qa() {
        let mut form = FormData::default();
        assert_eq!(NcrRecord::new("N", &item(), &form).status, NcrStatus::Open);
        form.set_qa(Some(QaDisposition::Accepted));
        assert_eq!(NcrRecord::new("N", &item(), &form).status, NcrStatus::Closed);
    }

    #[test]
    fn test_mirror_copies_flags_and_starts_pending() {
        let mut form = FormData::default();
        form.founder = "Somchai".into();
        form.select_problem(Some(ProblemType::Damaged));
        form.select_root_cause(Some(RootCause::Transport));
        let record = NcrRecord::new("NCR-2024-001", &item(), &form);

        let mirrored = ReturnRecord::mirror(&record);
        assert_eq!(mirrored.ncr_document_number, "NCR-2024-001");
        assert_eq!(mirrored.status, ReturnStatus::Pending);
        assert_eq!(mirrored.problem.as_deref(), Some("สินค้าชำรุด"));
        assert_eq!(mirrored.root_cause.as_deref(), Some("การขนส่ง"));
        assert_eq!(mirrored.quantity, 5.0);
        assert_ne!(mirrored.id, record.item.id);
    }
}
