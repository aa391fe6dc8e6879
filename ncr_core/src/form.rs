//! # Form Data
//!
//! The header, problem, action, root-cause and closing sections of an NCR.
//!
//! Each checkbox group on the paper form allows at most one tick. Rather
//! than one boolean per box, every group is a single `Option<Enum>` field:
//! choosing a value replaces whatever was chosen before, so sibling boxes
//! can never be ticked together.
//!
//! ## Example
//!
//! ```rust
//! use ncr_core::form::{FormData, ProblemType, RootCause};
//!
//! let mut form = FormData::default();
//! form.select_problem(Some(ProblemType::Damaged));
//! form.select_problem(Some(ProblemType::Lost));
//! assert_eq!(form.problem, Some(ProblemType::Lost));
//!
//! form.select_root_cause(Some(RootCause::Transport));
//! assert!(form.root_cause.is_some());
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Checkbox Groups
// ============================================================================

/// Problem type group (section 2 of the paper form)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemType {
    Damaged,
    DamagedInBox,
    Lost,
    Wet,
    Deteriorated,
    Expired,
    NearExpiry,
    ShortShipped,
    OverShipped,
    WrongItem,
    WrongCustomer,
    WrongLot,
    NotOrdered,
    DuplicateOrder,
    LabelError,
    PackagingDefect,
    Contaminated,
    /// Free text goes in [`FormData::problem_other`]
    Other,
}

impl ProblemType {
    /// All problem types in paper-form order
    pub const ALL: [ProblemType; 18] = [
        ProblemType::Damaged,
        ProblemType::DamagedInBox,
        ProblemType::Lost,
        ProblemType::Wet,
        ProblemType::Deteriorated,
        ProblemType::Expired,
        ProblemType::NearExpiry,
        ProblemType::ShortShipped,
        ProblemType::OverShipped,
        ProblemType::WrongItem,
        ProblemType::WrongCustomer,
        ProblemType::WrongLot,
        ProblemType::NotOrdered,
        ProblemType::DuplicateOrder,
        ProblemType::LabelError,
        ProblemType::PackagingDefect,
        ProblemType::Contaminated,
        ProblemType::Other,
    ];

    /// Label printed next to the checkbox
    pub fn display_name(&self) -> &'static str {
        match self {
            ProblemType::Damaged => "สินค้าชำรุด",
            ProblemType::DamagedInBox => "ชำรุดในกล่อง",
            ProblemType::Lost => "สินค้าสูญหาย",
            ProblemType::Wet => "เปียกน้ำ",
            ProblemType::Deteriorated => "เสื่อมคุณภาพ",
            ProblemType::Expired => "หมดอายุ",
            ProblemType::NearExpiry => "ใกล้หมดอายุ",
            ProblemType::ShortShipped => "ส่งขาด",
            ProblemType::OverShipped => "ส่งเกิน",
            ProblemType::WrongItem => "ส่งผิดรายการ",
            ProblemType::WrongCustomer => "ส่งผิดลูกค้า",
            ProblemType::WrongLot => "ผิด Lot",
            ProblemType::NotOrdered => "ลูกค้าไม่ได้สั่ง",
            ProblemType::DuplicateOrder => "สั่งซ้ำ",
            ProblemType::LabelError => "ฉลากผิด",
            ProblemType::PackagingDefect => "บรรจุภัณฑ์ผิดปกติ",
            ProblemType::Contaminated => "ปนเปื้อน",
            ProblemType::Other => "อื่นๆ",
        }
    }
}

impl std::fmt::Display for ProblemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Corrective action kinds (section 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Return,
    Rework,
    Destroy,
    SpecialAccept,
    ClaimSupplier,
    Other,
}

impl ActionKind {
    /// All action kinds in paper-form order
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Return,
        ActionKind::Rework,
        ActionKind::Destroy,
        ActionKind::SpecialAccept,
        ActionKind::ClaimSupplier,
        ActionKind::Other,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ActionKind::Return => "ส่งคืน",
            ActionKind::Rework => "แก้ไข/ปรับปรุง",
            ActionKind::Destroy => "ทำลาย",
            ActionKind::SpecialAccept => "ยอมรับเป็นกรณีพิเศษ",
            ActionKind::ClaimSupplier => "เรียกร้องค่าเสียหาย",
            ActionKind::Other => "อื่นๆ",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The selected corrective action with its own quantity and note.
///
/// Quantity is kept as text because the paper form accepts entries like
/// "ทั้งหมด" as well as numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveAction {
    pub kind: ActionKind,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub note: String,
}

impl CorrectiveAction {
    pub fn new(kind: ActionKind) -> Self {
        CorrectiveAction {
            kind,
            quantity: String::new(),
            note: String::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = quantity.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// Root cause group (section 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootCause {
    Packaging,
    Transport,
    Operation,
    Environment,
}

impl RootCause {
    pub const ALL: [RootCause; 4] = [
        RootCause::Packaging,
        RootCause::Transport,
        RootCause::Operation,
        RootCause::Environment,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            RootCause::Packaging => "บรรจุภัณฑ์",
            RootCause::Transport => "การขนส่ง",
            RootCause::Operation => "การปฏิบัติงาน",
            RootCause::Environment => "สภาพแวดล้อม",
        }
    }
}

impl std::fmt::Display for RootCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// QA closing disposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QaDisposition {
    Accepted,
    Rejected,
}

impl QaDisposition {
    pub fn display_name(&self) -> &'static str {
        match self {
            QaDisposition::Accepted => "ยอมรับ",
            QaDisposition::Rejected => "ไม่ยอมรับ",
        }
    }
}

// ============================================================================
// Form Record
// ============================================================================

/// All non-item fields of an NCR.
///
/// Missing keys deserialize to their defaults so partially filled forms
/// coming from the browser can be loaded as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormData {
    // --- routing ---
    /// Recipient ("ถึง")
    pub to: String,
    pub date: Option<NaiveDate>,
    /// Copy-to ("สำเนา")
    pub copy_to: String,
    pub po_number: String,
    /// Person who found the problem ("ผู้พบปัญหา")
    pub founder: String,

    // --- problem ---
    pub problem: Option<ProblemType>,
    /// Text for [`ProblemType::Other`]
    pub problem_other: String,
    /// Free-text problem description
    pub detail: String,

    // --- corrective action ---
    pub action: Option<CorrectiveAction>,
    pub due_date: Option<NaiveDate>,
    pub approver_name: String,
    pub approver_position: String,
    pub approver_date: Option<NaiveDate>,

    // --- root cause ---
    pub root_cause: Option<RootCause>,
    pub cause_detail: String,
    pub prevention: String,
    pub responsible_person: String,

    // --- closing ---
    pub qa: Option<QaDisposition>,
    pub qa_reason: String,
    pub qa_name: String,
    pub qa_date: Option<NaiveDate>,
}

impl FormData {
    /// Create an empty form dated `date`
    pub fn dated(date: NaiveDate) -> Self {
        FormData {
            date: Some(date),
            ..FormData::default()
        }
    }

    /// Select (or clear) the problem type.
    ///
    /// Leaving [`ProblemType::Other`] also clears the other-text.
    pub fn select_problem(&mut self, problem: Option<ProblemType>) {
        if problem != Some(ProblemType::Other) {
            self.problem_other.clear();
        }
        self.problem = problem;
    }

    /// Select (or clear) the corrective action
    pub fn select_action(&mut self, action: Option<CorrectiveAction>) {
        self.action = action;
    }

    /// Select (or clear) the root cause
    pub fn select_root_cause(&mut self, cause: Option<RootCause>) {
        self.root_cause = cause;
    }

    /// Set (or clear) the QA disposition
    pub fn set_qa(&mut self, qa: Option<QaDisposition>) {
        self.qa = qa;
    }

    /// Whether QA accepted the closure
    pub fn is_closed(&self) -> bool {
        self.qa == Some(QaDisposition::Accepted)
    }

    /// Label for the chosen problem, including other-text when given
    pub fn problem_label(&self) -> Option<String> {
        self.problem.map(|p| match p {
            ProblemType::Other if !self.problem_other.trim().is_empty() => {
                format!("{}: {}", p.display_name(), self.problem_other.trim())
            }
            _ => p.display_name().to_string(),
        })
    }
}
