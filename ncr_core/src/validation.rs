//! Required-field checks run before save, print and export.

use serde::{Deserialize, Serialize};

use crate::form::FormData;
use crate::item::NcrItem;

/// One missing piece of the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationIssue {
    MissingFounder,
    MissingProblem,
    NoItems,
    MissingRootCause,
}

impl ValidationIssue {
    /// Message shown in the issue list
    pub fn message(&self) -> &'static str {
        match self {
            ValidationIssue::MissingFounder => "กรุณาระบุชื่อผู้พบปัญหา",
            ValidationIssue::MissingProblem => "กรุณาเลือกประเภทปัญหาหรือระบุรายละเอียดปัญหา",
            ValidationIssue::NoItems => "กรุณาเพิ่มรายการสินค้าอย่างน้อย 1 รายการ",
            ValidationIssue::MissingRootCause => "กรุณาเลือกสาเหตุของปัญหา",
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Check the form and item list, in the order the sections appear.
pub fn validate(form: &FormData, items: &[NcrItem]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if form.founder.trim().is_empty() {
        issues.push(ValidationIssue::MissingFounder);
    }
    if form.problem.is_none() && form.detail.trim().is_empty() {
        issues.push(ValidationIssue::MissingProblem);
    }
    if items.is_empty() {
        issues.push(ValidationIssue::NoItems);
    }
    if form.root_cause.is_none() {
        issues.push(ValidationIssue::MissingRootCause);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{ProblemType, RootCause};
    use crate::item::ItemDraft;
    use uuid::Uuid;

    fn item() -> NcrItem {
        ItemDraft {
            branch: "นครสวรรค์".into(),
            product_code: "P001".into(),
            return_route: "นครสวรรค์".into(),
            ..ItemDraft::default()
        }
        .build(Uuid::new_v4())
    }

    #[test]
    fn test_empty_form_has_four_issues() {
        let issues = validate(&FormData::default(), &[]);
        assert_eq!(
            issues,
            vec![
                ValidationIssue::MissingFounder,
                ValidationIssue::MissingProblem,
                ValidationIssue::NoItems,
                ValidationIssue::MissingRootCause,
            ]
        );
    }

    #[test]
    fn test_complete_form_is_valid() {
        let mut form = FormData::default();
        form.founder = "Somchai".into();
        form.select_problem(Some(ProblemType::Damaged));
        form.select_root_cause(Some(RootCause::Transport));
        assert!(validate(&form, &[item()]).is_empty());
    }

    #[test]
    fn test_detail_substitutes_for_problem_type() {
        let mut form = FormData::default();
        form.founder = "Somchai".into();
        form.detail = "ฝากล่องฉีก".into();
        form.select_root_cause(Some(RootCause::Packaging));
        assert!(validate(&form, &[item()]).is_empty());

        form.detail = "   ".into();
        assert_eq!(validate(&form, &[item()]), vec![ValidationIssue::MissingProblem]);
    }

    #[test]
    fn test_whitespace_founder_is_missing() {
        let mut form = FormData::default();
        form.founder = "  ".into();
        assert!(validate(&form, &[]).contains(&ValidationIssue::MissingFounder));
    }
}
