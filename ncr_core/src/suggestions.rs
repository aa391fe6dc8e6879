//! Autocomplete lists built from records already in the store.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{NcrError, NcrResult};
use crate::records::NcrRecord;
use crate::store::NcrStore;

/// Distinct, sorted values seen in earlier NCRs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub founders: Vec<String>,
    pub customers: Vec<String>,
    pub product_codes: Vec<String>,
}

impl Suggestions {
    /// Collect from records; blank values are skipped and whitespace trimmed.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a NcrRecord>) -> Self {
        let mut founders = BTreeSet::new();
        let mut customers = BTreeSet::new();
        let mut product_codes = BTreeSet::new();

        fn insert(set: &mut BTreeSet<String>, value: &str) {
            let value = value.trim();
            if !value.is_empty() {
                set.insert(value.to_string());
            }
        }

        for record in records {
            insert(&mut founders, &record.form.founder);
            insert(&mut customers, &record.item.customer);
            if let Some(destination) = &record.item.destination_customer {
                insert(&mut customers, destination);
            }
            insert(&mut product_codes, &record.item.product_code);
        }

        Suggestions {
            founders: founders.into_iter().collect(),
            customers: customers.into_iter().collect(),
            product_codes: product_codes.into_iter().collect(),
        }
    }

    /// Values of `list` starting with `prefix`, case-insensitive
    pub fn matching<'a>(list: &'a [String], prefix: &str) -> Vec<&'a str> {
        let prefix = prefix.trim().to_lowercase();
        list.iter()
            .filter(|value| value.to_lowercase().starts_with(&prefix))
            .map(String::as_str)
            .collect()
    }
}

/// Read the store's records and build suggestion lists.
pub async fn load_suggestions<S>(store: &S) -> NcrResult<Suggestions>
where
    S: NcrStore + ?Sized,
{
    let records = store
        .ncr_records()
        .await
        .map_err(|e| NcrError::store("list records", e.to_string()))?;
    let suggestions = Suggestions::from_records(&records);
    tracing::debug!(
        records = records.len(),
        founders = suggestions.founders.len(),
        customers = suggestions.customers.len(),
        "suggestions loaded"
    );
    Ok(suggestions)
}
