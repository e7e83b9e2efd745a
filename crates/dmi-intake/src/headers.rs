//! Header normalization and the expected-field check.
//!
//! Every header comparison in the crate goes through [`normalize_header`].

use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::IntakeError;
use crate::loader::ParsedTable;

/// Trim, lowercase and replace each internal whitespace run with one `_`.
///
/// Idempotent: normalizing an already normalized name returns it unchanged.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalized column names of one table.
///
/// Keeps first-seen source order for reporting; duplicates collapse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct NormalizedHeaders(Vec<String>);

impl NormalizedHeaders {
    pub fn from_raw<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let names = columns
            .into_iter()
            .map(|c| normalize_header(c.as_ref()))
            .filter(|name| seen.insert(name.clone()))
            .collect();
        Self(names)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|h| h == field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_set(&self) -> BTreeSet<&str> {
        self.iter().collect()
    }

    /// Expected fields absent from these headers, sorted
    pub fn missing<'a>(&self, expected: &'a BTreeSet<String>) -> Vec<&'a str> {
        expected
            .iter()
            .map(String::as_str)
            .filter(|field| !self.contains(field))
            .collect()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Check raw column names against `expected`.
///
/// Returns the full normalized header set, extras included. Fails with
/// [`IntakeError::MissingHeaders`] listing every absent field.
pub fn validate_header_names<I, S>(
    columns: I,
    expected: &BTreeSet<String>,
) -> Result<NormalizedHeaders, IntakeError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let headers = NormalizedHeaders::from_raw(columns);
    let missing = headers.missing(expected);
    if missing.is_empty() {
        Ok(headers)
    } else {
        tracing::debug!(missing = ?missing, "Upload is missing expected headers");
        Err(IntakeError::MissingHeaders(
            missing.into_iter().map(str::to_string).collect(),
        ))
    }
}

/// Check a parsed table's header row against `expected`
pub fn validate_headers(
    table: &ParsedTable,
    expected: &BTreeSet<String>,
) -> Result<NormalizedHeaders, IntakeError> {
    validate_header_names(table.columns(), expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Farmer Name"), "farmer_name");
        assert_eq!(normalize_header("  phone   number\t"), "phone_number");
        assert_eq!(normalize_header("REG_NO"), "reg_no");
        assert_eq!(normalize_header("Date of\nBirth"), "date_of_birth");
        assert_eq!(normalize_header("   "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["Farmer Name", " a  B c ", "x_y", "Ñame Full", ""] {
            let once = normalize_header(raw);
            assert_eq!(normalize_header(&once), once);
        }
    }

    #[test]
    fn test_matching_headers_return_full_normalized_set() {
        let headers =
            validate_header_names(["Farmer Name", "phone number"], &fields(&["farmer_name", "phone_number"]))
                .unwrap();
        assert_eq!(
            headers.as_set(),
            ["farmer_name", "phone_number"].into_iter().collect()
        );
    }

    #[test]
    fn test_extra_columns_are_kept() {
        let headers = validate_header_names(["State", "LGA", "Ward"], &fields(&["state"])).unwrap();
        assert_eq!(headers.into_vec(), vec!["state", "lga", "ward"]);
    }

    #[test]
    fn test_single_missing_field() {
        let err = validate_header_names(["state"], &fields(&["reg_no", "state"])).unwrap_err();
        assert_eq!(err, IntakeError::MissingHeaders(vec!["reg_no".to_string()]));
    }

    #[test]
    fn test_all_missing_fields_reported() {
        let expected = fields(&["state", "lga", "reg_no", "farmer_name"]);
        let err = validate_header_names(["Farmer Name", "ward"], &expected).unwrap_err();
        assert_eq!(
            err.missing_fields().unwrap(),
            &["lga".to_string(), "reg_no".to_string(), "state".to_string()]
        );
    }

    #[test]
    fn test_duplicate_headers_collapse() {
        let headers = NormalizedHeaders::from_raw(["State", "state ", "STATE"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_empty_expected_accepts_anything() {
        assert!(validate_header_names(Vec::<String>::new(), &BTreeSet::new()).is_ok());
    }

    #[test]
    fn test_validate_headers_on_table() {
        let table = ParsedTable::new(vec!["Reg No".to_string(), "State".to_string()], Vec::new());
        let headers = validate_headers(&table, &fields(&["reg_no"])).unwrap();
        assert!(headers.contains("state"));
    }
}
