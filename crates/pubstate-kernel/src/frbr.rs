//! Frbr: work/expression addressing of legal documents.
//!
//! A *work* is the abstract legal document (an act, a bill, a geometry
//! information object). An *expression* is one version of it in one
//! language on one date. Within a workspace, `(work key, expression
//! version)` is unique.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Legal identifier of a work expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frbr {
    pub work_province_id: String,
    pub work_country: String,
    pub work_date: String,
    pub work_other: String,
    pub expression_language: String,
    pub expression_date: String,
    pub expression_version: u32,
}

/// Document class segment of an AKN work path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkClass {
    Act,
    Bill,
    Doc,
}

impl WorkClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Act => "act",
            Self::Bill => "bill",
            Self::Doc => "doc",
        }
    }
}

/// The work part of a [`Frbr`]: everything except the expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkKey {
    pub province_id: String,
    pub country: String,
    pub date: String,
    pub other: String,
}

impl fmt::Display for WorkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.country, self.province_id, self.date, self.other)
    }
}

impl Frbr {
    pub fn work_key(&self) -> WorkKey {
        WorkKey {
            province_id: self.work_province_id.clone(),
            country: self.work_country.clone(),
            date: self.work_date.clone(),
            other: self.work_other.clone(),
        }
    }

    pub fn same_work(&self, other: &Frbr) -> bool {
        self.work_key() == other.work_key()
    }

    /// Work path, e.g. `/akn/nl/act/pv28/2024/omgevingsvisie`.
    pub fn work_uri(&self, class: WorkClass) -> String {
        format!(
            "/akn/{}/{}/{}/{}/{}",
            self.work_country,
            class.as_str(),
            self.work_province_id,
            self.work_date,
            self.work_other
        )
    }

    /// Expression path, e.g. `/akn/nl/act/pv28/2024/omgevingsvisie/nld@2024-03-01;2`.
    pub fn expression_uri(&self, class: WorkClass) -> String {
        format!(
            "{}/{}@{};{}",
            self.work_uri(class),
            self.expression_language,
            self.expression_date,
            self.expression_version
        )
    }

    /// The next expression of the same work.
    pub fn next_expression(&self, expression_date: impl Into<String>) -> Frbr {
        Frbr {
            expression_date: expression_date.into(),
            expression_version: self.expression_version + 1,
            ..self.clone()
        }
    }

    /// Check the invariants a freshly assigned identifier must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.expression_version < 1 {
            return Err(format!(
                "{}: expression version must be >= 1",
                self.work_key()
            ));
        }
        if self.work_other.trim().is_empty() {
            return Err(format!("{}: empty work-other", self.work_key()));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_frbr(work_other: &str, version: u32) -> Frbr {
    Frbr {
        work_province_id: "pv28".to_string(),
        work_country: "nl".to_string(),
        work_date: "2024".to_string(),
        work_other: work_other.to_string(),
        expression_language: "nld".to_string(),
        expression_date: "2024-03-01".to_string(),
        expression_version: version,
    }
}
