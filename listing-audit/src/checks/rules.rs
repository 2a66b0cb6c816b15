//! Rule-based checks
//!
//! Pure functions over the normalized record; no external calls.

use crate::record::{Field, ListingRecord};
use crate::types::{CheckContext, CheckError, CheckName, CheckOutcome, ListingCheck};
use async_trait::async_trait;

/// Most categories a listing may carry (primary included)
pub const MAX_CATEGORIES: usize = 3;

/// Most service areas a listing may declare
pub const MAX_SERVICE_AREAS: usize = 5;

/// True when primary + additional categories exceed [`MAX_CATEGORIES`]
pub fn category_overload(record: &ListingRecord) -> CheckOutcome {
    match &record.additional_categories {
        Field::Absent => CheckOutcome::not_applicable(),
        Field::Malformed(reason) => {
            CheckOutcome::indeterminate(format!("additional_categories: {}", reason))
        }
        Field::Value(additional) => CheckOutcome::from_bool(1 + additional.len() > MAX_CATEGORIES),
    }
}

/// True when more than [`MAX_SERVICE_AREAS`] service areas are declared
pub fn excess_service_areas(record: &ListingRecord) -> CheckOutcome {
    match &record.service_areas {
        Field::Absent => CheckOutcome::not_applicable(),
        Field::Malformed(reason) => CheckOutcome::indeterminate(format!("service_areas: {}", reason)),
        Field::Value(areas) => CheckOutcome::from_bool(areas.len() > MAX_SERVICE_AREAS),
    }
}

/// True when any of hours, website, or description is missing or blank
pub fn missing_operational_info(record: &ListingRecord) -> CheckOutcome {
    let hours = presence(&record.regular_hours, |h| !h.is_empty());
    let website = presence(&record.website_uri, |s| !s.trim().is_empty());
    let description = presence(&record.description, |s| !s.trim().is_empty());
    let inputs = [hours, website, description];

    if inputs.iter().all(|p| *p == Presence::Absent) {
        return CheckOutcome::not_applicable();
    }
    if inputs
        .iter()
        .any(|p| matches!(p, Presence::Absent | Presence::Blank))
    {
        return CheckOutcome::from_bool(true);
    }
    if inputs.iter().any(|p| *p == Presence::Malformed) {
        return CheckOutcome::indeterminate("operational info partially malformed");
    }
    CheckOutcome::from_bool(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Absent,
    Malformed,
    Blank,
    Filled,
}

fn presence<T>(field: &Field<T>, filled: impl Fn(&T) -> bool) -> Presence {
    match field {
        Field::Absent => Presence::Absent,
        Field::Malformed(_) => Presence::Malformed,
        Field::Value(v) if filled(v) => Presence::Filled,
        Field::Value(_) => Presence::Blank,
    }
}

// ============================================================================
// ListingCheck adapters
// ============================================================================

/// More than three categories
pub struct CategoryOverloadCheck;

#[async_trait]
impl ListingCheck for CategoryOverloadCheck {
    fn name(&self) -> CheckName {
        CheckName::CategoryOverload
    }

    async fn evaluate(
        &self,
        record: &ListingRecord,
        _ctx: &CheckContext,
    ) -> Result<CheckOutcome, CheckError> {
        Ok(category_overload(record))
    }
}

/// More than five service areas
pub struct ExcessServiceAreasCheck;

#[async_trait]
impl ListingCheck for ExcessServiceAreasCheck {
    fn name(&self) -> CheckName {
        CheckName::ExcessServiceAreas
    }

    async fn evaluate(
        &self,
        record: &ListingRecord,
        _ctx: &CheckContext,
    ) -> Result<CheckOutcome, CheckError> {
        Ok(excess_service_areas(record))
    }
}

/// Missing hours, website, or description
pub struct MissingOperationalInfoCheck;

#[async_trait]
impl ListingCheck for MissingOperationalInfoCheck {
    fn name(&self) -> CheckName {
        CheckName::MissingOperationalInfo
    }

    async fn evaluate(
        &self,
        record: &ListingRecord,
        _ctx: &CheckContext,
    ) -> Result<CheckOutcome, CheckError> {
        Ok(missing_operational_info(record))
    }
}
