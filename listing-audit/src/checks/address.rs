//! Address Authenticity Checker
//!
//! Two interchangeable strategies selected by configuration:
//! - validation: structured components in, confidence signals out; the
//!   address is fake when the service could not confirm every component
//! - autocomplete: free-text query in, suggestions out; the address is fake
//!   when no suggestion shares a meaningful fragment with the query

use crate::clients::{AddressAutocomplete, AddressComponents, AddressSuggestion, AddressValidator};
use crate::record::{AddressFields, Field, ListingRecord};
use crate::types::{CheckContext, CheckError, CheckName, CheckOutcome, ListingCheck};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Query fragments this short never count as a match
const MIN_MATCH_LEN: usize = 3;

/// Address collaborator for the configured strategy
#[derive(Clone)]
pub enum AddressBackend {
    Validation(Arc<dyn AddressValidator>),
    Autocomplete(Arc<dyn AddressAutocomplete>),
}

impl AddressBackend {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            AddressBackend::Validation(_) => "validation",
            AddressBackend::Autocomplete(_) => "autocomplete",
        }
    }

    /// Whether the request carries the sublocality
    pub fn sends_sublocality(&self) -> bool {
        matches!(self, AddressBackend::Validation(_))
    }
}

/// Address that cannot be matched to a real place
pub struct FakeAddressCheck {
    backend: AddressBackend,
}

impl FakeAddressCheck {
    pub fn new(backend: AddressBackend) -> Self {
        Self { backend }
    }
}

/// Structured components when the address is checkable
///
/// The precondition is evaluated first: `Ok(None)` when the region code is
/// absent or blank, or nothing besides it is present. `Err(reason)` when a
/// component the request would carry is malformed; `sublocality` is only
/// carried when `with_sublocality` is set.
pub fn address_components(
    address: &AddressFields,
    with_sublocality: bool,
) -> Result<Option<AddressComponents>, String> {
    let region_code = match &address.region_code {
        Field::Malformed(reason) => return Err(format!("region_code: {}", reason)),
        field => match field.non_blank() {
            Some(region_code) => region_code.to_string(),
            None => return Ok(None),
        },
    };

    let lines = match &address.address_lines {
        Field::Malformed(reason) => return Err(format!("address_lines: {}", reason)),
        Field::Absent => Vec::new(),
        Field::Value(lines) => lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
    };
    let mut carried = vec![
        ("locality", &address.locality),
        ("administrative_area", &address.administrative_area),
        ("postal_code", &address.postal_code),
    ];
    if with_sublocality {
        carried.push(("sublocality", &address.sublocality));
    }
    for (name, field) in carried {
        if let Field::Malformed(reason) = field {
            return Err(format!("{}: {}", name, reason));
        }
    }

    let owned = |field: &Field<String>| field.non_blank().map(str::to_string);
    let components = AddressComponents {
        address_lines: lines,
        locality: owned(&address.locality),
        administrative_area: owned(&address.administrative_area),
        sublocality: if with_sublocality {
            owned(&address.sublocality)
        } else {
            None
        },
        postal_code: owned(&address.postal_code),
        region_code,
    };

    let has_detail = !components.address_lines.is_empty()
        || components.locality.is_some()
        || components.administrative_area.is_some()
        || components.postal_code.is_some();
    Ok(has_detail.then_some(components))
}

/// Comma-joined free-text query for the autocomplete service
pub fn autocomplete_query(components: &AddressComponents) -> String {
    let lines = components.address_lines.join(" ");
    [
        Some(lines.as_str()),
        components.locality.as_deref(),
        components.administrative_area.as_deref(),
        components.postal_code.as_deref(),
        Some(components.region_code.as_str()),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect::<Vec<_>>()
    .join(",")
}

/// Whether any suggestion contains a meaningful fragment of the query
pub fn suggestions_match(query: &str, suggestions: &[AddressSuggestion]) -> bool {
    let query = query.to_lowercase();
    let parts: Vec<&str> = query
        .split(',')
        .map(str::trim)
        .filter(|part| part.chars().count() >= MIN_MATCH_LEN)
        .collect();

    suggestions.iter().any(|suggestion| {
        let description = suggestion.description.to_lowercase();
        parts.iter().any(|part| description.contains(part))
    })
}

#[async_trait]
impl ListingCheck for FakeAddressCheck {
    fn name(&self) -> CheckName {
        CheckName::FakeAddress
    }

    async fn evaluate(
        &self,
        record: &ListingRecord,
        ctx: &CheckContext,
    ) -> Result<CheckOutcome, CheckError> {
        let components = match address_components(
            &record.address,
            self.backend.sends_sublocality(),
        ) {
            Err(reason) => return Ok(CheckOutcome::indeterminate(reason)),
            Ok(None) => return Ok(CheckOutcome::from_bool(false)),
            Ok(Some(components)) => components,
        };

        match &self.backend {
            AddressBackend::Validation(validator) => {
                let signals = validator.validate(&components).await?;
                debug!(
                    listing_id = %ctx.listing_id,
                    validator = validator.name(),
                    unconfirmed = signals.has_unconfirmed_components,
                    complete = signals.address_complete,
                    "Address validation signals"
                );
                let mut diagnostic = format!("address_complete={}", signals.address_complete);
                if let Some(formatted) = &signals.formatted_address {
                    diagnostic.push_str(&format!(", formatted={}", formatted));
                }
                if !signals.missing_component_types.is_empty() {
                    diagnostic.push_str(&format!(
                        ", missing={}",
                        signals.missing_component_types.join("|")
                    ));
                }
                Ok(CheckOutcome::from_bool(signals.has_unconfirmed_components)
                    .with_diagnostic(diagnostic))
            }
            AddressBackend::Autocomplete(autocomplete) => {
                let query = autocomplete_query(&components);
                let suggestions = autocomplete.suggest(&query).await?;
                debug!(
                    listing_id = %ctx.listing_id,
                    autocomplete = autocomplete.name(),
                    suggestions = suggestions.len(),
                    "Address autocomplete suggestions"
                );
                if suggestions.is_empty() {
                    return Ok(CheckOutcome::from_bool(true)
                        .with_diagnostic("no suggestions for address"));
                }
                Ok(CheckOutcome::from_bool(!suggestions_match(
                    &query,
                    &suggestions,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> AddressFields {
        AddressFields {
            address_lines: Field::Value(vec!["999 Nonexistent Blvd".into()]),
            locality: Field::Value("Faketown".into()),
            administrative_area: Field::Value("ZZ".into()),
            sublocality: Field::Absent,
            postal_code: Field::Value("99999".into()),
            region_code: Field::Value("US".into()),
        }
    }

    fn suggestion(description: &str) -> AddressSuggestion {
        AddressSuggestion {
            description: description.into(),
            place_id: None,
        }
    }

    #[test]
    fn test_query_format() {
        let components = address_components(&fields(), false).unwrap().unwrap();
        assert_eq!(
            autocomplete_query(&components),
            "999 Nonexistent Blvd,Faketown,ZZ,99999,US"
        );
    }

    #[test]
    fn test_precondition_requires_region_and_detail() {
        let mut f = fields();
        f.region_code = Field::Value("  ".into());
        assert_eq!(address_components(&f, true), Ok(None));

        let mut f = AddressFields::default();
        f.region_code = Field::Value("US".into());
        assert_eq!(address_components(&f, true), Ok(None));

        f.postal_code = Field::Value("10001".into());
        assert!(matches!(address_components(&f, true), Ok(Some(_))));
    }

    #[test]
    fn test_malformed_lines_rejected() {
        let mut f = fields();
        f.address_lines = Field::Malformed("not a list".into());
        assert!(address_components(&f, true).is_err());
    }

    #[test]
    fn test_missing_region_wins_over_malformed_component() {
        let mut f = fields();
        f.region_code = Field::Absent;
        f.locality = Field::Malformed("expected text".into());
        assert_eq!(address_components(&f, true), Ok(None));
    }

    #[test]
    fn test_sublocality_only_matters_when_sent() {
        let mut f = fields();
        f.sublocality = Field::Malformed("expected text".into());

        let components = address_components(&f, false).unwrap().unwrap();
        assert_eq!(components.sublocality, None);
        assert_eq!(
            address_components(&f, true),
            Err("sublocality: expected text".to_string())
        );
    }

    #[test]
    fn test_short_parts_never_match() {
        let query = "999 Nonexistent Blvd,Faketown,ZZ,99999,US";
        assert!(!suggestions_match(query, &[suggestion("ZZ Top Road, US")]));
        assert!(suggestions_match(
            query,
            &[suggestion("Faketown Mall, Springfield")]
        ));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert!(suggestions_match(
            "12 High St,London,GB",
            &[suggestion("12 HIGH ST, LONDON, UK")]
        ));
    }
}
