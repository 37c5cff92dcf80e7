//! Structured URI validation

use crate::descriptor::UriConstraint;
use crate::outcome::{type_name, ConstraintFault, EvaluationResult};
use crate::uri::{is_valid_scheme, DecomposedUri};
use log::debug;
use serde_json::Value;

const CONSTRAINT: &str = "uri";

/// Null is valid; strings must parse as URIs and match every restriction
pub fn evaluate(descriptor: &UriConstraint, value: &Value) -> EvaluationResult {
    let text = match value {
        Value::Null => return EvaluationResult::Valid,
        Value::String(s) => s,
        other => {
            return ConstraintFault::UnsupportedType {
                constraint: CONSTRAINT,
                found: type_name(other).to_string(),
            }
            .into()
        }
    };

    if let Err(fault) = validate_allow_lists(descriptor) {
        return fault.into();
    }

    let uri = match DecomposedUri::parse(text) {
        Ok(uri) => uri,
        Err(e) => {
            debug!("'{}' is not a URI: {}", text, e);
            return EvaluationResult::Invalid;
        }
    };

    EvaluationResult::from_bool(matches(descriptor, &uri))
}

/// Allow-list entries must be usable: schemes well formed, no empty parts
pub fn validate_allow_lists(descriptor: &UriConstraint) -> Result<(), ConstraintFault> {
    for scheme in descriptor.schemes.iter().flatten() {
        if !is_valid_scheme(scheme) {
            return Err(ConstraintFault::InvalidAllowList(format!(
                "scheme '{}' is not a valid scheme name",
                scheme
            )));
        }
    }
    if descriptor.ssp.iter().any(|ssp| ssp.as_deref() == Some("")) {
        return Err(ConstraintFault::InvalidAllowList(
            "scheme-specific part must not be empty; use null to allow its absence".to_string(),
        ));
    }
    Ok(())
}

fn matches(descriptor: &UriConstraint, uri: &DecomposedUri) -> bool {
    let scheme_ok = allowed(&descriptor.schemes, uri.scheme.as_ref(), |a, b| {
        a.eq_ignore_ascii_case(b)
    });
    if !scheme_ok {
        debug!("scheme {:?} not in {:?}", uri.scheme, descriptor.schemes);
        return false;
    }

    if !allowed(&descriptor.ssp, uri.scheme_specific_part.as_ref(), |a, b| a == b) {
        debug!(
            "scheme-specific part {:?} not in {:?}",
            uri.scheme_specific_part, descriptor.ssp
        );
        return false;
    }

    if !allowed(&descriptor.port, uri.port.as_ref(), |a, b| a == b) {
        debug!("port {:?} not in {:?}", uri.port, descriptor.port);
        return false;
    }

    let required = [
        (descriptor.requires_path, &uri.path, "path"),
        (descriptor.requires_query, &uri.query, "query"),
        (descriptor.requires_fragment, &uri.fragment, "fragment"),
        (descriptor.requires_user_info, &uri.user_info, "user info"),
    ];
    for (needed, part, name) in required {
        if needed && !part.as_deref().is_some_and(|p| !p.is_empty()) {
            debug!("{} is required", name);
            return false;
        }
    }
    true
}

/// An empty list allows anything. Otherwise a present part must match an
/// entry and an absent one needs a `None` entry.
fn allowed<T>(list: &[Option<T>], actual: Option<&T>, eq: impl Fn(&T, &T) -> bool) -> bool {
    if list.is_empty() {
        return true;
    }
    match actual {
        Some(actual) => list.iter().flatten().any(|entry| eq(entry, actual)),
        None => list.iter().any(Option::is_none),
    }
}
