//! DSL validator behaviour against the shared registry fixture.

use leadscope_filters::{DslValidator, EntityKind, RangePolicy, SearchTarget, ValidationIssue};
use serde_json::json;

mod support;

fn validator() -> DslValidator {
    DslValidator::new(support::registry())
}

#[test]
fn misplaced_company_filter_moves_to_company_bucket() {
    let result = validator().validate(&json!({
        "contact": { "company_size": 50 },
        "company": {}
    }));

    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        result.issues[0],
        ValidationIssue::BucketPlacement {
            found: EntityKind::Contact,
            target: EntityKind::Company,
            ..
        }
    ));
    assert_eq!(
        result.normalized.to_value(),
        json!({ "contact": {}, "company": { "company_size": { "include": [50] } } })
    );
}

#[test]
fn contact_only_filter_leaves_company_bucket() {
    let result = validator().validate(&json!({
        "company": { "job_title": { "include": ["CTO"] } }
    }));

    assert_eq!(
        result.errors,
        vec!["Filter 'job_title' belongs to the contact bucket, not company".to_string()]
    );
    assert!(result.normalized.company.is_empty());
    assert_eq!(result.normalized.contact["job_title"], json!({ "include": ["CTO"] }));
}

#[test]
fn relocation_does_not_overwrite_existing_entry() {
    let result = validator().validate(&json!({
        "contact": { "job_title": { "include": ["CTO"] } },
        "company": { "job_title": { "include": ["CEO"] } }
    }));

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.normalized.contact["job_title"], json!({ "include": ["CTO"] }));
    assert!(result.normalized.company.is_empty());
}

#[test]
fn location_filters_are_not_relocated() {
    let result = validator().validate(&json!({
        "company": { "countries": { "include": ["Germany"] } }
    }));

    assert!(result.valid, "{:?}", result.errors);
    assert!(result.normalized.company.contains_key("countries"));
}

#[test]
fn missing_range_is_reported() {
    let result = validator().validate(&json!({
        "company": { "annual_revenue": { "include": ["10M"] } }
    }));

    assert!(!result.valid);
    assert!(result
        .errors
        .iter()
        .any(|e| e.contains("Range required for company.annual_revenue")));
    assert!(result.normalized.company.contains_key("annual_revenue"));
}

#[test]
fn drop_policy_removes_rangeless_entry() {
    let result = validator()
        .with_range_policy(RangePolicy::Drop)
        .validate(&json!({ "company": { "annual_revenue": "10M" } }));

    assert!(!result.valid);
    assert!(result.normalized.company.is_empty());
}

#[test]
fn exists_mode_forces_presence_shape() {
    let result = validator().validate(&json!({
        "contact": { "has_email": { "include": ["x"], "presence": "known" } }
    }));

    assert!(result.valid, "{:?}", result.errors);
    assert_eq!(
        result.normalized.contact["has_email"],
        json!({ "presence": "known", "include": [], "exclude": [] })
    );

    let defaulted = validator().validate(&json!({ "contact": { "has_email": true } }));
    assert_eq!(defaulted.normalized.contact["has_email"]["presence"], json!("known"));
}

#[test]
fn unsupported_exclusion_is_cleared_and_reported() {
    let result = validator().validate(&json!({
        "company": { "company_size": { "include": ["11-50"], "exclude": ["1-10"] } }
    }));

    assert!(!result.valid);
    assert_eq!(result.errors, vec!["Exclusion not supported for company.company_size".to_string()]);
    assert_eq!(result.normalized.company["company_size"]["exclude"], json!([]));
    assert_eq!(result.normalized.company["company_size"]["include"], json!(["11-50"]));
}

#[test]
fn malformed_exclusion_on_unsupported_filter_is_cleared() {
    let result = validator().validate(&json!({
        "company": { "company_size": { "include": ["11-50"], "exclude": "1-10" } }
    }));

    assert_eq!(
        result.errors,
        vec!["Invalid value for company.company_size: 'exclude' must be an array".to_string()]
    );
    assert_eq!(
        result.normalized.company["company_size"],
        json!({ "include": ["11-50"], "exclude": [] })
    );
}

#[test]
fn boolean_scalar_becomes_text_include() {
    let result = validator().validate(&json!({
        "contact": { "is_verified": true, "company_size": 50 }
    }));

    assert_eq!(result.normalized.contact["is_verified"], json!({ "include": ["true"] }));
    assert_eq!(result.normalized.company["company_size"], json!({ "include": [50] }));
}

#[test]
fn unknown_filters_are_dropped() {
    let result = validator().validate(&json!({
        "contact": { "favourite_colour": "blue", "job_title": "CTO" }
    }));

    assert_eq!(result.errors, vec!["Unknown filter 'favourite_colour'".to_string()]);
    assert_eq!(result.normalized.contact.len(), 1);
}

#[test]
fn structural_errors_keep_the_value() {
    let result = validator().validate(&json!({
        "contact": { "job_title": { "include": "CTO", "boost": 2 } }
    }));

    assert_eq!(result.issues.len(), 2);
    assert!(result.issues.iter().all(|i| i.kind() == "structure"));
    assert_eq!(result.normalized.contact["job_title"]["include"], json!("CTO"));
}

#[test]
fn alias_and_canonical_keys_validate_identically() {
    let aliased = validator().validate(&json!({ "contact": { "title": { "include": ["CTO"] } } }));
    let canonical =
        validator().validate(&json!({ "contact": { "job_title": { "include": ["CTO"] } } }));

    assert_eq!(aliased.valid, canonical.valid);
    assert_eq!(aliased.errors, canonical.errors);
    assert_eq!(aliased.normalized, canonical.normalized);
}

#[test]
fn alias_colliding_with_canonical_key_is_a_duplicate() {
    let result = validator().validate(&json!({
        "contact": { "job_title": "CTO", "title": "CEO" }
    }));

    assert!(matches!(
        result.issues.as_slice(),
        [ValidationIssue::DuplicateFilter { .. }]
    ));
    assert_eq!(result.normalized.contact.len(), 1);
}

#[test]
fn malformed_buckets_are_reported() {
    let result = validator().validate(&json!({ "contact": [], "company": null }));
    assert_eq!(result.errors, vec!["Bucket 'contact' must be an object".to_string()]);
    assert!(result.normalized.is_empty());

    let result = validator().validate(&json!("contact"));
    assert!(!result.valid);
}

#[test]
fn normalized_output_keeps_filters_in_their_buckets() {
    let registry = support::registry();
    let result = DslValidator::new(registry.clone()).validate(&json!({
        "contact": { "company_size": 10, "industry": ["SaaS"], "annual_revenue": { "range": { "min": 1 } } },
        "company": { "job_title": "CTO", "seniority": "vp", "industry": "Fintech" }
    }));

    for entity in EntityKind::ALL {
        for id in result.normalized.bucket(entity).keys() {
            let def = registry.get(id).unwrap();
            assert!(def.applies_to(entity), "{} left in {}", id, entity);
        }
    }
}

#[test]
fn second_pass_is_clean() {
    let validator = validator();
    let first = validator.validate(&json!({
        "contact": { "company_size": 50, "title": "CTO", "has_email": { "include": ["x"] } },
        "company": { "company_size": { "include": ["1-10"], "exclude": ["5000+"] } }
    }));
    assert!(!first.valid);

    let second = validator.validate_dsl(&first.normalized);
    assert!(second.valid, "{:?}", second.errors);
    assert_eq!(second.normalized, first.normalized);
}

#[test]
fn job_title_in_contact_bucket_targets_contacts() {
    let validator = validator();
    let result = validator.validate(&json!({
        "contact": { "job_title": { "include": ["CTO"] } },
        "company": { "industry": "SaaS", "company_size": "51-200" }
    }));
    assert_eq!(validator.detect_entity(&result.normalized), SearchTarget::Contacts);

    let result = validator.validate(&json!({ "company": { "industry": "SaaS" } }));
    assert_eq!(validator.detect_entity(&result.normalized), SearchTarget::Companies);

    let result = validator.validate(&json!({ "company": { "industry": "SaaS" }, "contact": { "seniority": "vp" } }));
    assert_eq!(validator.detect_entity(&result.normalized), SearchTarget::Contacts);

    let result = validator.validate(&json!({}));
    assert_eq!(validator.detect_entity(&result.normalized), SearchTarget::Contacts);
}

#[test]
fn strict_returns_errors_when_invalid() {
    let result = validator().validate(&json!({ "contact": { "nope": 1 } }));
    assert_eq!(result.strict().unwrap_err(), vec!["Unknown filter 'nope'".to_string()]);

    let ok = validator().validate(&json!({ "contact": { "job_title": "CTO" } }));
    assert_eq!(ok.strict().unwrap().contact["job_title"], json!({ "include": ["CTO"] }));
}
