//! The `tests` namespace: test-submission queries and cheating reports.

use crate::endpoint::{EndpointDescriptor, Registry, RegistryError, Shaped};
use crate::request::RequestSpec;
use crate::tag::Tag;
use serde_json::Value;

/// `GET /tests/my-submissions`
pub const MY_SUBMISSIONS: &str = "tests.mySubmissions";
/// `POST /cheating-attempt`
pub const REPORT_CHEATING: &str = "tests.reportCheating";

/// Registers the test-submission endpoints.
pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(
        EndpointDescriptor::query(MY_SUBMISSIONS, |_| Ok(RequestSpec::get("/tests/my-submissions")))
            .transform(|raw| {
                if raw.is_array() {
                    Ok(Shaped::Valid(raw))
                } else {
                    Ok(Shaped::Defaulted(Value::Array(Vec::new())))
                }
            })
            .provides(|_, _| vec![Tag::of("TestSubmissions")]),
    )?;

    // Fire-and-record: a cheating report changes nothing the cache holds.
    registry.register(
        EndpointDescriptor::mutation(REPORT_CHEATING, |args| {
            Ok(RequestSpec::post("/cheating-attempt").json(args.clone()))
        })
        .invalidates(|_| vec![]),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registration() {
        let mut registry = Registry::new();
        register(&mut registry).expect("register");

        let descriptor = registry.get_query(MY_SUBMISSIONS).expect("query");
        let spec = descriptor.build_request(&Value::Null).expect("request");
        assert_eq!(spec.path, "/tests/my-submissions");
        assert_eq!(
            descriptor.provided_tags(&Value::Null, &Value::Null),
            vec![Tag::of("TestSubmissions")]
        );
        assert_eq!(
            descriptor.shape_response(json!({"oops": 1})).expect("shape"),
            Shaped::Defaulted(json!([]))
        );
    }

    #[test]
    fn test_report_cheating_posts_payload_without_invalidation() {
        let mut registry = Registry::new();
        register(&mut registry).expect("register");

        let descriptor = registry.get_mutation(REPORT_CHEATING).expect("mutation");
        let args = json!({"testId": "T1", "reason": "tab-switch"});
        let spec = descriptor.build_request(&args).expect("request");
        assert_eq!(spec.method, reqwest::Method::POST);
        assert_eq!(spec.path, "/cheating-attempt");
        assert_eq!(spec.body, Some(args.clone()));
        assert!(descriptor.invalidated_tags(&args).is_empty());
    }
}
