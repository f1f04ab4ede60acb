//! Wire model for `POST /api/v1/proxy`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::proof::ProofBundle;

pub const DEFAULT_METHOD: &str = "POST";

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

/// Proof-carrying request for a privileged action.
///
/// `request_body` is the action payload itself; the gateway recomputes its
/// commitment rather than trusting `public_signals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    pub resource_id: u64,
    #[serde(flatten)]
    pub proof_bundle: ProofBundle,
    /// Path on the downstream system, e.g. `/repos/owner/repo/contents/file.md`.
    pub target_endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub request_body: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_wire_request() {
        let raw = json!({
            "resourceId": 1,
            "proof": {"A": ["1", "2"], "protocol": "plonk"},
            "publicSignals": ["1", "42"],
            "targetEndpoint": "/repos/acme/demo/contents/hello.md",
            "method": "PUT",
            "requestBody": {"message": "hi", "content": "aGk="}
        });
        let req: AuthorizationRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(req.resource_id, 1);
        assert_eq!(req.proof_bundle.public_signals, vec!["1", "42"]);
        assert_eq!(req.proof_bundle.proof["protocol"], "plonk");
        assert_eq!(req.method, "PUT");
        assert_eq!(req.request_body["content"], "aGk=");
    }

    #[test]
    fn test_method_defaults_to_post() {
        let raw = json!({
            "resourceId": 1,
            "proof": {},
            "publicSignals": [],
            "targetEndpoint": "/x",
            "requestBody": null
        });
        let req: AuthorizationRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(req.method, "POST");
    }

    #[test]
    fn test_missing_fields_rejected() {
        let without_proof = json!({
            "resourceId": 1,
            "publicSignals": [],
            "targetEndpoint": "/x",
            "requestBody": {}
        });
        assert!(serde_json::from_value::<AuthorizationRequest>(without_proof).is_err());

        let string_resource = json!({
            "resourceId": "1",
            "proof": {},
            "publicSignals": [],
            "targetEndpoint": "/x",
            "requestBody": {}
        });
        assert!(serde_json::from_value::<AuthorizationRequest>(string_resource).is_err());
    }

    #[test]
    fn test_serializes_flat_camel_case() {
        let req = AuthorizationRequest {
            resource_id: 7,
            proof_bundle: ProofBundle {
                proof: json!({"tag": "ab"}),
                public_signals: vec!["7".into(), "9".into()],
            },
            target_endpoint: "/x".into(),
            method: "PATCH".into(),
            request_body: json!({"k": "v"}),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["resourceId"], 7);
        assert_eq!(v["proof"], json!({"tag": "ab"}));
        assert_eq!(v["publicSignals"], json!(["7", "9"]));
        assert_eq!(v["targetEndpoint"], "/x");
        assert_eq!(v["requestBody"], json!({"k": "v"}));
        assert!(v.get("proofBundle").is_none());
    }
}
