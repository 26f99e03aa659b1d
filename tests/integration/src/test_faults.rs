//! Fault mapping tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{Fixture, envelope, post_event, wsdl_event};

    fn assert_fault(body: &str, code: &str, message: &str) {
        assert!(body.contains(&format!("<faultcode>soap:{code}</faultcode>")), "{body}");
        assert!(body.contains(message), "{body}");
    }

    #[tokio::test]
    async fn test_should_return_404_for_unknown_service() {
        let handler = Fixture::new().handler();
        for event in [
            wsdl_event("/billing"),
            post_event("/billing", &envelope("<Add/>")),
        ] {
            let resp = handler.handle(event).await;
            assert_eq!(resp.status_code, 404);
            assert_fault(&resp.body, "Client", "Service not found");
        }
    }

    #[tokio::test]
    async fn test_should_return_404_for_root_path() {
        let resp = Fixture::new().handler().handle(wsdl_event("/")).await;
        assert_eq!(resp.status_code, 404);
    }

    #[tokio::test]
    async fn test_should_return_501_for_unknown_operation() {
        let fixture = Fixture::new();
        let resp = fixture
            .handler()
            .handle(post_event("/inventory", &envelope("<Audit><sku>A</sku></Audit>")))
            .await;
        assert_eq!(resp.status_code, 501);
        assert_fault(&resp.body, "Server", "Operation didn");
        assert_eq!(fixture.call_count(), 0);
    }

    #[tokio::test]
    async fn test_should_return_400_without_invoking_on_unparseable_body() {
        let fixture = Fixture::new();
        let handler = fixture.handler();
        let empty_body = envelope("");
        for body in [
            "",
            "definitely not xml",
            "<soap:Envelope><soap:Body><Reserve>",
            "<Reserve><sku>A</sku></Reserve>",
            empty_body.as_str(),
        ] {
            let resp = handler.handle(post_event("/inventory", body)).await;
            assert_eq!(resp.status_code, 400, "{body:?}");
            assert_fault(&resp.body, "Client", "");
        }
        assert_eq!(fixture.call_count(), 0);
    }

    #[tokio::test]
    async fn test_should_reject_doctype_without_invoking() {
        let fixture = Fixture::new();
        let body = r#"<?xml version="1.0"?><!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]><soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><Reserve><sku>&xxe;</sku></Reserve></soap:Body></soap:Envelope>"#;
        let resp = fixture.handler().handle(post_event("/inventory", body)).await;
        assert_eq!(resp.status_code, 400);
        assert!(resp.body.contains("DOCTYPE"));
        assert_eq!(fixture.call_count(), 0);
    }

    #[tokio::test]
    async fn test_should_keep_status_of_operation_fault() {
        let resp = Fixture::new()
            .handler()
            .handle(post_event("/calculator", &envelope("<Divide><a>1</a><b>0</b></Divide>")))
            .await;
        assert_eq!(resp.status_code, 400);
        assert_fault(&resp.body, "Client", "Division by zero");
    }

    #[tokio::test]
    async fn test_should_map_foreign_errors_to_500() {
        let resp = Fixture::new()
            .handler()
            .handle(post_event("/calculator", &envelope("<Crash/>")))
            .await;
        assert_eq!(resp.status_code, 500);
        assert_fault(&resp.body, "Server", "database unavailable");
        assert!(resp.body.contains("<statusCode>500</statusCode>"));
    }

    #[tokio::test]
    async fn test_should_return_500_when_result_cannot_be_rendered() {
        let resp = Fixture::new()
            .handler()
            .handle(post_event("/calculator", &envelope("<Scalar/>")))
            .await;
        assert_eq!(resp.status_code, 500);
        assert_fault(&resp.body, "Server", "Failed to render SOAP response");
    }

    #[tokio::test]
    async fn test_should_return_405_for_unrouted_verbs() {
        let handler = Fixture::new().handler();
        for method in ["PUT", "DELETE", "PATCH", "GET"] {
            let resp = handler
                .handle(json!({ "path": "/calculator", "httpMethod": method }))
                .await;
            assert_eq!(resp.status_code, 405, "{method}");
            assert_fault(&resp.body, "Client", &format!("Method Not Allowed: {method}"));
        }
    }

    #[tokio::test]
    async fn test_should_return_400_for_malformed_event() {
        let handler = Fixture::new().handler();
        let resp = handler.handle(json!({ "path": 42 })).await;
        assert_eq!(resp.status_code, 400);
        assert_fault(&resp.body, "Client", "Malformed event");
    }

    #[tokio::test]
    async fn test_should_always_return_xml_content_type() {
        let handler = Fixture::new().handler();
        let resp = handler.handle(json!(null)).await;
        assert_eq!(resp.headers["Content-Type"], "application/xml");
        assert!(!resp.body.is_empty());
        soapstack_xml::check_well_formed(&resp.body).unwrap();
    }
}
