//! Operation dispatch tests.

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    use crate::{Fixture, envelope, envelope_12, post_event};

    #[tokio::test]
    async fn test_should_invoke_operation_and_render_result() {
        let handler = Fixture::new().handler();
        let resp = handler
            .handle(post_event(
                "/calculator",
                &envelope(r#"<m:Add xmlns:m="urn:calc"><m:a>1</m:a><m:b>2</m:b></m:Add>"#),
            ))
            .await;
        assert_eq!(resp.status_code, 200);
        assert!(resp.body.contains("<soap:Body><AddResponse><result>3</result></AddResponse></soap:Body>"));
    }

    #[tokio::test]
    async fn test_should_accept_soap_12_requests() {
        let handler = Fixture::new().handler();
        let resp = handler
            .handle(post_event(
                "/calculator",
                &envelope_12("<Add><a>20</a><b>22</b></Add>"),
            ))
            .await;
        assert_eq!(resp.status_code, 200);
        assert!(resp.body.contains("<result>42</result>"));
    }

    #[tokio::test]
    async fn test_should_pass_inputs_in_document_order() {
        let fixture = Fixture::new();
        let resp = fixture
            .handler()
            .handle(post_event(
                "/inventory",
                &envelope("<Reserve><sku>A-1</sku><quantity>3</quantity><note>rush</note></Reserve>"),
            ))
            .await;
        assert_eq!(resp.status_code, 200);

        let calls = fixture.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Reserve");
        assert_eq!(calls[0].1, vec![json!("A-1"), json!(3), json!("rush")]);
    }

    #[tokio::test]
    async fn test_should_render_result_unchanged() {
        let handler = Fixture::new().handler();
        let resp = handler
            .handle(post_event(
                "/inventory",
                &envelope("<Release><sku>B-2</sku><sku>B-3</sku></Release>"),
            ))
            .await;
        assert_eq!(resp.status_code, 200);
        assert!(
            resp.body
                .contains("<ReleaseResponse><items>B-2</items><items>B-3</items></ReleaseResponse>")
        );
    }

    #[tokio::test]
    async fn test_should_produce_identical_responses_for_identical_requests() {
        let handler = Fixture::new().handler();
        let event = post_event("/calculator", &envelope("<Add><a>5</a><b>7</b></Add>"));
        let first = handler.handle(event.clone()).await;
        let second = handler.handle(event).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_should_decode_base64_encoded_body() {
        let handler = Fixture::new().handler();
        let body = STANDARD.encode(envelope("<Add><a>1</a><b>1</b></Add>"));
        let resp = handler
            .handle(json!({
                "path": "/calculator",
                "httpMethod": "POST",
                "body": body,
                "isBase64Encoded": true
            }))
            .await;
        assert_eq!(resp.status_code, 200);
        assert!(resp.body.contains("<result>2</result>"));
    }

    #[tokio::test]
    async fn test_should_serve_concurrent_requests() {
        let handler = Fixture::new().handler();
        let requests = (0..16).map(|i| {
            let handler = handler.clone();
            async move {
                handler
                    .handle(post_event(
                        "/calculator",
                        &envelope(&format!("<Add><a>{i}</a><b>1</b></Add>")),
                    ))
                    .await
            }
        });
        let responses = futures::future::join_all(requests).await;
        for (i, resp) in responses.iter().enumerate() {
            assert_eq!(resp.status_code, 200);
            assert!(resp.body.contains(&format!("<result>{}</result>", i + 1)));
        }
    }
}
