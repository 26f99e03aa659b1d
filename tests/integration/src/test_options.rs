//! Server option tests: authorization, event parsing and custom collaborators.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};
    use soapstack_core::{Fault, HandlerOptions, ServerOptions, event_header};
    use soapstack_xml::{
        RequestParser, ResponseBuilderOptions, SOAP_12_NAMESPACE, SoapVersion,
    };

    use crate::{Fixture, envelope, post_event, wsdl_event};

    #[tokio::test]
    async fn test_should_forbid_every_request_when_unauthorized() {
        let fixture = Fixture::with_options(
            ServerOptions::builder()
                .authorize(Arc::new(|_: &Value| false))
                .build(),
        );
        let handler = fixture.handler();
        for event in [
            wsdl_event("/calculator"),
            wsdl_event("/unknown"),
            json!({ "path": "/calculator" }),
            post_event("/inventory", &envelope("<Reserve><sku>A</sku></Reserve>")),
        ] {
            let resp = handler.handle(event).await;
            assert_eq!(resp.status_code, 403);
            assert!(resp.body.contains("Access Forbidden"));
            assert!(!resp.body.contains("definitions"));
        }
        assert_eq!(fixture.call_count(), 0);
    }

    #[tokio::test]
    async fn test_should_authorize_by_header() {
        let fixture = Fixture::with_options(
            ServerOptions::builder()
                .authorize(Arc::new(|event: &Value| {
                    event_header(event, "authorization") == Some("Bearer token")
                }))
                .build(),
        );
        let handler = fixture.handler();

        let mut event = wsdl_event("/calculator");
        assert_eq!(handler.handle(event.clone()).await.status_code, 403);

        event["headers"] = json!({ "Authorization": "Bearer token" });
        assert_eq!(handler.handle(event).await.status_code, 200);
    }

    #[tokio::test]
    async fn test_should_apply_event_parser_before_decoding() {
        let fixture = Fixture::with_options(
            ServerOptions::builder()
                .event_parser(Arc::new(|mut raw: Value| {
                    if let Some(route) = raw.get("rawPath").cloned() {
                        raw["path"] = route;
                    }
                    if let Some(method) = raw.pointer("/requestContext/http/method").cloned() {
                        raw["httpMethod"] = method;
                    }
                    raw
                }))
                .build(),
        );
        let resp = fixture
            .handler()
            .handle(json!({
                "rawPath": "/calculator",
                "requestContext": { "http": { "method": "POST" } },
                "body": envelope("<Add><a>2</a><b>3</b></Add>")
            }))
            .await;
        assert_eq!(resp.status_code, 200);
        assert!(resp.body.contains("<result>5</result>"));
    }

    #[tokio::test]
    async fn test_should_render_soap_12_envelopes_when_configured() {
        let fixture = Fixture::with_options(
            ServerOptions::builder()
                .response_builder_options(
                    ResponseBuilderOptions::builder()
                        .version(SoapVersion::Soap12)
                        .build(),
                )
                .build(),
        );
        let handler = fixture.handler();

        let ok = handler
            .handle(post_event("/calculator", &envelope("<Add><a>1</a><b>1</b></Add>")))
            .await;
        assert!(ok.body.contains(SOAP_12_NAMESPACE));

        let fault = handler
            .handle(post_event("/calculator", &envelope("<Missing/>")))
            .await;
        assert_eq!(fault.status_code, 501);
        assert!(fault.body.contains("<soap:Value>soap:Receiver</soap:Value>"));
    }

    #[derive(Debug, Default)]
    struct CountingParser {
        calls: AtomicUsize,
    }

    impl RequestParser for CountingParser {
        fn parse(&self, _body: &str) -> Result<soapstack_core::OperationDescriptor, Fault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(soapstack_core::fault!(UNPROCESSABLE_ENTITY, "custom parser rejected"))
        }
    }

    #[tokio::test]
    async fn test_should_use_custom_parser_status() {
        let parser = Arc::new(CountingParser::default());
        let fixture = Fixture::with_options(
            ServerOptions::builder()
                .request_parser(Arc::clone(&parser) as Arc<dyn RequestParser>)
                .build(),
        );
        let handler = fixture.handler();

        let resp = handler
            .handle(post_event("/inventory", &envelope("<Reserve/>")))
            .await;
        assert_eq!(resp.status_code, 422);
        assert!(resp.body.contains("custom parser rejected"));
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.call_count(), 0);

        // WSDL requests never reach the parser.
        handler.handle(wsdl_event("/inventory")).await;
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_should_behave_identically_in_debug_mode() {
        let fixture = Fixture::new();
        let quiet = fixture.handler();
        let verbose = fixture
            .server
            .create_handler(HandlerOptions::builder().debug(true).build());
        let event = post_event("/calculator", &envelope("<Add><a>4</a><b>4</b></Add>"));
        assert_eq!(quiet.handle(event.clone()).await, verbose.handle(event).await);
    }
}
