//! WSDL retrieval and registry construction tests.

#[cfg(test)]
mod tests {
    use std::io::Write;

    use soapstack_core::{
        OperationTable, RegistryError, ServerConfig, ServiceDefinition, SoapServer,
    };

    use crate::{CALCULATOR_WSDL, Fixture, INVENTORY_WSDL, wsdl_event};

    #[tokio::test]
    async fn test_should_return_wsdl_verbatim_for_every_service() {
        let fixture = Fixture::new();
        let handler = fixture.handler();

        for (name, wsdl) in [("calculator", CALCULATOR_WSDL), ("inventory", INVENTORY_WSDL)] {
            let resp = handler.handle(wsdl_event(&format!("/prod/{name}"))).await;
            assert_eq!(resp.status_code, 200, "{name}");
            assert_eq!(resp.body, wsdl, "{name}");
            assert_eq!(resp.headers["Content-Type"], "application/xml");
        }
    }

    #[tokio::test]
    async fn test_should_accept_any_wsdl_flag_value() {
        let handler = Fixture::new().handler();
        let resp = handler
            .handle(serde_json::json!({
                "path": "/calculator/",
                "httpMethod": "GET",
                "queryStringParameters": { "wsdl": "1", "other": "x" }
            }))
            .await;
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body, CALCULATOR_WSDL);
    }

    #[tokio::test]
    async fn test_should_not_invoke_services_for_wsdl() {
        let fixture = Fixture::new();
        fixture.handler().handle(wsdl_event("/inventory")).await;
        assert_eq!(fixture.call_count(), 0);
    }

    #[tokio::test]
    async fn test_should_serve_wsdl_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CALCULATOR_WSDL.as_bytes()).unwrap();
        let path = file.path().to_path_buf();

        let server = SoapServer::new(ServerConfig::new(move || {
            vec![(
                "calculator".to_owned(),
                ServiceDefinition::from_path(path.clone(), OperationTable::new()),
            )]
        }))
        .unwrap();
        let resp = server
            .create_handler(soapstack_core::HandlerOptions::default())
            .handle(wsdl_event("/calculator"))
            .await;
        assert_eq!(resp.body, CALCULATOR_WSDL);
    }

    #[test]
    fn test_should_fail_construction_on_unreadable_wsdl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.wsdl");
        let err = SoapServer::new(ServerConfig::new(move || {
            vec![(
                "calculator".to_owned(),
                ServiceDefinition::from_path(path.clone(), OperationTable::new()),
            )]
        }))
        .unwrap_err();
        assert!(matches!(err, RegistryError::ReadWsdl { .. }));
        assert!(err.to_string().contains("absent.wsdl"));
    }

    #[test]
    fn test_should_fail_construction_on_malformed_wsdl() {
        let err = SoapServer::new(ServerConfig::new(|| {
            vec![(
                "calculator".to_owned(),
                ServiceDefinition::from_contents("<definitions><portType>", OperationTable::new()),
            )]
        }))
        .unwrap_err();
        assert!(matches!(err, RegistryError::MalformedWsdl { ref service, .. } if service == "calculator"));
    }
}
