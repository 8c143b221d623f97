use axl::{AxlService, Error, ExecuteOptions, ServiceConfig, Tags};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::path::PathBuf;
use url::Url;

const AUTHORIZATION: &str = "Basic YWRtaW46c2VjcmV0";

const BANNER_PAGE: &str = "<html><head><title>Cisco CallManager: AXL Web Service</title></head>\
     <body><h1>Cisco CallManager: AXL Web Service</h1>\
     <p>The AXL Web Service is working and accepting requests.</p></body></html>";

fn service(server: &MockServer) -> AxlService {
    let endpoint = Url::parse(&server.url("/axl/")).unwrap();

    let config = ServiceConfig::new("cucm.example.com", "admin", "secret", "14.0")
        .unwrap()
        .with_schema_dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/schema"))
        .with_endpoint(endpoint);

    AxlService::new(config)
}

fn envelope(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soapenv:Body>{}</soapenv:Body></soapenv:Envelope>",
        body
    )
}

fn tags(value: Value) -> Tags {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

#[tokio::test]
async fn test_authentication_against_banner() {
    let server = MockServer::start_async().await;

    let banner = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/axl/")
                .header("Authorization", AUTHORIZATION);
            then.status(200).body(BANNER_PAGE);
        })
        .await;

    assert!(service(&server).test_authentication().await.unwrap());
    banner.assert_async().await;
}

#[tokio::test]
async fn test_authentication_rejected() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/axl/");
            then.status(401).body("<html>401 Unauthorized</html>");
        })
        .await;

    assert!(matches!(
        service(&server).test_authentication().await,
        Err(Error::Auth(_))
    ));
}

#[tokio::test]
async fn test_execute_add_route_partition() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/axl/");
            then.status(200).body(BANNER_PAGE);
        })
        .await;

    let operation = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/axl/")
                .header("Authorization", AUTHORIZATION)
                .header("SOAPAction", "\"CUCM:DB ver=14.0 addRoutePartition\"")
                .body_contains("<ns:addRoutePartition>")
                .body_contains("<name>TEST-PT</name>");
            then.status(200).body(envelope(
                "<ns:addRoutePartitionResponse xmlns:ns=\"http://www.cisco.com/AXL/API/14.0\">\
                 <return>{9C6B2E4A-1111-2222-3333-444455556666}</return>\
                 </ns:addRoutePartitionResponse>",
            ));
        })
        .await;

    let result = service(&server)
        .execute_operation(
            "addRoutePartition",
            tags(json!({
                "routePartition": {"name": "TEST-PT", "description": "d"},
                "template_data": {"owner": "ops"}
            })),
            &ExecuteOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result, json!("{9C6B2E4A-1111-2222-3333-444455556666}"));
    operation.assert_async().await;
}

#[tokio::test]
async fn test_execute_reset_phone_raw() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/axl/");
            then.status(200).body(BANNER_PAGE);
        })
        .await;

    let reset = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/axl/")
                .header("SOAPAction", "\"CUCM:DB ver=14.0 resetPhone\"")
                .body_contains("<ns:resetPhone><name>SEPAAAA</name></ns:resetPhone>");
            then.status(200).body(envelope(
                "<ns:resetPhoneResponse><return>{1}</return></ns:resetPhoneResponse>",
            ));
        })
        .await;

    let result = service(&server)
        .execute_operation(
            "resetPhone",
            tags(json!({"resetPhone": {"name": "SEPAAAA"}})),
            &ExecuteOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result, json!({"return": "Success"}));
    reset.assert_async().await;
}

#[tokio::test]
async fn test_execute_stops_after_failed_probe() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/axl/");
            then.status(200).body("<html>Authentication failed</html>");
        })
        .await;

    let operation = server
        .mock_async(|when, then| {
            when.method(POST).path("/axl/");
            then.status(200).body(envelope("<ns:getPhoneResponse/>"));
        })
        .await;

    let result = service(&server)
        .execute_operation(
            "getPhone",
            tags(json!({"name": "SEP001122334455"})),
            &ExecuteOptions::default(),
        )
        .await;

    assert!(matches!(result, Err(Error::Auth(_))));
    operation.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_execute_remote_fault() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/axl/");
            then.status(200).body(BANNER_PAGE);
        })
        .await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/axl/");
            then.status(500).body(envelope(
                "<soapenv:Fault><faultcode>soapenv:Client</faultcode>\
                 <faultstring>Item not valid: The specified Route Partition was not found</faultstring>\
                 <detail><axlError><axlcode>5007</axlcode></axlError></detail></soapenv:Fault>",
            ));
        })
        .await;

    let result = service(&server)
        .execute_operation(
            "listRoutePartition",
            tags(json!({"searchCriteria": {"name": "%"}, "returnedTags": {"name": ""}})),
            &ExecuteOptions::default(),
        )
        .await;

    match result {
        Err(Error::RemoteFault(fault)) => {
            assert_eq!(
                fault.string,
                "Item not valid: The specified Route Partition was not found"
            );
            assert_eq!(fault.detail, Some(json!({"axlError": {"axlcode": "5007"}})));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_execute_list_cleans_and_shapes() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/axl/");
            then.status(200).body(BANNER_PAGE);
        })
        .await;

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/axl/")
                .body_contains("<searchCriteria><name>%</name></searchCriteria>");
            then.status(200).body(envelope(
                "<ns:listRoutePartitionResponse><return>\
                 <routePartition uuid=\"{1}\"><name>PT-1</name><description/></routePartition>\
                 </return></ns:listRoutePartitionResponse>",
            ));
        })
        .await;

    let result = service(&server)
        .execute_operation(
            "listRoutePartition",
            tags(json!({
                "searchCriteria": {"name": "%"},
                "returnedTags": {"name": "", "description": ""},
                "skip": "",
                "first": ""
            })),
            &ExecuteOptions {
                clean: true,
                remove_attributes: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result, json!({"routePartition": [{"name": "PT-1"}]}));
}

#[tokio::test]
async fn test_unknown_operation_is_not_sent() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/axl/");
            then.status(200).body(BANNER_PAGE);
        })
        .await;

    let operation = server
        .mock_async(|when, then| {
            when.method(POST).path("/axl/");
            then.status(200).body(envelope("<ns:doThingResponse/>"));
        })
        .await;

    let result = service(&server)
        .execute_operation("doThing", Tags::new(), &ExecuteOptions::default())
        .await;

    assert!(matches!(result, Err(Error::OperationNotFound(name)) if name == "doThing"));
    operation.assert_hits_async(0).await;
}
