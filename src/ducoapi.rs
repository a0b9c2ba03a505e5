use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

pub const INFO_PATH: &str = "/info";
pub const INFO_NODES_PATH: &str = "/info/nodes";
pub const CONFIG_NODES_PATH: &str = "/config/nodes";
pub const ACTION_NODES_PATH: &str = "/action/nodes";

/// Requests supported by the connectivity board.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Address of the board, without trailing slash.
    fn base_url(&self) -> &str;
    async fn get_info(&self) -> Result<Value>;
    async fn get_nodes(&self) -> Result<Vec<Value>>;
    async fn raw_get(&self, path: &str) -> Result<Value>;
    async fn raw_patch(&self, path: &str, body: String) -> Result<Value>;
    async fn change_action_node(&self, action: &str, value: &str, node_id: u16) -> Result<()>;
}

#[allow(non_snake_case)]
#[derive(Debug, Serialize)]
pub struct NodeEnumAction<'a> {
    pub Action: &'a str,
    pub Val: &'a str,
}

pub struct DucoClient {
    client: reqwest::Client,
    base_url: String,
}

impl DucoClient {
    /// Certificate validation is normally disabled, the board uses a self signed certificate.
    pub fn new(base_url: &str, validate_certificates: bool) -> Result<DucoClient> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!validate_certificates)
            .build()?;

        Ok(DucoClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn parse_response(path: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                path: path.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl DeviceApi for DucoClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_info(&self) -> Result<Value> {
        self.raw_get(INFO_PATH).await
    }

    async fn get_nodes(&self) -> Result<Vec<Value>> {
        parse_node_list(self.raw_get(INFO_NODES_PATH).await?)
    }

    async fn raw_get(&self, path: &str) -> Result<Value> {
        log::debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        DucoClient::parse_response(path, response).await
    }

    async fn raw_patch(&self, path: &str, body: String) -> Result<Value> {
        log::debug!("PATCH {}: {}", path, body);
        let response = self
            .client
            .patch(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        DucoClient::parse_response(path, response).await
    }

    async fn change_action_node(&self, action: &str, value: &str, node_id: u16) -> Result<()> {
        let path = format!("{}/{}", ACTION_NODES_PATH, node_id);
        let action = NodeEnumAction {
            Action: action,
            Val: value,
        };

        log::debug!("POST {}: {:?}", path, action);
        let response = self.client.post(self.url(&path)).json(&action).send().await?;
        DucoClient::parse_response(&path, response).await?;
        Ok(())
    }
}

/// Extracts the node records from an `/info/nodes` response.
pub fn parse_node_list(response: Value) -> Result<Vec<Value>> {
    match response {
        Value::Object(mut obj) => match obj.remove("Nodes") {
            Some(Value::Array(nodes)) => Ok(nodes),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(Error::Runtime("Unexpected 'Nodes' value in node list".to_string())),
        },
        _ => Err(Error::Runtime("Unexpected node list response".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, body_string, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn test_parse_node_list() {
        let json_response: Value = serde_json::from_slice(include_bytes!("../test/data/info_nodes.json")).unwrap();

        let nodes = parse_node_list(json_response).unwrap();
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0]["Node"], json!(1));
    }

    #[test]
    fn test_parse_node_list_without_nodes() {
        assert!(parse_node_list(json!({})).unwrap().is_empty());
        assert!(parse_node_list(json!({"Nodes": "none"})).is_err());
        assert!(parse_node_list(json!([])).is_err());
    }

    #[test]
    fn test_url() {
        let client = DucoClient::new("https://192.168.1.20/", false).unwrap();
        assert_eq!(client.base_url(), "https://192.168.1.20");
        assert_eq!(client.url("/info"), "https://192.168.1.20/info");
        assert_eq!(client.url("config/nodes/1"), "https://192.168.1.20/config/nodes/1");
    }

    #[tokio::test]
    async fn test_get_info_and_nodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                include_bytes!("../test/data/info.json").to_vec(),
                "application/json",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/info/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                include_bytes!("../test/data/info_nodes.json").to_vec(),
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = DucoClient::new(&server.uri(), false).unwrap();
        let info = client.get_info().await.unwrap();
        assert_eq!(info["General"]["Lan"]["Mac"]["Val"], json!("00:1A:2B:3C:4D:5E"));
        assert_eq!(client.get_nodes().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/config/nodes"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = DucoClient::new(&server.uri(), false).unwrap();
        match client.raw_get(CONFIG_NODES_PATH).await {
            Err(Error::Status { path, status }) => {
                assert_eq!(path, "/config/nodes");
                assert_eq!(status.as_u16(), 503);
            }
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_patch_and_action() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/config/nodes/1"))
            .and(body_string(r#"{"FlowLvlMan1":{"Val":40}}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Result": "SUCCESS"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/action/nodes/1"))
            .and(body_json(json!({"Action": "SetVentilationState", "Val": "MAN2"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = DucoClient::new(&server.uri(), false).unwrap();
        let result = client
            .raw_patch("/config/nodes/1", r#"{"FlowLvlMan1":{"Val":40}}"#.to_string())
            .await
            .unwrap();
        assert_eq!(result, json!({"Result": "SUCCESS"}));

        client
            .change_action_node("SetVentilationState", "MAN2", 1)
            .await
            .unwrap();
    }
}
