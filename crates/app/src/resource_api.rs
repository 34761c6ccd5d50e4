use std::sync::Arc;

use async_trait::async_trait;
use mcp_scaffold::{ApiClient, ApiError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filters for listing resources. Unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// Trait abstracting the upstream resources API for testing.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list(&self, filter: &ListFilter) -> Result<Value, ApiError>;
    async fn get(&self, id: &str) -> Result<Value, ApiError>;
    async fn create(&self, body: &Map<String, Value>) -> Result<Value, ApiError>;
    async fn update(&self, id: &str, changes: &Map<String, Value>) -> Result<Value, ApiError>;
    async fn delete(&self, id: &str) -> Result<Value, ApiError>;
    async fn search(&self, query: &str, limit: Option<u32>) -> Result<Value, ApiError>;
    fn clear_cache(&self);
}

/// Resources API over the shared [`ApiClient`].
pub struct HttpResourceApi {
    client: Arc<ApiClient>,
}

impl HttpResourceApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

fn item_path(id: &str) -> String {
    format!("resources/{}", urlencoding::encode(id))
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn list(&self, filter: &ListFilter) -> Result<Value, ApiError> {
        let query = [
            ("status", filter.status.clone()),
            ("limit", filter.limit.map(|n| n.to_string())),
            ("offset", filter.offset.map(|n| n.to_string())),
        ];
        self.client.get("resources", &query, true).await
    }

    async fn get(&self, id: &str) -> Result<Value, ApiError> {
        self.client.get(&item_path(id), &[], true).await
    }

    async fn create(&self, body: &Map<String, Value>) -> Result<Value, ApiError> {
        self.client.post("resources", body).await
    }

    async fn update(&self, id: &str, changes: &Map<String, Value>) -> Result<Value, ApiError> {
        self.client.put(&item_path(id), changes).await
    }

    async fn delete(&self, id: &str) -> Result<Value, ApiError> {
        self.client.delete(&item_path(id)).await
    }

    async fn search(&self, query: &str, limit: Option<u32>) -> Result<Value, ApiError> {
        let params = [
            ("q", Some(query.to_string())),
            ("limit", limit.map(|n| n.to_string())),
        ];
        self.client.get("resources/search", &params, true).await
    }

    fn clear_cache(&self) {
        self.client.clear_cache();
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        List(ListFilter),
        Get(String),
        Create(Map<String, Value>),
        Update(String, Map<String, Value>),
        Delete(String),
        Search(String, Option<u32>),
        ClearCache,
    }

    /// In-memory upstream. `list` and `search` return every stored resource
    /// regardless of filters, like a loose upstream search would.
    pub struct MockResourceApi {
        pub resources: Mutex<Vec<Value>>,
        pub calls: Mutex<Vec<Call>>,
        pub fail_with: Mutex<Option<u16>>,
    }

    impl MockResourceApi {
        pub fn new(resources: Vec<Value>) -> Self {
            Self {
                resources: Mutex::new(resources),
                calls: Mutex::new(Vec::new()),
                fail_with: Mutex::new(None),
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            match *self.fail_with.lock().unwrap() {
                Some(status) => Err(ApiError::Status {
                    status,
                    body: "mock failure".into(),
                }),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ResourceApi for MockResourceApi {
        async fn list(&self, filter: &ListFilter) -> Result<Value, ApiError> {
            self.record(Call::List(filter.clone()))?;
            Ok(Value::Array(self.resources.lock().unwrap().clone()))
        }

        async fn get(&self, id: &str) -> Result<Value, ApiError> {
            self.record(Call::Get(id.into()))?;
            self.resources
                .lock()
                .unwrap()
                .iter()
                .find(|r| r["id"] == id)
                .cloned()
                .ok_or_else(|| ApiError::Status {
                    status: 404,
                    body: format!(r#"{{"error":"resource {} not found"}}"#, id),
                })
        }

        async fn create(&self, body: &Map<String, Value>) -> Result<Value, ApiError> {
            self.record(Call::Create(body.clone()))?;
            let mut created = body.clone();
            created.insert("id".into(), Value::String("new-1".into()));
            Ok(Value::Object(created))
        }

        async fn update(&self, id: &str, changes: &Map<String, Value>) -> Result<Value, ApiError> {
            self.record(Call::Update(id.into(), changes.clone()))?;
            let mut updated = changes.clone();
            updated.insert("id".into(), Value::String(id.into()));
            Ok(Value::Object(updated))
        }

        async fn delete(&self, id: &str) -> Result<Value, ApiError> {
            self.record(Call::Delete(id.into()))?;
            Ok(Value::Null)
        }

        async fn search(&self, query: &str, limit: Option<u32>) -> Result<Value, ApiError> {
            self.record(Call::Search(query.into(), limit))?;
            Ok(serde_json::json!({ "resources": self.resources.lock().unwrap().clone() }))
        }

        fn clear_cache(&self) {
            self.calls.lock().unwrap().push(Call::ClearCache);
        }
    }
}
