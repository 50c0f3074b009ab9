//! OpsLevel GraphQL client backing `ServiceCatalog`.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::model::{CatalogService, Lifecycle, MaturityLevel, Page, TeamContact};
use crate::domain::ports::ServiceCatalog;
use crate::utils::error::{ActionError, Result};
use crate::utils::http::{ensure_success, read_json, send_with_rate_limit_retry};

pub const DEFAULT_API_URL: &str = "https://api.opslevel.com/graphql";
const SERVICES_PER_PAGE: u32 = 100;

const LIST_SERVICES: &str = r#"
query services($after: String, $first: Int) {
  account {
    services(after: $after, first: $first) {
      nodes {
        name
        htmlUrl
        lifecycle { index name }
        owner { contacts { type address } }
        repos { edges { node { url } } }
        maturityReport { overallLevel { index name } }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
}"#;

const LIST_LEVELS: &str = r#"
query levels {
  account {
    rubric {
      levels { nodes { index name } }
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Account<T> {
    account: T,
}

#[derive(Debug, Deserialize)]
struct ServicesField {
    services: Connection<ServiceNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceNode {
    name: String,
    #[serde(default)]
    html_url: String,
    lifecycle: Option<IndexedName>,
    owner: Option<TeamNode>,
    repos: Option<Edges<RepositoryNode>>,
    maturity_report: Option<MaturityReportNode>,
}

#[derive(Debug, Deserialize)]
struct IndexedName {
    index: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TeamNode {
    #[serde(default)]
    contacts: Vec<ContactNode>,
}

#[derive(Debug, Deserialize)]
struct ContactNode {
    #[serde(rename = "type")]
    kind: String,
    address: String,
}

#[derive(Debug, Deserialize)]
struct Edges<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaturityReportNode {
    overall_level: Option<IndexedName>,
}

#[derive(Debug, Deserialize)]
struct RubricField {
    rubric: LevelsField,
}

#[derive(Debug, Deserialize)]
struct LevelsField {
    levels: Connection<IndexedName>,
}

impl From<ServiceNode> for CatalogService {
    fn from(node: ServiceNode) -> Self {
        CatalogService {
            name: node.name,
            html_url: node.html_url,
            lifecycle: node.lifecycle.map(|l| Lifecycle {
                index: l.index,
                name: l.name,
            }),
            level: node
                .maturity_report
                .and_then(|report| report.overall_level)
                .map(|level| MaturityLevel {
                    index: level.index,
                    name: level.name,
                }),
            team_contacts: node
                .owner
                .map(|team| team.contacts)
                .unwrap_or_default()
                .into_iter()
                .map(|contact| TeamContact {
                    kind: contact.kind.to_lowercase(),
                    address: contact.address,
                })
                .collect(),
            repository_urls: node
                .repos
                .map(|repos| repos.edges.into_iter().map(|edge| edge.node.url).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpsLevelClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl OpsLevelClient {
    pub fn new(endpoint: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        }
    }

    async fn query<T: DeserializeOwned>(&self, operation: &str, query: &str, variables: Value) -> Result<T> {
        let request = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&json!({ "query": query, "variables": variables }));

        let response = send_with_rate_limit_retry(operation, request).await?;
        let response = ensure_success(operation, response).await?;
        let body: GraphQlResponse<T> = read_json(operation, response).await?;

        if let Some(first) = body.errors.first() {
            return Err(ActionError::upstream(operation, &first.message));
        }
        body.data
            .ok_or_else(|| ActionError::upstream(operation, "response carried no data"))
    }
}

#[async_trait]
impl ServiceCatalog for OpsLevelClient {
    async fn list_services(&self, cursor: Option<String>) -> Result<Page<CatalogService>> {
        let data: Account<ServicesField> = self
            .query(
                "list services",
                LIST_SERVICES,
                json!({ "after": cursor, "first": SERVICES_PER_PAGE }),
            )
            .await?;

        let services = data.account.services;
        let next = services
            .page_info
            .filter(|info| info.has_next_page)
            .and_then(|info| info.end_cursor);

        Ok(Page {
            items: services.nodes.into_iter().map(CatalogService::from).collect(),
            next,
        })
    }

    async fn list_levels(&self) -> Result<Vec<MaturityLevel>> {
        let data: Account<RubricField> = self.query("list levels", LIST_LEVELS, json!({})).await?;
        Ok(data
            .account
            .rubric
            .levels
            .nodes
            .into_iter()
            .map(|level| MaturityLevel {
                index: level.index,
                name: level.name,
            })
            .collect())
    }
}
