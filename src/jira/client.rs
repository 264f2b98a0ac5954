use crate::model::Result;
use serde_json::Value;

const MAX_RESULTS: usize = 100;

/// Progress callback: (issues fetched so far, total reported by the server).
pub type PageProgress<'a> = Box<dyn FnMut(usize, usize) + Send + 'a>;

/// Thin Jira REST client. Pagination and auth live here; the core never
/// sees anything but fully fetched issue lists.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    url: String,
    username: String,
    token: String,
}

impl JiraClient {
    pub fn new(url: impl ToString, username: impl ToString, token: impl ToString) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            username: username.to_string(),
            token: token.to_string(),
        }
    }

    /// Credential probe, run before any report so an auth problem fails
    /// fast instead of mid-fetch.
    pub async fn myself(&self) -> Result<()> {
        let res = self.get("/rest/api/2/myself").send().await?;
        if !res.status().is_success() {
            return Err(format!(
                "Jira returned {} when checking user credentials",
                res.status()
            )
            .into());
        }
        Ok(())
    }

    /// Runs a JQL search and follows pagination until every matching issue
    /// is fetched.
    pub async fn search<'a>(
        &self,
        jql: &str,
        expand: Option<&str>,
        mut cb: PageProgress<'a>,
    ) -> Result<Vec<Value>> {
        let mut issues: Vec<Value> = vec![];
        loop {
            let query = [
                ("jql", jql.to_string()),
                ("expand", expand.unwrap_or("None").to_string()),
                ("fields", "*all".to_string()),
                ("maxResults", MAX_RESULTS.to_string()),
                ("startAt", issues.len().to_string()),
            ];
            let body: Value = self
                .get("/rest/api/2/search")
                .query(&query)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let Some(total) = body["total"].as_u64() else {
                return Err("Not found 'total' field in search response".into());
            };
            let Some(page) = body["issues"].as_array() else {
                return Err("Not found 'issues' field in search response".into());
            };
            let page_len = page.len();
            issues.extend(page.iter().cloned());
            cb(issues.len(), total as usize);

            if issues.len() >= total as usize || page_len == 0 {
                break;
            }
        }
        Ok(issues)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.url, path))
            .basic_auth(&self.username, Some(&self.token))
            .header("Accept", "application/json")
    }
}
