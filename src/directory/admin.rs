//! Admin SDK Directory API client.

use groups_config::{Group, Role};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::{DirectoryService, RemoteGroup, RemoteMember};
use crate::api::{ApiClient, Call, RemoteError};

/// Base URL of the Directory API.
pub const DIRECTORY_API_BASE: &str = "https://admin.googleapis.com/admin/directory/v1";

const PAGE_SIZE: &str = "200";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupsPage {
    #[serde(default)]
    groups: Vec<RemoteGroup>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembersPage {
    #[serde(default)]
    members: Vec<ApiMember>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMember {
    email: Option<String>,
    role: Option<String>,
}

impl ApiMember {
    fn into_remote(self) -> Option<RemoteMember> {
        let email = self.email?;
        let role = match self.role.as_deref().and_then(Role::parse) {
            Some(role) => role,
            None => {
                warn!(
                    member = %email,
                    role = ?self.role,
                    "member has unknown role, treating as MEMBER"
                );
                Role::Member
            }
        };
        Some(RemoteMember { email, role })
    }
}

/// Directory client backed by the Admin SDK.
#[derive(Clone)]
pub struct AdminDirectoryClient {
    api: ApiClient,
    base_url: String,
    customer: String,
}

impl AdminDirectoryClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            base_url: DIRECTORY_API_BASE.to_string(),
            customer: "my_customer".to_string(),
        }
    }

    /// Point the client at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, RemoteError> {
        ApiClient::url(&self.base_url, segments)
    }

    fn insert_group(&self, group: &Group) -> Result<(), RemoteError> {
        let call = Call::new("insert group", &group.email_id);
        let body = RemoteGroup::from(group);
        self.api
            .send::<serde_json::Value, _>(call, Method::POST, self.url(&["groups"])?, &body)?;
        Ok(())
    }

    fn insert_member(&self, group_email: &str, role: Role, email: &str) -> Result<(), RemoteError> {
        let call = Call::new("insert member", email);
        let body = json!({ "email": email, "role": role.as_str() });
        let url = self.url(&["groups", group_email, "members"])?;
        match self.api.send::<serde_json::Value, _>(call, Method::POST, url, &body)? {
            Some(_) => Ok(()),
            None => Err(RemoteError::status(call.operation, group_email, 404, "group not found")),
        }
    }
}

impl DirectoryService for AdminDirectoryClient {
    #[instrument(skip(self))]
    fn list_groups(&self) -> Result<Vec<RemoteGroup>, RemoteError> {
        let call = Call::new("list groups", &self.customer);
        let mut groups = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("customer", self.customer.as_str()), ("maxResults", PAGE_SIZE)];
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.as_str()));
            }
            let page: GroupsPage = self
                .api
                .get(call, self.url(&["groups"])?, &query)?
                .ok_or_else(|| {
                    RemoteError::status(call.operation, call.target, 404, "customer not found")
                })?;

            groups.extend(page.groups);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = groups.len(), "listed groups");
        Ok(groups)
    }

    fn get_group(&self, email: &str) -> Result<Option<RemoteGroup>, RemoteError> {
        self.api
            .get(Call::new("get group", email), self.url(&["groups", email])?, &[])
    }

    #[instrument(skip(self))]
    fn list_members(&self, group_email: &str) -> Result<Vec<RemoteMember>, RemoteError> {
        let call = Call::new("list members", group_email);
        let url = self.url(&["groups", group_email, "members"])?;
        let mut members = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("maxResults", PAGE_SIZE)];
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.as_str()));
            }
            let page: MembersPage = self
                .api
                .get(call, url.clone(), &query)?
                .ok_or_else(|| {
                    RemoteError::status(call.operation, call.target, 404, "group not found")
                })?;

            members.extend(page.members.into_iter().filter_map(ApiMember::into_remote));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(members)
    }

    fn create_or_update_group(&self, group: &Group) -> Result<(), RemoteError> {
        let call = Call::new("update group", &group.email_id);
        let body = RemoteGroup::from(group);
        let url = self.url(&["groups", &group.email_id])?;
        match self.api.send::<serde_json::Value, _>(call, Method::PUT, url, &body)? {
            Some(_) => Ok(()),
            None => self.insert_group(group),
        }
    }

    fn add_or_update_member(
        &self,
        group_email: &str,
        role: Role,
        email: &str,
    ) -> Result<(), RemoteError> {
        let call = Call::new("update member", email);
        let body = json!({ "role": role.as_str() });
        let url = self.url(&["groups", group_email, "members", email])?;
        match self.api.send::<serde_json::Value, _>(call, Method::PATCH, url, &body)? {
            Some(_) => Ok(()),
            None => self.insert_member(group_email, role, email),
        }
    }

    fn remove_member(&self, group_email: &str, email: &str) -> Result<(), RemoteError> {
        let url = self.url(&["groups", group_email, "members", email])?;
        self.api.delete(Call::new("remove member", email), url)
    }

    fn delete_group(&self, email: &str) -> Result<(), RemoteError> {
        let url = self.url(&["groups", email])?;
        self.api.delete(Call::new("delete group", email), url)
    }
}
