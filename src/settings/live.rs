//! Groups Settings API client.

use reqwest::Method;
use serde_json::{Map, Value};

use super::{GroupSettings, SettingsService};
use crate::api::{ApiClient, Call, RemoteError};

/// Base URL of the Groups Settings API.
pub const SETTINGS_API_BASE: &str = "https://www.googleapis.com/groups/v1/groups";

/// Resource fields that are not settings.
const NON_SETTING_FIELDS: &[&str] = &["kind", "email", "name", "description"];

/// `WhoCanJoin` -> `whoCanJoin`
fn to_wire_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `whoCanJoin` -> `WhoCanJoin`
fn from_wire_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// String-valued fields of a settings resource, excluding identity fields.
fn settings_from_resource(resource: Map<String, Value>) -> GroupSettings {
    resource
        .into_iter()
        .filter(|(key, _)| !NON_SETTING_FIELDS.contains(&key.as_str()))
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((from_wire_key(&key), s)),
            _ => None,
        })
        .collect()
}

fn settings_to_resource(settings: &GroupSettings) -> Map<String, Value> {
    settings
        .iter()
        .map(|(key, value)| (to_wire_key(key), Value::String(value.clone())))
        .collect()
}

/// Settings client backed by the Groups Settings API.
#[derive(Clone)]
pub struct GroupsSettingsClient {
    api: ApiClient,
    base_url: String,
}

impl GroupsSettingsClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            base_url: SETTINGS_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl SettingsService for GroupsSettingsClient {
    fn get(&self, group_email: &str) -> Result<GroupSettings, RemoteError> {
        let call = Call::new("get settings", group_email);
        let url = ApiClient::url(&self.base_url, &[group_email])?;
        let resource: Map<String, Value> = self
            .api
            .get(call, url, &[("alt", "json")])?
            .ok_or_else(|| {
                RemoteError::status(call.operation, call.target, 404, "group not found")
            })?;
        Ok(settings_from_resource(resource))
    }

    fn update(&self, group_email: &str, settings: &GroupSettings) -> Result<(), RemoteError> {
        let call = Call::new("update settings", group_email);
        let mut url = ApiClient::url(&self.base_url, &[group_email])?;
        url.query_pairs_mut().append_pair("alt", "json");
        let body = settings_to_resource(settings);
        match self.api.send::<Value, _>(call, Method::PATCH, url, &body)? {
            Some(_) => Ok(()),
            None => Err(RemoteError::status(call.operation, call.target, 404, "group not found")),
        }
    }
}
