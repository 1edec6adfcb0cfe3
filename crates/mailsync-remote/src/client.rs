//! HTTP client for the `?/Json/` action endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use mailsync_core::model::{AccountsAndIdentities, Quota, Uid};
use mailsync_core::remote::{
    FolderHashUpdate, FolderInfo, FolderListPayload, ListQuery, MessageListPage, MoveRequest,
    Remote, RemoteError, RemoteResult,
};

use crate::error::{Error, Result};
use crate::wire;

/// Connection settings of the webmail server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the webmail installation.
    pub base_url: String,
    /// CSRF token sent as `XToken`.
    pub token: String,
    /// Session cookie header value.
    pub cookie: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            cookie: None,
            timeout_secs: 30,
        }
    }
}

/// Form parameters of one action call.
type Params = Vec<(&'static str, String)>;

/// [`Remote`] implementation posting actions to the JSON endpoint.
#[derive(Debug, Clone)]
pub struct JsonClient {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
}

impl JsonClient {
    /// Creates a client for the server described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or cookie is invalid, or the HTTP
    /// client cannot be built.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(Error::InvalidConfig("base_url is empty".into()));
        }

        let endpoint = endpoint_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| Error::InvalidConfig(format!("cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            token: config.token.clone(),
        })
    }

    /// The URL actions are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call(&self, action: &str, params: Params) -> RemoteResult<Value> {
        let mut form: Vec<(&str, String)> = Vec::with_capacity(params.len() + 2);
        form.push(("Action", action.to_string()));
        form.push(("XToken", self.token.clone()));
        form.extend(params);

        debug!(action, "Posting action");
        let body = self.post(&form).await.map_err(|e| {
            warn!(action, error = %e, "Action request failed");
            RemoteError::from(e)
        })?;
        wire::decode_envelope(&body)
    }

    async fn post(&self, form: &[(&str, String)]) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Builds `{base}/?/Json/&q[]=/0/`.
fn endpoint_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(Some("/Json/&q[]=/0/"));
    Ok(url)
}

const fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn uids_param(uids: &[Uid]) -> String {
    wire::join_uids(uids)
}

#[async_trait]
impl Remote for JsonClient {
    async fn folders(&self) -> RemoteResult<FolderListPayload> {
        let value = self.call("Folders", Vec::new()).await?;
        wire::parse_folders(value)
    }

    async fn message_list(&self, query: &ListQuery) -> RemoteResult<MessageListPage> {
        let mut params: Params = vec![
            ("Folder", query.folder.clone()),
            ("Offset", query.offset.to_string()),
            ("Limit", query.limit.to_string()),
            ("Search", query.search.clone()),
            ("UseThreads", flag(query.use_threads).to_string()),
            ("Hash", query.folder_hash.clone()),
        ];
        if let Some(root) = query.thread_uid {
            params.push(("ThreadUid", root.to_string()));
        }
        if let Some(uid_next) = query.uid_next {
            params.push(("UidNext", uid_next.to_string()));
        }
        let value = self.call("MessageList", params).await?;
        wire::parse_message_list(value)
    }

    async fn folder_information(
        &self,
        folder: &str,
        known_uids: &[Uid],
        uid_next: Option<Uid>,
    ) -> RemoteResult<FolderInfo> {
        let mut params: Params = vec![
            ("Folder", folder.to_string()),
            ("FlagsUids", uids_param(known_uids)),
        ];
        if let Some(uid_next) = uid_next {
            params.push(("UidNext", uid_next.to_string()));
        }
        let value = self.call("FolderInformation", params).await?;
        wire::parse_folder_info(value)
    }

    async fn folder_information_multiple(
        &self,
        folders: &[String],
    ) -> RemoteResult<Vec<FolderInfo>> {
        let params: Params = folders.iter().map(|f| ("Folders[]", f.clone())).collect();
        let value = self.call("FolderInformationMultiply", params).await?;
        wire::parse_folder_info_list(value)
    }

    async fn move_messages(&self, request: &MoveRequest) -> RemoteResult<Option<FolderHashUpdate>> {
        let params: Params = vec![
            ("FromFolder", request.from.clone()),
            ("ToFolder", request.to.clone()),
            ("Uids", uids_param(&request.uids)),
            ("MarkAsRead", flag(request.permanent).to_string()),
            ("Learning", request.marker.as_str().to_string()),
        ];
        let value = self.call("MessageMove", params).await?;
        wire::parse_hash_update(value)
    }

    async fn copy_messages(
        &self,
        from: &str,
        to: &str,
        uids: &[Uid],
    ) -> RemoteResult<Option<FolderHashUpdate>> {
        let params: Params = vec![
            ("FromFolder", from.to_string()),
            ("ToFolder", to.to_string()),
            ("Uids", uids_param(uids)),
        ];
        let value = self.call("MessageCopy", params).await?;
        wire::parse_hash_update(value)
    }

    async fn delete_messages(
        &self,
        folder: &str,
        uids: &[Uid],
    ) -> RemoteResult<Option<FolderHashUpdate>> {
        let params: Params = vec![("Folder", folder.to_string()), ("Uids", uids_param(uids))];
        let value = self.call("MessageDelete", params).await?;
        wire::parse_hash_update(value)
    }

    async fn set_seen(&self, folder: &str, uids: &[Uid], seen: bool) -> RemoteResult<()> {
        let params: Params = vec![
            ("Folder", folder.to_string()),
            ("Uids", uids_param(uids)),
            ("SetAction", flag(seen).to_string()),
        ];
        self.call("MessageSetSeen", params).await.map(drop)
    }

    async fn set_seen_to_all(
        &self,
        folder: &str,
        seen: bool,
        thread_uids: Option<&[Uid]>,
    ) -> RemoteResult<()> {
        let params: Params = vec![
            ("Folder", folder.to_string()),
            ("SetAction", flag(seen).to_string()),
            ("ThreadUids", thread_uids.map(uids_param).unwrap_or_default()),
        ];
        self.call("MessageSetSeenToAll", params).await.map(drop)
    }

    async fn set_flagged(&self, folder: &str, uids: &[Uid], flagged: bool) -> RemoteResult<()> {
        let params: Params = vec![
            ("Folder", folder.to_string()),
            ("Uids", uids_param(uids)),
            ("SetAction", flag(flagged).to_string()),
        ];
        self.call("MessageSetFlagged", params).await.map(drop)
    }

    async fn quota(&self) -> RemoteResult<Quota> {
        let value = self.call("Quota", Vec::new()).await?;
        wire::parse_quota(value)
    }

    async fn accounts_and_identities(&self) -> RemoteResult<AccountsAndIdentities> {
        let value = self.call("AccountsAndIdentities", Vec::new()).await?;
        wire::parse_accounts(value)
    }

    async fn contacts_sync(&self) -> RemoteResult<()> {
        self.call("ContactsSync", Vec::new()).await.map(drop)
    }
}
