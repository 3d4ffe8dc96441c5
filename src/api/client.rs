use std::sync::{PoisonError, RwLock};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use url::Url;
use uuid::Uuid;

use super::types::request::{CreateConversationRequest, LoginRequest, SendMessageRequest};
use super::types::response::{Conversation, Identity, Message, User};
use crate::Result;

/// HTTP client for the chat REST API.
///
/// Covers session creation, user listing/update, conversation CRUD and
/// membership, message send/delete/forward, emoji reactions, and contacts.
/// After [`Self::login`] the returned identifier is attached as a bearer
/// token to every subsequent request; `POST /session` and `GET /liveness`
/// are public and sent without it.
///
/// Realtime updates for the same data are delivered separately by
/// [`crate::realtime::Client`].
///
/// # Example
///
/// ```no_run
/// use chat_client_sdk::api::Client;
///
/// # async fn example() -> chat_client_sdk::Result<()> {
/// let client = Client::new("https://chat.example.com")?;
/// let identity = client.login("alice").await?;
///
/// for conversation in client.conversations(identity.identifier).await? {
///     println!("{}: {} unread", conversation.name, conversation.unread_count);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    host: Url,
    client: ReqwestClient,
    /// Bearer token for authenticated calls, set by `login`
    bearer: RwLock<Option<String>>,
}

impl Client {
    /// Creates a new API client for the service at `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(host: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("User-Agent", HeaderValue::from_static("chat_client_sdk"));
        headers.insert("Accept", HeaderValue::from_static("*/*"));
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = ReqwestClient::builder().default_headers(headers).build()?;

        Ok(Self {
            host: Url::parse(host)?,
            client,
            bearer: RwLock::new(None),
        })
    }

    /// Returns the base URL of the API.
    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// The bearer token in use, if logged in.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Use an identity obtained out of band (e.g., restored from storage)
    /// for authenticated calls without going through `login`.
    pub fn set_bearer(&self, user_id: Uuid) {
        *self
            .bearer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(user_id.to_string());
    }

    fn authed(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{path}", self.host));
        if let Some(token) = self
            .bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }

    // ---- session ----

    /// Log in (registering the name on first use) and retain the returned
    /// identifier as the bearer token for subsequent calls.
    pub async fn login(&self, name: &str) -> Result<Identity> {
        let request = self
            .client
            .request(Method::POST, format!("{}session", self.host))
            .json(&LoginRequest::builder().name(name).build())
            .build()?;

        let identity: Identity = crate::request(&self.client, request).await?;
        *self
            .bearer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(identity.identifier.to_string());

        Ok(identity)
    }

    /// Check server health. Public endpoint, no authentication.
    pub async fn liveness(&self) -> Result<()> {
        let request = self
            .client
            .request(Method::GET, format!("{}liveness", self.host))
            .build()?;
        crate::execute(&self.client, request).await
    }

    // ---- users ----

    /// List all users in the system.
    pub async fn users(&self) -> Result<Vec<User>> {
        let request = self.authed(Method::GET, "users").build()?;
        crate::request(&self.client, request).await
    }

    /// Update the user's username. The service expects the new name as a
    /// raw JSON string body.
    pub async fn set_username(&self, user_id: Uuid, username: &str) -> Result<User> {
        let request = self
            .authed(Method::PUT, &format!("users/{user_id}"))
            .json(&username)
            .build()?;
        crate::request(&self.client, request).await
    }

    /// Update the user's profile picture URL.
    pub async fn set_photo(&self, user_id: Uuid, photo_url: &str) -> Result<User> {
        let request = self
            .authed(Method::PUT, &format!("users/{user_id}/photo"))
            .json(&photo_url)
            .build()?;
        crate::request(&self.client, request).await
    }

    // ---- conversations ----

    /// List the user's conversations.
    pub async fn conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        let request = self
            .authed(Method::GET, &format!("users/{user_id}/conversations"))
            .build()?;
        crate::request(&self.client, request).await
    }

    /// Create a direct or group conversation.
    pub async fn create_conversation(
        &self,
        user_id: Uuid,
        body: &CreateConversationRequest,
    ) -> Result<Conversation> {
        let request = self
            .authed(Method::POST, &format!("users/{user_id}/conversations"))
            .json(body)
            .build()?;
        crate::request(&self.client, request).await
    }

    /// Fetch one conversation with its details.
    pub async fn conversation(&self, user_id: Uuid, conversation_id: Uuid) -> Result<Conversation> {
        let request = self
            .authed(
                Method::GET,
                &format!("users/{user_id}/conversations/{conversation_id}"),
            )
            .build()?;
        crate::request(&self.client, request).await
    }

    /// Add a member to a group conversation by username.
    pub async fn add_member(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        member_name: &str,
    ) -> Result<()> {
        let request = self
            .authed(
                Method::POST,
                &format!("users/{user_id}/conversations/{conversation_id}/members"),
            )
            .json(&serde_json::json!({ "name": member_name }))
            .build()?;
        crate::execute(&self.client, request).await
    }

    /// Leave a group conversation.
    pub async fn leave_group(&self, user_id: Uuid, conversation_id: Uuid) -> Result<()> {
        let request = self
            .authed(
                Method::DELETE,
                &format!("users/{user_id}/conversations/{conversation_id}/members"),
            )
            .build()?;
        crate::execute(&self.client, request).await
    }

    /// Rename a group conversation. Raw JSON string body.
    pub async fn set_group_name(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        name: &str,
    ) -> Result<()> {
        let request = self
            .authed(
                Method::PUT,
                &format!("users/{user_id}/conversations/{conversation_id}/name"),
            )
            .json(&name)
            .build()?;
        crate::execute(&self.client, request).await
    }

    /// Update a group conversation's picture. Raw JSON string body.
    pub async fn set_group_photo(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        photo_url: &str,
    ) -> Result<()> {
        let request = self
            .authed(
                Method::PUT,
                &format!("users/{user_id}/conversations/{conversation_id}/photo"),
            )
            .json(&photo_url)
            .build()?;
        crate::execute(&self.client, request).await
    }

    // ---- messages ----

    /// List all messages of a conversation.
    pub async fn messages(&self, user_id: Uuid, conversation_id: Uuid) -> Result<Vec<Message>> {
        let request = self
            .authed(
                Method::GET,
                &format!("users/{user_id}/conversations/{conversation_id}/messages"),
            )
            .build()?;
        crate::request(&self.client, request).await
    }

    /// Send a message. Returns the new message's id.
    pub async fn send_message(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        body: &SendMessageRequest,
    ) -> Result<Uuid> {
        let request = self
            .authed(
                Method::POST,
                &format!("users/{user_id}/conversations/{conversation_id}/messages"),
            )
            .json(body)
            .build()?;
        crate::request(&self.client, request).await
    }

    /// Delete a message previously sent by this user.
    pub async fn delete_message(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<()> {
        let request = self
            .authed(
                Method::DELETE,
                &format!("users/{user_id}/conversations/{conversation_id}/messages/{message_id}"),
            )
            .build()?;
        crate::execute(&self.client, request).await
    }

    /// Forward a message to another conversation. Returns the target
    /// conversation.
    pub async fn forward_message(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        target_conversation_id: Uuid,
    ) -> Result<Conversation> {
        let request = self
            .authed(
                Method::POST,
                &format!(
                    "users/{user_id}/conversations/{conversation_id}/messages/{message_id}/forward"
                ),
            )
            .json(&serde_json::json!({ "content": target_conversation_id }))
            .build()?;
        crate::request(&self.client, request).await
    }

    // ---- reactions ----

    /// Toggle an emoji reaction on a message. Returns the reaction's id.
    pub async fn toggle_reaction(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<Uuid> {
        let request = self
            .authed(
                Method::POST,
                &format!(
                    "users/{user_id}/conversations/{conversation_id}/messages/{message_id}/comments"
                ),
            )
            .json(&serde_json::json!({ "emoji": emoji }))
            .build()?;
        crate::request(&self.client, request).await
    }

    /// Remove an emoji reaction from a message.
    pub async fn remove_reaction(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<()> {
        let request = self
            .authed(
                Method::DELETE,
                &format!(
                    "users/{user_id}/conversations/{conversation_id}/messages/{message_id}/comments/{emoji}"
                ),
            )
            .build()?;
        crate::execute(&self.client, request).await
    }

    // ---- contacts ----

    /// List the user's contacts.
    pub async fn contacts(&self, user_id: Uuid) -> Result<Vec<User>> {
        let request = self
            .authed(Method::GET, &format!("users/{user_id}/contacts"))
            .build()?;
        crate::request(&self.client, request).await
    }

    /// Add another user to the contact list. Returns the added contact.
    pub async fn add_contact(&self, user_id: Uuid, contact_user_id: Uuid) -> Result<User> {
        let request = self
            .authed(Method::POST, &format!("users/{user_id}/contacts"))
            .json(&serde_json::json!({ "contactUserId": contact_user_id }))
            .build()?;
        crate::request(&self.client, request).await
    }

    /// Remove a contact.
    pub async fn remove_contact(&self, user_id: Uuid, contact_id: Uuid) -> Result<()> {
        let request = self
            .authed(
                Method::DELETE,
                &format!("users/{user_id}/contacts/{contact_id}"),
            )
            .build()?;
        crate::execute(&self.client, request).await
    }
}
