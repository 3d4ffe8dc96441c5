//! Client for the chat REST API.
//!
//! All state-changing and listing operations of the service are exposed
//! here; [`crate::realtime`] covers the push side.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/session` | `POST` | Log in, registering the username on first use |
//! | `/liveness` | `GET` | Health check |
//! | `/users` | `GET` | List all users |
//! | `/users/{id}` | `PUT` | Change username |
//! | `/users/{id}/photo` | `PUT` | Change profile picture |
//! | `/users/{id}/conversations` | `GET`/`POST` | List or create conversations |
//! | `/users/{id}/conversations/{cid}` | `GET` | Conversation details |
//! | `/users/{id}/conversations/{cid}/name` | `PUT` | Rename a group |
//! | `/users/{id}/conversations/{cid}/photo` | `PUT` | Change a group's picture |
//! | `/users/{id}/conversations/{cid}/members` | `POST`/`DELETE` | Add a member / leave |
//! | `/users/{id}/conversations/{cid}/messages` | `GET`/`POST` | List or send messages |
//! | `/users/{id}/conversations/{cid}/messages/{mid}` | `DELETE` | Delete a message |
//! | `/users/{id}/conversations/{cid}/messages/{mid}/forward` | `POST` | Forward a message |
//! | `/users/{id}/conversations/{cid}/messages/{mid}/comments` | `POST` | Toggle a reaction |
//! | `/users/{id}/conversations/{cid}/messages/{mid}/comments/{emoji}` | `DELETE` | Remove a reaction |
//! | `/users/{id}/contacts` | `GET`/`POST` | List or add contacts |
//! | `/users/{id}/contacts/{cid}` | `DELETE` | Remove a contact |
//!
//! Authentication is a bearer token equal to the user identifier returned
//! by `POST /session`; only `/session` and `/liveness` are public.

pub mod client;
pub mod types;

pub use client::Client;
