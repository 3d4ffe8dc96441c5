//! REST API explorer.
//!
//! Logs in, walks the user/conversation/message endpoints, and exercises
//! send and delete against the first conversation found.
//!
//! Run with tracing enabled:
//! ```sh
//! CHAT_BASE_URL=http://localhost:3000 CHAT_USERNAME=alice \
//!     RUST_LOG=info cargo run --example conversations
//! ```

use chat_client_sdk::api::Client;
use chat_client_sdk::api::types::request::SendMessageRequest;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let base_url =
        std::env::var("CHAT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let username = std::env::var("CHAT_USERNAME").unwrap_or_else(|_| "demo".to_owned());

    let client = Client::new(&base_url)?;

    match client.liveness().await {
        Ok(()) => info!(endpoint = "liveness", "service is up"),
        Err(e) => error!(endpoint = "liveness", error = %e),
    }

    let identity = client.login(&username).await?;
    info!(endpoint = "session", user = %identity.name, id = %identity.identifier);

    match client.users().await {
        Ok(users) => {
            info!(endpoint = "users", count = users.len());
            for user in users.iter().take(5) {
                info!(endpoint = "users", id = %user.id, username = %user.username);
            }
        }
        Err(e) => error!(endpoint = "users", error = %e),
    }

    match client.contacts(identity.identifier).await {
        Ok(contacts) => info!(endpoint = "contacts", count = contacts.len()),
        Err(e) => error!(endpoint = "contacts", error = %e),
    }

    let conversations = client.conversations(identity.identifier).await?;
    info!(endpoint = "conversations", count = conversations.len());

    let Some(conversation) = conversations.first() else {
        info!("no conversations yet, nothing more to show");
        return Ok(());
    };

    info!(
        endpoint = "conversations",
        id = %conversation.id,
        name = %conversation.name,
        unread = conversation.unread_count
    );

    match client
        .conversation(identity.identifier, conversation.id)
        .await
    {
        Ok(details) => info!(
            endpoint = "conversation",
            id = %details.id,
            participants = details.participants.len()
        ),
        Err(e) => error!(endpoint = "conversation", error = %e),
    }

    match client
        .messages(identity.identifier, conversation.id)
        .await
    {
        Ok(messages) => {
            info!(endpoint = "messages", count = messages.len());
            if let Some(message) = messages.last() {
                info!(
                    endpoint = "messages",
                    id = %message.id,
                    sender = %message.sender_username,
                    text = %message.text
                );
            }
        }
        Err(e) => error!(endpoint = "messages", error = %e),
    }

    // Send a message, then clean it up again
    let request = SendMessageRequest::builder()
        .content("hello from chat-client-sdk")
        .build();
    match client
        .send_message(identity.identifier, conversation.id, &request)
        .await
    {
        Ok(message_id) => {
            info!(endpoint = "send_message", id = %message_id);
            match client
                .delete_message(identity.identifier, conversation.id, message_id)
                .await
            {
                Ok(()) => info!(endpoint = "delete_message", id = %message_id),
                Err(e) => error!(endpoint = "delete_message", error = %e),
            }
        }
        Err(e) => error!(endpoint = "send_message", error = %e),
    }

    Ok(())
}
