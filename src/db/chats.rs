use sqlx::Row;

use super::repository::{
    increment_revision_tx, new_id, now_rfc3339, parse_json_array, to_json, Repository,
};
use crate::errors::AppError;
use crate::models::{Chat, CreateChatRequest, Message, UnreadCount};

const CHAT_COLUMNS: &str =
    "id, customer_id, vendor_id, order_id, messages, last_message_at, created_at, updated_at, version";

impl Repository {
    /// Chats a user takes part in, most recently active first.
    pub async fn list_chats(&self, participant_id: &str) -> Result<Vec<Chat>, AppError> {
        let sql = format!(
            r#"SELECT {} FROM chats
               WHERE customer_id = ?1 OR vendor_id = ?1
               ORDER BY COALESCE(last_message_at, created_at) DESC"#,
            CHAT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(participant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(chat_from_row).collect())
    }

    pub async fn get_chat(&self, id: &str) -> Result<Option<Chat>, AppError> {
        let sql = format!("SELECT {} FROM chats WHERE id = ?", CHAT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(chat_from_row))
    }

    /// Open a conversation, or return the one that already exists for the same
    /// customer, vendor and order.
    ///
    /// The boolean is true when a new chat was created.
    pub async fn create_chat(&self, request: &CreateChatRequest) -> Result<(Chat, bool), AppError> {
        let sql = format!(
            "SELECT {} FROM chats WHERE customer_id = ? AND vendor_id = ? AND order_id IS ?",
            CHAT_COLUMNS
        );
        let existing = sqlx::query(&sql)
            .bind(&request.customer_id)
            .bind(&request.vendor_id)
            .bind(&request.order_id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = existing {
            return Ok((chat_from_row(&row), false));
        }

        if request.customer_id == request.vendor_id {
            return Err(AppError::Validation(
                "A chat needs two different participants".to_string(),
            ));
        }
        self.get_user(&request.customer_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown user {}", request.customer_id)))?;
        self.require_vendor(&request.vendor_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => {
                    AppError::Validation(format!("Unknown vendor {}", request.vendor_id))
                }
                other => other,
            })?;

        let id = new_id();
        let now = now_rfc3339();

        sqlx::query(
            "INSERT INTO chats (id, customer_id, vendor_id, order_id, messages, created_at, updated_at, version) VALUES (?, ?, ?, ?, '[]', ?, ?, 1)"
        )
        .bind(&id)
        .bind(&request.customer_id)
        .bind(&request.vendor_id)
        .bind(&request.order_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        let chat = Chat {
            id,
            customer_id: request.customer_id.clone(),
            vendor_id: request.vendor_id.clone(),
            order_id: request.order_id.clone(),
            messages: Vec::new(),
            last_message_at: None,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        };
        Ok((chat, true))
    }

    /// Append a message. Only the chat's customer or vendor may post.
    pub async fn post_message(
        &self,
        chat_id: &str,
        sender_id: &str,
        body: &str,
    ) -> Result<Chat, AppError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::Validation("Message body is required".to_string()));
        }

        self.edit_messages(chat_id, sender_id, |chat, now| {
            chat.messages.push(Message {
                id: new_id(),
                sender_id: sender_id.to_string(),
                body: body.to_string(),
                sent_at: now.to_string(),
                read: false,
            });
            chat.last_message_at = Some(now.to_string());
            true
        })
        .await
    }

    /// Mark every message the other participant sent as read.
    pub async fn mark_chat_read(&self, chat_id: &str, reader_id: &str) -> Result<Chat, AppError> {
        self.edit_messages(chat_id, reader_id, |chat, _| {
            if chat.unread_for(reader_id) == 0 {
                return false;
            }
            for message in chat.messages.iter_mut() {
                if message.sender_id != reader_id {
                    message.read = true;
                }
            }
            true
        })
        .await
    }

    /// Unread messages addressed to a participant across all their chats.
    pub async fn unread_count(&self, participant_id: &str) -> Result<UnreadCount, AppError> {
        let chats = self.list_chats(participant_id).await?;
        Ok(UnreadCount {
            participant_id: participant_id.to_string(),
            unread: chats.iter().map(|c| c.unread_for(participant_id)).sum(),
        })
    }

    /// Read, change and write a chat's messages under the database write lock.
    ///
    /// `edit` returns false when it left the chat untouched; nothing is written then.
    async fn edit_messages<F>(&self, chat_id: &str, actor_id: &str, edit: F) -> Result<Chat, AppError>
    where
        F: FnOnce(&mut Chat, &str) -> bool,
    {
        let mut tx = self.pool.begin().await?;

        // Writing first takes the lock, so concurrent edits queue instead of conflicting.
        increment_revision_tx(&mut tx).await?;

        let sql = format!("SELECT {} FROM chats WHERE id = ?", CHAT_COLUMNS);
        let mut chat = sqlx::query(&sql)
            .bind(chat_id)
            .fetch_optional(&mut *tx)
            .await?
            .as_ref()
            .map(chat_from_row)
            .ok_or_else(|| AppError::not_found("Chat", chat_id))?;
        if !chat.has_participant(actor_id) {
            return Err(AppError::Forbidden(format!(
                "User {} is not part of chat {}",
                actor_id, chat_id
            )));
        }

        let now = now_rfc3339();
        if !edit(&mut chat, &now) {
            return Ok(chat);
        }

        chat.version += 1;
        chat.updated_at = now;
        sqlx::query(
            "UPDATE chats SET messages = ?, last_message_at = ?, updated_at = ?, version = ? WHERE id = ?",
        )
        .bind(to_json(&chat.messages))
        .bind(&chat.last_message_at)
        .bind(&chat.updated_at)
        .bind(chat.version)
        .bind(&chat.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(chat)
    }
}

fn chat_from_row(row: &sqlx::sqlite::SqliteRow) -> Chat {
    let messages: String = row.get("messages");
    Chat {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        vendor_id: row.get("vendor_id"),
        order_id: row.get("order_id"),
        messages: parse_json_array(&messages),
        last_message_at: row.get("last_message_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
