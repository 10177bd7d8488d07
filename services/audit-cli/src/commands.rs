//! Subcommand dispatch onto the domain API

use audit_api::{AuditApi, AuthResponse, LoginCredentials, RegisterData};
use audit_client::{Error, Result};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::Command;

/// Run one subcommand and return what to print on success.
pub async fn execute(api: &AuditApi, command: Command) -> Result<Value> {
    match command {
        Command::Login { email, password } => {
            let auth = api.auth.login(&LoginCredentials { email, password }).await?;
            Ok(signed_in(&auth))
        }
        Command::Register {
            email,
            password,
            firstname,
            lastname,
        } => {
            let auth = api
                .auth
                .register(&RegisterData {
                    email,
                    password,
                    firstname,
                    lastname,
                })
                .await?;
            Ok(signed_in(&auth))
        }
        Command::Logout => {
            api.auth.logout().await?;
            Ok(json!({ "loggedOut": true }))
        }
        Command::Whoami => to_json(&api.auth.profile().await?),
        Command::Chats => to_json(&api.chat.list_conversations().await?),
        Command::CreateChat { name } => to_json(&api.chat.create_chat(&name).await?),
        Command::Send { chat_id, prompt } => {
            to_json(&api.chat.send_message(&chat_id, &prompt).await?)
        }
        Command::Messages { chat_id } => {
            to_json(&api.chat.conversation_messages(&chat_id).await?)
        }
        Command::Users => to_json(&api.users.all_users().await?),
        Command::UserStatus { user_id, active } => {
            to_json(&api.users.update_user_status(&user_id, active).await?)
        }
        Command::DeleteChat { chat_id } => {
            to_json(&api.chat.delete_conversation(&chat_id).await?)
        }
    }
}

/// Login output: the user, never the tokens.
fn signed_in(auth: &AuthResponse) -> Value {
    json!({ "user": auth.user })
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Payload(format!("encoding output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_auth::{Session, TokenStore};
    use audit_client::{ApiClient, ClientConfig, HttpClient, RetryPolicy};
    use audit_limiter::Presets;
    use axum::Json;
    use axum::routing::{get, post};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn start_server(app: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn audit_api(base: String) -> (AuditApi, Arc<Session>) {
        let session = Arc::new(Session::new(Arc::new(TokenStore::in_memory())));
        let core = HttpClient::new(
            ClientConfig {
                base_url: base,
                timeout: Duration::from_secs(5),
            },
            session.clone(),
        )
        .unwrap();
        let api = ApiClient::new(Arc::new(core), RetryPolicy::new(1, Duration::from_millis(1)));
        (AuditApi::new(api, &Presets::default()), session)
    }

    #[tokio::test]
    async fn login_output_omits_tokens() {
        let app = axum::Router::new().route(
            "/auth/login",
            post(|| async {
                Json(json!({
                    "user": { "_id": "1", "firstname": "Ada", "lastname": "L", "email": "a@b.c" },
                    "token": "at_secret",
                    "refreshToken": "rt_secret"
                }))
            }),
        );
        let (api, session) = audit_api(start_server(app).await).await;

        let output = execute(
            &api,
            Command::Login {
                email: "a@b.c".into(),
                password: "pw".into(),
            },
        )
        .await
        .unwrap();

        let printed = output.to_string();
        assert!(printed.contains("Ada"));
        assert!(!printed.contains("at_secret"));
        assert!(!printed.contains("rt_secret"));
        assert!(session.is_authenticated().await);
    }

    #[tokio::test]
    async fn chats_prints_conversations() {
        let app = axum::Router::new().route(
            "/chat/list",
            get(|| async {
                Json(json!([{ "_id": "chat_1", "chatName": "Audit", "createdAt": "t" }]))
            }),
        );
        let (api, _) = audit_api(start_server(app).await).await;

        let output = execute(&api, Command::Chats).await.unwrap();
        assert_eq!(output[0]["id"], "chat_1");
        assert_eq!(output[0]["title"], "Audit");
    }

    #[tokio::test]
    async fn invalid_chat_name_reports_field() {
        let (api, _) = audit_api(start_server(axum::Router::new()).await).await;

        let err = execute(&api, Command::CreateChat { name: "x".into() })
            .await
            .unwrap_err();
        let normalized = audit_client::normalize(&err);
        assert_eq!(normalized.code, audit_client::ErrorCode::ValidationError);
        assert_eq!(normalized.field.as_deref(), Some("chatName"));
    }
}
