//! # DevFlow API
//!
//! Typed endpoint groups over a [`FetchClient`]. Each call resolves to an
//! [`ActionResponse`] and inherits the client's caching, retry and stats
//! behavior.

pub mod models;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::FetchClient;
use crate::dispatcher::FetchOptions;
use crate::envelope::{handle_error, ActionResponse};
use crate::error::FetchError;

pub use models::{
    Account, AccountInput, AiAnswerData, AiAnswerRequest, AuthProvider, Author, OAuthUser,
    Pagination, Question, SignInWithOAuthParams, SocialLinks, Tag, User, UserInput,
};

/// Entry point to the backend's endpoint groups
#[derive(Debug, Clone)]
pub struct DevflowApi {
    client: FetchClient,
}

impl DevflowApi {
    pub fn new(client: FetchClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi {
            client: &self.client,
        }
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi {
            client: &self.client,
        }
    }

    pub fn accounts(&self) -> AccountsApi<'_> {
        AccountsApi {
            client: &self.client,
        }
    }

    pub fn ai(&self) -> AiApi<'_> {
        AiApi {
            client: &self.client,
        }
    }
}

/// Send a JSON payload with the given method
async fn send_json<T, B>(
    client: &FetchClient,
    path: &str,
    build: fn(Value) -> FetchOptions,
    body: &B,
) -> ActionResponse<T>
where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
{
    match serde_json::to_value(body) {
        Ok(body) => client.fetch_path(path, build(body)).await,
        Err(e) => handle_error(&FetchError::InvalidRequest(format!(
            "unserializable request body: {e}"
        ))),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a FetchClient,
}

impl AuthApi<'_> {
    pub async fn oauth_sign_in(&self, params: &SignInWithOAuthParams) -> ActionResponse<Value> {
        send_json(self.client, "/auth/oauth-signin", FetchOptions::post, params).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UsersApi<'a> {
    client: &'a FetchClient,
}

impl UsersApi<'_> {
    pub async fn get_all(&self) -> ActionResponse<Vec<User>> {
        self.client.fetch_path("/users", FetchOptions::get()).await
    }

    pub async fn get_by_id(&self, id: &str) -> ActionResponse<User> {
        self.client
            .fetch_path(&format!("/users/{id}"), FetchOptions::get())
            .await
    }

    pub async fn get_by_email(&self, email: &str) -> ActionResponse<User> {
        self.client
            .fetch_path("/users/email/", FetchOptions::post(json!({ "email": email })))
            .await
    }

    pub async fn create(&self, user: &UserInput) -> ActionResponse<User> {
        send_json(self.client, "/users", FetchOptions::post, user).await
    }

    pub async fn update(&self, id: &str, user: &UserInput) -> ActionResponse<User> {
        send_json(self.client, &format!("/users/{id}"), FetchOptions::put, user).await
    }

    pub async fn delete(&self, id: &str) -> ActionResponse<Value> {
        self.client
            .fetch_path(&format!("/users/{id}"), FetchOptions::delete())
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AccountsApi<'a> {
    client: &'a FetchClient,
}

impl AccountsApi<'_> {
    pub async fn get_all(&self) -> ActionResponse<Vec<Account>> {
        self.client.fetch_path("/accounts", FetchOptions::get()).await
    }

    pub async fn get_by_id(&self, id: &str) -> ActionResponse<Account> {
        self.client
            .fetch_path(&format!("/accounts/{id}"), FetchOptions::get())
            .await
    }

    pub async fn get_by_provider(&self, provider_account_id: &str) -> ActionResponse<Account> {
        self.client
            .fetch_path(
                "/accounts/provider",
                FetchOptions::post(json!({ "providerAccountId": provider_account_id })),
            )
            .await
    }

    pub async fn create(&self, account: &AccountInput) -> ActionResponse<Account> {
        send_json(self.client, "/accounts", FetchOptions::post, account).await
    }

    pub async fn update(&self, id: &str, account: &AccountInput) -> ActionResponse<Account> {
        send_json(
            self.client,
            &format!("/accounts/{id}"),
            FetchOptions::put,
            account,
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> ActionResponse<Value> {
        self.client
            .fetch_path(&format!("/accounts/{id}"), FetchOptions::delete())
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AiApi<'a> {
    client: &'a FetchClient,
}

impl AiApi<'_> {
    pub async fn get_answer(
        &self,
        question: &str,
        content: &str,
        user_answer: &str,
    ) -> ActionResponse<AiAnswerData> {
        let request = AiAnswerRequest {
            question: question.to_string(),
            content: content.to_string(),
            user_answer: user_answer.to_string(),
        };
        send_json(self.client, "/ai/answers", FetchOptions::post, &request).await
    }
}
