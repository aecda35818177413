//! Typed shop API operations used by the storefront pages.

use std::sync::Arc;

use http::HeaderValue;
use http::header::SET_COOKIE;
use serde::{Deserialize, Serialize};

use crate::client::StorefrontClient;
use crate::document::Operation;
use crate::error::ClientError;
use crate::request::CallerContext;
use crate::response::WithHeaders;

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    pub id: String,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParentCollection {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent: Option<ParentCollection>,
    #[serde(default)]
    pub featured_asset: Option<Asset>,
}

impl Collection {
    /// Resized preview image of the featured asset.
    #[must_use]
    pub fn preview_url(&self, width: u32, height: u32) -> Option<String> {
        self.featured_asset
            .as_ref()
            .map(|asset| format!("{}?w={width}&h={height}", asset.preview))
    }

    /// Storefront route of the collection page.
    #[must_use]
    pub fn href(&self) -> String {
        format!("/collections/{}", self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub identifier: String,
}

/// Error result shape shared by the shop API's union error types.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    pub error_code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum NativeAuthenticationResult {
    CurrentUser(CurrentUser),
    InvalidCredentialsError(ErrorResult),
    NotVerifiedError(ErrorResult),
    NativeAuthStrategyError(ErrorResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Success {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_level_only: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionsVariables {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<CollectionListOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionList {
    pub items: Vec<Collection>,
    pub total_items: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionsData {
    pub collections: CollectionList,
}

pub struct CollectionsQuery;

impl Operation for CollectionsQuery {
    type Variables = CollectionsVariables;
    type Data = CollectionsData;

    const NAME: &'static str = "collections";
    const QUERY: &'static str = r"
        query collections($options: CollectionListOptions) {
            collections(options: $options) {
                items {
                    id
                    name
                    slug
                    parent {
                        name
                    }
                    featuredAsset {
                        id
                        preview
                    }
                }
                totalItems
            }
        }
    ";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCustomerData {
    pub active_customer: Option<Customer>,
}

pub struct ActiveCustomerQuery;

impl Operation for ActiveCustomerQuery {
    type Variables = ();
    type Data = ActiveCustomerData;

    const NAME: &'static str = "activeCustomer";
    const QUERY: &'static str = r"
        query activeCustomer {
            activeCustomer {
                id
                title
                firstName
                lastName
                emailAddress
            }
        }
    ";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInVariables {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogInData {
    pub login: NativeAuthenticationResult,
}

pub struct LogInMutation;

impl Operation for LogInMutation {
    type Variables = LogInVariables;
    type Data = LogInData;

    const NAME: &'static str = "login";
    const QUERY: &'static str = r"
        mutation login($email: String!, $password: String!, $rememberMe: Boolean) {
            login(username: $email, password: $password, rememberMe: $rememberMe) {
                __typename
                ... on CurrentUser {
                    id
                    identifier
                }
                ... on ErrorResult {
                    errorCode
                    message
                }
            }
        }
    ";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LogOutData {
    pub logout: Success,
}

pub struct LogOutMutation;

impl Operation for LogOutMutation {
    type Variables = ();
    type Data = LogOutData;

    const NAME: &'static str = "logout";
    const QUERY: &'static str = r"
        mutation logout {
            logout {
                success
            }
        }
    ";
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// One method per storefront operation, all routed through the same client.
#[derive(Debug, Clone)]
pub struct StorefrontSdk {
    client: Arc<StorefrontClient>,
}

impl StorefrontSdk {
    #[must_use]
    pub fn new(client: Arc<StorefrontClient>) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &StorefrontClient {
        &self.client
    }

    /// # Errors
    /// See [`StorefrontClient::send`].
    pub async fn collections(
        &self,
        options: Option<CollectionListOptions>,
        context: Option<&CallerContext>,
    ) -> Result<WithHeaders<CollectionList>, ClientError> {
        let resp = self
            .client
            .request::<CollectionsQuery>(&CollectionsVariables { options }, context)
            .await?;
        Ok(resp.map(|data| data.collections))
    }

    /// # Errors
    /// See [`StorefrontClient::send`].
    pub async fn active_customer(
        &self,
        context: Option<&CallerContext>,
    ) -> Result<WithHeaders<Option<Customer>>, ClientError> {
        let resp = self
            .client
            .request::<ActiveCustomerQuery>(&(), context)
            .await?;
        Ok(resp.map(|data| data.active_customer))
    }

    /// Log in with native credentials. On success the shop API issues a
    /// token that ends up in the caller's session.
    ///
    /// # Errors
    /// See [`StorefrontClient::send`]. Rejected credentials are not an
    /// error: they come back as a `NativeAuthenticationResult` variant.
    pub async fn log_in(
        &self,
        variables: &LogInVariables,
        context: Option<&CallerContext>,
    ) -> Result<WithHeaders<NativeAuthenticationResult>, ClientError> {
        let resp = self
            .client
            .request::<LogInMutation>(variables, context)
            .await?;
        Ok(resp.map(|data| data.login))
    }

    /// Log out on the shop API and drop the caller's session.
    ///
    /// # Errors
    /// See [`StorefrontClient::send`] and [`StorefrontClient::end_session`].
    pub async fn log_out(
        &self,
        context: Option<&CallerContext>,
    ) -> Result<WithHeaders<bool>, ClientError> {
        let mut resp = self
            .client
            .request::<LogOutMutation>(&(), context)
            .await?
            .map(|data| data.logout.success);

        if resp.value
            && let Some(directive) = self.client.end_session(context).await?
        {
            let directive = HeaderValue::from_str(&directive).map_err(|e| {
                ClientError::InvalidResponse(format!("Invalid session cookie: {e}"))
            })?;
            resp.headers.append(SET_COOKIE, directive);
        }
        Ok(resp)
    }
}
