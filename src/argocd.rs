//! # ArgoCD API Client
//!
//! Session login and account password change against the GitOps engine's
//! HTTP API, used by the credential rotation phase.

use crate::constants;
use crate::crd::BuildCustomization;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Client for the ArgoCD API, operating on the built-in admin account
#[derive(Debug, Clone)]
pub struct ArgoCdClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordRequest<'a> {
    name: &'a str,
    current_password: &'a str,
    new_password: &'a str,
}

impl ArgoCdClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// External API base URL for the platform's routing style
    pub fn external_url(build: &BuildCustomization) -> String {
        build.service_url("argocd")
    }

    /// Open a session as the admin account, returning the bearer token
    pub async fn login(&self, password: &str) -> Result<String> {
        let url = format!("{}/api/v1/session", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&SessionRequest {
                username: constants::ARGOCD_ADMIN_USER,
                password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AdminApi {
                api: "argocd",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let session: SessionResponse = response.json().await?;
        Ok(session.token)
    }

    /// Change the admin account password using an authenticated session
    pub async fn change_admin_password(
        &self,
        token: &str,
        current: &str,
        new: &str,
    ) -> Result<()> {
        let url = format!("{}/api/v1/account/password", self.base_url);
        let response = self
            .http
            .put(&url)
            .bearer_auth(token)
            .json(&UpdatePasswordRequest {
                name: constants::ARGOCD_ADMIN_USER,
                current_password: current,
                new_password: new,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("changed argocd admin password");
            return Ok(());
        }
        Err(Error::AdminApi {
            api: "argocd",
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }
}
