//! Thin clients for the external collaborators: ballot content, AI
//! simplification / bias checks, and ZIP-to-location lookup.
//!
//! Failures here are isolated to these paths and never touch decision or
//! card state.

use reqwest::{Client as HttpClient, StatusCode};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::upstream::{
        BallotDocument, BiasCheckRequest, BiasReport, SimplifyRequest, Summary, ZipLocation,
    },
    common::UsState,
};

/// Shared HTTP client plus the configured collaborator base URLs.
pub struct Services {
    http: HttpClient,
    ballot_url: String,
    ai_url: String,
    location_url: String,
}

impl Services {
    pub fn new(config: &Config) -> Self {
        Self {
            http: HttpClient::new(),
            ballot_url: config.ballot_api_url().trim_end_matches('/').to_string(),
            ai_url: config.ai_api_url().trim_end_matches('/').to_string(),
            location_url: config.location_api_url().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the ballot document for a state (and optionally county).
    pub async fn get_ballot(
        &self,
        state: &UsState,
        county: Option<&str>,
    ) -> Result<BallotDocument> {
        let mut request = self
            .http
            .get(format!("{}/ballot", self.ballot_url))
            .query(&[("state", state.as_str())]);
        if let Some(county) = county {
            request = request.query(&[("county", county)]);
        }
        let ballot = request
            .send()
            .await?
            .error_for_status()?
            .json::<BallotDocument>()
            .await?;
        Ok(ballot)
    }

    /// Simplify a measure's text into plain-language summaries.
    pub async fn simplify(&self, request: &SimplifyRequest) -> Result<Summary> {
        let summary = self
            .http
            .post(format!("{}/simplify", self.ai_url))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<Summary>()
            .await?;
        Ok(summary)
    }

    /// Check a piece of ballot content for slanted language.
    pub async fn check_bias(&self, request: &BiasCheckRequest) -> Result<BiasReport> {
        let report = self
            .http
            .post(format!("{}/bias-check", self.ai_url))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<BiasReport>()
            .await?;
        Ok(report)
    }

    /// Resolve a ZIP code to a state and county.
    pub async fn lookup_zip(&self, zip: &str) -> Result<ZipLocation> {
        let response = self
            .http
            .get(format!("{}/zip/{}", self.location_url, zip))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::not_found(format!("ZIP code '{}'", zip)));
        }
        let location = response.error_for_status()?.json::<ZipLocation>().await?;
        Ok(location)
    }
}

/// A fairing that builds the upstream service clients from the application
/// config and places them into managed state. Depends on the config fairing
/// having run first.
pub struct ServicesFairing;

#[rocket::async_trait]
impl Fairing for ServicesFairing {
    fn info(&self) -> Info {
        Info {
            name: "Upstream Services",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.state::<Config>() {
            Some(config) => config,
            None => {
                error!("Config was not available when building service clients");
                return Err(rocket);
            }
        };
        let services = Services::new(config);
        info!("Upstream service clients ready");

        rocket = rocket.manage(services);
        Ok(rocket)
    }
}
