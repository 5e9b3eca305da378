use crate::config::DEFAULT_API_URL;
use crate::error::RelgetError;
use crate::models::Release;
use anyhow::{Context, Result};
use std::io::Write;

const USER_AGENT: &str = "relget";

/// Where releases and their assets come from.
///
/// The manager only talks to this trait, so tests can serve releases from
/// memory instead of the network.
pub trait ReleaseSource {
    /// Latest published release of `owner/name`
    fn latest_release(&self, owner: &str, name: &str) -> Result<Release>;

    /// Stream the asset at `url` into `dest`, returning the byte count
    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64>;
}

/// GitHub REST API client
pub struct GitHubClient {
    agent: ureq::Agent,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<&str>) -> Self {
        let agent = ureq::AgentBuilder::new().user_agent(USER_AGENT).build();
        Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }

    /// Release endpoint for the latest release of `owner/name`
    pub fn latest_release_url(&self, owner: &str, name: &str) -> String {
        format!("{}/repos/{owner}/{name}/releases/latest", self.api_url)
    }
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, None)
    }
}

impl ReleaseSource for GitHubClient {
    fn latest_release(&self, owner: &str, name: &str) -> Result<Release> {
        let api_url = self.latest_release_url(owner, name);
        let repo = format!("{owner}/{name}");
        log::debug!("Fetching release info from: {api_url}");

        let mut request = self
            .agent
            .get(&api_url)
            .set("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => {
                return Err(RelgetError::ReleaseNotFound(repo).into());
            }
            Err(ureq::Error::Status(status, response)) if is_rate_limited(status, &response) => {
                return Err(RelgetError::RateLimited(repo).into());
            }
            Err(ureq::Error::Status(status, _)) => {
                return Err(anyhow::anyhow!(
                    "GitHub API request for {repo} failed with status: {status}"
                ));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to fetch release info for {repo}"));
            }
        };

        let release: Release = response
            .into_json()
            .with_context(|| format!("Failed to parse GitHub release JSON for {repo}"))?;

        log::debug!(
            "Latest release of {repo} is {} with {} assets",
            release.tag_name,
            release.assets.len()
        );
        Ok(release)
    }

    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64> {
        log::debug!("Downloading: {url}");

        let response = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("Failed to download: {url}"))?;

        let bytes = std::io::copy(&mut response.into_reader(), dest)
            .with_context(|| format!("Failed to read download body: {url}"))?;

        log::debug!("Downloaded {bytes} bytes from {url}");
        Ok(bytes)
    }
}

/// GitHub signals an exhausted quota with 429, or 403 plus a zero
/// `x-ratelimit-remaining` header.
fn is_rate_limited(status: u16, response: &ureq::Response) -> bool {
    status == 429
        || (status == 403 && response.header("x-ratelimit-remaining") == Some("0"))
}
