use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::identifier::ProgrammeId;

pub const DEFAULT_METADATA_URL: &str = "https://www.bbc.co.uk";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Programme details needed to name a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgrammeMetadata {
    pub episode_title: String,
    pub show_title: String,
    pub episode_position: u32,
    pub series_position: u32,
}

impl ProgrammeMetadata {
    /// A programme with neither series nor episode position is a one-off.
    pub fn is_standalone(&self) -> bool {
        self.episode_position == 0 && self.series_position == 0
    }

    pub fn is_fully_numbered(&self) -> bool {
        self.episode_position != 0 && self.series_position != 0
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Unknown PID {pid}: metadata service answered {status}")]
    NotFound { pid: ProgrammeId, status: u16 },

    #[error("Request for PID {pid} failed: {source}")]
    Transport {
        pid: ProgrammeId,
        #[source]
        source: reqwest::Error,
    },

    #[error("Metadata for PID {pid} could not be decoded: {source}")]
    Decode {
        pid: ProgrammeId,
        #[source]
        source: serde_json::Error,
    },
}

/// Looks up programme metadata for an identifier.
pub trait MetadataResolver {
    fn resolve(&self, pid: &ProgrammeId) -> Result<ProgrammeMetadata, ResolveError>;
}

// Wire format of `/programmes/<pid>.json`. Only the consumed fields are modelled.
#[derive(Debug, Deserialize)]
struct ProgrammeDocument {
    programme: ProgrammeRecord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProgrammeRecord {
    position: Option<u32>,
    title: Option<String>,
    display_title: Option<DisplayTitle>,
    parent: Option<ParentRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DisplayTitle {
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ParentRecord {
    programme: Option<ParentProgramme>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ParentProgramme {
    position: Option<u32>,
}

impl From<ProgrammeRecord> for ProgrammeMetadata {
    fn from(record: ProgrammeRecord) -> Self {
        Self {
            episode_title: record.title.unwrap_or_default(),
            show_title: record
                .display_title
                .and_then(|display| display.title)
                .unwrap_or_default(),
            episode_position: record.position.unwrap_or(0),
            series_position: record
                .parent
                .and_then(|parent| parent.programme)
                .and_then(|programme| programme.position)
                .unwrap_or(0),
        }
    }
}

/// Decodes a programme document body.
pub fn parse_programme(body: &str) -> Result<ProgrammeMetadata, serde_json::Error> {
    let document: ProgrammeDocument = serde_json::from_str(body)?;
    Ok(document.programme.into())
}

/// Resolver backed by the broadcaster's public programmes endpoint.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: Client,
    base_url: String,
}

impl HttpResolver {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn programme_url(&self, pid: &ProgrammeId) -> String {
        format!("{}/programmes/{}.json", self.base_url, pid)
    }
}

impl MetadataResolver for HttpResolver {
    fn resolve(&self, pid: &ProgrammeId) -> Result<ProgrammeMetadata, ResolveError> {
        let url = self.programme_url(pid);
        debug!("Fetching {}", url);

        let transport = |source| ResolveError::Transport { pid: pid.clone(), source };

        let response = self.client.get(&url).send().map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::NotFound {
                pid: pid.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(transport)?;

        parse_programme(&body).map_err(|source| ResolveError::Decode {
            pid: pid.clone(),
            source,
        })
    }
}
