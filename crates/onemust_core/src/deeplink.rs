//! Custom URL scheme routes used by the widget to open the main app.
//!
//! # Responsibility
//! - Parse `onemust://` URLs into typed routes.
//! - Render routes back to their canonical URL.
//!
//! # Invariants
//! - `parse_deep_link(link.to_url()) == Ok(link)` for every route.

use crate::model::card::CardId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use url::Url;
use uuid::Uuid;

pub const DEEP_LINK_SCHEME: &str = "onemust";

/// Route requested by a widget tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepLink {
    /// Open the capture composer.
    Capture,
    /// Open one card by id.
    OpenCard(CardId),
}

impl DeepLink {
    pub fn to_url(self) -> String {
        match self {
            Self::Capture => format!("{DEEP_LINK_SCHEME}://capture"),
            Self::OpenCard(id) => format!("{DEEP_LINK_SCHEME}://card/{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkError {
    Malformed(String),
    UnsupportedScheme(String),
    UnknownRoute(String),
    InvalidCardId(String),
}

impl Display for DeepLinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "malformed deep link: {message}"),
            Self::UnsupportedScheme(scheme) => write!(f, "unsupported deep link scheme `{scheme}`"),
            Self::UnknownRoute(route) => write!(f, "unknown deep link route `{route}`"),
            Self::InvalidCardId(value) => write!(f, "invalid card id `{value}` in deep link"),
        }
    }
}

impl Error for DeepLinkError {}

/// Parses a deep link. Route names are case-insensitive; trailing slashes are ignored.
pub fn parse_deep_link(raw: &str) -> Result<DeepLink, DeepLinkError> {
    let url = Url::parse(raw.trim()).map_err(|err| DeepLinkError::Malformed(err.to_string()))?;
    if url.scheme() != DEEP_LINK_SCHEME {
        return Err(DeepLinkError::UnsupportedScheme(url.scheme().to_string()));
    }

    // `onemust://card/<id>` puts the route in the host; `onemust:card/<id>`
    // leaves it in the path. Accept both.
    let mut segments = url
        .host_str()
        .into_iter()
        .chain(url.path().split('/'))
        .filter(|segment| !segment.is_empty());

    let route = segments.next().unwrap_or_default().to_ascii_lowercase();
    match route.as_str() {
        "capture" | "new" => Ok(DeepLink::Capture),
        "card" => {
            let raw_id = segments.next().unwrap_or_default();
            Uuid::parse_str(raw_id)
                .map(DeepLink::OpenCard)
                .map_err(|_| DeepLinkError::InvalidCardId(raw_id.to_string()))
        }
        _ => Err(DeepLinkError::UnknownRoute(route)),
    }
}
