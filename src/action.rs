// SPDX-License-Identifier: GPL-3.0-or-later

use serde::Deserialize;

use crate::{
    error::{ActionError, BindError},
    markup::{Document, NodeId},
};

pub const ATTR_LISTING_ID: &str = "data-listing-id";
pub const ATTR_LISTING_URL: &str = "data-listing-url";
pub const ATTR_TARGET: &str = "data-target";
pub const ATTR_NEXT_LISTING: &str = "data-next-listing";

/// What a listing button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Reject,
    Score,
    Star,
}
impl Target {
    pub fn parse(tag: &str) -> Option<Target> {
        match tag {
            "reject" => Some(Target::Reject),
            "score" => Some(Target::Score),
            "star" => Some(Target::Star),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Target::Reject => "reject",
            Target::Score => "score",
            Target::Star => "star",
        }
    }
}

/// The two page behaviours that exist for listing actions.
///
/// `RemoveRow` fades a rejected listing out of the table. `ToggleAndAdvance`
/// keeps the row, renders the rejection as a glyph and follows the button's
/// next-listing link after every successful action.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    #[default]
    RemoveRow,
    ToggleAndAdvance,
}
impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remove-row" | "1" => Ok(Variant::RemoveRow),
            "toggle-and-advance" | "2" => Ok(Variant::ToggleAndAdvance),
            _ => Err(format!(
                "unknown variant {s:?} (expected remove-row or toggle-and-advance)"
            )),
        }
    }
}

/// Everything the controller needs to know about one button, read from the
/// markup once when the button is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonConfig {
    pub listing_id: String,
    pub button: NodeId,
    pub target: Target,
    pub endpoint: String,
    pub next_listing: Option<String>,
    /// The `tr#listing-<id>` row, if the page has one.
    pub row: Option<NodeId>,
    /// Sibling `span.score` elements of the button.
    pub score_displays: Vec<NodeId>,
}
impl ButtonConfig {
    pub fn bind(doc: &Document, listing_id: &str, button: NodeId) -> Result<Self, BindError> {
        let missing = |attribute| BindError::MissingAttribute {
            listing_id: listing_id.to_string(),
            attribute,
        };

        let endpoint = doc
            .attr(button, ATTR_LISTING_URL)
            .ok_or_else(|| missing(ATTR_LISTING_URL))?;
        let tag = doc
            .attr(button, ATTR_TARGET)
            .ok_or_else(|| missing(ATTR_TARGET))?;
        let Some(target) = Target::parse(tag) else {
            return Err(BindError::UnknownTarget {
                listing_id: listing_id.to_string(),
                target: tag.to_string(),
            });
        };

        let score_displays: Vec<NodeId> = doc
            .siblings(button)
            .into_iter()
            .filter(|&n| doc.tag(n) == "span" && doc.has_class(n, "score"))
            .collect();
        if target == Target::Score && score_displays.is_empty() {
            return Err(BindError::MissingScoreDisplay {
                listing_id: listing_id.to_string(),
            });
        }

        let next_listing = doc
            .attr(button, ATTR_NEXT_LISTING)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Ok(ButtonConfig {
            listing_id: listing_id.to_string(),
            button,
            target,
            endpoint: endpoint.to_string(),
            next_listing,
            row: doc.find_by_id(&format!("listing-{listing_id}")),
            score_displays,
        })
    }
}

/// Score as the server reports it; either a number or preformatted text.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ScoreValue {
    Integer(i64),
    Float(f64),
    Text(String),
}
impl std::fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreValue::Integer(value) => write!(f, "{value}"),
            ScoreValue::Float(value) => write!(f, "{value}"),
            ScoreValue::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ScoreResponse {
    score: ScoreValue,
}

#[derive(Deserialize, Debug)]
struct StarResponse {
    starred: bool,
}

#[derive(Deserialize, Debug)]
struct RejectResponse {
    rejected: bool,
}

/// Page change confirmed by the server for one action.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    RemoveRow,
    SetScore(ScoreValue),
    SetStarred(bool),
    SetRejected(bool),
}
impl Update {
    /// Decode a response body according to the schema of `target`.
    pub fn decode(target: Target, variant: Variant, body: &str) -> Result<Update, ActionError> {
        Ok(match (target, variant) {
            (Target::Reject, Variant::RemoveRow) => {
                serde_json::from_str::<serde_json::Value>(body)?;
                Update::RemoveRow
            }
            (Target::Reject, Variant::ToggleAndAdvance) => {
                Update::SetRejected(serde_json::from_str::<RejectResponse>(body)?.rejected)
            }
            (Target::Score, _) => Update::SetScore(serde_json::from_str::<ScoreResponse>(body)?.score),
            (Target::Star, _) => Update::SetStarred(serde_json::from_str::<StarResponse>(body)?.starred),
        })
    }
}
