//! Fixed-shape text encoding for task checklists.
//!
//! Wire format: a JSON array of `{"text": string, "isChecked": bool}`
//! objects in checklist order. A missing column (`NULL`) and `[]` both decode
//! to an empty checklist; the encoder always writes an array.

use crate::model::task::ChecklistItem;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChecklistItemWire {
    text: String,
    #[serde(rename = "isChecked")]
    is_checked: bool,
}

/// Checklist text could not be produced or parsed.
#[derive(Debug)]
pub struct ChecklistCodecError(serde_json::Error);

impl Display for ChecklistCodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed checklist encoding: {}", self.0)
    }
}

impl Error for ChecklistCodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

pub fn encode_checklist(items: &[ChecklistItem]) -> Result<String, ChecklistCodecError> {
    let wire = items
        .iter()
        .map(|item| ChecklistItemWire {
            text: item.text.clone(),
            is_checked: item.is_checked,
        })
        .collect::<Vec<_>>();
    serde_json::to_string(&wire).map_err(ChecklistCodecError)
}

pub fn decode_checklist(encoded: Option<&str>) -> Result<Vec<ChecklistItem>, ChecklistCodecError> {
    let Some(encoded) = encoded else {
        return Ok(Vec::new());
    };

    let wire: Option<Vec<ChecklistItemWire>> =
        serde_json::from_str(encoded).map_err(ChecklistCodecError)?;
    Ok(wire
        .unwrap_or_default()
        .into_iter()
        .map(|item| ChecklistItem {
            text: item.text,
            is_checked: item.is_checked,
        })
        .collect())
}
