use serde::{Deserialize, Serialize};

use crate::error::CommandLayerError;

/// Structured output of intent interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_query: Option<String>,
}

/// What a [`CommandResult`] resolves to after applying the priority rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapIntent {
    Location(String),
    Directions { origin: String, destination: String },
    None,
}

impl CommandResult {
    pub fn location<S: Into<String>>(query: S) -> Self {
        Self {
            location_query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn directions<O: Into<String>, D: Into<String>>(origin: O, destination: D) -> Self {
        Self {
            origin_query: Some(origin.into()),
            destination_query: Some(destination.into()),
            ..Self::default()
        }
    }

    /// Parses the arguments of the interpreter's map tool call.
    pub fn from_tool_args(args: serde_json::Value) -> Result<Self, CommandLayerError> {
        serde_json::from_value(args)
            .map_err(|err| CommandLayerError::InvalidCommand(err.to_string()))
    }

    /// location > origin+destination > destination alone. Blank fields are absent.
    pub fn intent(&self) -> MapIntent {
        let location = non_blank(&self.location_query);
        let origin = non_blank(&self.origin_query);
        let destination = non_blank(&self.destination_query);

        match (location, origin, destination) {
            (Some(location), _, _) => MapIntent::Location(location.to_string()),
            (None, Some(origin), Some(destination)) => MapIntent::Directions {
                origin: origin.to_string(),
                destination: destination.to_string(),
            },
            (None, None, Some(destination)) => MapIntent::Location(destination.to_string()),
            _ => MapIntent::None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
