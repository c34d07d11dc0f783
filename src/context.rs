//! Profile context: the flat map handed to prompt templating.

use serde::{Deserialize, Serialize};

use crate::model::Profile;
use crate::summary::{ProfileData, Summary};

/// `{budget?, interests?, nationality?, previous_trips?}`; absent fields
/// are omitted rather than null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_trips: Option<Vec<String>>,
}

impl ProfileContext {
    pub fn from_profile(profile: &Profile) -> Self {
        let summary = crate::summary::summarize(profile);
        Self::from_summary(&summary, profile.trip_destinations())
    }

    /// Combine a summary's projected fields with trip destinations.
    pub fn from_summary(summary: &Summary, trip_destinations: Vec<String>) -> Self {
        let ProfileData { budget, interests, nationality } = summary.profile_data.clone();
        Self {
            budget,
            interests,
            nationality,
            previous_trips: (!trip_destinations.is_empty()).then_some(trip_destinations),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.budget.is_none()
            && self.interests.is_none()
            && self.nationality.is_none()
            && self.previous_trips.is_none()
    }

    /// The context as a JSON object.
    pub fn to_json(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
