//! Destination-specific recommendations derived from a profile.
//!
//! Each rule looks at one node type and is applied independently. Edges
//! are recorded on the profile but not consulted here.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{NodeType, Profile};

/// Interests beyond this many are not turned into suggestions.
pub const MAX_INTEREST_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    pub budget_considerations: Vec<String>,
    pub interest_based_suggestions: SmallVec<[String; MAX_INTEREST_SUGGESTIONS]>,
    pub visa_requirements: Vec<String>,
    pub previous_trip_insights: Vec<String>,
}

impl Recommendations {
    pub fn is_empty(&self) -> bool {
        self.budget_considerations.is_empty()
            && self.interest_based_suggestions.is_empty()
            && self.visa_requirements.is_empty()
            && self.previous_trip_insights.is_empty()
    }

    /// Categories as (label, entries) pairs, in display order.
    pub fn categories(&self) -> [(&'static str, &[String]); 4] {
        [
            ("budget_considerations", self.budget_considerations.as_slice()),
            ("interest_based_suggestions", self.interest_based_suggestions.as_slice()),
            ("visa_requirements", self.visa_requirements.as_slice()),
            ("previous_trip_insights", self.previous_trip_insights.as_slice()),
        ]
    }
}

/// Build recommendations for a trip to `destination`.
pub fn recommend(profile: &Profile, destination: &str) -> Recommendations {
    let mut out = Recommendations::default();

    if let Some(budget) = profile
        .find_node_by_type(NodeType::Budget)
        .and_then(|n| n.payload.as_budget())
    {
        let range = budget.budget_range.as_deref().unwrap_or("unspecified");
        out.budget_considerations.push(format!("Based on your budget range: {range}"));
    }

    if let Some(interests) = profile
        .find_node_by_type(NodeType::Interests)
        .and_then(|n| n.payload.as_interests())
    {
        out.interest_based_suggestions = interests
            .list()
            .iter()
            .take(MAX_INTEREST_SUGGESTIONS)
            .map(|i| format!("Focus on {} activities in {destination}", i.to_lowercase()))
            .collect();
    }

    if let Some(visa) = profile
        .find_node_by_type(NodeType::Visa)
        .and_then(|n| n.payload.as_visa())
    {
        let nationality = visa.nationality.as_deref().unwrap_or("unspecified");
        out.visa_requirements.push(format!(
            "Check visa requirements for {nationality} citizens visiting {destination}"
        ));
    }

    let destinations = profile.trip_destinations();
    if !destinations.is_empty() {
        out.previous_trip_insights
            .push(format!("Based on your previous trips to: {}", destinations.join(", ")));
    }

    out
}
