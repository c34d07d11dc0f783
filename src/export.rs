//! CSV export: a profile summary followed by the user's stored plans.
//!
//! ```text
//! Profile Field,Value
//! User ID,...            ← summary block
//!
//! Trip #,Destination,... ← one row per plan, nested fields flattened
//! ```
//!
//! Read-only: nothing here writes back to a profile.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::recommend::Recommendations;
use crate::summary::Summary;
use crate::Result;

const PLAN_HEADER: [&str; 10] = [
    "Trip #",
    "Destination",
    "Dates",
    "Budget",
    "Flights",
    "Hotels",
    "Itinerary",
    "Budget Analysis",
    "Travel Tips",
    "Recommendations",
];

// ============================================================================
// Plan records (supplied by the caller)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub name: String,
    #[serde(default)]
    pub price: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: String,
    #[serde(default)]
    pub activities: Vec<String>,
}

/// Generated content of a stored plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanDetails {
    pub flights: Vec<String>,
    pub hotels: Vec<Hotel>,
    pub itinerary: Vec<DayPlan>,
    /// (category, amount) pairs, e.g. `("food", "280")`.
    pub budget_analysis: Vec<(String, String)>,
    /// (category, tips) pairs, e.g. `("safety", ["Use official taxi stands"])`.
    pub travel_tips: Vec<(String, Vec<String>)>,
    pub recommendations: Option<Recommendations>,
}

/// A stored travel plan as the hosting application keeps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelPlan {
    pub destination: String,
    #[serde(default)]
    pub checkin_date: Option<String>,
    #[serde(default)]
    pub checkout_date: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub details: PlanDetails,
}

// ============================================================================
// Export
// ============================================================================

/// Write `summary` and `plans` as CSV with `\r\n` row terminators.
pub fn export_csv(summary: &Summary, plans: &[TravelPlan], writer: &mut dyn Write) -> Result<()> {
    let user_id = summary.user_id.as_deref().unwrap_or_default();
    let created = summary.created_at.map(|t| t.to_rfc3339()).unwrap_or_default();
    let updated = summary.last_updated.map(|t| t.to_rfc3339()).unwrap_or_default();

    let mut out = csv_writer(&mut *writer);
    out.write_record(["Profile Field", "Value"])?;
    out.write_record(["User ID", user_id])?;
    out.write_record(["Created At", created.as_str()])?;
    out.write_record(["Last Updated", updated.as_str()])?;
    out.write_record(["Node Count", summary.node_count.to_string().as_str()])?;
    out.write_record(["Edge Count", summary.edge_count.to_string().as_str()])?;

    let data = &summary.profile_data;
    if let Some(budget) = &data.budget {
        out.write_record(["Budget", budget.as_str()])?;
    }
    if let Some(interests) = &data.interests {
        out.write_record(["Interests", interests.join(", ").as_str()])?;
    }
    if let Some(nationality) = &data.nationality {
        out.write_record(["Nationality", nationality.as_str()])?;
    }
    out.flush()?;
    drop(out);

    // An empty record would be written as `""`; the separator row is bare.
    writer.write_all(b"\r\n")?;

    let mut out = csv_writer(&mut *writer);
    out.write_record(PLAN_HEADER)?;
    for (idx, plan) in plans.iter().enumerate() {
        out.write_record(plan_row(idx + 1, plan))?;
    }
    out.flush()?;
    Ok(())
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer)
}

/// One plan flattened into the ten `PLAN_HEADER` columns.
fn plan_row(number: usize, plan: &TravelPlan) -> [String; 10] {
    let d = &plan.details;
    let dates = format!(
        "{} to {}",
        plan.checkin_date.as_deref().unwrap_or_default(),
        plan.checkout_date.as_deref().unwrap_or_default(),
    );
    let hotels: Vec<String> = d.hotels.iter().map(|h| format!("{} ({})", h.name, h.price)).collect();
    let itinerary: Vec<String> = d
        .itinerary
        .iter()
        .map(|day| format!("{}: {}", day.day, day.activities.join(", ")))
        .collect();
    let budget_analysis: Vec<String> =
        d.budget_analysis.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    let tips: Vec<String> = d
        .travel_tips
        .iter()
        .map(|(k, v)| format!("{k}: {}", v.join(", ")))
        .collect();
    let recommendations: Vec<String> = d
        .recommendations
        .iter()
        .flat_map(|r| r.categories())
        .filter(|(_, entries)| !entries.is_empty())
        .map(|(k, entries)| format!("{k}: {}", entries.join(", ")))
        .collect();

    [
        number.to_string(),
        plan.destination.clone(),
        dates,
        plan.budget.clone().unwrap_or_default(),
        d.flights.join("; "),
        hotels.join("; "),
        itinerary.join(" | "),
        budget_analysis.join("; "),
        tips.join("; "),
        recommendations.join("; "),
    ]
}
