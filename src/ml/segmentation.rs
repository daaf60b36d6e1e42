/*!
 * # Customer Segmentation
 *
 * RFM (recency, frequency, monetary) analysis. Each attribute is ranked and
 * cut into quintiles, the three scores form a code such as `"545"`, and the
 * code is mapped to a segment by the first matching rule in
 * [`SEGMENT_RULES`].
 */

use crate::ml::regression::round_to;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use utoipa::ToSchema;

const RECENCY_LABELS: [u8; 5] = [5, 4, 3, 2, 1];
const ASCENDING_LABELS: [u8; 5] = [1, 2, 3, 4, 5];

/// RFM attributes of one customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub id: String,
    pub recency_days: u32,
    pub frequency: u32,
    pub monetary: f64,
}

/// Quintile scores, each between 1 and 5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfmScore {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

impl RfmScore {
    pub fn new(recency: u8, frequency: u8, monetary: u8) -> Self {
        Self {
            recency,
            frequency,
            monetary,
        }
    }

    /// The three digits concatenated, recency first
    pub fn code(&self) -> String {
        format!("{}{}{}", self.recency, self.frequency, self.monetary)
    }

    pub fn segment(&self) -> Segment {
        SEGMENT_RULES
            .iter()
            .find(|(_, rule)| rule(self))
            .map_or(Segment::NeedsAttention, |(segment, _)| *segment)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, IntoStaticStr, EnumIter,
)]
pub enum Segment {
    #[serde(rename = "Champions")]
    #[strum(serialize = "Champions")]
    Champions,
    #[serde(rename = "Loyal Customers")]
    #[strum(serialize = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalists")]
    #[strum(serialize = "Potential Loyalists")]
    PotentialLoyalists,
    #[serde(rename = "At Risk")]
    #[strum(serialize = "At Risk")]
    AtRisk,
    #[serde(rename = "Hibernating")]
    #[strum(serialize = "Hibernating")]
    Hibernating,
    #[serde(rename = "Needs Attention")]
    #[strum(serialize = "Needs Attention")]
    NeedsAttention,
}

impl Segment {
    pub fn description(&self) -> &'static str {
        match self {
            Segment::Champions => "Best customers, highest value, frequent buyers",
            Segment::LoyalCustomers => "Regular buyers, good revenue",
            Segment::PotentialLoyalists => "Recent customers with potential",
            Segment::AtRisk => "Previously active, declining engagement",
            Segment::Hibernating => "Inactive, may need win-back campaigns",
            Segment::NeedsAttention => "Average engagement, at risk of slipping without a nudge",
        }
    }

    pub fn marketing_actions(&self) -> &'static [&'static str] {
        match self {
            Segment::Champions => &[
                "VIP rewards program",
                "Early access to new products",
                "Referral bonuses",
            ],
            Segment::LoyalCustomers => &[
                "Loyalty rewards",
                "Personalized recommendations",
                "Exclusive offers",
            ],
            Segment::PotentialLoyalists => &[
                "Engagement campaigns",
                "First-purchase incentives",
                "Product bundles",
            ],
            Segment::AtRisk => &[
                "Win-back emails",
                "Special discounts",
                "Survey for feedback",
            ],
            Segment::Hibernating => &[
                "Reactivation campaigns",
                "Deep discounts",
                "Product updates",
            ],
            Segment::NeedsAttention => &[
                "Limited-time offers",
                "Recommendations based on purchase history",
                "Reactivation reminders",
            ],
        }
    }
}

type SegmentRule = fn(&RfmScore) -> bool;

/// Classification rules in precedence order; the first match wins and
/// anything left over is [`Segment::NeedsAttention`].
pub const SEGMENT_RULES: &[(Segment, SegmentRule)] = &[
    (Segment::Champions, is_champion),
    (Segment::LoyalCustomers, is_loyal),
    (Segment::PotentialLoyalists, is_potential_loyalist),
    (Segment::AtRisk, is_at_risk),
    (Segment::Hibernating, is_hibernating),
];

fn is_champion(s: &RfmScore) -> bool {
    matches!(
        (s.recency, s.frequency, s.monetary),
        (5, 5, 5) | (5, 5, 4) | (5, 4, 5) | (4, 5, 5)
    )
}

fn is_loyal(s: &RfmScore) -> bool {
    matches!(s.frequency, 4 | 5) && matches!(s.monetary, 4 | 5)
}

fn is_potential_loyalist(s: &RfmScore) -> bool {
    matches!(s.recency, 4 | 5) && matches!(s.frequency, 3 | 4)
}

fn is_at_risk(s: &RfmScore) -> bool {
    matches!(s.recency, 1 | 2) && matches!(s.frequency, 3..=5)
}

fn is_hibernating(s: &RfmScore) -> bool {
    matches!(s.recency, 1 | 2) && matches!(s.frequency, 1 | 2)
}

/// 1-based ranks in ascending value order, ties broken by input position
fn rank_first(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0; values.len()];
    for (position, &index) in order.iter().enumerate() {
        ranks[index] = position + 1;
    }
    ranks
}

/// Quintile label of every value. Values are ranked, the ranks are cut at
/// the 0/20/40/60/80/100% quantiles, duplicate edges are dropped and the
/// surviving bins take the leading labels.
pub fn quintile_scores(values: &[f64], labels: &[u8; 5]) -> Vec<u8> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let ranks = rank_first(values);
    let mut edges: Vec<f64> = (0..=5)
        .map(|k| 1.0 + ((n - 1) * k) as f64 / 5.0)
        .collect();
    edges.dedup();

    ranks
        .into_iter()
        .map(|rank| {
            let rank = rank as f64;
            // bins are right-inclusive; the first one also holds its lower edge
            let bin = edges[1..]
                .iter()
                .position(|&upper| rank <= upper)
                .unwrap_or(0);
            labels[bin.min(labels.len() - 1)]
        })
        .collect()
}

/// Score every customer against the rest of the batch
pub fn score_customers(customers: &[CustomerRecord]) -> Vec<RfmScore> {
    let recency: Vec<f64> = customers.iter().map(|c| f64::from(c.recency_days)).collect();
    let frequency: Vec<f64> = customers.iter().map(|c| f64::from(c.frequency)).collect();
    let monetary: Vec<f64> = customers.iter().map(|c| c.monetary).collect();

    let r = quintile_scores(&recency, &RECENCY_LABELS);
    let f = quintile_scores(&frequency, &ASCENDING_LABELS);
    let m = quintile_scores(&monetary, &ASCENDING_LABELS);

    r.into_iter()
        .zip(f)
        .zip(m)
        .map(|((r, f), m)| RfmScore::new(r, f, m))
        .collect()
}

/// Aggregates for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SegmentSummary {
    #[schema(example = "Champions")]
    pub name: String,
    pub count: usize,
    /// Mean days since last order, 1 decimal
    pub avg_recency: f64,
    /// Mean order count, 1 decimal
    pub avg_frequency: f64,
    /// Mean total spent, 2 decimals
    pub avg_monetary: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentationResult {
    pub segments: Vec<SegmentSummary>,
    pub characteristics: BTreeMap<String, String>,
    pub recommendations: BTreeMap<String, Vec<String>>,
}

#[derive(Default)]
struct SegmentTotals {
    count: usize,
    recency: f64,
    frequency: f64,
    monetary: f64,
}

#[derive(Debug, Default, Clone)]
pub struct CustomerSegmenter;

impl CustomerSegmenter {
    pub fn new() -> Self {
        Self
    }

    pub fn segment(&self, customers: &[CustomerRecord]) -> SegmentationResult {
        if customers.is_empty() {
            return SegmentationResult::default();
        }

        let scores = score_customers(customers);

        // keyed by label so segments come out in name order
        let mut totals: BTreeMap<&'static str, SegmentTotals> = BTreeMap::new();
        for (customer, score) in customers.iter().zip(&scores) {
            let label: &'static str = score.segment().into();
            let entry = totals.entry(label).or_default();
            entry.count += 1;
            entry.recency += f64::from(customer.recency_days);
            entry.frequency += f64::from(customer.frequency);
            entry.monetary += customer.monetary;
        }

        let segments = totals
            .into_iter()
            .map(|(name, t)| {
                let count = t.count as f64;
                SegmentSummary {
                    name: name.to_string(),
                    count: t.count,
                    avg_recency: round_to(t.recency / count, 1),
                    avg_frequency: round_to(t.frequency / count, 1),
                    avg_monetary: round_to(t.monetary / count, 2),
                }
            })
            .collect();

        SegmentationResult {
            segments,
            characteristics: Segment::iter()
                .map(|s| (s.to_string(), s.description().to_string()))
                .collect(),
            recommendations: Segment::iter()
                .map(|s| {
                    let actions = s.marketing_actions().iter().map(|a| a.to_string()).collect();
                    (s.to_string(), actions)
                })
                .collect(),
        }
    }
}
