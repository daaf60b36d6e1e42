use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    metrics::ANALYTICS_METRICS,
    ml::{CustomerRecord, CustomerSegmenter, SegmentSummary},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CustomerSegmentation {
    pub segments: Vec<SegmentSummary>,
    /// Description per segment name
    pub characteristics: BTreeMap<String, String>,
    /// Marketing actions per segment name
    pub recommendations: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SegmentationService {
    segmenter: CustomerSegmenter,
}

impl SegmentationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn segment(&self, customers: Vec<CustomerRecord>) -> CustomerSegmentation {
        info!(customers = customers.len(), "Segmenting customers");

        let started = Instant::now();
        let result = self.segmenter.segment(&customers);
        ANALYTICS_METRICS.record_segmentation(customers.len(), started.elapsed());

        CustomerSegmentation {
            segments: result.segments,
            characteristics: result.characteristics,
            recommendations: result.recommendations,
        }
    }
}
