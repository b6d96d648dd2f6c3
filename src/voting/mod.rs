pub mod chart;
pub mod style;
pub mod table;

use crate::models::VoteValue;
use serde::{Deserialize, Serialize};

pub use chart::generate_chart_data;
pub use style::{vote_style, VoteStyle};
pub use table::VoteTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    HorizontalBar,
    StackedBar,
    Pie,
    Doughnut,
    Line,
}

// One dataset of the chart: a vote value and its amount per option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub value: VoteValue,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub chart_type: ChartType,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    pub fn total(&self) -> f64 {
        self.series.iter().flat_map(|series| series.data.iter()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
