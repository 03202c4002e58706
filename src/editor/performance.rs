//! Render and interaction timings with a rolling window and slow-component tally.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::services::Clock;

pub const RENDER_THRESHOLD_MS: f64 = 16.0;
pub const INPUT_THRESHOLD_MS: f64 = 50.0;
pub const LOAD_THRESHOLD_MS: f64 = 1000.0;
pub const MAX_METRICS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Render,
    Input,
    Load,
    Memory,
    Network,
}

impl MetricType {
    pub fn threshold_ms(self) -> Option<f64> {
        match self {
            MetricType::Render => Some(RENDER_THRESHOLD_MS),
            MetricType::Input => Some(INPUT_THRESHOLD_MS),
            MetricType::Load => Some(LOAD_THRESHOLD_MS),
            MetricType::Memory | MetricType::Network => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub name: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub timestamp: u64,
    pub component: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowComponent {
    pub component: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub average_render_time: f64,
    pub average_input_delay: f64,
    pub average_load_time: f64,
    pub memory_usage: Option<f64>,
    pub slow_components: Vec<SlowComponent>,
    pub metric_count: usize,
}

/// Rolling window of timing metrics plus a tally of components that went
/// over their threshold.
pub struct PerformanceMonitor {
    clock: Arc<dyn Clock>,
    marks: HashMap<String, u64>,
    metrics: VecDeque<Metric>,
    slow_components: HashMap<String, u32>,
}

impl PerformanceMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        PerformanceMonitor {
            clock,
            marks: HashMap::new(),
            metrics: VecDeque::with_capacity(MAX_METRICS),
            slow_components: HashMap::new(),
        }
    }

    pub fn mark(&mut self, id: &str) {
        self.marks.insert(id.to_string(), self.clock.now_ms());
    }

    /// Records the time elapsed since `mark(id)`. Returns `None` when no
    /// such mark exists.
    pub fn measure(&mut self, id: &str, name: &str, metric_type: MetricType, component: Option<&str>) -> Option<f64> {
        let start = self.marks.remove(id)?;
        let elapsed = self.clock.now_ms().saturating_sub(start) as f64;
        self.record(name, metric_type, elapsed, component);
        Some(elapsed)
    }

    pub fn record(&mut self, name: &str, metric_type: MetricType, value: f64, component: Option<&str>) {
        if self.metrics.len() == MAX_METRICS {
            self.metrics.pop_front();
        }
        self.metrics.push_back(Metric {
            name: name.to_string(),
            metric_type,
            value,
            timestamp: self.clock.now_ms(),
            component: component.map(str::to_string),
        });

        let over = metric_type.threshold_ms().map_or(false, |limit| value > limit);
        if let (true, Some(component)) = (over, component) {
            *self.slow_components.entry(component.to_string()).or_insert(0) += 1;
            log::debug!("Slow {:?} in {}: {:.1} ms", metric_type, component, value);
        }
    }

    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    fn average(&self, metric_type: MetricType) -> f64 {
        let values: Vec<f64> = self
            .metrics
            .iter()
            .filter(|m| m.metric_type == metric_type)
            .map(|m| m.value)
            .collect();
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }

    pub fn summary(&self) -> PerformanceSummary {
        let mut slow_components: Vec<SlowComponent> = self
            .slow_components
            .iter()
            .map(|(component, count)| SlowComponent {
                component: component.clone(),
                count: *count,
            })
            .collect();
        slow_components.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.component.cmp(&b.component)));

        PerformanceSummary {
            average_render_time: self.average(MetricType::Render),
            average_input_delay: self.average(MetricType::Input),
            average_load_time: self.average(MetricType::Load),
            memory_usage: self
                .metrics
                .iter()
                .rev()
                .find(|m| m.metric_type == MetricType::Memory)
                .map(|m| m.value),
            slow_components,
            metric_count: self.metrics.len(),
        }
    }

    pub fn clear(&mut self) {
        self.marks.clear();
        self.metrics.clear();
        self.slow_components.clear();
    }
}
