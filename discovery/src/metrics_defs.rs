//! Metrics definitions for discovery.

use shared::metrics_defs::{MetricDef, MetricType};

pub const COMMANDS_RECEIVED: MetricDef = MetricDef {
    name: "commands.received",
    metric_type: MetricType::Counter,
    description: "Number of payloads taken off the command channel",
};

pub const COMMANDS_REJECTED: MetricDef = MetricDef {
    name: "commands.rejected",
    metric_type: MetricType::Counter,
    description: "Number of payloads that did not decode to a valid sol",
};

pub const RUNS_COMPLETED: MetricDef = MetricDef {
    name: "runs.completed",
    metric_type: MetricType::Counter,
    description: "Number of finished discovery runs, tagged by outcome",
};

pub const RUNS_IN_FLIGHT: MetricDef = MetricDef {
    name: "runs.in_flight",
    metric_type: MetricType::Gauge,
    description: "Number of discovery runs currently executing",
};

pub const RUN_DURATION: MetricDef = MetricDef {
    name: "run.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete a discovery run in seconds",
};

pub const PROBE_DURATION: MetricDef = MetricDef {
    name: "probe.duration",
    metric_type: MetricType::Histogram,
    description: "Time to probe every photo of a sol in seconds",
};

pub const PROBES_FAILED: MetricDef = MetricDef {
    name: "probes.failed",
    metric_type: MetricType::Counter,
    description: "Number of size probes that returned an error",
};

pub const ALL_METRICS: &[MetricDef] = &[
    COMMANDS_RECEIVED,
    COMMANDS_REJECTED,
    RUNS_COMPLETED,
    RUNS_IN_FLIGHT,
    RUN_DURATION,
    PROBE_DURATION,
    PROBES_FAILED,
];
