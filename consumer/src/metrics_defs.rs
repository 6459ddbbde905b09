use shared::metrics_defs::{MetricDef, MetricType};

pub const REPLAYS: MetricDef = MetricDef {
    name: "replays",
    metric_type: MetricType::Counter,
    description: "Number of replay attempts. Tagged with outcome.",
};

pub const REPLAY_DURATION: MetricDef = MetricDef {
    name: "replay.duration",
    metric_type: MetricType::Histogram,
    description: "Time to replay a request and drain its response in seconds",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of deliveries currently being processed",
};

pub const ALL_METRICS: &[MetricDef] = &[REPLAYS, REPLAY_DURATION, REQUESTS_INFLIGHT];
