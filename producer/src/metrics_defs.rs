use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS_CAPTURED: MetricDef = MetricDef {
    name: "requests.captured",
    metric_type: MetricType::Counter,
    description: "Number of requests captured and published to the stream",
};

pub const REQUESTS_REJECTED: MetricDef = MetricDef {
    name: "requests.rejected",
    metric_type: MetricType::Counter,
    description: "Number of requests that failed. Tagged with reason.",
};

pub const REQUESTS_PASSTHROUGH: MetricDef = MetricDef {
    name: "requests.passthrough",
    metric_type: MetricType::Counter,
    description: "Number of requests forwarded synchronously to their destination",
};

pub const REQUEST_BODY_SIZE: MetricDef = MetricDef {
    name: "request.body_size",
    metric_type: MetricType::Histogram,
    description: "Size in bytes of captured request bodies",
};

pub const PUBLISH_DURATION: MetricDef = MetricDef {
    name: "publish.duration",
    metric_type: MetricType::Histogram,
    description: "Time to append a record to the stream in seconds",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUESTS_CAPTURED,
    REQUESTS_REJECTED,
    REQUESTS_PASSTHROUGH,
    REQUEST_BODY_SIZE,
    PUBLISH_DURATION,
    REQUESTS_INFLIGHT,
];
