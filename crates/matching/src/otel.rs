// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! OpenTelemetry tracer initialization for the matching service
//!
//! When `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are exported to
//! that OTLP endpoint; otherwise the provider stays local and spans are
//! only visible through the tracing layer. W3C Trace Context is set as
//! the global propagator so upstream `traceparent` headers carry
//! through the broker consumers.

use anyhow::Result;
use opentelemetry::{global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator, resource::Resource, trace as sdktrace,
};

/// Service name for OpenTelemetry resource identification
const SERVICE_NAME: &str = "quasar-matching";

/// Initialize the OpenTelemetry tracer.
///
/// Sampling is `ParentBased(AlwaysOn)`: upstream sampling decisions are
/// respected, fresh traces are always sampled. Returns the tracer for
/// the tracing-opentelemetry layer.
pub fn init_tracer() -> Result<Option<sdktrace::Tracer>> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder().with_service_name(SERVICE_NAME).build();

    let provider_builder = sdktrace::SdkTracerProvider::builder()
        .with_sampler(sdktrace::Sampler::ParentBased(Box::new(
            sdktrace::Sampler::AlwaysOn,
        )))
        .with_resource(resource);

    let provider = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok() {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()?;
            provider_builder.with_batch_exporter(exporter).build()
        }
        None => provider_builder.build(),
    };

    let tracer = provider.tracer(SERVICE_NAME);
    global::set_tracer_provider(provider);

    Ok(Some(tracer))
}
