/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fhir_streamer::{
    BrokerClient, BrokerError, CorrelationContextBuilder, DescriptorTable, InboundMessage,
    IngestionRouter, PublishRecord, RouterConfig, RuntimeIds,
};
use std::sync::Arc;
use tokio::runtime::Builder;

const BODY: &str = r#"{"resourceType":"Patient","id":"42","active":true}"#;

struct DiscardingBroker;

#[async_trait]
impl BrokerClient for DiscardingBroker {
    async fn publish(&self, record: PublishRecord) -> Result<(), BrokerError> {
        black_box(record);
        Ok(())
    }
}

fn ingest_criterion(c: &mut Criterion) {
    let runtime = Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("benchmark runtime should build");

    let table = Arc::new(DescriptorTable::builtin().expect("builtin table should validate"));

    let mut lookup_group = c.benchmark_group("descriptor_table");
    lookup_group.bench_function("lookup_mixed_case", |b| {
        b.iter(|| {
            let descriptor = table.lookup(black_box("/Patient")).expect("patient is bound");
            black_box(descriptor);
        });
    });
    lookup_group.finish();

    let builder = CorrelationContextBuilder::default();
    let descriptor = table.lookup("patient").expect("patient is bound").clone();
    let message = InboundMessage::new(BODY);

    let mut context_group = c.benchmark_group("correlation_context");
    context_group.bench_function("build_envelope", |b| {
        b.iter(|| {
            let envelope = builder
                .build(
                    &message,
                    &descriptor,
                    RuntimeIds::for_message("bench", &descriptor, &message),
                )
                .expect("context should build");
            black_box(envelope);
        });
    });
    context_group.finish();

    let router = {
        let _guard = runtime.enter();
        IngestionRouter::new(
            "bench",
            table.clone(),
            Arc::new(DiscardingBroker),
            RouterConfig::default(),
        )
        .expect("router should start")
    };

    let mut ingest_group = c.benchmark_group("ingest");
    ingest_group.bench_function("single_message", |b| {
        b.iter(|| {
            let receipt = runtime
                .block_on(router.ingest("patient", InboundMessage::new(BODY)))
                .expect("ingestion should succeed");
            black_box(receipt);
        });
    });
    ingest_group.finish();

    runtime.block_on(router.shutdown());
}

criterion_group!(benches, ingest_criterion);
criterion_main!(benches);
