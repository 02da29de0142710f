#![allow(clippy::type_complexity)]
//! Benchmarks for relation resolution.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use restmodel::middleware::{Flow, MiddlewareBuilder, middleware_fn};
use restmodel::relations::{FetchStrategy, RelationOptions, group_by, match_key, process_params};
use restmodel::{Model, ModelConfig, ModelRegistry, Params, RestError, RestService};
use serde_json::{Value, json};

fn articles(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({"id": i, "title": format!("Article {}", i), "authorId": i % 50}))
        .collect()
}

fn comments(count: usize) -> Vec<Value> {
    (0..count * 4)
        .map(|i| json!({"id": i, "articleId": i / 4, "body": "..."}))
        .collect()
}

/// Benchmark grouping related rows by key.
fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouping");

    group.bench_function("match_key_int", |b| {
        let value = json!(12345);
        b.iter(|| black_box(match_key(black_box(&value))))
    });

    group.bench_function("match_key_string", |b| {
        let value = json!("user-12345");
        b.iter(|| black_box(match_key(black_box(&value))))
    });

    for size in [100, 1_000, 10_000] {
        let rows = comments(size / 4);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(BenchmarkId::new("group_by", size), &rows, |b, rows| {
            b.iter(|| black_box(group_by(rows.clone(), "articleId")))
        });
    }

    group.finish();
}

/// Benchmark row reference substitution.
fn bench_process_params(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_params");
    let row = json!({"id": 7, "photoId": 42, "owner": "ann"});

    group.bench_function("single_reference", |b| {
        let template = Params::new().with("id", "@photoId");
        b.iter(|| black_box(process_params(black_box(&template), &row)))
    });

    group.bench_function("mixed_5", |b| {
        let template = Params::new()
            .with("id", "@photoId")
            .with("owner", "@owner")
            .with("size", "thumb")
            .with("limit", 10)
            .with("missing", "@nope");
        b.iter(|| black_box(process_params(black_box(&template), &row)))
    });

    group.finish();
}

fn in_memory_service(size: usize) -> (RestService, Arc<Model>) {
    let article_rows = Value::Array(articles(size));
    let comment_rows = Value::Array(comments(size));
    let service = RestService::builder("http://bench.test")
        .registry(Arc::new(ModelRegistry::new()))
        .middlewares(
            MiddlewareBuilder::new()
                .with(middleware_fn("memory", move |stage, _| {
                    let request = stage
                        .value
                        .as_request()
                        .ok_or_else(|| RestError::middleware("expected a request"))?;
                    let body = if request.url.ends_with("/articles") {
                        article_rows.clone()
                    } else if request.url.ends_with("/comments") {
                        comment_rows.clone()
                    } else {
                        json!([{"id": 0, "name": "author"}])
                    };
                    Ok(Flow::proceed(body))
                }))
                .build(),
        )
        .build();

    service.register_model("Comment", "/comments", ModelConfig::new()).unwrap();
    service.register_model("User", "/users", ModelConfig::new()).unwrap();
    let model = service
        .register_model(
            "Article",
            "/articles",
            ModelConfig::new()
                .has_many("Comment", "comments", "articleId")
                .has_one(
                    "User",
                    "author",
                    RelationOptions::new()
                        .fetch_mode(FetchStrategy::Exclusive)
                        .param("id", "@authorId"),
                ),
        )
        .unwrap();
    (service, model)
}

/// Benchmark full query + include round trips against an in-memory transport.
fn bench_include(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("include");

    for size in [10, 100, 1_000] {
        let (_service, model) = in_memory_service(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("combined_many", size), &model, |b, model| {
            b.to_async(&runtime)
                .iter(|| async { black_box(model.query(Params::new(), &["comments"]).await.unwrap()) })
        });

        group.bench_with_input(BenchmarkId::new("exclusive_one", size), &model, |b, model| {
            b.to_async(&runtime)
                .iter(|| async { black_box(model.query(Params::new(), &["author"]).await.unwrap()) })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grouping, bench_process_params, bench_include);
criterion_main!(benches);
