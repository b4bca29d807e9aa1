use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sms_core::*;
use sms_voipms::VoipMsClient;
use voipms_sms::bridge::Bridge;

fn inbound(to: &str, text_len: usize) -> Vec<u8> {
    serde_json::json!({
        "data": {
            "event_type": "message.received",
            "record_type": "event",
            "payload": {
                "record_type": "message",
                "to": [{ "phone_number": to }],
                "from": { "phone_number": "+15557654321" },
                "text": "x".repeat(text_len),
                "id": 1
            }
        }
    })
    .to_string()
    .into_bytes()
}

fn benchmark_webhook_processing(c: &mut Criterion) {
    let bridge = Bridge::new(
        VoipMsClient::with_api_url("user", "pw", "http://127.0.0.1:9/rest.php".into()),
        "http://localhost:8123",
    );
    for did in ["5551234567", "6045551234", "4165550000"] {
        bridge.setup_did(did).unwrap();
    }
    let processor = bridge.processor();
    let headers: Headers = vec![("content-type".to_string(), "application/json".to_string())];

    let mut group = c.benchmark_group("webhook_processing");
    for size in [16, 160, 1600] {
        let matched = inbound("+15551234567", size);
        let unmatched = inbound("+12125550199", size);

        group.bench_with_input(BenchmarkId::new("matched", size), &size, |b, _| {
            b.iter(|| black_box(processor.process_webhook(&headers, &matched)))
        });
        group.bench_with_input(BenchmarkId::new("unmatched", size), &size, |b, _| {
            b.iter(|| black_box(processor.process_webhook(&headers, &unmatched)))
        });
    }
    group.bench_function("rejected_event_type", |b| {
        let body = String::from_utf8(inbound("+15551234567", 16))
            .unwrap()
            .replace("message.received", "message.sent");
        b.iter(|| black_box(processor.process_webhook(&headers, body.as_bytes())))
    });
    group.finish();
}

fn benchmark_identity(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity");
    let secret = generate_secret_key();

    group.bench_function("generate_secret_key", |b| {
        b.iter(|| black_box(generate_secret_key()))
    });
    group.bench_function("generate_webhook_id", |b| {
        b.iter(|| black_box(generate_webhook_id(black_box("5551234567"), &secret)))
    });
    group.bench_function("numbers_match", |b| {
        b.iter(|| black_box(phone::numbers_match(black_box("+15551234567"), "5551234567")))
    });

    group.finish();
}

fn benchmark_configuration_loading(c: &mut Criterion) {
    use voipms_sms::config::AppConfig;

    let mut group = c.benchmark_group("configuration");

    group.bench_function("create_default", |b| {
        b.iter(|| black_box(AppConfig::default()))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_webhook_processing,
    benchmark_identity,
    benchmark_configuration_loading
);

criterion_main!(benches);
