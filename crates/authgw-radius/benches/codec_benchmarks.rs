use authgw_radius::auth::encode_response;
use authgw_radius::{
    AccessRequestBuilder, Attribute, AttributeType, AuthMethod, Code, NasIdentity, Packet,
    generate_nt_response, interpret_reply,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::net::Ipv4Addr;

const SECRET: &[u8] = b"testing123";

fn nas() -> NasIdentity {
    NasIdentity {
        identifier: Some("bench".to_string()),
        ipv4: Some(Ipv4Addr::new(10, 0, 0, 1)),
        port: None,
    }
}

fn bench_build_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_access_request");
    let nas = nas();

    for method in [AuthMethod::Pap, AuthMethod::MsChapV2] {
        for signed in [false, true] {
            let id = format!("{}/signed={}", method, signed);
            group.bench_with_input(BenchmarkId::from_parameter(id), &method, |b, &method| {
                b.iter(|| {
                    AccessRequestBuilder::new(&nas, SECRET, method, "testuser", "testpassword")
                        .calling_station_id("192.0.2.10")
                        .message_authenticator(signed)
                        .build()
                        .expect("Failed to build request")
                });
            });
        }
    }

    group.finish();
}

fn bench_nt_response(c: &mut Criterion) {
    c.bench_function("generate_nt_response", |b| {
        b.iter(|| {
            generate_nt_response(
                black_box(&[0x5B; 16]),
                black_box(&[0x21; 16]),
                black_box("User"),
                black_box("clientPass"),
            )
        });
    });
}

fn bench_interpret_reply(c: &mut Criterion) {
    let nas = nas();
    let request = AccessRequestBuilder::new(&nas, SECRET, AuthMethod::Pap, "testuser", "pw")
        .build()
        .expect("Failed to build request");

    let mut accept = Packet::new(Code::AccessAccept, request.identifier(), [0u8; 16]);
    accept.add_attribute(
        Attribute::ipv4(AttributeType::FramedIpAddress as u8, Ipv4Addr::new(10, 8, 0, 2))
            .expect("Failed to create Framed-IP-Address attribute"),
    );
    let raw = encode_response(&accept, &request.authenticator, SECRET)
        .expect("Failed to encode reply");

    c.bench_function("interpret_reply", |b| {
        b.iter(|| interpret_reply(black_box(&raw), &request, SECRET).expect("Reply should verify"));
    });
}

criterion_group!(benches, bench_build_request, bench_nt_response, bench_interpret_reply);
criterion_main!(benches);
