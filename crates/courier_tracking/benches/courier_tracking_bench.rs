use std::hint::black_box;

use courier_tracking::{
    config::TrackingConfig,
    geo_math::{bearing_degrees, destination_point, distance_meters, distance_to_path},
    geopoint::GeoPoint,
    ids::{AgentId, DeliveryId},
    ingest_coordinator::IngestCoordinator,
    location_fix::FixInput,
    meters::Meters,
    route::{RouteEndpoint, RoutePlan},
};
use criterion::{Criterion, criterion_group, criterion_main};
use jiff::SignedDuration;

const ORIGIN: GeoPoint = GeoPoint::new(37.7749, -122.4194);
const DESTINATION: GeoPoint = GeoPoint::new(37.7849, -122.4094);

fn geo_math_benchmark(c: &mut Criterion) {
    c.bench_function("distance_meters", |b| {
        b.iter(|| distance_meters(black_box(&ORIGIN), black_box(&DESTINATION)))
    });

    c.bench_function("bearing_degrees", |b| {
        b.iter(|| bearing_degrees(black_box(&ORIGIN), black_box(&DESTINATION)))
    });

    let path: Vec<GeoPoint> = (0..50)
        .map(|step| destination_point(&ORIGIN, (step * 7) as f64, Meters::new(step as f64 * 40.0)))
        .collect();
    let probe = destination_point(&ORIGIN, 45.0, Meters::new(800.0));

    c.bench_function("distance_to_path (50 points)", |b| {
        b.iter(|| distance_to_path(black_box(&probe), black_box(&path)))
    });
}

fn ingest_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let delivery_id = DeliveryId::new("bench-delivery").unwrap();
    let agent_id = AgentId::new("bench-agent").unwrap();

    let coordinator = runtime.block_on(async {
        let coordinator = IngestCoordinator::builder(TrackingConfig::default()).build();
        let plan = RoutePlan {
            origin: RouteEndpoint::new(ORIGIN, None),
            destination: RouteEndpoint::new(DESTINATION, None),
            waypoints: vec![],
            encoded_path: None,
            distance: Meters::new(5000.0),
            duration: SignedDuration::from_secs(900),
        };
        coordinator
            .create_route(&delivery_id, &agent_id, plan)
            .await
            .unwrap();
        coordinator.start_route(&delivery_id).await.unwrap();
        coordinator
    });

    c.bench_function("submit fix with active route", |b| {
        b.iter(|| {
            let input =
                FixInput::new(delivery_id.clone(), agent_id.clone(), ORIGIN).with_speed(30.0);
            black_box(runtime.block_on(coordinator.submit(input)).unwrap())
        })
    });
}

criterion_group!(benches, geo_math_benchmark, ingest_benchmark);
criterion_main!(benches);
