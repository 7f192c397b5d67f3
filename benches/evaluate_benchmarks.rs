use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use leuchtet::nodes::{ColorFilter, Controller, Passthrough};
use leuchtet::{ChannelId, ControllerId, FilterId, Intent, PatchGraph, Tick};

const CHANNELS: u32 = 64;

/// Every channel goes through a passthrough and a color split to its own
/// three controller outputs.
fn build_graph() -> PatchGraph {
    let mut graph = PatchGraph::new();
    let controller = Controller::new(ControllerId(0), "Pixels", (CHANNELS * 3) as u16);
    graph.register_controller(&controller).unwrap();
    let outputs: Vec<_> = controller.outputs().collect();

    for i in 0..CHANNELS {
        let channel = ChannelId(i);
        let (pass, color) = (FilterId(i * 2), FilterId(i * 2 + 1));
        graph.register_channel(channel).unwrap();
        graph.add_filter(pass, Passthrough::default()).unwrap();
        graph.add_filter(color, ColorFilter::rgb()).unwrap();

        graph.connect(channel, 0, pass, 0).unwrap();
        graph.connect(pass, 0, color, 0).unwrap();
        for component in 0..3 {
            graph
                .connect(color, component, outputs[(i * 3) as usize + component], 0)
                .unwrap();
        }
    }
    graph
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    c.bench_function("PatchGraph.evaluate()", |b| {
        let mut graph = build_graph();
        let tick = (0..CHANNELS).fold(Tick::new(Duration::ZERO), |tick, i| {
            tick.with(ChannelId(i), vec![Intent::rgb(1.0, 0.5, i as f32 / CHANNELS as f32)])
        });

        b.iter(|| black_box(graph.evaluate(&tick)))
    });

    c.bench_function("PatchGraph.connect()+disconnect()", |b| {
        let mut graph = build_graph();
        graph.add_filter(FilterId(1_000), Passthrough::default()).unwrap();

        b.iter(|| {
            graph.connect(ChannelId(0), 0, FilterId(1_000), 0).unwrap();
            black_box(graph.disconnect(FilterId(1_000), 0))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
