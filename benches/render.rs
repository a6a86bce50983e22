use chrono::NaiveTime;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use led_sens::config::find_builtin;
use led_sens_core::{
    DeviceLayout, DisplayModeEngine, MetricBounds, MetricsSnapshot, PacketEncoder, PaletteSet,
};

fn pa120_engine() -> DisplayModeEngine {
    let builtin = find_builtin("pa120").expect("built-in layout");
    let layout = DeviceLayout::from_config(builtin.config().expect("layout json"), 0.1)
        .expect("valid layout");
    let colors = vec!["00ff00-ff0000-cpu_temp".to_string(); layout.led_count()];
    let palettes = PaletteSet::parse(Some(colors.as_slice()), None, layout.led_count());
    DisplayModeEngine::new(layout, palettes, MetricBounds::default(), 50)
}

fn render_benchmark(c: &mut Criterion) {
    let engine = pa120_engine();
    let encoder = PacketEncoder::for_layout(engine.layout());
    let snapshot = MetricsSnapshot::new()
        .with("cpu_temp", 61)
        .with("cpu_usage", 37)
        .with("gpu_temp", 54)
        .with("gpu_usage", 99);
    let now = NaiveTime::from_hms_opt(21, 42, 7).expect("valid time");

    c.bench_function("render_metrics", |b| {
        let mut tick = 0;
        b.iter(|| {
            let frame = engine
                .render(black_box("metrics"), tick, black_box(&snapshot), now)
                .expect("render");
            tick = engine.next_tick(tick);
            black_box(frame)
        })
    });

    c.bench_function("render_and_encode_time", |b| {
        b.iter(|| {
            let frame = engine
                .render(black_box("alternate_time_with_seconds"), 7, &snapshot, now)
                .expect("render");
            black_box(encoder.encode(&frame).expect("encode"))
        })
    });
}

criterion_group!(benches, render_benchmark);
criterion_main!(benches);
