use criterion::{Criterion, black_box, criterion_group, criterion_main};

use biomatch_algorithm::{Config, Engine, File, Template, TemplateList};

fn seeded_engine(name: &str, count: usize, dim: usize) -> Engine {
    let engine = Engine::new(
        Config::default()
            .with_algorithm("Normalize:L2")
            .with_block_size(256)
            .with_quiet(true),
    );
    let list: TemplateList = (0..count)
        .map(|i| {
            let data = (0..dim).map(|k| ((i * 31 + k * 7) % 97) as f32).collect();
            Template::new(File::new(format!("s{i}.raw")), data)
        })
        .collect();
    engine.storage().memory().insert_gallery(name, list);
    engine
}

fn bench_enroll(c: &mut Criterion) {
    c.bench_function("enroll_1000x128_normalize", |b| {
        b.iter_with_setup(
            || seeded_engine("input.mem", 1000, 128),
            |engine| {
                let files = engine
                    .enroll(&File::new("input.mem"), &File::new("out.mem"))
                    .unwrap();
                black_box(files.len());
            },
        );
    });
}

fn bench_compare(c: &mut Criterion) {
    let engine = seeded_engine("input.mem", 300, 128);
    engine
        .enroll(&File::new("input.mem"), &File::new("gallery.mem"))
        .unwrap();

    c.bench_function("compare_300x300_l2", |b| {
        b.iter(|| {
            engine
                .compare(
                    &File::new("gallery.mem"),
                    &File::new("."),
                    &File::new("scores.mem"),
                )
                .unwrap();
        });
    });
}

criterion_group!(benches, bench_enroll, bench_compare);
criterion_main!(benches);
