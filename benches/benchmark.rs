use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use apidex::dataset::{RawClass, RawDataset, RawEnum, RawMember};
use apidex::engine::FilterEngine;
use apidex::index::{EnumItem, EnumValue, MemberType};
use apidex::query::CompiledQuery;

// ------------- Synthetic dataset -------------
fn dataset(classes: usize, members: usize, enums: usize) -> RawDataset {
    let types = [MemberType::Property, MemberType::Function, MemberType::Event, MemberType::Callback];
    RawDataset {
        classes: (0..classes)
            .map(|c| RawClass {
                name: format!("Class{c}"),
                inherits: vec![format!("Base{}", c % 7), "Instance".into()],
                members: (0..members)
                    .map(|m| RawMember {
                        name: format!("Member{c}_{m}"),
                        member_type: types[m % types.len()],
                        value_type: (m % 3 != 0).then(|| "string".to_string()),
                        unreplicated: m % 11 == 0,
                        deprecated: m % 5 == 0,
                        hidden: m % 13 == 0,
                        unscriptable: false,
                        security: (m % 17 == 0).then(|| "PluginSecurity".to_string()),
                    })
                    .collect(),
            })
            .collect(),
        enums: (0..enums)
            .map(|e| RawEnum {
                name: format!("Enum{e}"),
                items: (0..20)
                    .map(|i| EnumItem {
                        name: format!("Item{i}"),
                        value: EnumValue::Integer(i),
                        unreplicated: false,
                        deprecated: i == 19,
                        hidden: false,
                        unscriptable: false,
                        security: None,
                    })
                    .collect(),
            })
            .collect(),
        ..RawDataset::default()
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let query = "type == 'Property' && !deprecated && (inheritance.includes('Base3') || name matches '_1[0-9]$')";
    c.bench_function("compile", |b| b.iter(|| CompiledQuery::compile(black_box(query))));

    // roughly the size of a real dump: 5k members, 300 enums
    let mut engine = FilterEngine::default();
    engine.initialize(&dataset(250, 20, 300));
    c.bench_function("filter empty", |b| b.iter(|| engine.filter(black_box("")).map(|r| r.len())));
    c.bench_function("filter flag", |b| b.iter(|| engine.filter(black_box("deprecated")).map(|r| r.len())));
    c.bench_function("filter compound", |b| b.iter(|| engine.filter(black_box(query)).map(|r| r.len())));
    c.bench_function("filter enum items", |b| {
        b.iter(|| engine.filter(black_box("className == 'Enum299' && valueType >= 19")).map(|r| r.len()))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
