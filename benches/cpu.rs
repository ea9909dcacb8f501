use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gb_core::System;

fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 0x8000];
    data[0x0100..0x0100 + program.len()].copy_from_slice(program);
    let mut checksum: u8 = 0;
    for &byte in &data[0x0134..=0x014c] {
        checksum = checksum.wrapping_sub(byte).wrapping_sub(1);
    }
    data[0x014d] = checksum;
    data
}

fn bench_nop_sled(c: &mut Criterion) {
    let program = vec![0x00; 0x7e00];
    let mut system = System::new();
    system.load_rom(rom_with_program(&program)).unwrap();

    c.bench_function("cpu step nop sled", |b| {
        b.iter(|| {
            black_box(system.step());
        })
    });
}

fn bench_run_frame(c: &mut Criterion) {
    let mut system = System::new();
    system.load_rom(rom_with_program(&[0x18, 0xfe])).unwrap(); // JR -2

    c.bench_function("run one frame", |b| {
        b.iter(|| {
            black_box(system.run_frame());
        })
    });
}

criterion_group!(benches, bench_nop_sled, bench_run_frame);
criterion_main!(benches);
