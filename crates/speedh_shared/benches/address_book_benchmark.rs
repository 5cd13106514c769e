//! # Address Book Benchmark
//!
//! The orchestrator regenerates the book wholesale on every successful run;
//! this keeps serialization and parsing honest as extras accumulate.
//!
//! Run with: `cargo bench --package speedh_shared`

// Benchmarks don't need strict docs
#![allow(missing_docs)]

use alloy_primitives::Address;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use speedh_shared::{AddressBook, ContractRole};

fn populated_book(chains: u64) -> AddressBook {
    let mut book = AddressBook::new();
    for chain_id in 1..=chains {
        for role in ContractRole::ALL {
            let mut bytes = [0u8; 20];
            bytes[0] = role.index() as u8;
            bytes[12..].copy_from_slice(&chain_id.to_be_bytes());
            book.assign(role, chain_id, Address::from(bytes));
        }
    }
    book
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("address_book_serialize");
    for chains in [1u64, 8, 64] {
        let book = populated_book(chains);
        group.bench_with_input(BenchmarkId::from_parameter(chains), &book, |b, book| {
            b.iter(|| black_box(book.serialize()));
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("address_book_parse");
    for chains in [1u64, 8, 64] {
        let text = populated_book(chains).serialize();
        group.bench_with_input(BenchmarkId::from_parameter(chains), &text, |b, text| {
            b.iter(|| black_box(AddressBook::parse(text)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_serialize, bench_parse);
criterion_main!(benches);
