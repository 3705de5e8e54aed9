// Ledger benchmarks for the KOIN token.
//
// Covers the pure regeneration step, a full transfer over the in-memory
// store, and dispatcher decoding of a transfer call.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use koin_contracts::dispatch::{call, Request, TransferArgs};
use koin_contracts::mana::regenerate;
use koin_contracts::{AccountRecord, EntryPoint, Token};
use koin_protocol::config::{TokenConfig, MANA_REGEN_WINDOW_MS};
use koin_protocol::{AccountKey, MemoryStore, StaticHost};

const T0: u64 = 1_700_000_000_000;

fn key(i: usize) -> AccountKey {
    AccountKey::new(format!("acct-{i:04}").into_bytes()).unwrap()
}

/// A token with `n` funded accounts, each holding a full mana allowance.
fn funded_token(n: usize) -> Token<MemoryStore> {
    let token = Token::new(MemoryStore::new(), TokenConfig::default());
    let kernel = StaticHost::kernel(T0);
    for i in 0..n {
        token.mint(&kernel, &key(i), u64::MAX / (n as u64 * 2)).unwrap();
    }
    token
}

fn bench_regenerate(c: &mut Criterion) {
    let record = AccountRecord {
        balance: 1_000_000_000,
        mana: 0,
        last_update: T0,
    };

    c.bench_function("mana/regenerate", |b| {
        b.iter(|| {
            regenerate(
                black_box(record),
                black_box(T0 + MANA_REGEN_WINDOW_MS / 3),
                MANA_REGEN_WINDOW_MS,
            )
        });
    });
}

fn bench_transfer(c: &mut Criterion) {
    let mut group = c.benchmark_group("token/transfer");

    for &accounts in &[2usize, 64, 1024] {
        let token = funded_token(accounts);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(accounts),
            &accounts,
            |b, &n| {
                let mut i = 0usize;
                b.iter(|| {
                    let from = key(i % n);
                    let to = key((i + 1) % n);
                    let host = StaticHost::user(from.clone(), T0 + i as u64);
                    i += 1;
                    token.transfer(&host, &from, &to, 1).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let token = funded_token(2);
    let args = Request::Transfer(TransferArgs {
        from: key(0),
        to: key(1),
        value: 1,
    })
    .encode_args()
    .unwrap();
    let host = StaticHost::user(key(0), T0);
    let selector = EntryPoint::Transfer.selector();

    c.bench_function("dispatch/transfer", |b| {
        b.iter(|| call(&token, &host, selector, black_box(&args)).unwrap());
    });
}

criterion_group!(benches, bench_regenerate, bench_transfer, bench_dispatch);
criterion_main!(benches);
