//! # ForgeChain Push Validation Benchmarks
//!
//! | Operation | Dominant cost |
//! |-----------|---------------|
//! | Push note sanity | Ed25519 node signature |
//! | Push note consistency | Ed25519 per-reference signatures, ledger reads |
//! | Endorsement | BLS12-381 verification |
//! | Post replay | Front matter parsing per commit |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fc_01_push_validation::test_utils::{hash_of, Fixture, Host, MemLogic, MemRepo};
use fc_01_push_validation::validation::{
    check_endorsement, check_push_note, check_push_note_sanity, validate_post_commit,
    tx_details_from_note,
};
use shared_types::{EndorsedReference, PushedReference, ZERO_HASH};
use std::time::Duration;

// ============================================================================
// PUSH NOTES
// ============================================================================

fn bench_push_note_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("push-note");
    group.measurement_time(Duration::from_secs(10));

    let fx = Fixture::new();
    let note = fx.master_push_note();

    group.bench_function("sanity", |b| {
        b.iter(|| black_box(check_push_note_sanity(&fx.config, &note, fx.now).is_ok()))
    });

    group.bench_function("sanity_and_consistency", |b| {
        b.iter(|| {
            black_box(
                check_push_note(&fx.config, &note, Some(&fx.repo), fx.logic.as_ref(), fx.now)
                    .is_ok(),
            )
        })
    });

    // Consistency verifies one pusher signature per reference
    for size in [1usize, 8, 32] {
        let references: Vec<PushedReference> = (0..size)
            .map(|i| fx.pushed_ref(&format!("refs/heads/b{}", i), ZERO_HASH, &hash_of(2), 1))
            .collect();
        let note = fx.push_note(references);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("references", size), &note, |b, note| {
            b.iter(|| {
                black_box(
                    check_push_note(&fx.config, note, None, fx.logic.as_ref(), fx.now).is_ok(),
                )
            })
        });
    }

    group.finish();
}

// ============================================================================
// ENDORSEMENTS
// ============================================================================

fn bench_endorsement_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("endorsement");
    group.measurement_time(Duration::from_secs(10));

    let logic = MemLogic::new();
    let hosts: Vec<Host> = (1..=21).map(Host::new).collect();
    for host in &hosts {
        logic.add_host(host.ticket());
    }
    let refs = vec![EndorsedReference {
        hash: vec![0xab; 20],
    }];

    // Last host sits at the end of the top host scan
    let endorsement = hosts[20].endorse([7u8; 32], refs);
    group.bench_function("bls_verify_single", |b| {
        b.iter(|| black_box(check_endorsement(&endorsement, &logic, 21, None).is_ok()))
    });

    group.finish();
}

// ============================================================================
// POST REPLAY
// ============================================================================

fn bench_post_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("post-replay");
    let fx = Fixture::new();
    let logic = MemLogic::new();

    for depth in [1u64, 10, 50] {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: Thread\n---\nfirst");
        for n in 2..=depth {
            repo.add_post_commit(&hash_of(n), &[&hash_of(n - 1)], "---\n---\nreply");
        }
        let name = "refs/heads/issues/1";
        repo.set_ref(name, &hash_of(depth));

        let note = fx.push_note(vec![fx.pushed_ref(name, ZERO_HASH, &hash_of(depth), 1)]);
        let change = note.references[0].clone();
        let detail = tx_details_from_note(&note, &[]).remove(0);

        group.throughput(Throughput::Elements(depth));
        group.bench_with_input(BenchmarkId::new("commits", depth), &depth, |b, _| {
            b.iter(|| {
                black_box(validate_post_commit(&fx.config, &repo, &logic, &change, &detail).is_ok())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_push_note_checks,
    bench_endorsement_verification,
    bench_post_replay,
);

criterion_main!(benches);
