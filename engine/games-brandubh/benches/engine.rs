use criterion::{black_box, criterion_group, criterion_main, Criterion};
use games_brandubh::moves::{legal_move_mask, legal_moves, Move};
use games_brandubh::{encode_state, Board, Side};

fn bench_movegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("brandubh_movegen");

    group.bench_function("legal_moves_initial", |b| {
        let board = Board::initial();
        b.iter(|| black_box(legal_moves(&board)));
    });

    group.bench_function("legal_moves_defender", |b| {
        let board = Board::initial().with_to_move(Side::Defender);
        b.iter(|| black_box(legal_moves(&board)));
    });

    group.bench_function("legal_move_mask_initial", |b| {
        let board = Board::initial();
        b.iter(|| black_box(legal_move_mask(&board)));
    });

    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("brandubh_apply");

    group.bench_function("apply_opening_move", |b| {
        let board = Board::initial();
        let mv = Move::new(0, 3, 0, 1);
        b.iter(|| black_box(board.apply(mv).unwrap()));
    });

    group.bench_function("outcome_initial", |b| {
        let board = Board::initial();
        b.iter(|| black_box(board.outcome()));
    });

    group.finish();
}

fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("brandubh_encoding");

    group.bench_function("encode_state", |b| {
        let board = Board::initial();
        b.iter(|| black_box(encode_state(&board)));
    });

    group.bench_function("policy_index_roundtrip", |b| {
        b.iter(|| {
            for index in 0..games_brandubh::POLICY_SIZE as u16 {
                if let Some(mv) = Move::from_policy_index(index) {
                    black_box(mv.policy_index());
                }
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_movegen, bench_apply, bench_encoding);
criterion_main!(benches);
