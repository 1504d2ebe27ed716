//! Search benchmarks.
//!
//! Run with: `cargo bench -p ismcts`
//!
//! These measure full `choose_move` calls on the m-n-k game across
//! iteration budgets and execution policies, plus the goofspiel game to
//! cover the simultaneous-move (EXP3) path.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use games_goofspiel::Goofspiel;
use games_mnk::MnkGame;
use ismcts::{Execution, Game, MoSolver, SoSolver};

fn bench_iteration_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("so_solver_iterations");
    for iterations in [100usize, 400, 1600] {
        group.throughput(Throughput::Elements(iterations as u64));
        group.bench_with_input(
            BenchmarkId::new("sequential", iterations),
            &iterations,
            |b, &iterations| {
                let mut solver = SoSolver::<MnkGame>::new(Execution::Sequential);
                solver.set_iteration_count(iterations);
                let game = MnkGame::new();
                b.iter(|| solver.choose_move(&game).unwrap());
            },
        );
    }
    group.finish();
}

fn bench_execution_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("so_solver_execution");
    let policies = [
        ("sequential", Execution::Sequential),
        ("tree_parallel", Execution::tree_parallel()),
        ("root_parallel", Execution::root_parallel()),
    ];
    for (name, execution) in policies {
        group.bench_function(name, |b| {
            let mut solver = SoSolver::<MnkGame>::new(execution);
            solver.set_iteration_count(1000);
            let game = MnkGame::new();
            b.iter(|| solver.choose_move(&game).unwrap());
        });
    }
    group.finish();
}

fn bench_bigger_board(c: &mut Criterion) {
    c.bench_function("so_solver_9x9", |b| {
        let mut solver = SoSolver::<MnkGame>::new(Execution::Sequential);
        solver.set_iteration_count(200);
        let game = MnkGame::with_dimensions(9, 9, 5);
        b.iter(|| solver.choose_move(&game).unwrap());
    });
}

fn bench_simultaneous_game(c: &mut Criterion) {
    let mut group = c.benchmark_group("goofspiel");
    let mut game = Goofspiel::new();
    game.do_move(game.valid_moves()[0]);

    group.bench_function("so_solver", |b| {
        let mut solver = SoSolver::<Goofspiel>::new(Execution::Sequential);
        solver.set_iteration_count(500);
        b.iter(|| solver.choose_move(&game).unwrap());
    });
    group.bench_function("mo_solver", |b| {
        let mut solver = MoSolver::<Goofspiel>::new(Execution::Sequential);
        solver.set_iteration_count(500);
        b.iter(|| solver.choose_move(&game).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_iteration_counts,
    bench_execution_policies,
    bench_bigger_board,
    bench_simultaneous_game
);
criterion_main!(benches);
