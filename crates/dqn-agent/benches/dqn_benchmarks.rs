use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use dqn_agent::{DqnLearner, QNetwork, ReplayBuffer};
use dqn_core::{DiscreteAction, EnvironmentDims, StateVector, Transition};

fn random_transition(rng: &mut StdRng) -> Transition {
    let mut state = || StateVector::new((0..4).map(|_| rng.gen_range(-1.0..1.0)).collect());
    let s = state();
    let next = state();
    Transition {
        state: s,
        action: DiscreteAction(rng.gen_range(0..2)),
        next_state: next,
        reward: 1.0,
        terminated: rng.gen_bool(0.05),
        truncated: false,
    }
}

fn filled_buffer(rng: &mut StdRng, n: usize) -> ReplayBuffer {
    let mut buffer = ReplayBuffer::new(n);
    for _ in 0..n {
        buffer.push(random_transition(rng));
    }
    buffer
}

fn bench_replay_sample(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let buffer = filled_buffer(&mut rng, 100_000);

    c.bench_function("replay_sample_32_of_100k", |b| {
        b.iter(|| buffer.sample(black_box(32), &mut rng));
    });
}

fn bench_optimize(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let buffer = filled_buffer(&mut rng, 1_000);
    let dims = EnvironmentDims { state_dim: 4, action_dim: 2 };
    let learner = DqnLearner::new(QNetwork::new(dims, 64, &mut rng), 1e-3, 0.99);

    c.bench_function("dqn_optimize_batch_32", |b| {
        b.iter_batched(
            || (learner.clone(), buffer.sample(32, &mut rng).unwrap_or_default()),
            |(mut learner, batch)| learner.optimize(&batch),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_replay_sample, bench_optimize);
criterion_main!(benches);
