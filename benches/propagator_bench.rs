use criterion::{criterion_group, criterion_main, Criterion};
use filament_sliding::filament::{Filament, FilamentKind};
use filament_sliding::linker::LinkerType;
use filament_sliding::propagator::Propagator;
use filament_sliding::random::RandomGenerator;
use filament_sliding::reaction::{
    BindFree, BindPartial, HopFull, HopPartial, KineticParams, Reaction, UnbindFull,
    UnbindPartial,
};
use filament_sliding::system_state::{ExternalForceType, SystemState};

fn kinetic_params() -> KineticParams {
    KineticParams {
        k_bind_tip: 0.2,
        k_bind_blocked: 0.05,
        k_bind_partial: 0.3,
        k_off_partial: 0.1,
        k_off_full: 0.1,
        spring_constant: 40.0,
        delta_e_head: 0.0,
        hop_base_head: 0.5,
        hop_base_tail: 0.5,
        delta_e_direction: 0.0,
        delta_e_cooperativity: 0.0,
    }
}

fn all_reactions() -> Vec<Box<dyn Reaction>> {
    let mut reactions: Vec<Box<dyn Reaction>> = Vec::new();
    for &kind in &LinkerType::ALL {
        let p = kinetic_params();
        reactions.push(Box::new(BindFree::new(kind, p)));
        reactions.push(Box::new(BindPartial::new(kind, p)));
        reactions.push(Box::new(UnbindPartial::new(kind, p)));
        reactions.push(Box::new(UnbindFull::new(kind, p)));
        reactions.push(Box::new(HopPartial::new(kind, p)));
        reactions.push(Box::new(HopFull::new(kind, p)));
    }
    reactions
}

fn bench_propagator_step(c: &mut Criterion) {
    let fixed = Filament::new(FilamentKind::Fixed, 500, 0.008);
    let mobile = Filament::new(FilamentKind::Mobile, 500, 0.008);
    let mut state = SystemState::new(
        fixed,
        mobile,
        20,
        10,
        10,
        1.4,
        40.0,
        ExternalForceType::BarrierFree,
    )
    .unwrap();
    let mut propagator = Propagator::new(all_reactions(), 2.0, 1e-4).unwrap();
    let mut rng = RandomGenerator::from_seed_str("bench");

    c.bench_function("propagator_step", |b| {
        b.iter(|| propagator.step(&mut state, &mut rng).unwrap())
    });
}

criterion_group!(benches, bench_propagator_step);
criterion_main!(benches);
