//! Dispatch loop benchmarks.
//!
//! - `loop_*`: a counting loop of local loads, arithmetic, compare and branch
//! - `array_fill`: indexed stores growing a global array
//! - `calls`: script-to-script calls through the frame stack
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use gmrun::{
    AssetId, Comparison, DataType, InstanceRegistry, Instruction, Opcode, Script, Vm, VmConfig,
    sentinel,
};

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// `for (i = 0; i < n; i++) {}` in local scope.
fn counting_loop(n: i32) -> Script {
    Script::new(
        AssetId::new(0),
        "count",
        vec![
            Instruction::push_int(0),
            Instruction::pop(DataType::Variable, DataType::Int32, "local.i"),
            // 2: loop head
            Instruction::push_variable(Opcode::PushLoc, "local.i"),
            Instruction::push_int(n),
            Instruction::cmp(Comparison::Lt, DataType::Int32, DataType::Variable),
            Instruction::branch(Opcode::Bf, 1),
            Instruction::push_variable(Opcode::PushLoc, "local.i"),
            Instruction::push_int(1),
            Instruction::binary(Opcode::Add, DataType::Int32, DataType::Variable),
            Instruction::pop(DataType::Variable, DataType::Variable, "local.i"),
            Instruction::branch(Opcode::B, 0),
            // 11: exit
            Instruction::push_variable(Opcode::PushLoc, "local.i"),
            Instruction::ret(),
        ],
    )
    .with_label(0, 2)
    .with_label(1, 11)
}

/// Store `n` elements into a global array, one instruction group each.
fn array_fill(n: i32) -> Script {
    let mut instructions = Vec::new();
    for index in 0..n {
        instructions.push(Instruction::push_int(index));
        instructions.push(Instruction::push_int(sentinel::GLOBAL));
        instructions.push(Instruction::push_int(index));
        instructions.push(Instruction::pop(
            DataType::Variable,
            DataType::Variable,
            "[array]self.cells",
        ));
    }
    Script::new(AssetId::new(1), "fill", instructions)
}

fn call_chain(n: u32) -> Vec<Script> {
    let callee = Script::new(
        AssetId::new(2),
        "identity",
        vec![
            Instruction::push_variable(Opcode::Push, "arg.argument0"),
            Instruction::ret(),
        ],
    );
    let mut body = Vec::new();
    for _ in 0..n {
        body.push(Instruction::push_int(1));
        body.push(Instruction::call("identity", 1));
        body.push(Instruction::unary(Opcode::Popz, DataType::Variable));
    }
    vec![callee, Script::new(AssetId::new(3), "caller", body)]
}

fn bench_loop(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("loop");
    for n in [100, 10_000] {
        let mut vm = Vm::new(VmConfig::default());
        vm.load_script(counting_loop(n));
        let mut instances = InstanceRegistry::new();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let result = vm.execute(&mut instances, "count", None, Vec::new());
                end_profiling_frame();
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_array_fill(c: &mut Criterion) {
    let mut vm = Vm::new(VmConfig::default());
    vm.load_script(array_fill(256));
    let mut instances = InstanceRegistry::new();

    c.bench_function("array_fill", |b| {
        b.iter(|| {
            vm.reset();
            black_box(vm.execute(&mut instances, "fill", None, Vec::new()))
        })
    });
}

fn bench_calls(c: &mut Criterion) {
    let mut vm = Vm::new(VmConfig::default());
    for script in call_chain(256) {
        vm.load_script(script);
    }
    let mut instances = InstanceRegistry::new();

    c.bench_function("calls", |b| {
        b.iter(|| black_box(vm.execute(&mut instances, "caller", None, Vec::new())))
    });
}

criterion_group!(benches, bench_loop, bench_array_fill, bench_calls);
criterion_main!(benches);
