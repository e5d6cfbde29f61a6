//! Fluid network example: a pump, a pipe run, two boilers and a buffer tank.
//!
//! The pump feeds a pipe run that branches to two boilers. Once the boilers
//! are full, a buffer tank on an output starts draining into them as the
//! owners burn water between ticks. Demonstrates routing, lost flow and
//! stored-fluid suppliers.
//!
//! Run with: `cargo run -p pipeworks-examples --example fluid_network`

use pipeworks_core::fixed::{Fixed64, fixed64_to_f64};
use pipeworks_core::id::{FluidTypeId, PointId};
use pipeworks_core::location::BlockPos;
use pipeworks_core::registry::{FluidRegistryBuilder, FluidTag, FluidTemperature};
use pipeworks_fluid::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = FluidRegistryBuilder::new();
    let water = registry.register_fluid("water")?;
    registry.add_tag("water", FluidTag::Temperature(FluidTemperature::Normal))?;
    let registry = registry.build();

    let mut fluid = FluidManager::new(FluidSettings::default());

    // Pump: 120 water per second, 60 per fluid tick.
    let mut pump = ConnectionPoint::create(PointKind::Output, BlockPos::new(0, 64, 0));
    pump.set_producer(Box::new(ConstantProducer::new(water, Fixed64::from_num(120))))?;
    let pump_id = pump.id();
    fluid.add(pump)?;

    // Pipe run along +x with a branch up at the end.
    for x in 1..=3 {
        fluid.add(ConnectionPoint::create(
            PointKind::Intersection,
            BlockPos::new(x, 64, 0),
        ))?;
    }

    let boiler_a = add_boiler(&mut fluid, water, BlockPos::new(4, 64, 0))?;
    let boiler_b = add_boiler(&mut fluid, water, BlockPos::new(3, 65, 0))?;

    // Buffer tank next to the first boiler, pre-filled.
    let mut tank = ConnectionPoint::create(PointKind::Output, BlockPos::new(5, 64, 0));
    tank.create_fluid_tank(AllowedFluids::Any, Fixed64::from_num(500), false, true)?;
    if let Some(buffer) = tank.buffer_mut() {
        buffer.insert(water, Fixed64::from_num(200));
    }
    let tank_id = tank.id();
    fluid.add(tank)?;

    let name = registry.name(water).unwrap_or("?");

    // --- Scenario 1: filling up ---

    println!("=== Scenario 1: pump {name} into two boilers ===\n");
    for tick in 1..=4u64 {
        let report = fluid.tick(tick * 10)?;
        print_tick(&fluid, &report, water, [pump_id, boiler_a, boiler_b, tank_id]);
    }

    // --- Scenario 2: boilers burn water, the tank covers the deficit ---

    println!("\n=== Scenario 2: boilers burn 80 each per tick ===\n");
    for tick in 5..=10u64 {
        for boiler in [boiler_a, boiler_b] {
            fluid
                .buffer_mut(boiler)?
                .withdraw(water, Fixed64::from_num(80));
        }
        let report = fluid.tick(tick * 10)?;
        print_tick(&fluid, &report, water, [pump_id, boiler_a, boiler_b, tank_id]);
    }

    let drained = fluid.shutdown();
    println!("\nShut down, {} points returned to their owners.", drained.len());
    Ok(())
}

fn add_boiler(
    fluid: &mut FluidManager,
    water: FluidTypeId,
    at: BlockPos,
) -> Result<PointId, FluidError> {
    let mut boiler = ConnectionPoint::create(PointKind::Input, at);
    boiler.create_fluid_buffer(water, Fixed64::from_num(100), true, false)?;
    let id = boiler.id();
    fluid.add(boiler)?;
    Ok(id)
}

fn print_tick(
    fluid: &FluidManager,
    report: &TickReport,
    water: FluidTypeId,
    [pump, boiler_a, boiler_b, tank]: [PointId; 4],
) {
    let amount = |id| fixed64_to_f64(fluid.fluid_amount(id, water).unwrap_or(Fixed64::ZERO));
    let flow = |id| fixed64_to_f64(fluid.flow_amount(id, water));
    println!(
        "Tick {}: pumped={:.1} boiler_a={:.1} boiler_b={:.1} tank={:.1} (tank gave {:.1}) lost={:.1}",
        report.tick,
        flow(pump),
        amount(boiler_a),
        amount(boiler_b),
        amount(tank),
        flow(tank),
        fixed64_to_f64(report.lost),
    );
    for event in &report.events {
        println!("  Event: {event:?}");
    }
}
