//! The fluid manager: registry of connection points and the tick driver.
//!
//! # Tick phases
//!
//! 1. Apply queued additions and removals.
//! 2. Rebuild directed edges and components through the adjacency oracle.
//! 3. Per component, per fluid in ascending id order: collect supplier
//!    offers, serve consumers in tie-break order along reachable routes,
//!    and discard what nobody took.
//! 4. Apply results: insert into consumers, withdraw from stored-fluid
//!    suppliers, run producer hooks.
//! 5. Publish the new flow snapshot.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use pipeworks_core::fixed::{Fixed64, Ticks};
use pipeworks_core::id::{FluidTypeId, PointId};
use pipeworks_core::location::BlockPos;

use crate::adjacency::{AdjacencyOracle, GridAdjacency};
use crate::buffer::FluidBuffer;
use crate::error::FluidError;
use crate::event::{FluidEvent, TickReport};
use crate::network::{Component, FluidNetwork, Route};
use crate::point::ConnectionPoint;
use crate::settings::{FluidSettings, TieBreak};
use crate::snapshot::{FlowReader, FlowSnapshot};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Ticking,
}

/// A structural change deferred to the start of the next tick.
#[derive(Debug)]
pub enum PendingChange {
    Add(ConnectionPoint),
    Remove(PointId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OfferSource {
    /// Producer emission; whatever is not drawn is lost.
    Emission,
    /// Stored fluid; whatever is not drawn stays in the buffer.
    Stored,
}

#[derive(Debug, Clone, Copy)]
struct Offer {
    point: PointId,
    amount: Fixed64,
    source: OfferSource,
}

/// Per-tick bookkeeping shared by every component.
struct TickContext {
    now: Ticks,
    snapshot: FlowSnapshot,
    report: TickReport,
    /// Flow already carried by each directed edge this tick.
    edge_used: BTreeMap<(PointId, PointId), Fixed64>,
    /// Flow already received by each throughput-limited input this tick.
    inbound: BTreeMap<PointId, Fixed64>,
}

// ---------------------------------------------------------------------------
// Fluid manager
// ---------------------------------------------------------------------------

/// Owns every registered connection point and simulates fluid flow between
/// them.
///
/// The manager is an explicit context object: create one at startup, add
/// points as their owners load, call [`tick`](Self::tick) on the fluid
/// schedule and [`shutdown`](Self::shutdown) when done.
#[derive(Debug)]
pub struct FluidManager<A: AdjacencyOracle = GridAdjacency> {
    settings: FluidSettings,
    oracle: A,
    points: BTreeMap<PointId, ConnectionPoint>,
    by_location: BTreeMap<BlockPos, Vec<PointId>>,
    pending: Vec<PendingChange>,
    /// Points removed through the queue, waiting for their owner.
    evicted: Vec<ConnectionPoint>,
    /// Partition computed by the last tick.
    components: Vec<Component>,
    reader: FlowReader,
    phase: Phase,
    ticks_run: u64,
}

impl Default for FluidManager<GridAdjacency> {
    fn default() -> Self {
        Self::new(FluidSettings::default())
    }
}

impl FluidManager<GridAdjacency> {
    /// A manager connecting face-adjacent points.
    pub fn new(settings: FluidSettings) -> Self {
        Self::with_oracle(settings, GridAdjacency)
    }
}

impl<A: AdjacencyOracle> FluidManager<A> {
    pub fn with_oracle(settings: FluidSettings, oracle: A) -> Self {
        Self {
            settings,
            oracle,
            points: BTreeMap::new(),
            by_location: BTreeMap::new(),
            pending: Vec::new(),
            evicted: Vec::new(),
            components: Vec::new(),
            reader: FlowReader::new(),
            phase: Phase::Idle,
            ticks_run: 0,
        }
    }

    pub fn settings(&self) -> &FluidSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut FluidSettings {
        &mut self.settings
    }

    pub fn adjacency(&self) -> &A {
        &self.oracle
    }

    pub fn adjacency_mut(&mut self) -> &mut A {
        &mut self.oracle
    }

    /// True once a tick has unwound mid-way. A poisoned manager refuses
    /// further ticks and structural changes; its points can still be
    /// recovered with [`shutdown`](Self::shutdown).
    pub fn is_poisoned(&self) -> bool {
        self.phase == Phase::Ticking
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a point. Its buffer and producer must already be armed.
    pub fn add(&mut self, point: ConnectionPoint) -> Result<(), FluidError> {
        self.ensure_idle()?;
        self.insert_point(point)
    }

    /// Deregister a point and hand it back. Removing an unknown id is a
    /// no-op returning `None`.
    pub fn remove(&mut self, id: PointId) -> Result<Option<ConnectionPoint>, FluidError> {
        self.ensure_idle()?;
        Ok(self.take_point(id))
    }

    /// Defer an addition to the start of the next tick.
    pub fn queue_add(&mut self, point: ConnectionPoint) {
        self.pending.push(PendingChange::Add(point));
    }

    /// Defer a removal to the start of the next tick. The removed point is
    /// collected with [`take_evicted`](Self::take_evicted).
    pub fn queue_remove(&mut self, id: PointId) {
        self.pending.push(PendingChange::Remove(id));
    }

    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    /// Points removed by queued removals since the last call.
    pub fn take_evicted(&mut self) -> Vec<ConnectionPoint> {
        std::mem::take(&mut self.evicted)
    }

    fn ensure_idle(&self) -> Result<(), FluidError> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Ticking => Err(FluidError::ConcurrentModification),
        }
    }

    fn insert_point(&mut self, point: ConnectionPoint) -> Result<(), FluidError> {
        let id = point.id();
        if self.points.contains_key(&id) {
            return Err(FluidError::DuplicateRegistration(id));
        }
        self.by_location.entry(point.location()).or_default().push(id);
        self.points.insert(id, point);
        Ok(())
    }

    fn take_point(&mut self, id: PointId) -> Option<ConnectionPoint> {
        let point = self.points.remove(&id)?;
        let location = point.location();
        if let Some(ids) = self.by_location.get_mut(&location) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_location.remove(&location);
            }
        }
        Some(point)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, id: PointId) -> Option<&ConnectionPoint> {
        self.points.get(&id)
    }

    pub fn get_mut(&mut self, id: PointId) -> Option<&mut ConnectionPoint> {
        self.points.get_mut(&id)
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.points.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point_ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.points.keys().copied()
    }

    /// Points attached to `pos`.
    pub fn points_at(&self, pos: BlockPos) -> &[PointId] {
        self.by_location.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stored amount of `fluid` in a registered point's buffer.
    pub fn fluid_amount(&self, id: PointId, fluid: FluidTypeId) -> Result<Fixed64, FluidError> {
        self.points
            .get(&id)
            .map(|p| p.fluid_amount(fluid))
            .ok_or(FluidError::UnknownPoint(id))
    }

    /// Mutable access to a registered point's buffer, for owners that
    /// consume or top up stored fluid between ticks.
    pub fn buffer_mut(&mut self, id: PointId) -> Result<&mut FluidBuffer, FluidError> {
        self.points
            .get_mut(&id)
            .ok_or(FluidError::UnknownPoint(id))?
            .buffer_mut()
            .ok_or(FluidError::IllegalState("point has no fluid buffer"))
    }

    /// Amount delivered to, drawn from, or passed through `id` during the
    /// last tick. Zero for unknown points.
    pub fn flow_amount(&self, id: PointId, fluid: FluidTypeId) -> Fixed64 {
        self.reader.flow_amount(id, fluid)
    }

    /// A read handle that can be moved to other threads.
    pub fn reader(&self) -> FlowReader {
        self.reader.clone()
    }

    /// Components computed by the last tick.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Drain every point, including queued additions and uncollected
    /// evictions, and clear the published snapshot.
    pub fn shutdown(&mut self) -> Vec<ConnectionPoint> {
        let mut drained: Vec<ConnectionPoint> =
            std::mem::take(&mut self.points).into_values().collect();
        self.by_location.clear();
        self.components.clear();
        drained.append(&mut self.evicted);
        for change in self.pending.drain(..) {
            if let PendingChange::Add(point) = change {
                drained.push(point);
            }
        }
        self.reader.publish(FlowSnapshot::default());
        log::debug!("fluid manager shut down, {} points drained", drained.len());
        drained
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one simulation pass.
    pub fn tick(&mut self, now: Ticks) -> Result<TickReport, FluidError> {
        if self.phase == Phase::Ticking {
            return Err(FluidError::IllegalState(
                "fluid manager is poisoned by an interrupted tick",
            ));
        }
        self.phase = Phase::Ticking;

        let mut ctx = TickContext {
            now,
            snapshot: FlowSnapshot {
                tick: now,
                ..FlowSnapshot::default()
            },
            report: TickReport {
                tick: now,
                ..TickReport::default()
            },
            edge_used: BTreeMap::new(),
            inbound: BTreeMap::new(),
        };

        self.apply_pending(&mut ctx);

        let network = FluidNetwork::build(&self.points, &self.by_location, &self.oracle);
        log::debug!(
            "tick {now}: {} fluid components over {} points",
            network.components().len(),
            self.points.len()
        );

        for component in network.components() {
            self.simulate_component(component, &network, &mut ctx);
        }

        let TickContext {
            snapshot,
            mut report,
            ..
        } = ctx;
        report.components = network.components().len();
        self.components = network.into_components();
        self.reader.publish(snapshot);
        self.ticks_run += 1;
        self.phase = Phase::Idle;

        log::trace!(
            "tick {now}: supplied {} delivered {} lost {} ({} events)",
            report.supplied,
            report.delivered,
            report.lost,
            report.events.len()
        );
        Ok(report)
    }

    fn apply_pending(&mut self, ctx: &mut TickContext) {
        for change in std::mem::take(&mut self.pending) {
            match change {
                PendingChange::Add(point) => {
                    let id = point.id();
                    match self.insert_point(point) {
                        Ok(()) => ctx.report.points_added += 1,
                        Err(err) => {
                            log::warn!("dropping queued fluid point {id}: {err}");
                            ctx.report.events.push(FluidEvent::QueuedChangeRejected {
                                point: id,
                                tick: ctx.now,
                            });
                        }
                    }
                }
                PendingChange::Remove(id) => {
                    if let Some(point) = self.take_point(id) {
                        self.evicted.push(point);
                        ctx.report.points_removed += 1;
                    }
                }
            }
        }
    }

    fn simulate_component(
        &mut self,
        component: &Component,
        network: &FluidNetwork,
        ctx: &mut TickContext,
    ) {
        if component.suppliers.is_empty() {
            return;
        }
        for (fluid, offers) in self.collect_offers(component) {
            self.route_fluid(component, network, fluid, &offers, ctx);
        }
    }

    /// Offers per fluid, each list in supplier id order. A point with a
    /// producer offers its emission and never its stored fluid.
    fn collect_offers(&self, component: &Component) -> BTreeMap<FluidTypeId, Vec<Offer>> {
        let epsilon = self.settings.supply_epsilon;
        let mut offers: BTreeMap<FluidTypeId, Vec<Offer>> = BTreeMap::new();
        for id in &component.suppliers {
            let Some(point) = self.points.get(id) else {
                continue;
            };
            if let Some(producer) = point.producer() {
                let mut rates: BTreeMap<FluidTypeId, Fixed64> = BTreeMap::new();
                for (fluid, rate) in producer.supplied_fluids() {
                    let total = rates.entry(fluid).or_insert(Fixed64::ZERO);
                    *total = total.saturating_add(rate.max(Fixed64::ZERO));
                }
                for (fluid, rate) in rates {
                    let amount = self.settings.scale_rate(rate);
                    if amount < epsilon {
                        continue;
                    }
                    offers.entry(fluid).or_default().push(Offer {
                        point: *id,
                        amount,
                        source: OfferSource::Emission,
                    });
                }
            } else if let Some(buffer) = point.buffer().filter(|b| b.exposes_to_network()) {
                let Some(fluid) = buffer.fluid() else {
                    continue;
                };
                let amount = buffer.fluid_amount(fluid);
                if amount < epsilon {
                    continue;
                }
                offers.entry(fluid).or_default().push(Offer {
                    point: *id,
                    amount,
                    source: OfferSource::Stored,
                });
            }
        }
        offers
    }

    /// Consumers wanting `fluid`, in service order.
    fn demand_order(&self, component: &Component, fluid: FluidTypeId) -> Vec<PointId> {
        let epsilon = self.settings.supply_epsilon;
        let mut order: Vec<PointId> = component
            .consumers
            .iter()
            .copied()
            .filter(|id| {
                self.points
                    .get(id)
                    .and_then(ConnectionPoint::buffer)
                    .is_some_and(|b| b.requested(fluid) >= epsilon)
            })
            .collect();
        match self.settings.tie_break {
            TieBreak::AscendingId | TieBreak::EvenSplit => {}
            TieBreak::DescendingId => order.reverse(),
            TieBreak::RoundRobin => {
                if !order.is_empty() {
                    let shift = (self.ticks_run % order.len() as u64) as usize;
                    order.rotate_left(shift);
                }
            }
        }
        order
    }

    /// What `consumer` can take of `fluid` this tick: buffer headroom,
    /// capped by whatever its throughput limit has left.
    fn wanted(&self, consumer: PointId, fluid: FluidTypeId, ctx: &TickContext) -> Option<Fixed64> {
        let point = self.points.get(&consumer)?;
        let mut want = point.buffer()?.requested(fluid);
        if let Some(limit) = point.throughput() {
            let used = ctx.inbound.get(&consumer).copied().unwrap_or(Fixed64::ZERO);
            want = want.min((self.settings.scale_rate(limit) - used).max(Fixed64::ZERO));
        }
        Some(want)
    }

    fn route_fluid(
        &mut self,
        component: &Component,
        network: &FluidNetwork,
        fluid: FluidTypeId,
        offers: &[Offer],
        ctx: &mut TickContext,
    ) {
        let edge_limit = self.settings.edge_limit();
        let mut budget = self.settings.component_limit().unwrap_or(Fixed64::MAX);
        let routes: Vec<BTreeMap<PointId, Route>> = offers
            .iter()
            .map(|offer| {
                network
                    .routes(offer.point, fluid, &self.points)
                    .into_iter()
                    .map(|route| (route.consumer, route))
                    .collect()
            })
            .collect();
        let wants: Vec<(PointId, Fixed64)> = self
            .demand_order(component, fluid)
            .into_iter()
            .filter_map(|consumer| Some((consumer, self.wanted(consumer, fluid, ctx)?)))
            .collect();

        // Per-supplier draw allowance and per-consumer target.
        let (mut remaining, targets) = if self.settings.tie_break == TieBreak::EvenSplit {
            even_split(offers, &routes, &wants, budget)
        } else {
            (
                offers.iter().map(|o| o.amount).collect::<Vec<_>>(),
                wants.iter().map(|&(_, want)| want).collect::<Vec<_>>(),
            )
        };
        let mut drawn = vec![Fixed64::ZERO; offers.len()];
        let mut delivered = Fixed64::ZERO;

        for (&(consumer, _), &want) in wants.iter().zip(&targets) {
            let mut received = Fixed64::ZERO;
            for (i, offer) in offers.iter().enumerate() {
                if received >= want || budget <= Fixed64::ZERO {
                    break;
                }
                if remaining[i] <= Fixed64::ZERO {
                    continue;
                }
                let Some(route) = routes[i].get(&consumer) else {
                    continue;
                };
                let mut amount = (want - received).min(remaining[i]).min(budget);
                if let Some(limit) = edge_limit {
                    for edge in route.edges() {
                        let used = ctx.edge_used.get(&edge).copied().unwrap_or(Fixed64::ZERO);
                        amount = amount.min(limit - used);
                    }
                }
                if amount <= Fixed64::ZERO {
                    continue;
                }
                if edge_limit.is_some() {
                    for edge in route.edges() {
                        let used = ctx.edge_used.entry(edge).or_insert(Fixed64::ZERO);
                        *used = used.saturating_add(amount);
                    }
                }
                for &pipe in route.intersections() {
                    ctx.snapshot.record(pipe, fluid, amount);
                }
                remaining[i] -= amount;
                drawn[i] += amount;
                received += amount;
                budget -= amount;
                log::trace!(
                    "{} -> {}: {amount} of fluid {}",
                    offer.point,
                    consumer,
                    fluid.0
                );
            }

            if received > Fixed64::ZERO {
                self.deliver(consumer, fluid, received, ctx);
                delivered = delivered.saturating_add(received);
            }
        }

        let mut lost = Fixed64::ZERO;
        for (i, offer) in offers.iter().enumerate() {
            ctx.report.supplied = ctx.report.supplied.saturating_add(offer.amount);
            ctx.snapshot.record(offer.point, fluid, drawn[i]);
            match offer.source {
                OfferSource::Emission => {
                    lost = lost.saturating_add(offer.amount - drawn[i]);
                    if drawn[i] > Fixed64::ZERO {
                        self.run_producer_hook(offer.point, fluid, drawn[i], ctx);
                    }
                }
                OfferSource::Stored => self.drain_stored(offer.point, fluid, drawn[i], ctx),
            }
        }

        ctx.report.delivered = ctx.report.delivered.saturating_add(delivered);
        if lost > Fixed64::ZERO {
            let anchor = component.anchor();
            log::debug!(
                "component {anchor}: {lost} of fluid {} lost for lack of demand",
                fluid.0
            );
            ctx.report.lost = ctx.report.lost.saturating_add(lost);
            ctx.snapshot.lost.insert((anchor, fluid), lost);
            ctx.report.events.push(FluidEvent::FlowLost {
                anchor,
                fluid,
                amount: lost,
                tick: ctx.now,
            });
        }
    }

    fn deliver(&mut self, consumer: PointId, fluid: FluidTypeId, amount: Fixed64, ctx: &mut TickContext) {
        let Some(point) = self.points.get_mut(&consumer) else {
            return;
        };
        let limited = point.throughput().is_some();
        let Some(buffer) = point.buffer_mut() else {
            return;
        };
        let was_full = buffer.is_full();
        let accepted = buffer.insert(fluid, amount);
        if !was_full && buffer.is_full() {
            ctx.report.events.push(FluidEvent::BufferFull {
                point: consumer,
                fluid,
                tick: ctx.now,
            });
        }
        if limited {
            let inbound = ctx.inbound.entry(consumer).or_insert(Fixed64::ZERO);
            *inbound = inbound.saturating_add(accepted);
        }
        ctx.snapshot.record(consumer, fluid, accepted);
    }

    fn drain_stored(&mut self, supplier: PointId, fluid: FluidTypeId, amount: Fixed64, ctx: &mut TickContext) {
        if amount <= Fixed64::ZERO {
            return;
        }
        let Some(buffer) = self.points.get_mut(&supplier).and_then(ConnectionPoint::buffer_mut) else {
            return;
        };
        buffer.withdraw(fluid, amount);
        if buffer.is_empty() {
            ctx.report.events.push(FluidEvent::BufferEmpty {
                point: supplier,
                fluid,
                tick: ctx.now,
            });
        }
    }

    fn run_producer_hook(&mut self, id: PointId, fluid: FluidTypeId, amount: Fixed64, ctx: &mut TickContext) {
        let Some(producer) = self.points.get_mut(&id).and_then(ConnectionPoint::producer_mut) else {
            return;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| producer.on_fluid_removed(fluid, amount)));
        let reason = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };
        log::warn!("fluid hook on {id} failed: {reason}");
        ctx.report.events.push(FluidEvent::HookFailed {
            point: id,
            fluid,
            reason,
            tick: ctx.now,
        });
    }
}

/// Allowances and targets for [`TieBreak::EvenSplit`].
///
/// Only suppliers that reach a consumer with headroom get an allowance, and
/// only consumers some supplier reaches get a target. Suppliers share the
/// total demand (capped by `budget`), then consumers share what the
/// suppliers give.
fn even_split(
    offers: &[Offer],
    routes: &[BTreeMap<PointId, Route>],
    wants: &[(PointId, Fixed64)],
    budget: Fixed64,
) -> (Vec<Fixed64>, Vec<Fixed64>) {
    let reachable: Vec<Fixed64> = wants
        .iter()
        .map(|&(consumer, want)| {
            if routes.iter().any(|r| r.contains_key(&consumer)) {
                want
            } else {
                Fixed64::ZERO
            }
        })
        .collect();
    let offered: Vec<Fixed64> = offers
        .iter()
        .zip(routes)
        .map(|(offer, reach)| {
            let feeds_someone = wants
                .iter()
                .zip(&reachable)
                .any(|(&(consumer, _), &want)| want > Fixed64::ZERO && reach.contains_key(&consumer));
            if feeds_someone {
                offer.amount
            } else {
                Fixed64::ZERO
            }
        })
        .collect();

    let demand = reachable
        .iter()
        .fold(Fixed64::ZERO, |total, want| total.saturating_add(*want));
    let allowances = even_shares(&offered, demand.min(budget));
    let supplied = allowances
        .iter()
        .fold(Fixed64::ZERO, |total, share| total.saturating_add(*share));
    (allowances, even_shares(&reachable, supplied))
}

/// Split `total` evenly over `amounts`, never giving more than an entry
/// asks for. Entries below the even share get their full amount and the
/// rest is shared equally among the others.
fn even_shares(amounts: &[Fixed64], total: Fixed64) -> Vec<Fixed64> {
    let mut shares = vec![Fixed64::ZERO; amounts.len()];
    let mut open: Vec<usize> = (0..amounts.len()).collect();
    let mut left = total.max(Fixed64::ZERO);
    while !open.is_empty() {
        let share = left / open.len() as i64;
        let (settled, rest): (Vec<usize>, Vec<usize>) =
            open.into_iter().partition(|&i| amounts[i] <= share);
        if settled.is_empty() {
            for &i in &rest {
                shares[i] = share;
            }
            break;
        }
        for i in settled {
            shares[i] = amounts[i];
            left -= amounts[i];
        }
        open = rest;
    }
    shares
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
