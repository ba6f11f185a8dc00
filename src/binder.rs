//! Decides which bus to talk to.
//!
//! Scanning every bus on every start is slow when the gauge is polled by a
//! short-lived process, so the last discovered bus is remembered. A cached bus
//! is only trusted after one probe confirms the gauge is still there: buses get
//! renumbered across reboots and hot-plugs.
//!
//! ```text
//! Start --explicit bus--> Bound
//! Start --> CheckCache --empty--> Scan
//!           CheckCache --hit----> Verify --ok--> Bound
//!                                 Verify --fail--> Scan
//! Scan --found (cache refreshed)--> Bound
//! Scan --nothing--> Unbound
//! ```

use chrono::{DateTime, Utc};

use crate::bus::{BusId, BusProvider};
use crate::cache::{BindingCache, CacheStore};
use crate::error::GaugeError;
use crate::probe::probe;
use crate::scan::scan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    Start(Option<BusId>),
    CheckCache,
    Verify(BusId),
    Scan,
    Bound(BusId),
    Unbound,
}

impl BindState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BindState::Bound(_) | BindState::Unbound)
    }
}

/// An open bus with the gauge on it. Dropping it closes the bus.
pub struct BusBinding<B> {
    pub bus_id: BusId,
    pub address: u8,
    pub bound_at: DateTime<Utc>,
    pub(crate) handle: B,
}

impl<B> BusBinding<B> {
    pub fn handle_mut(&mut self) -> &mut B {
        &mut self.handle
    }
}

pub struct DeviceBinder<'a, P, S> {
    provider: &'a P,
    cache: &'a BindingCache<S>,
    address: u8,
}

impl<'a, P: BusProvider, S: CacheStore> DeviceBinder<'a, P, S> {
    pub fn new(provider: &'a P, cache: &'a BindingCache<S>, address: u8) -> Self {
        Self {
            provider,
            cache,
            address,
        }
    }

    /// Advance the binding state machine by one transition.
    pub fn step(&self, state: BindState) -> BindState {
        let next = match state {
            BindState::Start(Some(bus)) => BindState::Bound(bus),
            BindState::Start(None) => BindState::CheckCache,
            BindState::CheckCache => match self.cache.load() {
                Some((bus, age)) => {
                    log::debug!("cached bus {bus} ({}s old)", age.as_secs());
                    BindState::Verify(bus)
                }
                None => BindState::Scan,
            },
            // Verification doesn't refresh the cache: only discoveries are recorded.
            BindState::Verify(bus) => {
                if probe(self.provider, bus, self.address) {
                    BindState::Bound(bus)
                } else {
                    log::info!("gauge no longer on cached bus {bus}, rescanning");
                    BindState::Scan
                }
            }
            BindState::Scan => match scan(self.provider, self.address) {
                Ok(bus) => {
                    self.cache.store(bus);
                    BindState::Bound(bus)
                }
                Err(_) => BindState::Unbound,
            },
            terminal => terminal,
        };
        log::debug!("bind: {state:?} -> {next:?}");
        next
    }

    /// Run the state machine to completion and return the bus the gauge is on.
    pub fn resolve(&self, explicit: Option<BusId>) -> Result<BusId, GaugeError> {
        let mut state = BindState::Start(explicit);
        while !state.is_terminal() {
            state = self.step(state);
        }
        match state {
            BindState::Bound(bus) => Ok(bus),
            _ => Err(GaugeError::NotFound {
                address: self.address,
            }),
        }
    }

    /// Resolve the bus and open it.
    pub fn bind(&self, explicit: Option<BusId>) -> Result<BusBinding<P::Bus>, GaugeError> {
        let bus_id = self.resolve(explicit)?;
        let handle = self.provider.open(bus_id)?;
        log::info!("bound to gauge at {:#04x} on i2c bus {bus_id}", self.address);
        Ok(BusBinding {
            bus_id,
            address: self.address,
            bound_at: Utc::now(),
            handle,
        })
    }
}
