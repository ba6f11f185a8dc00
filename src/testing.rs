//! In-memory stand-ins for the I2C buses and the cache file.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::bus::{BusId, BusProvider, DEVICE_ADDRESS};
use crate::cache::{CacheRecord, CacheStore};
use crate::error::{CacheError, TransportError};
use crate::register::Register;

/// 4.0 V, 85 %, 0 %/hr
pub const DEFAULT_GAUGE: [(Register, [u8; 2]); 3] = [
    (Register::Vcell, [0xC8, 0x00]),
    (Register::Soc, [0x55, 0x00]),
    (Register::Crate, [0x00, 0x00]),
];

pub struct FakeBus {
    address: u8,
    registers: HashMap<u8, [u8; 2]>,
    live: Rc<Cell<usize>>,
}

impl FakeBus {
    pub fn with_registers(registers: &[(Register, [u8; 2])]) -> Self {
        Self {
            address: DEVICE_ADDRESS,
            registers: registers.iter().map(|(r, v)| (r.addr(), *v)).collect(),
            live: Rc::new(Cell::new(1)),
        }
    }
}

impl Drop for FakeBus {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        let mut register = None;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => register = bytes.first().copied(),
                Operation::Read(buf) => {
                    let value = register
                        .and_then(|r| self.registers.get(&r))
                        .ok_or(ErrorKind::Other)?;
                    if buf.len() != value.len() {
                        return Err(ErrorKind::Other);
                    }
                    buf.copy_from_slice(value);
                }
            }
        }
        Ok(())
    }
}

enum FakeNode {
    /// Bus exists, nothing answers at the gauge address.
    Empty,
    Gauge(Vec<(Register, [u8; 2])>),
    /// The device node cannot be opened.
    Broken,
}

pub struct FakeBuses {
    nodes: Vec<(BusId, FakeNode)>,
    opened: RefCell<Vec<BusId>>,
    live: Rc<Cell<usize>>,
}

impl FakeBuses {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            opened: RefCell::new(Vec::new()),
            live: Rc::new(Cell::new(0)),
        }
    }

    pub fn empty(mut self, bus: u32) -> Self {
        self.nodes.push((BusId(bus), FakeNode::Empty));
        self
    }

    pub fn broken(mut self, bus: u32) -> Self {
        self.nodes.push((BusId(bus), FakeNode::Broken));
        self
    }

    pub fn gauge(self, bus: u32) -> Self {
        self.gauge_with(bus, &DEFAULT_GAUGE)
    }

    pub fn gauge_with(mut self, bus: u32, registers: &[(Register, [u8; 2])]) -> Self {
        self.nodes
            .push((BusId(bus), FakeNode::Gauge(registers.to_vec())));
        self
    }

    /// Every bus opened so far, in order.
    pub fn opened(&self) -> Vec<BusId> {
        self.opened.borrow().clone()
    }

    /// Handles opened and not yet dropped.
    pub fn live_handles(&self) -> usize {
        self.live.get()
    }
}

impl BusProvider for FakeBuses {
    type Bus = FakeBus;

    fn enumerate(&self) -> Vec<BusId> {
        self.nodes.iter().map(|(id, _)| *id).collect()
    }

    fn open(&self, bus: BusId) -> Result<FakeBus, TransportError> {
        let node = self
            .nodes
            .iter()
            .find(|(id, _)| *id == bus)
            .map(|(_, node)| node);
        let registers: &[(Register, [u8; 2])] = match node {
            Some(FakeNode::Gauge(registers)) => registers.as_slice(),
            Some(FakeNode::Empty) => &[],
            Some(FakeNode::Broken) | None => {
                return Err(TransportError::Open {
                    bus,
                    reason: "No such file or directory".into(),
                })
            }
        };

        self.opened.borrow_mut().push(bus);
        self.live.set(self.live.get() + 1);
        let mut handle = FakeBus::with_registers(registers);
        handle.live = self.live.clone();
        if matches!(node, Some(FakeNode::Empty)) {
            handle.address = 0;
        }
        Ok(handle)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub record: RefCell<Option<CacheRecord>>,
    pub writes: Cell<usize>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn holding(record: CacheRecord) -> Self {
        Self {
            record: RefCell::new(Some(record)),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn error() -> CacheError {
        CacheError::Io {
            path: PathBuf::from("memory"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
    }
}

impl CacheStore for MemoryStore {
    fn read(&self) -> Result<Option<CacheRecord>, CacheError> {
        if self.fail {
            return Err(Self::error());
        }
        Ok(self.record.borrow().clone())
    }

    fn write(&self, record: &CacheRecord) -> Result<(), CacheError> {
        if self.fail {
            return Err(Self::error());
        }
        self.writes.set(self.writes.get() + 1);
        *self.record.borrow_mut() = Some(record.clone());
        Ok(())
    }
}
