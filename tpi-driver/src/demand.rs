//! Shared drive demand
//!
//! The application writes the demand; the heartbeat thread reads it once per
//! tick. Both axes live behind one lock so a reader can never pair the `x`
//! of one write with the `y` of another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tpi_protocol::{Demand, EncodeError};

/// Cloneable handle to the live demand
#[derive(Debug, Clone, Default)]
pub struct DemandState {
    inner: Arc<Mutex<Demand>>,
}

impl DemandState {
    /// Create a demand cell holding `initial`
    pub fn new(initial: Demand) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    /// Replace both axes; out-of-range values leave the demand unchanged
    pub fn set(&self, x: i32, y: i32) -> Result<(), EncodeError> {
        let demand = Demand::new(x, y)?;
        *self.lock() = demand;
        Ok(())
    }

    pub fn set_demand(&self, demand: Demand) {
        *self.lock() = demand;
    }

    /// Bring the chair to a standstill
    pub fn stop(&self) {
        self.set_demand(Demand::ZERO);
    }

    /// Snapshot of the current demand
    pub fn get(&self) -> Demand {
        *self.lock()
    }

    /// Modify the demand in place under the lock
    pub fn update<F: FnOnce(&mut Demand)>(&self, f: F) {
        f(&mut self.lock());
    }

    /// Hold the demand lock
    ///
    /// The heartbeat keeps this guard across its send so that a tick and a
    /// concurrent write never interleave.
    pub fn lock(&self) -> MutexGuard<'_, Demand> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_standstill() {
        assert_eq!(DemandState::default().get(), Demand::ZERO);
    }

    #[test]
    fn test_set_and_get() {
        let demand = DemandState::new(Demand::new(10, 0).unwrap());
        assert_eq!(demand.get(), Demand::new(10, 0).unwrap());

        demand.set(-40, 60).unwrap();
        assert_eq!(demand.get().x(), -40);
        assert_eq!(demand.get().y(), 60);
    }

    #[test]
    fn test_out_of_range_leaves_value() {
        let demand = DemandState::new(Demand::new(5, 5).unwrap());
        assert!(demand.set(5, 101).is_err());
        assert_eq!(demand.get(), Demand::new(5, 5).unwrap());
    }

    #[test]
    fn test_clones_share_value() {
        let writer = DemandState::default();
        let reader = writer.clone();

        writer.set(100, -100).unwrap();
        assert_eq!(reader.get(), Demand::new(100, -100).unwrap());

        reader.stop();
        assert_eq!(writer.get(), Demand::ZERO);
    }

    #[test]
    fn test_update_in_place() {
        let demand = DemandState::new(Demand::new(20, 30).unwrap());
        demand.update(|d| *d = Demand::new(i32::from(d.y()), i32::from(d.x())).unwrap());
        assert_eq!(demand.get(), Demand::new(30, 20).unwrap());
    }
}
