//! Rental lifecycle.
//!
//! ```text
//! AVAILABLE --start--> RENTED --end--> AVAILABLE
//!                        |
//!                     expire
//!                        v
//!                     EXPIRED --end--> AVAILABLE
//! ```
//!
//! A start on a `RENTED` tag and an end on an `AVAILABLE` tag leave the record
//! untouched and report the current status.

use std::sync::Arc;

use rentscan_protocol::{RentalStatus, StatusResponse, TagId, DEFAULT_RENTAL_DURATION_SECS};

use crate::clock::Clock;
use crate::store::{RentalRecord, RentalStore};

pub struct RentalMachine {
    store: RentalStore,
    clock: Arc<dyn Clock>,
    default_duration: u64,
}

impl RentalMachine {
    pub fn new(store: RentalStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, default_duration: DEFAULT_RENTAL_DURATION_SECS }
    }

    pub fn with_default_duration(mut self, secs: u64) -> Self {
        self.default_duration = secs.max(1);
        self
    }

    pub fn store(&self) -> &RentalStore {
        &self.store
    }

    pub fn start(&self, tag: &TagId, duration: Option<u64>) -> StatusResponse {
        let now = self.clock.now_secs();
        let mut table = self.store.table();
        let record = table.entry(tag.clone()).or_default();

        if record.status == RentalStatus::Rented {
            log::warn!(
                "rental: start rejected tag={} already rented since={} duration={}",
                tag,
                record.rent_timestamp,
                record.duration
            );
            return StatusResponse::bare(tag.clone(), RentalStatus::Rented);
        }

        *record = RentalRecord {
            status: RentalStatus::Rented,
            rent_timestamp: now,
            duration: duration.unwrap_or(self.default_duration),
            return_timestamp: 0,
        };
        log::info!(
            "rental: started tag={} at={} duration={}",
            tag,
            record.rent_timestamp,
            record.duration
        );
        StatusResponse::bare(tag.clone(), RentalStatus::Rented)
    }

    pub fn end(&self, tag: &TagId) -> StatusResponse {
        let now = self.clock.now_secs();
        let mut table = self.store.table();
        let Some(record) = table.get_mut(tag) else {
            log::warn!("rental: end for unknown tag={}", tag);
            return StatusResponse::bare(tag.clone(), RentalStatus::Available);
        };

        if !matches!(record.status, RentalStatus::Rented | RentalStatus::Expired) {
            log::warn!("rental: end ignored tag={} status={}", tag, record.status);
            return StatusResponse::bare(tag.clone(), record.status);
        }

        let previous = record.status;
        record.status = RentalStatus::Available;
        record.return_timestamp = now;
        log::info!(
            "rental: ended tag={} was={} rented_at={} returned_at={}",
            tag,
            previous,
            record.rent_timestamp,
            now
        );
        StatusResponse::bare(tag.clone(), RentalStatus::Available)
    }

    pub fn status(&self, tag: &TagId) -> StatusResponse {
        match self.store.get(tag) {
            Some(record) => {
                log::info!(
                    "rental: status tag={} status={} rented_at={} duration={} returned_at={}",
                    tag,
                    record.status,
                    record.rent_timestamp,
                    record.duration,
                    record.return_timestamp
                );
                StatusResponse {
                    status: record.status,
                    tag: tag.clone(),
                    timestamp: record.rent_timestamp,
                    duration: record.duration,
                }
            }
            None => {
                log::info!("rental: status tag={} no record", tag);
                StatusResponse::bare(tag.clone(), RentalStatus::Available)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn tag(hex: &str) -> TagId {
        TagId::from_hex(hex).expect("tag")
    }

    fn machine_at(now: u64) -> (RentalMachine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        (RentalMachine::new(RentalStore::new(), clock.clone()), clock)
    }

    #[test]
    fn status_of_unseen_tag_is_available_and_creates_nothing() {
        let (machine, _) = machine_at(1_000);
        let response = machine.status(&tag("ffeedd"));
        assert_eq!(response, StatusResponse::bare(tag("ffeedd"), RentalStatus::Available));
        assert!(machine.store().is_empty());
    }

    #[test]
    fn start_creates_rented_record() {
        let (machine, _) = machine_at(1_000);
        let response = machine.start(&tag("aabbcc"), Some(5));
        assert_eq!(response.status, RentalStatus::Rented);

        let record = machine.store().get(&tag("aabbcc")).expect("record");
        assert_eq!(
            record,
            RentalRecord {
                status: RentalStatus::Rented,
                rent_timestamp: 1_000,
                duration: 5,
                return_timestamp: 0
            }
        );
    }

    #[test]
    fn start_applies_default_duration() {
        let (machine, _) = machine_at(1_000);
        machine.start(&tag("01"), None);
        assert_eq!(machine.store().get(&tag("01")).expect("record").duration, 3600);

        let (machine, _) = machine_at(1_000);
        let machine = machine.with_default_duration(120);
        machine.start(&tag("01"), None);
        assert_eq!(machine.store().get(&tag("01")).expect("record").duration, 120);
    }

    #[test]
    fn second_start_is_rejected_without_mutation() {
        let (machine, clock) = machine_at(1_000);
        machine.start(&tag("aabbcc"), Some(5));
        clock.advance(2);

        let response = machine.start(&tag("aabbcc"), Some(900));
        assert_eq!(response.status, RentalStatus::Rented);
        let record = machine.store().get(&tag("aabbcc")).expect("record");
        assert_eq!(record.rent_timestamp, 1_000);
        assert_eq!(record.duration, 5);
    }

    #[test]
    fn end_returns_rented_item() {
        let (machine, clock) = machine_at(1_000);
        machine.start(&tag("aabbcc"), Some(5));
        clock.set(1_003);

        let response = machine.end(&tag("aabbcc"));
        assert_eq!(response.status, RentalStatus::Available);
        let record = machine.store().get(&tag("aabbcc")).expect("record");
        assert_eq!(record.status, RentalStatus::Available);
        assert_eq!(record.return_timestamp, 1_003);
        assert_eq!(record.rent_timestamp, 1_000);
    }

    #[test]
    fn end_returns_expired_item() {
        let (machine, clock) = machine_at(1_000);
        machine.start(&tag("aabbcc"), Some(5));
        machine.store().table().get_mut(&tag("aabbcc")).expect("record").status =
            RentalStatus::Expired;
        clock.set(1_100);

        assert_eq!(machine.end(&tag("aabbcc")).status, RentalStatus::Available);
        assert_eq!(machine.store().get(&tag("aabbcc")).expect("record").return_timestamp, 1_100);
    }

    #[test]
    fn end_on_unknown_tag_creates_nothing() {
        let (machine, _) = machine_at(1_000);
        let response = machine.end(&tag("aabbcc"));
        assert_eq!(response.status, RentalStatus::Available);
        assert!(machine.store().is_empty());
    }

    #[test]
    fn end_on_available_item_is_noop() {
        let (machine, clock) = machine_at(1_000);
        machine.start(&tag("aabbcc"), Some(5));
        clock.set(1_002);
        machine.end(&tag("aabbcc"));
        clock.set(1_010);

        let response = machine.end(&tag("aabbcc"));
        assert_eq!(response.status, RentalStatus::Available);
        assert_eq!(machine.store().get(&tag("aabbcc")).expect("record").return_timestamp, 1_002);
    }

    #[test]
    fn returned_item_can_be_rented_again() {
        let (machine, clock) = machine_at(1_000);
        machine.start(&tag("aabbcc"), Some(5));
        machine.end(&tag("aabbcc"));
        clock.set(2_000);

        machine.start(&tag("aabbcc"), Some(60));
        let record = machine.store().get(&tag("aabbcc")).expect("record");
        assert_eq!(record.status, RentalStatus::Rented);
        assert_eq!(record.rent_timestamp, 2_000);
        assert_eq!(record.duration, 60);
        assert_eq!(record.return_timestamp, 0);
    }

    #[test]
    fn status_reports_rental_timing() {
        let (machine, _) = machine_at(1_000);
        machine.start(&tag("aabbcc"), Some(5));
        let response = machine.status(&tag("aabbcc"));
        assert_eq!(
            response,
            StatusResponse {
                status: RentalStatus::Rented,
                tag: tag("aabbcc"),
                timestamp: 1_000,
                duration: 5
            }
        );
    }

    #[test]
    fn start_and_end_replies_carry_no_timing() {
        let (machine, _) = machine_at(1_000);
        let started = machine.start(&tag("aabbcc"), Some(5));
        assert_eq!((started.timestamp, started.duration), (0, 0));
        let ended = machine.end(&tag("aabbcc"));
        assert_eq!((ended.timestamp, ended.duration), (0, 0));
    }
}
