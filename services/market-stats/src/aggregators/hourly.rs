//! Hourly statistics accumulation
//!
//! One snapshot becomes one upsert batch for the hour it was taken in.
//! Listings sharing a statistics identity fold to the minimum unit price
//! and the summed quantity; the store later touches only that hour's two
//! columns, so earlier hours of the day survive untouched.

use crate::identity::StatIdentity;
use crate::storage::rows::{HourlyUpsertBatch, HourlyUpsertRow};
use crate::AuctionListing;
use chrono::Timelike;
use rustc_hash::FxHashMap;
use services_common::{AhId, Px, Qty, Ts};
use tracing::debug;

/// Accumulator for hourly price statistics
#[derive(Debug, Default)]
pub struct HourlyStatAccumulator;

impl HourlyStatAccumulator {
    /// Create a new hourly accumulator
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Fold one snapshot into the upsert batch for its hour.
    ///
    /// Hour and day derive from the snapshot timestamp in UTC. Listings
    /// with no price signal (zero buyout or zero quantity) are skipped
    /// silently; they never abort the batch.
    #[must_use]
    pub fn accumulate(
        &self,
        listings: &[AuctionListing],
        last_modified: Ts,
        ah: AhId,
    ) -> HourlyUpsertBatch {
        let datetime = last_modified.to_datetime();
        let day = datetime.date_naive();
        // Hour of day is 0-23
        #[allow(clippy::cast_possible_truncation)]
        let hour = datetime.hour() as u8;

        let mut folded: FxHashMap<StatIdentity, (Px, Qty)> = FxHashMap::default();
        let mut order: Vec<StatIdentity> = Vec::new();

        for listing in listings {
            let Some(unit) = listing.unit_buyout() else {
                continue;
            };
            if !unit.is_positive() {
                continue;
            }

            let identity = StatIdentity::from_listing(ah, listing);
            match folded.get_mut(&identity) {
                Some((price, quantity)) => {
                    if unit < *price {
                        *price = unit;
                    }
                    *quantity = quantity.add(listing.quantity);
                }
                None => {
                    folded.insert(identity.clone(), (unit, listing.quantity));
                    order.push(identity);
                }
            }
        }

        let rows: Vec<HourlyUpsertRow> = order
            .into_iter()
            .map(|identity| {
                let (price, quantity) = folded.remove(&identity).unwrap_or((Px::ZERO, Qty::ZERO));
                HourlyUpsertRow {
                    identity,
                    price,
                    quantity,
                }
            })
            .collect();

        debug!(
            rows = rows.len(),
            listings = listings.len(),
            hour,
            %day,
            "accumulated hourly batch"
        );

        HourlyUpsertBatch { day, hour, rows }
    }
}
