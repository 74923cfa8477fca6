//! Timezone localization of UTC instants to entity-local wall time.

use crate::error::{HistoryError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use entity_history_types::entity::EntityId;
use rustc_hash::FxHashMap;

/// Per-entity timezone lookup with overflow-tolerant conversion.
#[derive(Debug, Clone)]
pub struct Localizer {
    zones: FxHashMap<EntityId, Tz>,
    default_zone: Tz,
    retry_shift: Duration,
}

impl Localizer {
    pub fn new(default_zone: Tz, retry_days: u32) -> Self {
        Self {
            zones: FxHashMap::default(),
            default_zone,
            retry_shift: Duration::days(i64::from(retry_days)),
        }
    }

    /// Build from `(entity, zone name)` pairs. Unparseable names fall back to
    /// the default zone.
    pub fn from_names<I, S>(names: I, default_zone: Tz, retry_days: u32) -> Self
    where
        I: IntoIterator<Item = (EntityId, S)>,
        S: AsRef<str>,
    {
        let mut localizer = Self::new(default_zone, retry_days);
        let mut malformed = 0usize;
        for (entity, name) in names {
            match name.as_ref().parse::<Tz>() {
                Ok(tz) => {
                    localizer.zones.insert(entity, tz);
                }
                Err(_) => {
                    malformed += 1;
                    log::warn!(
                        "Unknown timezone '{}' for {}, using {}",
                        name.as_ref(),
                        entity,
                        default_zone.name()
                    );
                }
            }
        }
        log::debug!(
            "Timezone lookup built: {} zones, {} malformed",
            localizer.zones.len(),
            malformed
        );
        localizer
    }

    pub fn insert(&mut self, entity: EntityId, zone: Tz) {
        self.zones.insert(entity, zone);
    }

    pub fn zone_for(&self, entity: EntityId) -> Tz {
        self.zones.get(&entity).copied().unwrap_or(self.default_zone)
    }

    /// Convert a UTC instant to the entity's zone-naive local time.
    ///
    /// If the conversion overflows the representable range, the instant is
    /// shifted back by the retry offset and converted once more; a second
    /// overflow is returned as `HistoryError::TimeOverflow`.
    pub fn localize(&self, entity: EntityId, time: DateTime<Utc>) -> Result<NaiveDateTime> {
        let zone = self.zone_for(entity);
        let utc = time.naive_utc();

        if let Some(local) = to_local(zone, utc) {
            return Ok(local);
        }

        log::warn!(
            "Localizing {} for {} overflowed, retrying {} days earlier",
            utc,
            entity,
            self.retry_shift.num_days()
        );
        utc.checked_sub_signed(self.retry_shift)
            .and_then(|shifted| to_local(zone, shifted))
            .ok_or(HistoryError::TimeOverflow { entity, time: utc })
    }

    /// Localize an instant that carries no zone. It is taken to be UTC.
    pub fn localize_naive(&self, entity: EntityId, time: NaiveDateTime) -> Result<NaiveDateTime> {
        self.localize(entity, Utc.from_utc_datetime(&time))
    }

    /// Local calendar day of a UTC instant for the entity.
    pub fn local_day(&self, entity: EntityId, time: DateTime<Utc>) -> Result<NaiveDate> {
        Ok(floor_day(self.localize(entity, time)?))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new(Tz::UTC, 7)
    }
}

/// Floor a local time to its calendar day.
#[inline]
pub fn floor_day(time: NaiveDateTime) -> NaiveDate {
    time.date()
}

fn to_local(zone: Tz, utc: NaiveDateTime) -> Option<NaiveDateTime> {
    let offset = zone.offset_from_utc_datetime(&utc).fix().local_minus_utc();
    utc.checked_add_signed(Duration::seconds(i64::from(offset)))
}
