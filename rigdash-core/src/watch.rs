//! The watch list: a paged projection of the store onto the dashboard.
//!
//! Each entry names a parameter, where and how to draw it, and four
//! thresholds. Severity is two nested bands: at or beyond the critical
//! bounds is critical, at or beyond the warning bounds is a warning,
//! otherwise none. Unused thresholds saturate to infinity so they can
//! never trip.

use heapless::{String, Vec};

use crate::param::ParamId;
use crate::store::ParamStore;

/// Watch list capacity.
pub const MAX_ITEMS: usize = 16;
/// Logical display pages.
pub const MAX_PAGES: u8 = 4;

/// How an entry is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    /// Round gauge (rpm, speed).
    Circular,
    /// Bar gauge (temperature, fuel).
    Linear,
    /// Half-circle gauge.
    Semicircle,
    /// Plain number.
    Numeric,
    /// On/off lamp.
    Indicator,
    /// Text status.
    Text,
    /// Trend line.
    Graph,
}

/// Alert severity, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AlertLevel {
    /// Inside all bands.
    #[default]
    None,
    /// Informational only.
    Info,
    /// Warning band tripped.
    Warning,
    /// Critical band tripped.
    Critical,
}

/// One watched parameter.
#[derive(Debug, Clone)]
pub struct WatchItem {
    /// Identity being watched.
    pub param: ParamId,
    /// Rendering.
    pub widget: Widget,
    /// Page index, 0..[`MAX_PAGES`].
    pub page: u8,
    /// Position within the page.
    pub position: u8,
    /// Decimal places to show.
    pub decimal_places: u8,
    /// Low warning bound.
    pub warn_low: f32,
    /// High warning bound.
    pub warn_high: f32,
    /// Low critical bound.
    pub crit_low: f32,
    /// High critical bound.
    pub crit_high: f32,
    /// Label override.
    pub custom_label: Option<String<12>>,
    /// Unit override.
    pub custom_unit: Option<String<8>>,
    /// Gauge scale minimum.
    pub gauge_min: f32,
    /// Gauge scale maximum.
    pub gauge_max: f32,
    /// Disabled entries keep their slot but are skipped everywhere.
    pub enabled: bool,
    /// Severity from the last [`WatchList::update`].
    pub alert: AlertLevel,
}

impl WatchItem {
    fn new(param: ParamId, widget: Widget, page: u8, position: u8) -> Self {
        Self {
            param,
            widget,
            page,
            position,
            decimal_places: 1,
            warn_low: f32::NEG_INFINITY,
            warn_high: f32::INFINITY,
            crit_low: f32::NEG_INFINITY,
            crit_high: f32::INFINITY,
            custom_label: None,
            custom_unit: None,
            gauge_min: 0.0,
            gauge_max: 100.0,
            enabled: true,
            alert: AlertLevel::None,
        }
    }

    /// Display label: the override if set, else the catalogue name.
    pub fn label(&self) -> &str {
        match &self.custom_label {
            Some(label) if !label.is_empty() => label,
            _ => self.param.name(),
        }
    }

    /// Display unit: the override if set, else the catalogue unit.
    pub fn unit(&self) -> &str {
        match &self.custom_unit {
            Some(unit) if !unit.is_empty() => unit,
            _ => self.param.unit(),
        }
    }
}

/// Severity of a value against an item's thresholds.
pub fn severity(item: &WatchItem, value: f32) -> AlertLevel {
    if value <= item.crit_low || value >= item.crit_high {
        AlertLevel::Critical
    } else if value <= item.warn_low || value >= item.warn_high {
        AlertLevel::Warning
    } else {
        AlertLevel::None
    }
}

/// Failures from watch-list mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchError {
    /// The parameter is already watched.
    AlreadyWatched,
    /// All [`MAX_ITEMS`] slots are taken.
    Full,
    /// Page index beyond [`MAX_PAGES`].
    BadPage,
    /// No entry for that parameter.
    NotFound,
}

/// The watch list itself.
pub struct WatchList {
    items: Vec<WatchItem, MAX_ITEMS>,
    current_page: u8,
}

impl WatchList {
    /// Empty list on page 0.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            current_page: 0,
        }
    }

    /// Add an entry with default thresholds and gauge range.
    pub fn add(
        &mut self,
        param: ParamId,
        widget: Widget,
        page: u8,
        position: u8,
    ) -> Result<usize, WatchError> {
        if page >= MAX_PAGES {
            return Err(WatchError::BadPage);
        }
        if self.items.iter().any(|item| item.param == param) {
            return Err(WatchError::AlreadyWatched);
        }
        self.items
            .push(WatchItem::new(param, widget, page, position))
            .map_err(|_| WatchError::Full)?;
        Ok(self.items.len() - 1)
    }

    /// Remove the entry for a parameter.
    pub fn remove(&mut self, param: ParamId) -> Result<(), WatchError> {
        let at = self
            .items
            .iter()
            .position(|item| item.param == param)
            .ok_or(WatchError::NotFound)?;
        self.items.remove(at);
        Ok(())
    }

    /// Set all four thresholds. Saturate unused bounds to infinity.
    pub fn set_thresholds(
        &mut self,
        param: ParamId,
        warn_low: f32,
        warn_high: f32,
        crit_low: f32,
        crit_high: f32,
    ) -> Result<(), WatchError> {
        let item = self.item_mut(param)?;
        item.warn_low = warn_low;
        item.warn_high = warn_high;
        item.crit_low = crit_low;
        item.crit_high = crit_high;
        Ok(())
    }

    /// Set the gauge scale.
    pub fn set_gauge_range(&mut self, param: ParamId, min: f32, max: f32) -> Result<(), WatchError> {
        let item = self.item_mut(param)?;
        item.gauge_min = min;
        item.gauge_max = max;
        Ok(())
    }

    /// Override label and unit. Overlong strings are truncated.
    pub fn set_custom_label(
        &mut self,
        param: ParamId,
        label: &str,
        unit: &str,
    ) -> Result<(), WatchError> {
        let item = self.item_mut(param)?;
        item.custom_label = Some(truncate(label));
        item.custom_unit = Some(truncate(unit));
        Ok(())
    }

    /// Recompute severity for every enabled entry.
    ///
    /// Entries without a valid value keep severity `None`; a stale-but-valid
    /// value keeps reporting its last severity until a consumer invalidates
    /// the parameter.
    pub fn update(&mut self, store: &ParamStore) {
        for item in &mut self.items {
            if !item.enabled {
                continue;
            }
            item.alert = match store.get(item.param) {
                Some(value) => severity(item, value),
                None => AlertLevel::None,
            };
        }
    }

    /// Enabled entries on a page.
    pub fn page_items(&self, page: u8) -> impl Iterator<Item = &WatchItem> {
        self.items
            .iter()
            .filter(move |item| item.enabled && item.page == page)
    }

    /// Entry for a parameter.
    pub fn item(&self, param: ParamId) -> Option<&WatchItem> {
        self.items.iter().find(|item| item.param == param)
    }

    /// Entry by slot index.
    pub fn item_at(&self, index: usize) -> Option<&WatchItem> {
        self.items.get(index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no entries exist.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Worst severity across enabled entries.
    pub fn highest_alert(&self) -> AlertLevel {
        self.items
            .iter()
            .filter(|item| item.enabled)
            .map(|item| item.alert)
            .max()
            .unwrap_or(AlertLevel::None)
    }

    /// Enabled entries at or above a severity.
    pub fn alert_count(&self, at_least: AlertLevel) -> usize {
        self.items
            .iter()
            .filter(|item| item.enabled && item.alert >= at_least)
            .count()
    }

    /// Current display page.
    pub fn page(&self) -> u8 {
        self.current_page
    }

    /// Jump to a page; out-of-range wraps to 0.
    pub fn set_page(&mut self, page: u8) {
        self.current_page = if page >= MAX_PAGES { 0 } else { page };
    }

    /// Advance to the next page, wrapping.
    pub fn next_page(&mut self) -> u8 {
        self.current_page = (self.current_page + 1) % MAX_PAGES;
        self.current_page
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.items.clear();
        self.current_page = 0;
    }

    /// Install the canonical four-page truck layout.
    ///
    /// Page 0 engine, page 1 speed/fuel, page 2 transmission, page 3
    /// electrics and diagnostics.
    pub fn setup_defaults(&mut self) {
        self.clear();

        let _ = self.add(ParamId::EngineSpeed, Widget::Circular, 0, 0);
        let _ = self.set_thresholds(ParamId::EngineSpeed, 400.0, 2200.0, 300.0, 2500.0);
        let _ = self.set_gauge_range(ParamId::EngineSpeed, 0.0, 3000.0);

        let _ = self.add(ParamId::CoolantTemp, Widget::Linear, 0, 1);
        let _ = self.set_thresholds(ParamId::CoolantTemp, 70.0, 100.0, 50.0, 110.0);
        let _ = self.set_gauge_range(ParamId::CoolantTemp, 40.0, 120.0);

        let _ = self.add(ParamId::OilPressure, Widget::Linear, 0, 2);
        let _ = self.set_thresholds(
            ParamId::OilPressure,
            150.0,
            f32::INFINITY,
            100.0,
            f32::INFINITY,
        );
        let _ = self.set_gauge_range(ParamId::OilPressure, 0.0, 700.0);

        let _ = self.add(ParamId::BoostPressure, Widget::Semicircle, 0, 3);
        let _ = self.set_gauge_range(ParamId::BoostPressure, 0.0, 300.0);

        let _ = self.add(ParamId::VehicleSpeed, Widget::Circular, 1, 0);
        let _ = self.set_gauge_range(ParamId::VehicleSpeed, 0.0, 140.0);

        let _ = self.add(ParamId::FuelLevel1, Widget::Linear, 1, 1);
        let _ = self.set_thresholds(
            ParamId::FuelLevel1,
            15.0,
            f32::INFINITY,
            10.0,
            f32::INFINITY,
        );
        let _ = self.set_gauge_range(ParamId::FuelLevel1, 0.0, 100.0);

        let _ = self.add(ParamId::TransOilTemp, Widget::Linear, 2, 0);
        let _ = self.set_thresholds(
            ParamId::TransOilTemp,
            f32::NEG_INFINITY,
            100.0,
            f32::NEG_INFINITY,
            120.0,
        );
        let _ = self.set_gauge_range(ParamId::TransOilTemp, 0.0, 150.0);

        let _ = self.add(ParamId::BatteryVoltage, Widget::Numeric, 3, 0);
        let _ = self.set_thresholds(ParamId::BatteryVoltage, 12.0, 15.0, 11.5, 15.5);

        if self.add(ParamId::ActiveDtcCount, Widget::Indicator, 3, 1).is_ok() {
            let _ = self.set_thresholds(
                ParamId::ActiveDtcCount,
                f32::NEG_INFINITY,
                0.5,
                f32::NEG_INFINITY,
                0.5,
            );
            if let Ok(item) = self.item_mut(ParamId::ActiveDtcCount) {
                item.decimal_places = 0;
            }
        }
    }

    fn item_mut(&mut self, param: ParamId) -> Result<&mut WatchItem, WatchError> {
        self.items
            .iter_mut()
            .find(|item| item.param == param)
            .ok_or(WatchError::NotFound)
    }
}

impl Default for WatchList {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Source;

    #[test]
    fn severity_bands_nest() {
        let mut item = WatchItem::new(ParamId::CoolantTemp, Widget::Linear, 0, 0);
        item.warn_low = 70.0;
        item.warn_high = 100.0;
        item.crit_low = 50.0;
        item.crit_high = 110.0;

        assert_eq!(severity(&item, 85.0), AlertLevel::None);
        assert_eq!(severity(&item, 100.0), AlertLevel::Warning);
        assert_eq!(severity(&item, 70.0), AlertLevel::Warning);
        assert_eq!(severity(&item, 110.0), AlertLevel::Critical);
        assert_eq!(severity(&item, 45.0), AlertLevel::Critical);
        // Stable under repetition.
        assert_eq!(severity(&item, 110.0), AlertLevel::Critical);
    }

    #[test]
    fn disabled_thresholds_never_trip() {
        let item = WatchItem::new(ParamId::BoostPressure, Widget::Semicircle, 0, 0);
        for value in [-1.0e9, 0.0, 1.0e9] {
            assert_eq!(severity(&item, value), AlertLevel::None);
        }
    }

    #[test]
    fn add_rejects_duplicates_and_bad_pages() {
        let mut list = WatchList::new();
        assert_eq!(list.add(ParamId::EngineSpeed, Widget::Circular, 0, 0), Ok(0));
        assert_eq!(
            list.add(ParamId::EngineSpeed, Widget::Numeric, 1, 0),
            Err(WatchError::AlreadyWatched)
        );
        assert_eq!(
            list.add(ParamId::CoolantTemp, Widget::Linear, MAX_PAGES, 0),
            Err(WatchError::BadPage)
        );
    }

    #[test]
    fn list_fills_up_at_capacity() {
        let mut list = WatchList::new();
        let mut added = 0;
        for id in ParamId::ALL {
            match list.add(id, Widget::Numeric, 0, added as u8) {
                Ok(_) => added += 1,
                Err(WatchError::Full) => break,
                Err(other) => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(added, MAX_ITEMS);
    }

    #[test]
    fn configure_by_identity() {
        let mut list = WatchList::new();
        list.add(ParamId::OilPressure, Widget::Linear, 0, 0).unwrap();

        list.set_thresholds(ParamId::OilPressure, 150.0, f32::INFINITY, 100.0, f32::INFINITY)
            .unwrap();
        list.set_gauge_range(ParamId::OilPressure, 0.0, 700.0).unwrap();
        list.set_custom_label(ParamId::OilPressure, "OIL", "psi").unwrap();

        let item = list.item(ParamId::OilPressure).unwrap();
        assert_eq!(item.warn_low, 150.0);
        assert_eq!(item.gauge_max, 700.0);
        assert_eq!(item.label(), "OIL");
        assert_eq!(item.unit(), "psi");

        assert_eq!(
            list.set_gauge_range(ParamId::FuelRate, 0.0, 1.0),
            Err(WatchError::NotFound)
        );
    }

    #[test]
    fn update_reads_the_store_and_summarises() {
        let mut store = ParamStore::new();
        let mut list = WatchList::new();
        list.setup_defaults();

        store.update(ParamId::CoolantTemp, 105.0, Source::J1939, 1);
        store.update(ParamId::BatteryVoltage, 11.0, Source::J1939, 1);
        store.update(ParamId::EngineSpeed, 1500.0, Source::J1939, 1);
        list.update(&store);

        assert_eq!(list.item(ParamId::CoolantTemp).unwrap().alert, AlertLevel::Warning);
        assert_eq!(
            list.item(ParamId::BatteryVoltage).unwrap().alert,
            AlertLevel::Critical
        );
        assert_eq!(list.item(ParamId::EngineSpeed).unwrap().alert, AlertLevel::None);
        // No fuel level data: no alert.
        assert_eq!(list.item(ParamId::FuelLevel1).unwrap().alert, AlertLevel::None);

        assert_eq!(list.highest_alert(), AlertLevel::Critical);
        assert_eq!(list.alert_count(AlertLevel::Warning), 2);
        assert_eq!(list.alert_count(AlertLevel::Critical), 1);
    }

    #[test]
    fn defaults_match_the_canonical_layout() {
        let mut list = WatchList::new();
        list.setup_defaults();
        assert_eq!(list.len(), 9);

        assert_eq!(list.page_items(0).count(), 4);
        assert_eq!(list.page_items(1).count(), 2);
        assert_eq!(list.page_items(2).count(), 1);
        assert_eq!(list.page_items(3).count(), 2);

        let rpm = list.item(ParamId::EngineSpeed).unwrap();
        assert_eq!(rpm.widget, Widget::Circular);
        assert_eq!((rpm.gauge_min, rpm.gauge_max), (0.0, 3000.0));
        assert_eq!(
            (rpm.warn_low, rpm.warn_high, rpm.crit_low, rpm.crit_high),
            (400.0, 2200.0, 300.0, 2500.0)
        );

        let dtc = list.item(ParamId::ActiveDtcCount).unwrap();
        assert_eq!(dtc.widget, Widget::Indicator);
        assert_eq!(dtc.decimal_places, 0);
        // One active code must alert critically.
        assert_eq!(severity(dtc, 1.0), AlertLevel::Critical);
        assert_eq!(severity(dtc, 0.0), AlertLevel::None);
    }

    #[test]
    fn remove_then_re_add() {
        let mut list = WatchList::new();
        list.setup_defaults();
        list.remove(ParamId::BoostPressure).unwrap();
        assert!(list.item(ParamId::BoostPressure).is_none());
        assert_eq!(list.remove(ParamId::BoostPressure), Err(WatchError::NotFound));
        assert!(list.add(ParamId::BoostPressure, Widget::Numeric, 0, 3).is_ok());
    }

    #[test]
    fn page_navigation_wraps() {
        let mut list = WatchList::new();
        assert_eq!(list.page(), 0);
        list.set_page(2);
        assert_eq!(list.page(), 2);
        assert_eq!(list.next_page(), 3);
        assert_eq!(list.next_page(), 0);
        list.set_page(99);
        assert_eq!(list.page(), 0);
    }

    #[test]
    fn custom_labels_truncate_to_capacity() {
        let mut list = WatchList::new();
        list.add(ParamId::AmbientTemp, Widget::Numeric, 0, 0).unwrap();
        list.set_custom_label(ParamId::AmbientTemp, "Outside Temperature", "degC")
            .unwrap();
        let item = list.item(ParamId::AmbientTemp).unwrap();
        assert_eq!(item.label().len(), 12);
        assert_eq!(item.unit(), "degC");
    }
}
