//! Controller for the city list screen.
//!
//! Owns the store, the weather services and both list models. Runs on a
//! single thread; network requests are spawned on the shared runtime and
//! their results are applied here when the channel is drained.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use weathervk_core::{AppError, Config};
use weathervk_store::WeatherStore;
use weathervk_weather::{
    Coordinate, Geocoder, Location, LocationUpdate, WeatherForCity, WeatherMainCast,
    WeatherProvider,
};

use crate::bridge;
use crate::models::{CityListModel, CityRow, CurrentLocationModel, CurrentLocationRow};
use crate::services::{self, WeatherError, WeatherServiceMessage};

/// Receives "data changed" notifications for the saved-city list
pub trait ReloadDelegate: Send {
    fn reload_collection(&mut self);
}

pub struct WeatherController {
    store: WeatherStore,
    provider: Arc<WeatherProvider>,
    geocoder: Arc<Geocoder>,
    runtime: Handle,
    tx: Sender<WeatherServiceMessage>,
    rx: Receiver<WeatherServiceMessage>,
    delegate: Option<Box<dyn ReloadDelegate>>,
    list: CityListModel,
    header: CurrentLocationModel,
    next_seq: u64,
    in_flight: usize,
    // Latest applied request per city name; deletes leave a marker here too
    applied_city_seq: HashMap<String, u64>,
    // Latest successful request per target (coordinate or search text)
    applied_target_seq: HashMap<String, u64>,
    // Target of every city request still in flight
    pending_targets: HashMap<u64, String>,
    // City results issued at or before this sequence predate a clear
    cleared_through: u64,
    applied_location_seq: u64,
    location_requested: bool,
    last_error: Option<AppError>,
}

impl WeatherController {
    pub fn new(
        store: WeatherStore,
        provider: Arc<WeatherProvider>,
        geocoder: Arc<Geocoder>,
        runtime: Handle,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let units = provider.units();
        Self {
            store,
            provider,
            geocoder,
            runtime,
            tx,
            rx,
            delegate: None,
            list: CityListModel::new(units),
            header: CurrentLocationModel::new(units),
            next_seq: 0,
            in_flight: 0,
            applied_city_seq: HashMap::new(),
            applied_target_seq: HashMap::new(),
            pending_targets: HashMap::new(),
            cleared_through: 0,
            applied_location_seq: 0,
            location_requested: false,
            last_error: None,
        }
    }

    /// Build the services from configuration and run them on the shared runtime
    pub fn from_config(config: &Config, store: WeatherStore) -> Result<Self, AppError> {
        let provider = WeatherProvider::new(bridge::provider_settings(config))
            .map_err(|e| AppError::from(WeatherError::from(e)))?;
        let geocoder = Geocoder::new(bridge::geocoder_settings(config))
            .map_err(|e| AppError::from(WeatherError::from(e)))?;
        let runtime =
            bridge::get_runtime().ok_or(AppError::from(WeatherError::NotInitialized))?;

        Ok(Self::new(
            store,
            Arc::new(provider),
            Arc::new(geocoder),
            runtime,
        ))
    }

    pub fn set_reload_delegate(&mut self, delegate: Box<dyn ReloadDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Re-fetch every saved city. Returns the number of requests started.
    pub fn on_load(&mut self) -> Result<usize, AppError> {
        let cities = self.store.cities()?;
        tracing::info!("Refreshing {} saved cities", cities.len());
        for city in &cities {
            self.request_city(city.coordinate());
        }
        Ok(cities.len())
    }

    /// Geocode the search text and fetch weather for the match.
    /// Blank text is ignored and returns false.
    pub fn on_search_submitted(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let seq = self.begin_request();
        self.pending_targets.insert(seq, search_target(text));
        services::request_search(
            &self.tx,
            &self.runtime,
            self.geocoder.clone(),
            self.provider.clone(),
            seq,
            text.to_string(),
        );
        true
    }

    /// Handle a location update. The first granted update with a position
    /// shows the header and fetches its weather; later updates are ignored.
    pub fn on_location_update(&mut self, update: LocationUpdate) {
        if !update.permission.is_granted() {
            tracing::debug!("Location permission {:?}, header stays hidden", update.permission);
            return;
        }
        if self.location_requested {
            return;
        }
        let Some(location) = update.location else {
            tracing::debug!("Location granted but no position yet");
            return;
        };

        self.location_requested = true;
        self.header.show();
        self.request_current_location(location);
    }

    /// Fetch weather for a coordinate; the result is upserted when drained.
    /// Returns the request's sequence number.
    pub fn request_city(&mut self, coordinate: Coordinate) -> u64 {
        let seq = self.begin_request();
        self.pending_targets.insert(seq, coordinate_target(coordinate));
        services::request_city_fetch(&self.tx, &self.runtime, self.provider.clone(), seq, coordinate);
        seq
    }

    /// Fetch weather for the header without going through permission handling
    pub fn request_current_location(&mut self, location: Location) -> u64 {
        let seq = self.begin_request();
        services::request_location_fetch(
            &self.tx,
            &self.runtime,
            self.provider.clone(),
            self.geocoder.clone(),
            seq,
            location,
        );
        seq
    }

    fn begin_request(&mut self) -> u64 {
        self.next_seq += 1;
        self.in_flight += 1;
        self.next_seq
    }

    /// Apply every result that has arrived so far. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    self.handle_message(msg);
                    handled += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        handled
    }

    /// Block until every outstanding request has reported back or the
    /// timeout passes. Returns true when nothing is left in flight.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.process_pending();

        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(msg) => self.handle_message(msg),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if self.in_flight > 0 {
            tracing::warn!("{} weather requests still pending", self.in_flight);
        }
        self.in_flight == 0
    }

    fn handle_message(&mut self, msg: WeatherServiceMessage) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match msg {
            WeatherServiceMessage::CityFetched { seq, result } => {
                let target = self.pending_targets.remove(&seq);
                match result {
                    Ok(weather) => {
                        if self.apply_city(seq, weather) {
                            if let Some(target) = target {
                                self.applied_target_seq.insert(target, seq);
                            }
                        }
                    }
                    Err(e) => {
                        let superseded = seq <= self.cleared_through
                            || target
                                .and_then(|t| self.applied_target_seq.get(&t).copied())
                                .is_some_and(|applied| applied > seq);
                        if superseded {
                            tracing::debug!("Ignoring failure of superseded request #{}: {}", seq, e);
                        } else {
                            self.record_failure("City weather", e.into());
                        }
                    }
                }
            }
            WeatherServiceMessage::LocationFetched { seq, result } => match result {
                Ok(weather) => self.apply_location(seq, weather),
                Err(e) if seq < self.applied_location_seq => {
                    tracing::debug!("Ignoring failure of superseded location request #{}: {}", seq, e);
                }
                Err(e) => self.record_failure("Current location weather", e.into()),
            },
        }
    }

    /// Store a fetched city unless a newer request, a delete or a clear
    /// already covers it. Returns whether the result was applied.
    fn apply_city(&mut self, seq: u64, weather: WeatherMainCast) -> bool {
        if seq <= self.cleared_through {
            tracing::debug!("Dropping result #{} for {} issued before clear", seq, weather.name);
            return false;
        }
        if let Some(&applied) = self.applied_city_seq.get(&weather.name) {
            if applied >= seq {
                tracing::debug!(
                    "Dropping stale result #{} for {} (already applied #{})",
                    seq,
                    weather.name,
                    applied
                );
                return false;
            }
        }

        match self.store.update_city(&weather) {
            Ok(record) => {
                tracing::info!("Updated {}: {} degrees", record.city, record.temperature);
                self.applied_city_seq.insert(record.city, seq);
                self.notify_reload();
                true
            }
            Err(e) => {
                self.record_failure("Saving city", e.into());
                false
            }
        }
    }

    fn apply_location(&mut self, seq: u64, weather: WeatherForCity) {
        if seq < self.applied_location_seq {
            tracing::debug!("Dropping stale current-location result #{}", seq);
            return;
        }
        self.applied_location_seq = seq;
        self.header.set_weather(&weather);
        tracing::info!("Current location weather for {:?}", weather.name);
    }

    fn record_failure(&mut self, what: &str, error: AppError) {
        tracing::warn!("{} failed: {}", what, error);
        self.last_error = Some(error);
    }

    fn notify_reload(&mut self) {
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.reload_collection();
        }
    }

    /// Remove a saved city. Returns whether it existed.
    pub fn delete_city(&mut self, name: &str) -> Result<bool, AppError> {
        let removed = self.store.delete_city(name)?;
        if removed {
            // Requests already issued must not bring the city back
            self.applied_city_seq.insert(name.to_string(), self.next_seq);
            self.notify_reload();
        }
        Ok(removed)
    }

    /// Remove every saved city. Returns how many were removed.
    pub fn clear(&mut self) -> Result<usize, AppError> {
        let removed = self.store.delete_cities()?;
        self.applied_city_seq.clear();
        self.cleared_through = self.next_seq;
        if removed > 0 {
            self.notify_reload();
        }
        Ok(removed)
    }

    pub fn rows(&self) -> Result<Vec<CityRow>, AppError> {
        Ok(self.list.rows(&self.store)?)
    }

    pub fn current_location(&self) -> Option<&CurrentLocationRow> {
        self.header.row()
    }

    pub fn header_visible(&self) -> bool {
        self.header.is_visible()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Most recent failure, kept until taken
    pub fn last_error(&self) -> Option<&AppError> {
        self.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<AppError> {
        self.last_error.take()
    }

    pub fn store(&self) -> &WeatherStore {
        &self.store
    }
}

fn coordinate_target(coordinate: Coordinate) -> String {
    format!("{:.4},{:.4}", coordinate.latitude, coordinate.longitude)
}

fn search_target(text: &str) -> String {
    format!("search:{}", text.to_lowercase())
}
