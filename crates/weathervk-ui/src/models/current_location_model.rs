//! Header row showing weather at the device position.
//!
//! Kept apart from the saved-city list and never persisted.

use weathervk_weather::{ForecastEntry, UnitSystem, WeatherForCity};

/// One day of the header's forecast strip
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastLine {
    /// Short weekday name, e.g. "Mon"
    pub day: String,
    pub temperature: Option<i32>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentLocationRow {
    pub place: String,
    pub temperature: Option<i32>,
    pub condition: String,
    pub icon: Option<String>,
    pub forecast: Vec<ForecastLine>,
    pub units: UnitSystem,
}

impl CurrentLocationRow {
    pub fn from_weather(weather: &WeatherForCity, units: UnitSystem) -> Self {
        let place = if weather.name.trim().is_empty() {
            weather.coordinate().to_string()
        } else {
            weather.name.clone()
        };

        let condition = weather
            .weather
            .first()
            .or_else(|| weather.current.as_ref().and_then(|c| c.condition()));

        let forecast = weather
            .weekly_forecast
            .iter()
            .map(|day| ForecastLine {
                day: day.date().format("%a").to_string(),
                temperature: day.temperature().map(|t| t.round() as i32),
                icon: day.condition().map(|c| c.icon.clone()),
            })
            .collect();

        Self {
            place,
            temperature: weather.temperature().map(|t| t.round() as i32),
            condition: condition
                .map(|c| c.category().description().to_string())
                .unwrap_or_default(),
            icon: condition.map(|c| c.icon.clone()),
            forecast,
            units,
        }
    }
}

impl std::fmt::Display for CurrentLocationRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suffix = self.units.temperature_suffix();
        write!(f, "{}", self.place)?;
        if let Some(t) = self.temperature {
            write!(f, "  {}{}", t, suffix)?;
        }
        if !self.condition.is_empty() {
            write!(f, "  {}", self.condition)?;
        }
        for line in &self.forecast {
            match line.temperature {
                Some(t) => write!(f, "\n  {} {}{}", line.day, t, suffix)?,
                None => write!(f, "\n  {} --", line.day)?,
            }
        }
        Ok(())
    }
}

/// Visibility and contents of the current-location header
#[derive(Debug, Clone, Default)]
pub struct CurrentLocationModel {
    visible: bool,
    row: Option<CurrentLocationRow>,
    units: UnitSystem,
}

impl CurrentLocationModel {
    pub fn new(units: UnitSystem) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn set_weather(&mut self, weather: &WeatherForCity) {
        self.row = Some(CurrentLocationRow::from_weather(weather, self.units));
    }

    /// The header row, once weather has arrived for a visible header
    pub fn row(&self) -> Option<&CurrentLocationRow> {
        if self.visible {
            self.row.as_ref()
        } else {
            None
        }
    }
}
