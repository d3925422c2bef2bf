//! Weather lookup over a fixed city table.

use async_trait::async_trait;
use runtime::tools::{
    Arguments, ParameterSpec, SchemaError, Tool, ToolDescriptor, ToolError,
};
use std::sync::Arc;
use tracing::debug;

/// Recorded conditions for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct CityWeather {
    pub city: String,
    /// Degrees Fahrenheit.
    pub temperature: i32,
    pub condition: String,
    /// Relative humidity in percent.
    pub humidity: u8,
}

impl CityWeather {
    pub fn new(
        city: impl Into<String>,
        temperature: i32,
        condition: impl Into<String>,
        humidity: u8,
    ) -> Self {
        Self {
            city: city.into(),
            temperature,
            condition: condition.into(),
            humidity,
        }
    }
}

/// The dataset behind the weather tools.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherTable {
    cities: Vec<CityWeather>,
}

impl WeatherTable {
    pub fn new(cities: Vec<CityWeather>) -> Self {
        Self { cities }
    }

    /// The ten cities the weather agent ships with.
    pub fn standard() -> Self {
        Self::new(vec![
            CityWeather::new("New York", 72, "Sunny", 65),
            CityWeather::new("London", 59, "Cloudy", 78),
            CityWeather::new("Tokyo", 68, "Rainy", 85),
            CityWeather::new("Paris", 64, "Partly Cloudy", 70),
            CityWeather::new("Sydney", 75, "Sunny", 60),
            CityWeather::new("Berlin", 57, "Windy", 72),
            CityWeather::new("Toronto", 66, "Clear", 68),
            CityWeather::new("Dubai", 95, "Hot and Sunny", 45),
            CityWeather::new("Singapore", 88, "Humid", 90),
            CityWeather::new("Mumbai", 86, "Monsoon", 88),
        ])
    }

    /// Look a city up, ignoring ASCII case and surrounding whitespace.
    pub fn lookup(&self, city: &str) -> Option<&CityWeather> {
        let city = city.trim();
        self.cities
            .iter()
            .find(|entry| entry.city.eq_ignore_ascii_case(city))
    }

    pub fn city_names(&self) -> String {
        self.cities
            .iter()
            .map(|entry| entry.city.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The report returned to the agent. Unknown cities get the list of
    /// known ones instead of a failure.
    pub fn report(&self, city: &str) -> String {
        match self.lookup(city) {
            Some(entry) => format!(
                "Weather in {}: {}, Temperature: {}°F, Humidity: {}%",
                entry.city, entry.condition, entry.temperature, entry.humidity
            ),
            None => {
                debug!(city, "no weather data");
                format!(
                    "Sorry, weather data is not available for {}. Available cities are: {}",
                    city.trim(),
                    self.city_names()
                )
            }
        }
    }
}

impl Default for WeatherTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// `get_weather(city)`.
#[derive(Debug)]
pub struct GetWeather {
    descriptor: ToolDescriptor,
    table: Arc<WeatherTable>,
}

impl GetWeather {
    pub fn new(table: Arc<WeatherTable>) -> Result<Self, SchemaError> {
        let descriptor =
            ToolDescriptor::builder("get_weather", "Get weather information for a specific city.")
                .param(
                    ParameterSpec::text("city")
                        .describe("The name of the city to get weather for"),
                )
                .build()?;
        Ok(Self { descriptor, table })
    }
}

#[async_trait]
impl Tool for GetWeather {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, arguments: Arguments) -> Result<String, ToolError> {
        Ok(self.table.report(arguments.text("city")?))
    }
}

/// `list_cities()`.
#[derive(Debug)]
pub struct ListCities {
    descriptor: ToolDescriptor,
    table: Arc<WeatherTable>,
}

impl ListCities {
    pub fn new(table: Arc<WeatherTable>) -> Result<Self, SchemaError> {
        let descriptor = ToolDescriptor::builder(
            "list_cities",
            "List all available cities with weather data.",
        )
        .build()?;
        Ok(Self { descriptor, table })
    }
}

#[async_trait]
impl Tool for ListCities {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _arguments: Arguments) -> Result<String, ToolError> {
        Ok(format!("Available cities: {}", self.table.city_names()))
    }
}

/// Both weather tools over one shared table.
pub fn tools(table: Arc<WeatherTable>) -> Result<Vec<Arc<dyn Tool>>, SchemaError> {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(GetWeather::new(Arc::clone(&table))?),
        Arc::new(ListCities::new(table)?),
    ];
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_padding() {
        let table = WeatherTable::standard();
        assert_eq!(table.lookup(" tokyo ").map(|c| c.temperature), Some(68));
        assert!(table.lookup("Atlantis").is_none());
    }

    #[test]
    fn report_uses_canonical_city_name() {
        let table = WeatherTable::standard();
        assert_eq!(
            table.report("new york"),
            "Weather in New York: Sunny, Temperature: 72°F, Humidity: 65%"
        );
    }

    #[test]
    fn custom_table() {
        let table = WeatherTable::new(vec![CityWeather::new("Oslo", 41, "Snow", 80)]);
        assert_eq!(table.city_names(), "Oslo");
        assert!(table.report("Paris").ends_with("Available cities are: Oslo"));
    }

    #[tokio::test]
    async fn list_cities_names_all_ten() {
        let tool = ListCities::new(Arc::new(WeatherTable::standard())).unwrap();
        let out = tool.invoke(Arguments::default()).await.unwrap();
        assert!(out.starts_with("Available cities: New York, London"));
        assert_eq!(out.matches(", ").count(), 9);
    }
}
